// Copyright © 2024 Twinpress. All rights reserved.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! # Configuration Module
//!
//! Site configuration for both operating modes. Values come from three
//! layers, applied in order: an optional TOML file, environment variables
//! carrying a prefix, and explicit key/value overrides (used by the CLI).
//!
//! ## Example
//!
//! ```rust,no_run
//! use twinpress::core::config::ConfigBuilder;
//!
//! let config = ConfigBuilder::new()
//!     .with_file("twinpress.toml")
//!     .with_env_prefix("TWINPRESS_")
//!     .with_override("server.port", 8080_i64)
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(config.server.port, 8080);
//! ```

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use toml::Value as TomlValue;

use crate::context::{BaseContext, RESERVED_CONTEXT_KEYS};
use crate::{Result, TwinpressError};

/// Configuration file picked up when present in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "twinpress.toml";

/// Prefix of environment variables that override configuration values.
pub const DEFAULT_ENV_PREFIX: &str = "TWINPRESS_";

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_template_dir")]
    /// Root directory of all templates and partials.
    pub template_dir: PathBuf,

    #[serde(default = "default_pages_dir")]
    /// Subdirectory of `template_dir` holding one content file per page.
    pub pages_dir: String,

    #[serde(default = "default_index_template")]
    /// Index template file name, relative to `template_dir`.
    pub index_template: String,

    #[serde(default = "default_assets_dir")]
    /// Static asset source tree.
    pub assets_dir: PathBuf,

    #[serde(default = "default_output_dir")]
    /// Output root of the static build.
    pub output_dir: PathBuf,

    #[serde(default)]
    /// Site metadata exposed to every template.
    pub site: SiteConfig,

    #[serde(default)]
    /// Template engine settings.
    pub template: TemplateConfig,

    #[serde(default)]
    /// Development server settings.
    pub server: ServerConfig,

    #[serde(default)]
    /// Build output settings.
    pub output: OutputConfig,

    #[serde(default)]
    /// Custom values merged into the base render context.
    pub custom: HashMap<String, TomlValue>,
}

/// Site metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    #[serde(default = "default_site_title")]
    /// Site title; page titles are derived as `"<Page> - <title>"`.
    pub title: String,

    #[serde(default = "default_site_description")]
    /// Site description.
    pub description: String,

    #[serde(default = "default_home_title")]
    /// Title of the fixed home navigation entry.
    pub home_title: String,
}

/// Template engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateConfig {
    #[serde(default = "default_content_extension")]
    /// Extension identifying content files (without the dot).
    pub content_extension: String,

    #[serde(default = "default_partial_extension")]
    /// Extension identifying partials under the template root.
    pub partial_extension: String,

    #[serde(default)]
    /// Fail renders that reference missing variables.
    pub strict_mode: bool,
}

/// Development server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    /// Host address to bind to.
    pub host: String,

    #[serde(default = "default_port")]
    /// Port to listen on.
    pub port: u16,

    #[serde(default = "default_true")]
    /// Watch the template root and push reloads to connected browsers.
    pub live_reload: bool,
}

/// Build output settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    /// Minify rendered documents.
    pub minify: bool,

    #[serde(default)]
    /// Extra literal markers stripped from build output.
    pub dev_markers: Vec<String>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: default_site_title(),
            description: default_site_description(),
            home_title: default_home_title(),
        }
    }
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            content_extension: default_content_extension(),
            partial_extension: default_partial_extension(),
            strict_mode: false,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            live_reload: true,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            template_dir: default_template_dir(),
            pages_dir: default_pages_dir(),
            index_template: default_index_template(),
            assets_dir: default_assets_dir(),
            output_dir: default_output_dir(),
            site: SiteConfig::default(),
            template: TemplateConfig::default(),
            server: ServerConfig::default(),
            output: OutputConfig::default(),
            custom: HashMap::new(),
        }
    }
}

impl Config {
    /// Validates the configuration.
    pub fn validate(&self) -> Result<()> {
        validate_config(self)
    }

    /// Directory holding the page content files.
    pub fn pages_path(&self) -> PathBuf {
        self.template_dir.join(&self.pages_dir)
    }

    /// Path of the index template.
    pub fn index_path(&self) -> PathBuf {
        self.template_dir.join(&self.index_template)
    }

    /// Builds the process-wide base context from site metadata and custom values.
    ///
    /// Custom values whose names collide with the reserved context names are
    /// dropped, so they can never shadow the values the pipeline computes.
    pub fn base_context(&self) -> BaseContext {
        let mut custom = serde_json::Map::new();
        for (key, value) in &self.custom {
            if RESERVED_CONTEXT_KEYS.contains(&key.as_str()) {
                warn!(
                    "Ignoring custom context value '{}': the name is reserved",
                    key
                );
                continue;
            }
            match serde_json::to_value(value) {
                Ok(json) => {
                    _ = custom.insert(key.clone(), json);
                }
                Err(e) => {
                    warn!("Ignoring custom context value '{}': {}", key, e)
                }
            }
        }

        BaseContext {
            site_title: self.site.title.clone(),
            site_description: self.site.description.clone(),
            custom: JsonValue::Object(custom),
        }
    }
}

/// Builds a `Config` from a file, environment variables and overrides.
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config_file: Option<PathBuf>,
    env_prefix: Option<String>,
    overrides: Vec<(String, TomlValue)>,
}

impl ConfigBuilder {
    /// Initialises a new `ConfigBuilder`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a TOML configuration file to the builder.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Adds a prefix for environment variables overriding configuration values.
    ///
    /// `TWINPRESS_SERVER_PORT` maps to `server.port`; top-level keys such as
    /// `TWINPRESS_OUTPUT_DIR` map to `output_dir`. Variables naming no
    /// setting are skipped with a warning.
    pub fn with_env_prefix<S: Into<String>>(
        mut self,
        prefix: S,
    ) -> Self {
        self.env_prefix = Some(prefix.into());
        self
    }

    /// Adds a key-value pair overriding a configuration value.
    ///
    /// Overrides are applied in insertion order, after the file and the
    /// environment.
    pub fn with_override<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<TomlValue>,
    {
        self.overrides.push((key.into(), value.into()));
        self
    }

    /// Builds the final configuration and validates it.
    pub fn build(self) -> Result<Config> {
        let mut config = if let Some(path) = self.config_file {
            load_from_file(&path)?
        } else {
            Config::default()
        };

        if let Some(prefix) = self.env_prefix {
            apply_env_overrides(&mut config, &prefix)?;
        }

        for (key, value) in &self.overrides {
            apply_config_value(&mut config, key, &override_text(value))?;
        }

        validate_config(&config)?;
        debug!("Resolved configuration: {:?}", config);
        Ok(config)
    }
}

// Internal helper functions

fn load_from_file(path: &Path) -> Result<Config> {
    let content = fs::read_to_string(path).map_err(|e| {
        TwinpressError::config_error(
            format!("Failed to read config file: {}", e),
            Some(path.to_path_buf()),
        )
    })?;

    toml::from_str(&content).map_err(|e| {
        TwinpressError::config_error(
            format!("Failed to parse config file: {}", e),
            Some(path.to_path_buf()),
        )
    })
}

const TOP_LEVEL_KEYS: &[&str] = &[
    "template_dir",
    "pages_dir",
    "index_template",
    "assets_dir",
    "output_dir",
];

const SECTIONS: &[&str] = &["site", "template", "server", "output", "custom"];

const SECTION_KEYS: &[(&str, &[&str])] = &[
    ("site", &["title", "description", "home_title"]),
    (
        "template",
        &["content_extension", "partial_extension", "strict_mode"],
    ),
    ("server", &["host", "port", "live_reload"]),
    ("output", &["minify", "dev_markers"]),
];

/// Whether `key` names a setting, in the dotted form used by overrides.
fn is_known_key(key: &str) -> bool {
    if TOP_LEVEL_KEYS.contains(&key) {
        return true;
    }
    match key.split_once('.') {
        Some(("custom", name)) => !name.is_empty(),
        Some((section, name)) => SECTION_KEYS
            .iter()
            .any(|(known, keys)| *known == section && keys.contains(&name)),
        None => false,
    }
}

fn env_key_to_config_key(stripped: &str) -> String {
    let key = stripped.trim_start_matches('_').to_lowercase();
    if TOP_LEVEL_KEYS.contains(&key.as_str()) {
        return key;
    }
    for section in SECTIONS {
        if let Some(rest) = key
            .strip_prefix(section)
            .and_then(|rest| rest.strip_prefix('_'))
        {
            return format!("{}.{}", section, rest);
        }
    }
    key
}

fn apply_env_overrides(
    config: &mut Config,
    prefix: &str,
) -> Result<()> {
    for (key, value) in env::vars() {
        if let Some(stripped) = key.strip_prefix(prefix) {
            let config_key = env_key_to_config_key(stripped);
            if !is_known_key(&config_key) {
                warn!("Ignoring {}: no configuration key '{}'", key, config_key);
                continue;
            }
            apply_config_value(config, &config_key, &value)?;
        }
    }
    Ok(())
}

fn validate_config(config: &Config) -> Result<()> {
    validate_path(&config.template_dir, "template")?;
    validate_path(&config.assets_dir, "asset")?;

    let extension = &config.template.content_extension;
    if extension.is_empty() || extension.starts_with('.') {
        return Err(TwinpressError::config_error(
            format!(
                "Content extension must be non-empty and given without a dot: '{}'",
                extension
            ),
            None,
        ));
    }

    if config.pages_dir.is_empty() {
        return Err(TwinpressError::config_error(
            "Pages directory name cannot be empty",
            None,
        ));
    }

    if config.server.port == 0 {
        return Err(TwinpressError::config_error(
            "Server port must be non-zero",
            None,
        ));
    }

    Ok(())
}

fn apply_config_value<T: ToString>(
    config: &mut Config,
    key: &str,
    value: &T,
) -> Result<()> {
    let value_str = value.to_string().trim_matches('"').to_string();
    match key {
        "template_dir" => config.template_dir = PathBuf::from(value_str),
        "pages_dir" => config.pages_dir = value_str,
        "index_template" => config.index_template = value_str,
        "assets_dir" => config.assets_dir = PathBuf::from(value_str),
        "output_dir" => config.output_dir = PathBuf::from(value_str),
        _ => {
            if let Some((section, key)) = key.split_once('.') {
                match section {
                    "site" => {
                        apply_site_value(&mut config.site, key, value_str)?
                    }
                    "template" => apply_template_value(
                        &mut config.template,
                        key,
                        &value_str,
                    )?,
                    "server" => apply_server_value(
                        &mut config.server,
                        key,
                        &value_str,
                    )?,
                    "output" => apply_output_value(
                        &mut config.output,
                        key,
                        &value_str,
                    )?,
                    "custom" => {
                        _ = config.custom.insert(
                            key.to_string(),
                            TomlValue::String(value_str),
                        );
                    }
                    _ => {
                        return Err(TwinpressError::config_error(
                            format!(
                                "Unknown configuration section: {}",
                                section
                            ),
                            None,
                        ));
                    }
                }
            } else {
                return Err(TwinpressError::config_error(
                    format!("Unknown configuration key: {}", key),
                    None,
                ));
            }
        }
    }
    Ok(())
}

/// Plain text of an override; strings are taken verbatim rather than in
/// their quoted TOML form.
fn override_text(value: &TomlValue) -> String {
    match value {
        TomlValue::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn parse_value<T>(key: &str, value: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.parse().map_err(|e| {
        TwinpressError::config_error(
            format!("Invalid {} value '{}': {}", key, value, e),
            None,
        )
    })
}

fn unknown_key(section: &str, key: &str) -> TwinpressError {
    TwinpressError::config_error(
        format!("Unknown configuration key: {}.{}", section, key),
        None,
    )
}

fn apply_site_value(
    config: &mut SiteConfig,
    key: &str,
    value: String,
) -> Result<()> {
    match key {
        "title" => config.title = value,
        "description" => config.description = value,
        "home_title" => config.home_title = value,
        _ => return Err(unknown_key("site", key)),
    }
    Ok(())
}

fn apply_template_value(
    config: &mut TemplateConfig,
    key: &str,
    value: &str,
) -> Result<()> {
    match key {
        "content_extension" => {
            config.content_extension = value.to_string()
        }
        "partial_extension" => {
            config.partial_extension = value.to_string()
        }
        "strict_mode" => config.strict_mode = parse_value(key, value)?,
        _ => return Err(unknown_key("template", key)),
    }
    Ok(())
}

fn apply_server_value(
    config: &mut ServerConfig,
    key: &str,
    value: &str,
) -> Result<()> {
    match key {
        "host" => config.host = value.to_string(),
        "port" => config.port = parse_value(key, value)?,
        "live_reload" => config.live_reload = parse_value(key, value)?,
        _ => return Err(unknown_key("server", key)),
    }
    Ok(())
}

fn apply_output_value(
    config: &mut OutputConfig,
    key: &str,
    value: &str,
) -> Result<()> {
    match key {
        "minify" => config.minify = parse_value(key, value)?,
        "dev_markers" => config.dev_markers.push(value.to_string()),
        _ => return Err(unknown_key("output", key)),
    }
    Ok(())
}

/// Configured directories are optional, since discovery degrades to an
/// empty site, but an existing path must be a directory.
fn validate_path(path: &Path, name: &str) -> Result<()> {
    if path.exists() && !path.is_dir() {
        return Err(TwinpressError::config_error(
            format!(
                "{} path is not a directory: {}",
                name,
                path.display()
            ),
            Some(path.to_path_buf()),
        ));
    }

    Ok(())
}

// Default value functions
fn default_true() -> bool {
    true
}

fn default_template_dir() -> PathBuf {
    PathBuf::from("views")
}

fn default_pages_dir() -> String {
    "@pages".to_string()
}

fn default_index_template() -> String {
    "index.html".to_string()
}

fn default_assets_dir() -> PathBuf {
    PathBuf::from("assets")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("dist")
}

fn default_site_title() -> String {
    "Theme Default".to_string()
}

fn default_site_description() -> String {
    "A beautiful theme built with Handlebars".to_string()
}

fn default_home_title() -> String {
    "home".to_string()
}

fn default_content_extension() -> String {
    "html".to_string()
}

fn default_partial_extension() -> String {
    "hbs".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5173
}
