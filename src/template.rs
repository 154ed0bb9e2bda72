// Copyright © 2024 Twinpress. All rights reserved.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! # Template Rendering Module
//!
//! Wraps the Handlebars engine behind [`TemplateRenderer`]. A renderer is
//! bound to one [`RenderConfig`] at construction: its `asset_url` and
//! `page_url` helpers are built from that configuration, so a serve-mode
//! renderer can never emit build-mode URLs or the reverse.
//!
//! ## Features
//!
//! - `{{asset_url "css/site.css"}}` and `{{page_url "about"}}` helpers
//! - Partials discovered under the template root (`{{> components/header}}`)
//! - Engine failures captured as [`RenderResult::Failed`] with a diagnostic
//!   fragment, never propagated to the caller

use crate::context::RenderContext;
use crate::core::config::Config;
use crate::core::traits::TemplateRenderer;
use crate::urls::{Mode, RenderConfig};
use crate::{Result, TwinpressError};
use handlebars::{
    Context, Handlebars, Helper, HelperResult, Output,
    RenderContext as HbsRenderContext, RenderError, RenderErrorReason,
};
use log::{debug, warn};
use parking_lot::RwLock;
use serde_json::Value as JsonValue;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

/// Outcome of one render call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderResult {
    /// Fully rendered HTML.
    Rendered(String),
    /// The engine failed; `diagnostic` is the fallback document.
    Failed {
        /// Engine error message.
        message: String,
        /// `<!-- Template error: ... -->` followed by the unrendered template text.
        diagnostic: String,
    },
}

impl RenderResult {
    /// Builds a failure result for `template`.
    pub fn failed<S: Into<String>>(message: S, template: &str) -> Self {
        let message = message.into();
        let diagnostic = format!(
            "<!-- Template error: {} -->\n{}",
            message.replace("-->", "--&gt;"),
            template
        );
        RenderResult::Failed {
            message,
            diagnostic,
        }
    }

    /// Whether rendering succeeded.
    pub fn is_rendered(&self) -> bool {
        matches!(self, RenderResult::Rendered(_))
    }

    /// The error message, if rendering failed.
    pub fn error(&self) -> Option<&str> {
        match self {
            RenderResult::Rendered(_) => None,
            RenderResult::Failed { message, .. } => Some(message),
        }
    }

    /// The document to show: rendered HTML or the diagnostic fallback.
    pub fn into_html(self) -> String {
        match self {
            RenderResult::Rendered(html) => html,
            RenderResult::Failed { diagnostic, .. } => diagnostic,
        }
    }
}

/// A custom template helper with a name and an execution.
pub trait TemplateHelper: Send + Sync {
    /// Executes the helper with the given parameters and context.
    fn execute(
        &self,
        params: &[JsonValue],
        context: &JsonValue,
    ) -> Result<JsonValue>;

    /// Returns the name of the helper for registration.
    fn name(&self) -> &str;
}

/// Renderer for Handlebars templates bound to one mode.
#[derive(Clone)]
pub struct HandlebarsRenderer {
    engine: Arc<RwLock<Handlebars<'static>>>,
    template_dir: PathBuf,
    partial_extension: String,
    partials: Arc<RwLock<Vec<String>>>,
    config: RenderConfig,
    strict_mode: bool,
}

impl std::fmt::Debug for HandlebarsRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlebarsRenderer")
            .field("template_dir", &self.template_dir)
            .field("mode", &self.config.mode())
            .field("partials", &self.partials.read().len())
            .field("strict_mode", &self.strict_mode)
            .finish()
    }
}

impl HandlebarsRenderer {
    /// Creates a renderer for `template_dir` bound to `config`.
    ///
    /// Serve-mode renderers run the engine in development mode, so partials
    /// registered from files are re-read on every render.
    pub fn new(template_dir: &Path, config: RenderConfig) -> Self {
        let mut handlebars = Handlebars::new();
        handlebars.set_dev_mode(config.mode() == Mode::Serve);
        handlebars.register_escape_fn(handlebars::html_escape);

        let renderer = Self {
            engine: Arc::new(RwLock::new(handlebars)),
            template_dir: template_dir.to_path_buf(),
            partial_extension: "hbs".to_string(),
            partials: Arc::new(RwLock::new(Vec::new())),
            config: config.clone(),
            strict_mode: false,
        };

        renderer
            .with_helper(helpers::AssetUrlHelper::new(config.clone()))
            .with_helper(helpers::PageUrlHelper::new(config))
    }

    /// Creates a renderer for `mode` from the site configuration and loads
    /// its partials. Partials that fail to parse are logged and skipped.
    pub fn from_config(config: &Config, mode: Mode) -> Self {
        let renderer = Self::new(
            &config.template_dir,
            RenderConfig::new(mode, config.template.content_extension.clone()),
        )
        .with_partial_extension(&config.template.partial_extension)
        .with_strict_mode(config.template.strict_mode);

        if let Err(e) = renderer.reload_partials() {
            warn!("{}", e);
        }
        renderer
    }

    /// Enables or disables strict mode: missing variables fail the render.
    pub fn with_strict_mode(mut self, strict: bool) -> Self {
        self.strict_mode = strict;
        self.engine.write().set_strict_mode(strict);
        self
    }

    /// Sets the extension of partial files under the template root.
    pub fn with_partial_extension(mut self, extension: &str) -> Self {
        self.partial_extension = extension.trim_start_matches('.').to_string();
        self
    }

    /// Registers a custom helper with the renderer.
    pub fn with_helper<H>(self, helper: H) -> Self
    where
        H: TemplateHelper + 'static,
    {
        let name = helper.name().to_string();
        self.register_helper(&name, helper);
        self
    }

    /// Registers a partial from a string.
    pub fn with_partial(self, name: &str, template: &str) -> Result<Self> {
        self.engine
            .write()
            .register_partial(name, template)
            .map_err(|e| {
                TwinpressError::template_rendering_error(
                    format!("Failed to register partial '{}': {}", name, e),
                    name.to_string(),
                    Some(Box::new(e)),
                )
            })?;
        Ok(self)
    }

    /// Names of the partials currently registered from files.
    pub fn partial_names(&self) -> Vec<String> {
        self.partials.read().clone()
    }

    /// Registers a helper function with the Handlebars engine.
    fn register_helper<H>(&self, name: &str, helper: H)
    where
        H: TemplateHelper + 'static,
    {
        let helper_fn = move |h: &Helper,
                              _: &Handlebars,
                              ctx: &Context,
                              _: &mut HbsRenderContext,
                              out: &mut dyn Output|
              -> HelperResult {
            let params: Vec<JsonValue> =
                h.params().iter().map(|p| p.value().clone()).collect();

            let result =
                helper.execute(&params, ctx.data()).map_err(|e| {
                    RenderError::from(RenderErrorReason::Other(
                        e.to_string(),
                    ))
                })?;
            match result {
                JsonValue::String(text) => out.write(&text)?,
                other => out.write(&other.to_string())?,
            }
            Ok(())
        };

        self.engine
            .write()
            .register_helper(name, Box::new(helper_fn));
    }

    fn partial_files(&self) -> Vec<(String, PathBuf)> {
        if !self.template_dir.is_dir() {
            return Vec::new();
        }
        WalkDir::new(&self.template_dir)
            .follow_links(true)
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!("Skipping unreadable template entry: {}", e);
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .filter(|entry| {
                entry.path().extension().and_then(|e| e.to_str())
                    == Some(self.partial_extension.as_str())
            })
            .filter_map(|entry| {
                let relative = entry.path().strip_prefix(&self.template_dir).ok()?;
                partial_name(relative).map(|name| (name, entry.path().to_path_buf()))
            })
            .collect()
    }
}

/// Partial name of a template-root-relative path: `/`-separated, without
/// the extension.
fn partial_name(relative: &Path) -> Option<String> {
    let stem = relative.with_extension("");
    let segments: Option<Vec<&str>> =
        stem.components().map(|c| c.as_os_str().to_str()).collect();
    let name = segments?.join("/");
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

impl TemplateRenderer for HandlebarsRenderer {
    fn render(&self, template: &str, context: &RenderContext) -> RenderResult {
        match self.engine.read().render_template(template, context) {
            Ok(html) => RenderResult::Rendered(html),
            Err(e) => RenderResult::failed(e.to_string(), template),
        }
    }

    fn render_config(&self) -> &RenderConfig {
        &self.config
    }

    /// Drops the partials registered by the previous scan and registers the
    /// current set. Files that fail to parse are skipped; the first failure
    /// is returned after all other partials have been registered.
    fn reload_partials(&self) -> Result<usize> {
        let files = self.partial_files();
        let mut engine = self.engine.write();
        let mut registered = self.partials.write();

        for name in registered.drain(..) {
            engine.unregister_template(&name);
        }

        let mut first_error = None;
        for (name, path) in files {
            match engine.register_template_file(&name, &path) {
                Ok(()) => registered.push(name),
                Err(e) => {
                    warn!("Failed to register partial {}: {}", path.display(), e);
                    if first_error.is_none() {
                        first_error = Some(TwinpressError::template_rendering_error(
                            format!("Failed to register partial: {}", e),
                            path.display().to_string(),
                            Some(Box::new(e)),
                        ));
                    }
                }
            }
        }

        debug!(
            "Registered {} partial(s) from {}",
            registered.len(),
            self.template_dir.display()
        );
        match first_error {
            Some(e) => Err(e),
            None => Ok(registered.len()),
        }
    }
}

/// Built-in helpers for template processing.
pub mod helpers {
    use super::*;

    fn string_param<'a>(params: &'a [JsonValue], helper: &str) -> Result<&'a str> {
        params.first().and_then(|p| p.as_str()).ok_or_else(|| {
            TwinpressError::template_rendering_error(
                format!("{} helper requires a string parameter", helper),
                String::new(),
                None,
            )
        })
    }

    /// `{{asset_url "path"}}`: URL of a static asset in the renderer's mode.
    #[derive(Debug, Clone)]
    pub struct AssetUrlHelper {
        config: RenderConfig,
    }

    impl AssetUrlHelper {
        /// Creates the helper for `config`.
        pub fn new(config: RenderConfig) -> Self {
            Self { config }
        }
    }

    impl TemplateHelper for AssetUrlHelper {
        fn execute(
            &self,
            params: &[JsonValue],
            _context: &JsonValue,
        ) -> Result<JsonValue> {
            let path = string_param(params, self.name())?;
            Ok(JsonValue::String(self.config.asset_url(path)))
        }

        fn name(&self) -> &str {
            "asset_url"
        }
    }

    /// `{{page_url "id"}}`: URL of a content page in the renderer's mode.
    #[derive(Debug, Clone)]
    pub struct PageUrlHelper {
        config: RenderConfig,
    }

    impl PageUrlHelper {
        /// Creates the helper for `config`.
        pub fn new(config: RenderConfig) -> Self {
            Self { config }
        }
    }

    impl TemplateHelper for PageUrlHelper {
        fn execute(
            &self,
            params: &[JsonValue],
            _context: &JsonValue,
        ) -> Result<JsonValue> {
            let id = string_param(params, self.name())?;
            Ok(JsonValue::String(self.config.page_url(id)))
        }

        fn name(&self) -> &str {
            "page_url"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{BaseContext, PageOverrides};
    use crate::navigation::NavigationEntry;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn context(mode: Mode) -> RenderContext {
        let base = BaseContext {
            site_title: "Theme Default".to_string(),
            site_description: "A theme".to_string(),
            custom: json!({}),
        };
        let navigation = vec![NavigationEntry {
            title: "home".to_string(),
            url: "/".to_string(),
        }];
        RenderContext::compose(&base, PageOverrides::default(), mode, &navigation)
    }

    #[test]
    fn test_render_with_url_helpers_serve() {
        let temp_dir = TempDir::new().unwrap();
        let renderer =
            HandlebarsRenderer::new(temp_dir.path(), RenderConfig::serve("html"));

        let result = renderer.render(
            r#"<link href="{{asset_url "css/site.css"}}"><a href="{{page_url "about"}}">{{pageTitle}}</a>"#,
            &context(Mode::Serve),
        );

        assert_eq!(
            result,
            RenderResult::Rendered(
                r#"<link href="/assets/css/site.css"><a href="/pages/about">Theme Default</a>"#
                    .to_string()
            )
        );
    }

    #[test]
    fn test_render_with_url_helpers_build() {
        let temp_dir = TempDir::new().unwrap();
        let renderer =
            HandlebarsRenderer::new(temp_dir.path(), RenderConfig::build("html"));

        let html = renderer
            .render(
                r#"{{asset_url "assets/js/main.js"}} {{page_url "about"}}"#,
                &context(Mode::Build),
            )
            .into_html();
        assert_eq!(html, "./assets/js/main.js ./about.html");
    }

    #[test]
    fn test_navigation_loop() {
        let temp_dir = TempDir::new().unwrap();
        let renderer =
            HandlebarsRenderer::new(temp_dir.path(), RenderConfig::serve("html"));

        let html = renderer
            .render(
                "{{#each navigation}}<a href=\"{{url}}\">{{title}}</a>{{/each}}",
                &context(Mode::Serve),
            )
            .into_html();
        assert_eq!(html, "<a href=\"/\">home</a>");
    }

    #[test]
    fn test_render_failure_returns_diagnostic() {
        let temp_dir = TempDir::new().unwrap();
        let renderer =
            HandlebarsRenderer::new(temp_dir.path(), RenderConfig::serve("html"));
        let template = "<h1>{{#each navigation}}</h1>";

        let result = renderer.render(template, &context(Mode::Serve));

        assert!(!result.is_rendered());
        assert!(result.error().is_some());
        let html = result.into_html();
        assert!(html.starts_with("<!-- Template error: "));
        assert!(html.ends_with(template));
    }

    #[test]
    fn test_helper_without_parameter_fails_soft() {
        let temp_dir = TempDir::new().unwrap();
        let renderer =
            HandlebarsRenderer::new(temp_dir.path(), RenderConfig::serve("html"));

        let result = renderer.render("{{asset_url}}", &context(Mode::Serve));
        assert!(!result.is_rendered());
    }

    #[test]
    fn test_partials_loaded_from_template_root() {
        let temp_dir = TempDir::new().unwrap();
        let components = temp_dir.path().join("components");
        fs::create_dir(&components).unwrap();
        fs::write(components.join("header.hbs"), "<header>{{siteTitle}}</header>")
            .unwrap();

        let renderer =
            HandlebarsRenderer::new(temp_dir.path(), RenderConfig::serve("html"));
        assert_eq!(renderer.reload_partials().unwrap(), 1);
        assert_eq!(renderer.partial_names(), vec!["components/header".to_string()]);

        let html = renderer
            .render("{{> components/header}}", &context(Mode::Serve))
            .into_html();
        assert_eq!(html, "<header>Theme Default</header>");
    }

    #[test]
    fn test_reload_drops_removed_partials() {
        let temp_dir = TempDir::new().unwrap();
        let partial = temp_dir.path().join("footer.hbs");
        fs::write(&partial, "<footer></footer>").unwrap();

        let renderer =
            HandlebarsRenderer::new(temp_dir.path(), RenderConfig::serve("html"));
        assert_eq!(renderer.reload_partials().unwrap(), 1);

        fs::remove_file(&partial).unwrap();
        assert_eq!(renderer.reload_partials().unwrap(), 0);
        assert!(renderer.partial_names().is_empty());
    }

    #[test]
    fn test_string_partial() {
        let temp_dir = TempDir::new().unwrap();
        let renderer =
            HandlebarsRenderer::new(temp_dir.path(), RenderConfig::serve("html"))
                .with_partial("nav", "<nav>{{mode}}</nav>")
                .unwrap();

        let html = renderer.render("{{> nav}}", &context(Mode::Serve)).into_html();
        assert_eq!(html, "<nav>serve</nav>");
    }

    #[test]
    fn test_partial_name() {
        assert_eq!(
            partial_name(Path::new("components/header.hbs")),
            Some("components/header".to_string())
        );
        assert_eq!(partial_name(Path::new("footer.hbs")), Some("footer".to_string()));
    }
}
