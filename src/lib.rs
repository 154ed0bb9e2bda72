// Copyright © 2024 Twinpress. All rights reserved.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! # Twinpress Library
//!
//! Twinpress renders one set of Handlebars templates two ways: live behind a
//! development server with live reload, and as a static site ready to be
//! opened from disk. The same content discovery, navigation, and template
//! context feed both modes; only the URL strategy differs.
//!
//! For more information, visit the [Twinpress documentation](https://docs.rs/twinpress).

#![doc = include_str!("../README.md")]
#![doc(html_root_url = "https://docs.rs/twinpress")]
#![crate_name = "twinpress"]
#![crate_type = "lib"]

/// Module containing core utilities, such as configuration and error handling.
pub mod core;

/// Provides command-line interface utilities.
pub mod cli;

/// Provides content discovery.
pub mod content;

/// Provides the merged template context.
pub mod context;

/// Provides the static build pass.
pub mod emitter;

/// Provides output generation utilities.
pub mod generators;

/// Provides the navigation builder and snapshot.
pub mod navigation;

/// Provides development-markup stripping and template reading.
pub mod process;

/// Provides the development server.
pub mod server;

/// Provides template rendering utilities.
pub mod template;

/// Provides the per-mode URL filters.
pub mod urls;

pub use crate::core::config::{Config, ConfigBuilder};
pub use crate::core::error::{Result, TwinpressError};
pub use crate::emitter::{BuildEmitter, BuildReport};
pub use crate::urls::{Mode, RenderConfig};

/// Entry point tying a configuration to both operating modes.
///
/// # Examples
///
/// ```rust,no_run
/// use twinpress::{ConfigBuilder, Twinpress};
///
/// let config = ConfigBuilder::new().with_file("twinpress.toml").build().unwrap();
/// let report = Twinpress::new(config).build().unwrap();
/// assert!(report.is_success());
/// ```
#[derive(Debug, Clone)]
pub struct Twinpress {
    config: Config,
}

impl Twinpress {
    /// Creates an instance for `config`.
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// The configuration in use.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Writes the static site into the configured output directory.
    ///
    /// # Errors
    ///
    /// Fails only when the output root cannot be created; per-target
    /// failures are listed in the report.
    pub fn build(&self) -> Result<BuildReport> {
        BuildEmitter::new(self.config.clone()).run()
    }

    /// Runs the development server until Ctrl-C.
    pub async fn serve(self) -> Result<()> {
        server::run_server(self.config).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_build_through_facade() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let views = temp_dir.path().join("views");
        fs::create_dir_all(views.join("@pages"))?;
        fs::write(views.join("index.html"), "<h1>{{siteTitle}}</h1>")?;
        fs::write(views.join("@pages/about.html"), "<h1>{{pageTitle}}</h1>")?;

        let config = ConfigBuilder::new()
            .with_override("template_dir", views.to_string_lossy().into_owned())
            .with_override(
                "output_dir",
                temp_dir.path().join("dist").to_string_lossy().into_owned(),
            )
            .with_override("site.title", "Demo")
            .build()?;
        let site = Twinpress::new(config);

        let report = site.build()?;

        assert!(report.is_success());
        let dist = &site.config().output_dir;
        assert_eq!(fs::read_to_string(dist.join("index.html"))?, "<h1>Demo</h1>");
        assert_eq!(
            fs::read_to_string(dist.join("about.html"))?,
            "<h1>About - Demo</h1>"
        );
        Ok(())
    }
}
