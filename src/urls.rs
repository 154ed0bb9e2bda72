// Copyright © 2024 Twinpress. All rights reserved.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! # URL Filters
//!
//! Pure functions mapping a logical asset path or page identifier to the URL
//! a template should emit. The shape depends only on the [`Mode`] carried by
//! a [`RenderConfig`]:
//!
//! | Filter | `serve` | `build` |
//! |--------|---------|---------|
//! | `asset_url("css/site.css")` | `/assets/css/site.css` | `./assets/css/site.css` |
//! | `page_url("about")` | `/pages/about` | `./about.html` |
//!
//! A renderer is constructed from one `RenderConfig`, so its helpers and the
//! navigation it renders always agree on the mode.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Mount point of the asset tree on the development server.
pub const ASSETS_MOUNT: &str = "/assets";

/// Mount point of content pages on the development server.
pub const PAGES_MOUNT: &str = "/pages";

/// Asset folder inside the build output root.
pub const BUILD_ASSETS_DIR: &str = "assets";

/// File name of the index document, both as a request path and as output.
pub const INDEX_DOCUMENT: &str = "index.html";

/// Operating mode; selects the URL strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Live rendering behind the development server: root-relative URLs.
    Serve,
    /// Static output generation: document-relative URLs.
    Build,
}

impl Mode {
    /// Lowercase name, as exposed to templates.
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Serve => "serve",
            Mode::Build => "build",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mode plus the content extension: everything the URL filters depend on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderConfig {
    mode: Mode,
    content_extension: String,
}

impl RenderConfig {
    /// Creates a configuration for `mode` with the given content extension
    /// (without the dot).
    pub fn new<S: Into<String>>(mode: Mode, content_extension: S) -> Self {
        Self {
            mode,
            content_extension: content_extension.into(),
        }
    }

    /// Serve-mode configuration.
    pub fn serve<S: Into<String>>(content_extension: S) -> Self {
        Self::new(Mode::Serve, content_extension)
    }

    /// Build-mode configuration.
    pub fn build<S: Into<String>>(content_extension: S) -> Self {
        Self::new(Mode::Build, content_extension)
    }

    /// The configured mode.
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// The content extension, without the dot.
    pub fn content_extension(&self) -> &str {
        &self.content_extension
    }

    /// URL of a static asset.
    ///
    /// A redundant leading `assets/` or `/assets/` segment is removed, so
    /// `"assets/js/main.js"` and `"js/main.js"` resolve alike.
    pub fn asset_url(&self, path: &str) -> String {
        let trimmed = strip_asset_mount(path);
        match self.mode {
            Mode::Serve => format!("{}/{}", ASSETS_MOUNT, trimmed),
            Mode::Build => format!("./{}/{}", BUILD_ASSETS_DIR, trimmed),
        }
    }

    /// URL of a content page by identifier.
    ///
    /// A trailing content extension on the identifier is tolerated in both
    /// modes.
    pub fn page_url(&self, identifier: &str) -> String {
        let id = self.strip_extension(identifier);
        match self.mode {
            Mode::Serve => format!("{}/{}", PAGES_MOUNT, id),
            Mode::Build => format!("./{}", self.page_file_name(id)),
        }
    }

    /// URL of the index document.
    pub fn home_url(&self) -> String {
        match self.mode {
            Mode::Serve => "/".to_string(),
            Mode::Build => format!("./{}", INDEX_DOCUMENT),
        }
    }

    /// Output file name of a page in build mode.
    pub fn page_file_name(&self, identifier: &str) -> String {
        format!(
            "{}.{}",
            self.strip_extension(identifier),
            self.content_extension
        )
    }

    fn strip_extension<'a>(&self, identifier: &'a str) -> &'a str {
        identifier
            .strip_suffix(self.content_extension.as_str())
            .and_then(|rest| rest.strip_suffix('.'))
            .unwrap_or(identifier)
    }
}

fn strip_asset_mount(path: &str) -> &str {
    let path = path.strip_prefix('/').unwrap_or(path);
    path.strip_prefix("assets/").unwrap_or(path)
}
