// Copyright © 2024 Twinpress. All rights reserved.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! # Template Context
//!
//! Every render receives a [`RenderContext`], merged in a fixed order:
//!
//! 1. the [`BaseContext`]: site metadata and custom values, built once from
//!    the configuration;
//! 2. [`PageOverrides`]: current page identifier and page title, when a page
//!    is being rendered;
//! 3. the navigation list current at render time.
//!
//! Templates see camelCase names:
//!
//! | Name | Value |
//! |------|-------|
//! | `siteTitle` | site title |
//! | `pageTitle` | page title, or the site title when no page is current |
//! | `pageDescription` | site description |
//! | `mode` | `"serve"` or `"build"` |
//! | `devMode` | `true` in serve mode |
//! | `currentPage` | page identifier (absent on the index) |
//! | `navigation` | list of `{ title, url }` |

use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::content::Page;
use crate::navigation::NavigationEntry;
use crate::urls::Mode;

/// Names computed by the pipeline; custom values may not use them.
pub const RESERVED_CONTEXT_KEYS: &[&str] = &[
    "siteTitle",
    "pageTitle",
    "pageDescription",
    "mode",
    "devMode",
    "currentPage",
    "navigation",
];

/// Process-wide values shared by every render.
#[derive(Debug, Clone, PartialEq)]
pub struct BaseContext {
    /// Site title.
    pub site_title: String,
    /// Site description.
    pub site_description: String,
    /// Custom values (a JSON object) merged into every context.
    pub custom: JsonValue,
}

/// Per-page values layered over the base context.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageOverrides {
    /// Identifier of the page being rendered.
    pub current_page: Option<String>,
    /// Title replacing the site title as `pageTitle`.
    pub page_title: Option<String>,
}

impl PageOverrides {
    /// Overrides for rendering `page`: its identifier and `"<Title> - <site title>"`.
    pub fn for_page(page: &Page, site_title: &str) -> Self {
        Self {
            current_page: Some(page.id.clone()),
            page_title: Some(page.page_title(site_title)),
        }
    }
}

/// The merged, immutable context of one render call.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderContext {
    /// Site title.
    pub site_title: String,
    /// Page title.
    pub page_title: String,
    /// Site description.
    pub page_description: String,
    /// Mode this context was built for.
    pub mode: Mode,
    /// Whether live development markup is wanted.
    pub dev_mode: bool,
    /// Identifier of the current page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_page: Option<String>,
    /// Navigation entries.
    pub navigation: Vec<NavigationEntry>,
    /// Custom values, flattened into the top level.
    #[serde(flatten)]
    pub custom: serde_json::Map<String, JsonValue>,
}

impl RenderContext {
    /// Merges base, overrides and navigation into one context.
    pub fn compose(
        base: &BaseContext,
        overrides: PageOverrides,
        mode: Mode,
        navigation: &[NavigationEntry],
    ) -> Self {
        let custom = match &base.custom {
            JsonValue::Object(map) => map
                .iter()
                .filter(|(key, _)| {
                    !RESERVED_CONTEXT_KEYS.contains(&key.as_str())
                })
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
            _ => serde_json::Map::new(),
        };

        Self {
            site_title: base.site_title.clone(),
            page_title: overrides
                .page_title
                .unwrap_or_else(|| base.site_title.clone()),
            page_description: base.site_description.clone(),
            mode,
            dev_mode: mode == Mode::Serve,
            current_page: overrides.current_page,
            navigation: navigation.to_vec(),
            custom,
        }
    }
}
