// Copyright © 2024 Twinpress. All rights reserved.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! # Navigation Builder
//!
//! Produces the ordered navigation list exposed to templates: a fixed home
//! entry followed by one entry per discovered page, in discovery order.
//!
//! The development server keeps the current list in a [`NavigationSnapshot`].
//! Readers take an `Arc` of the list at render time; the change reactor is
//! the only writer and swaps in a freshly computed list.

use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;

use crate::content::Page;
use crate::urls::RenderConfig;

/// A (title, URL) pair shown in site navigation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavigationEntry {
    /// Display title.
    pub title: String,
    /// Link target; its shape depends on the mode.
    pub url: String,
}

/// Builds the navigation for `pages` in the mode of `config`.
///
/// The output is a pure function of its inputs: the home entry first, then
/// the pages in the order given.
pub fn build_navigation(
    pages: &[Page],
    config: &RenderConfig,
    home_title: &str,
) -> Vec<NavigationEntry> {
    let mut navigation = Vec::with_capacity(pages.len() + 1);
    navigation.push(NavigationEntry {
        title: home_title.to_string(),
        url: config.home_url(),
    });
    navigation.extend(pages.iter().map(|page| NavigationEntry {
        title: page.title.clone(),
        url: config.page_url(&page.id),
    }));
    navigation
}

/// The process-wide navigation list of the development server.
#[derive(Debug)]
pub struct NavigationSnapshot {
    current: RwLock<Arc<Vec<NavigationEntry>>>,
}

impl NavigationSnapshot {
    /// Creates a snapshot holding `navigation`.
    pub fn new(navigation: Vec<NavigationEntry>) -> Self {
        Self {
            current: RwLock::new(Arc::new(navigation)),
        }
    }

    /// The list as of now. Later replacements do not affect the returned value.
    pub fn current(&self) -> Arc<Vec<NavigationEntry>> {
        Arc::clone(&self.current.read())
    }

    /// Swaps in a new list.
    pub fn replace(&self, navigation: Vec<NavigationEntry>) {
        *self.current.write() = Arc::new(navigation);
    }
}
