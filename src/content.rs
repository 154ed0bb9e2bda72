// Copyright © 2024 Twinpress. All rights reserved.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! # Content Discovery
//!
//! Scans the pages directory for content files and derives a [`Page`] for
//! each one. The filesystem is the source of truth: pages are never cached
//! here, every call re-reads the directory.
//!
//! Discovery fails soft. A missing or unreadable directory yields an empty
//! list and a warning, so the rest of the site degrades to the home page
//! instead of failing.

use log::{debug, warn};
use serde::Serialize;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// One navigable page backed by a content file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page {
    /// File stem of the content file.
    pub id: String,
    /// Display title: the identifier with its first character upper-cased.
    pub title: String,
    /// Path of the content file.
    pub source: PathBuf,
}

impl Page {
    /// Builds a page from a content file path, or `None` when the path does
    /// not carry the content extension.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::path::Path;
    /// use twinpress::content::Page;
    ///
    /// let page = Page::from_path(Path::new("views/@pages/about.html"), "html").unwrap();
    /// assert_eq!(page.id, "about");
    /// assert_eq!(page.title, "About");
    /// ```
    pub fn from_path(path: &Path, extension: &str) -> Option<Self> {
        if path.extension().and_then(|e| e.to_str()) != Some(extension) {
            return None;
        }
        let id = path.file_stem()?.to_str()?.to_string();
        Some(Self {
            title: derive_title(&id),
            id,
            source: path.to_path_buf(),
        })
    }

    /// Page title as shown in the document head: `"<Title> - <site title>"`.
    pub fn page_title(&self, site_title: &str) -> String {
        format!("{} - {}", self.title, site_title)
    }
}

/// Upper-cases the first character of `id`, leaving the rest unchanged.
pub fn derive_title(id: &str) -> String {
    let mut chars = id.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Lists the content files of `pages_dir`, sorted by file name.
///
/// Entries that are not regular files, or that lack the content extension,
/// are skipped.
pub fn list_pages(pages_dir: &Path, extension: &str) -> Vec<Page> {
    let entries = match fs::read_dir(pages_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            warn!(
                "Pages directory {} does not exist; only the home page will be listed",
                pages_dir.display()
            );
            return Vec::new();
        }
        Err(e) => {
            warn!(
                "Error reading pages directory {}: {}",
                pages_dir.display(),
                e
            );
            return Vec::new();
        }
    };

    let mut pages: Vec<Page> = entries
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Skipping unreadable entry in {}: {}", pages_dir.display(), e);
                None
            }
        })
        .filter(|entry| entry.path().is_file())
        .filter_map(|entry| Page::from_path(&entry.path(), extension))
        .collect();

    pages.sort_by(|a, b| a.source.file_name().cmp(&b.source.file_name()));
    debug!("Discovered {} page(s) in {}", pages.len(), pages_dir.display());
    pages
}

/// Resolves a page identifier to its content file, if one exists.
///
/// Identifiers that could address anything outside `pages_dir` (path
/// separators, `..`, empty) never resolve.
pub fn find_page(pages_dir: &Path, id: &str, extension: &str) -> Option<Page> {
    if id.is_empty() || id == "." || id == ".." || id.contains(['/', '\\']) {
        return None;
    }
    let path = pages_dir.join(format!("{}.{}", id, extension));
    if !path.is_file() {
        return None;
    }
    Some(Page {
        id: id.to_string(),
        title: derive_title(id),
        source: path,
    })
}
