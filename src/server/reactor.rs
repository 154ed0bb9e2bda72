// Copyright © 2024 Twinpress. All rights reserved.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! # Change Reactor
//!
//! Turns a batch of changed paths into site updates. Changes under the
//! pages directory refresh the navigation snapshot before anything is
//! signalled; any change under the template root re-scans partials and sends
//! a full reload to connected browsers. Paths outside the template root are
//! ignored.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{info, warn};

use crate::server::live_reload::ReloadEvent;
use crate::server::state::DevSite;

/// What one batch caused.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChangeOutcome {
    /// Whether any path lay under the template root.
    pub relevant: bool,
    /// Whether the navigation was recomputed.
    pub navigation_refreshed: bool,
    /// Number of clients the reload reached.
    pub clients_notified: usize,
}

/// Applies file changes to a running [`DevSite`].
#[derive(Debug, Clone)]
pub struct ChangeReactor {
    site: Arc<DevSite>,
    template_root: PathBuf,
    pages_root: PathBuf,
}

impl ChangeReactor {
    /// Creates a reactor for `site`, resolving its directories once.
    pub fn new(site: Arc<DevSite>) -> Self {
        let template_root = normalize(&site.config().template_dir);
        let pages_root = normalize(&site.config().pages_path());
        Self {
            site,
            template_root,
            pages_root,
        }
    }

    /// Handles one batch of changed paths.
    pub fn handle_batch(&self, paths: &[PathBuf]) -> ChangeOutcome {
        let paths: Vec<PathBuf> = paths
            .iter()
            .map(|p| normalize(p))
            .filter(|p| p.starts_with(&self.template_root))
            .collect();
        if paths.is_empty() {
            return ChangeOutcome::default();
        }

        let mut outcome = ChangeOutcome {
            relevant: true,
            ..ChangeOutcome::default()
        };
        if paths.iter().any(|p| p.starts_with(&self.pages_root)) {
            self.site.refresh_navigation();
            outcome.navigation_refreshed = true;
        }
        if let Err(e) = self.site.renderer().reload_partials() {
            warn!("{}", e);
        }

        let event = ReloadEvent::full_reload();
        let kind = event.kind().to_string();
        outcome.clients_notified = self.site.broadcast(event);
        info!(
            "{} changed, sent {} to {} client(s)",
            describe(&paths),
            kind,
            outcome.clients_notified
        );
        outcome
    }
}

fn describe(paths: &[PathBuf]) -> String {
    match paths {
        [single] => single.display().to_string(),
        _ => format!("{} files", paths.len()),
    }
}

/// Absolute, symlink-free form of `path`. A path that no longer exists is
/// resolved through its nearest existing ancestor.
fn normalize(path: &Path) -> PathBuf {
    if let Ok(resolved) = path.canonicalize() {
        return resolved;
    }
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        match std::env::current_dir() {
            Ok(cwd) => cwd.join(path),
            Err(_) => return path.to_path_buf(),
        }
    };

    let mut missing = Vec::new();
    let mut ancestor = absolute.as_path();
    while let Some(parent) = ancestor.parent() {
        if let Some(name) = ancestor.file_name() {
            missing.push(name.to_os_string());
        }
        if let Ok(resolved) = parent.canonicalize() {
            return missing.iter().rev().fold(resolved, |acc, name| acc.join(name));
        }
        ancestor = parent;
    }
    absolute
}
