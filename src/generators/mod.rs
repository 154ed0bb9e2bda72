// Copyright © 2024 Twinpress. All rights reserved.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Output generators and the artifacts they persist.

use std::path::PathBuf;

/// HTML output generation and static asset copying.
pub mod html;

/// A rendered document ready to be written below an output root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputArtifact {
    /// Path relative to the output root.
    pub relative_path: PathBuf,
    /// File contents.
    pub content: Vec<u8>,
}

impl OutputArtifact {
    /// Creates an artifact for `relative_path` holding `content`.
    pub fn new<P, C>(relative_path: P, content: C) -> Self
    where
        P: Into<PathBuf>,
        C: Into<Vec<u8>>,
    {
        Self {
            relative_path: relative_path.into(),
            content: content.into(),
        }
    }

    /// Whether the artifact is an HTML document, judged by its extension.
    pub fn is_html(&self) -> bool {
        self.relative_path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("html") || e.eq_ignore_ascii_case("htm"))
    }
}
