// Copyright © 2024 Twinpress. All rights reserved.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! # HTML Output Generation
//!
//! [`HtmlGenerator`] writes rendered documents below an output root,
//! creating parent directories as needed and optionally minifying HTML with
//! `minify-html`. [`copy_assets`] mirrors a static asset tree into the output.
//!
//! # Examples
//!
//! ```rust,no_run
//! use twinpress::core::traits::Generator;
//! use twinpress::generators::OutputArtifact;
//! use twinpress::generators::html::HtmlGenerator;
//!
//! let generator = HtmlGenerator::new("dist").with_minification(true);
//! let written = generator
//!     .generate(&OutputArtifact::new("index.html", "<h1>Hello</h1>"))
//!     .unwrap();
//! assert!(written.ends_with("index.html"));
//! ```

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use log::debug;
use minify_html::{minify, Cfg};
use walkdir::WalkDir;

use crate::core::traits::Generator;
use crate::generators::OutputArtifact;
use crate::{Result, TwinpressError};

/// Writes artifacts below an output root.
#[derive(Debug, Clone)]
pub struct HtmlGenerator {
    output_root: PathBuf,
    minify: bool,
}

impl HtmlGenerator {
    /// Creates a generator writing below `output_root`, without minification.
    pub fn new<P: Into<PathBuf>>(output_root: P) -> Self {
        Self {
            output_root: output_root.into(),
            minify: false,
        }
    }

    /// Enables or disables HTML minification.
    pub fn with_minification(mut self, enable: bool) -> Self {
        self.minify = enable;
        self
    }

    /// Minifies HTML content using the `minify-html` crate.
    fn minify_html(&self, content: &[u8], path: &Path) -> Result<Vec<u8>> {
        let cfg = Cfg {
            minify_css: true,
            minify_js: true,
            ..Cfg::default()
        };
        let minified = minify(content, &cfg);
        match String::from_utf8(minified) {
            Ok(text) => Ok(text.into_bytes()),
            Err(e) => Err(TwinpressError::output_generation_error(
                "HTML minification failed",
                path.to_path_buf(),
                Some(Box::new(e)),
            )),
        }
    }
}

impl Generator for HtmlGenerator {
    fn generate(&self, artifact: &OutputArtifact) -> Result<PathBuf> {
        self.validate(artifact)?;
        let path = self.output_root.join(&artifact.relative_path);

        let content = if self.minify && artifact.is_html() {
            self.minify_html(&artifact.content, &path)?
        } else {
            artifact.content.clone()
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| TwinpressError::io_error(parent.to_path_buf(), e))?;
        }
        let file = File::create(&path)
            .map_err(|e| TwinpressError::io_error(path.clone(), e))?;
        let mut writer = BufWriter::new(file);
        writer
            .write_all(&content)
            .and_then(|()| writer.flush())
            .map_err(|e| TwinpressError::io_error(path.clone(), e))?;

        debug!("Wrote {} ({} bytes)", path.display(), content.len());
        Ok(path)
    }
}

/// Replaces `dest` with a copy of the tree at `source`, returning the number
/// of files copied.
///
/// Any previous contents of `dest` are removed first, so files deleted from
/// the source do not linger in the output.
pub fn copy_assets(source: &Path, dest: &Path) -> Result<usize> {
    if !source.is_dir() {
        return Err(TwinpressError::io_error(
            source.to_path_buf(),
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "asset directory does not exist",
            ),
        ));
    }
    if dest.exists() {
        fs::remove_dir_all(dest)
            .map_err(|e| TwinpressError::io_error(dest.to_path_buf(), e))?;
    }
    fs::create_dir_all(dest)
        .map_err(|e| TwinpressError::io_error(dest.to_path_buf(), e))?;

    let mut copied = 0;
    for entry in WalkDir::new(source).follow_links(true) {
        let entry = entry.map_err(|e| {
            TwinpressError::output_generation_error(
                "Cannot walk asset directory",
                source.to_path_buf(),
                Some(Box::new(e)),
            )
        })?;
        let relative = entry.path().strip_prefix(source).map_err(|e| {
            TwinpressError::output_generation_error(
                "Invalid asset path",
                entry.path().to_path_buf(),
                Some(Box::new(e)),
            )
        })?;
        let target = dest.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)
                .map_err(|e| TwinpressError::io_error(target.clone(), e))?;
        } else if entry.file_type().is_file() {
            _ = fs::copy(entry.path(), &target)
                .map_err(|e| TwinpressError::io_error(target.clone(), e))?;
            copied += 1;
        }
    }
    debug!(
        "Copied {} asset(s) from {} to {}",
        copied,
        source.display(),
        dest.display()
    );
    Ok(copied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_basic_output() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let generator = HtmlGenerator::new(temp_dir.path());
        let content = "<h1>Test</h1>";

        let path = generator.generate(&OutputArtifact::new("output.html", content))?;

        assert_eq!(path, temp_dir.path().join("output.html"));
        assert_eq!(fs::read_to_string(&path)?, content);
        Ok(())
    }

    #[test]
    fn test_minification() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let generator = HtmlGenerator::new(temp_dir.path()).with_minification(true);
        let content = "<div>\n    <p>Test</p>\n</div>";

        let path = generator.generate(&OutputArtifact::new("output.html", content))?;

        let result = fs::read_to_string(path)?;
        assert!(result.len() < content.len());
        assert!(result.contains("Test"));
        Ok(())
    }

    #[test]
    fn test_creates_parent_directories() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let generator = HtmlGenerator::new(temp_dir.path().join("dist"));

        let path = generator.generate(&OutputArtifact::new("nested/page.html", "x"))?;
        assert!(path.is_file());
        Ok(())
    }

    #[test]
    fn test_rejects_escaping_paths() {
        let temp_dir = TempDir::new().unwrap();
        let generator = HtmlGenerator::new(temp_dir.path());

        let result = generator.generate(&OutputArtifact::new("../outside.html", "x"));
        assert!(matches!(
            result,
            Err(TwinpressError::OutputGenerationError { .. })
        ));
    }

    #[test]
    fn test_copy_assets_replaces_destination() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let source = temp_dir.path().join("assets");
        fs::create_dir_all(source.join("css"))?;
        fs::write(source.join("css/site.css"), "body{}")?;
        fs::write(source.join("main.js"), "")?;

        let dest = temp_dir.path().join("dist/assets");
        fs::create_dir_all(&dest)?;
        fs::write(dest.join("stale.js"), "old")?;

        assert_eq!(copy_assets(&source, &dest)?, 2);
        assert_eq!(fs::read_to_string(dest.join("css/site.css"))?, "body{}");
        assert!(!dest.join("stale.js").exists());
        Ok(())
    }

    #[test]
    fn test_copy_assets_missing_source() {
        let temp_dir = TempDir::new().unwrap();
        let result = copy_assets(
            &temp_dir.path().join("missing"),
            &temp_dir.path().join("out"),
        );
        assert!(result.is_err());
    }
}
