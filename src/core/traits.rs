// Copyright © 2024 Twinpress. All rights reserved.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! # Core Traits Module
//!
//! The two seams of the pipeline:
//!
//! - [`TemplateRenderer`]: turns template text plus a render context into a
//!   [`RenderResult`]. Implementations must not fail the caller; engine
//!   errors come back as [`RenderResult::Failed`].
//! - [`Generator`]: persists an [`OutputArtifact`] below an output root.
//!
//! The dev server and the build emitter only talk to these traits, which
//! keeps both testable with in-memory implementations.

use std::path::{Component, Path, PathBuf};

use crate::context::RenderContext;
use crate::core::error::{Result, TwinpressError};
use crate::generators::OutputArtifact;
use crate::template::RenderResult;
use crate::urls::RenderConfig;

/// Trait for template rendering implementations.
pub trait TemplateRenderer: Send + Sync + std::fmt::Debug {
    /// Renders raw template text with the given context.
    ///
    /// Rendering is synchronous; the result is complete when this returns.
    fn render(&self, template: &str, context: &RenderContext) -> RenderResult;

    /// The mode-bound URL configuration the renderer's helpers use.
    fn render_config(&self) -> &RenderConfig;

    /// Re-scans partials, returning how many are registered.
    fn reload_partials(&self) -> Result<usize>;
}

/// Trait for output generation implementations.
pub trait Generator: Send + Sync + std::fmt::Debug {
    /// Writes the artifact, returning the path that was written.
    fn generate(&self, artifact: &OutputArtifact) -> Result<PathBuf>;

    /// Validates the artifact without writing it.
    ///
    /// The default implementation rejects artifact paths that are absolute
    /// or climb out of the output root.
    fn validate(&self, artifact: &OutputArtifact) -> Result<()> {
        validate_relative_path(&artifact.relative_path)
    }
}

/// Ensures `path` stays below whatever root it is joined onto.
pub fn validate_relative_path(path: &Path) -> Result<()> {
    let escapes = path.as_os_str().is_empty()
        || path
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if escapes {
        return Err(TwinpressError::output_generation_error(
            "Artifact path must be relative and stay inside the output root",
            path.to_path_buf(),
            None,
        ));
    }
    Ok(())
}
