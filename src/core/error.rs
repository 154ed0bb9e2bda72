// Copyright © 2024 Twinpress. All rights reserved.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! # Error Handling for Twinpress
//!
//! This module defines the error type shared by the discovery, rendering,
//! build and serving layers. The `thiserror` crate is used to keep variants
//! declarative and their messages consistent.
//!
//! Most of these errors never reach an end user: render failures are turned
//! into diagnostic markup, and build failures are recorded per target. The
//! variants exist so that the smallest failing unit can report precisely what
//! went wrong before the caller decides how to degrade.

use std::path::PathBuf;
use thiserror::Error;

/// A unified result type for the Twinpress library.
pub type Result<T> = std::result::Result<T, TwinpressError>;

/// The main error type for Twinpress.
#[derive(Error, Debug)]
pub enum TwinpressError {
    /// Error related to configuration loading or validation.
    #[error("Configuration error: {message}.")]
    ConfigError {
        /// Detailed description of the configuration error.
        message: String,
        /// Optional path of the file or directory that caused the error.
        path: Option<PathBuf>,
    },

    /// Error related to template registration or rendering.
    #[error(
        "Template rendering error: {message} in template `{template}`."
    )]
    TemplateRenderingError {
        /// Description of the template rendering error.
        message: String,
        /// The template file or identifier associated with the error.
        template: String,
        /// Optional source error providing additional context.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Error writing a build artifact or copying the asset tree.
    #[error("Output generation error: {message} at {path:?}.")]
    OutputGenerationError {
        /// Description of the output generation error.
        message: String,
        /// Path associated with the error.
        path: PathBuf,
        /// Optional source error providing additional context.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// IO error encountered during file operations.
    #[error("File IO error at `{path:?}`: {source}")]
    IOError {
        /// Path associated with the IO error.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The file watcher backing live reload could not be set up.
    #[error("File watch error: {0}")]
    WatchError(#[from] notify::Error),

    /// The development server failed to bind or serve.
    #[error("Server error: {0}")]
    ServerError(String),

    /// General internal error.
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<std::io::Error> for TwinpressError {
    /// Converts a standard IO error into a `TwinpressError::IOError`
    /// with an empty path.
    fn from(source: std::io::Error) -> Self {
        TwinpressError::IOError {
            path: PathBuf::new(),
            source,
        }
    }
}

impl TwinpressError {
    /// Creates a `ConfigError` with a specific message.
    ///
    /// # Parameters
    /// - `message`: A description of the configuration error.
    /// - `path`: Optional path of the file causing the error.
    pub fn config_error<S: Into<String>>(
        message: S,
        path: Option<PathBuf>,
    ) -> Self {
        TwinpressError::ConfigError {
            message: message.into(),
            path,
        }
    }

    /// Creates an `OutputGenerationError` with a message, path, and optional source.
    pub fn output_generation_error<S: Into<String>>(
        message: S,
        path: PathBuf,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        TwinpressError::OutputGenerationError {
            message: message.into(),
            path,
            source,
        }
    }

    /// Creates a `TemplateRenderingError` with a message, template name, and optional source.
    pub fn template_rendering_error<S: Into<String>>(
        message: S,
        template: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        TwinpressError::TemplateRenderingError {
            message: message.into(),
            template,
            source,
        }
    }

    /// Wraps an IO error as an `IOError` variant with the specified path.
    pub fn io_error(path: PathBuf, source: std::io::Error) -> Self {
        TwinpressError::IOError { path, source }
    }

    /// Creates a `ServerError` with a custom message.
    pub fn server_error<S: Into<String>>(message: S) -> Self {
        TwinpressError::ServerError(message.into())
    }

    /// Creates a general internal error with a custom message.
    pub fn internal_error<S: Into<String>>(message: S) -> Self {
        TwinpressError::InternalError(message.into())
    }
}
