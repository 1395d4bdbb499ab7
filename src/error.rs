// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Huang Rui <vowstar@gmail.com>

//! Error types shared by the codec, the geometry model and the editors.

use thiserror::Error;

/// Result type for every fallible operation in this crate
pub type Result<T> = std::result::Result<T, SonError>;

#[derive(Debug, Error)]
pub enum SonError {
    /// A required structural marker is missing or a record body is malformed.
    #[error("format error: {0}")]
    Format(String),
    /// The model or the active backend cannot express the requested operation.
    #[error("unsupported operation: {0}")]
    Unsupported(String),
    /// A geometric algorithm could not produce a result.
    #[error("geometry error: {0}")]
    Geometry(String),
    /// An edit was rejected because it would break a model invariant.
    #[error("invalid edit: {0}")]
    InvalidEdit(String),
    /// The remote automation engine reported a failure.
    #[error("backend error: {0}")]
    Backend(String),
    #[error("config error: {0}")]
    Config(#[from] toml::de::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl SonError {
    /// Format error for the 0-based line index `line`, reported 1-based
    pub fn at_line(line: usize, message: impl AsRef<str>) -> Self {
        SonError::Format(format!("Line {}: {}", line + 1, message.as_ref()))
    }
}
