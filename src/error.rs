// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Error types for snapsolve

use std::time::Duration;
use thiserror::Error;

/// Result type alias for snapsolve operations
pub type Result<T> = std::result::Result<T, SnapsolveError>;

/// snapsolve error types
#[derive(Error, Debug)]
pub enum SnapsolveError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("File system error: {0}")]
    FileSystem(#[from] std::io::Error),

    #[error("Watch error: {0}")]
    Watch(#[from] notify::Error),

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Server error: {0}")]
    Server(String),

    #[error("Worker failed: {0}")]
    Worker(String),
}

/// Failures raised while asking a provider for an answer.
///
/// Every variant means no answer was produced; callers never see a partial
/// or empty answer text.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("authentication rejected ({status}): {body}")]
    Auth { status: u16, body: String },

    #[error("provider returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),
}
