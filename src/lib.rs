// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! snapsolve: screenshot question answerer
//!
//! Watches a directory for new screenshots, asks a multimodal AI provider to
//! answer the questions they contain, prepends each answer to a markdown log,
//! publishes progress to a JSON status record and archives the screenshot.
//! A small web viewer renders the log and polls the status.

pub mod answer_log;
pub mod archive;
pub mod classifier;
pub mod config;
pub mod error;
pub mod notifier;
pub mod provider;
pub mod queue;
pub mod status;
pub mod watcher;
pub mod web;
pub mod worker;

pub use config::AppConfig;
pub use error::{ProviderError, Result, SnapsolveError};
