// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Last-known pipeline status, polled by the viewer

use chrono::Local;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::answer_log::{write_atomic, TIMESTAMP_FORMAT};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Idle,
    Processing,
    Completed,
    Error,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Idle => "Idle",
            Phase::Processing => "Processing",
            Phase::Completed => "Completed",
            Phase::Error => "Error",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusRecord {
    pub filename: String,
    pub status: Phase,
    pub time: String,
    pub details: String,
}

/// Writes the single status record; last write wins
#[derive(Debug, Clone)]
pub struct StatusPublisher {
    path: PathBuf,
}

impl StatusPublisher {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Overwrite the record. Failures are logged and otherwise ignored.
    pub fn publish(&self, filename: &str, phase: Phase, details: &str) {
        let record = StatusRecord {
            filename: filename.to_string(),
            status: phase,
            time: Local::now().format(TIMESTAMP_FORMAT).to_string(),
            details: details.to_string(),
        };

        let result = serde_json::to_vec(&record)
            .map_err(std::io::Error::from)
            .and_then(|bytes| write_atomic(&self.path, &bytes));
        if let Err(e) = result {
            debug!("Failed to write status to {:?}: {}", self.path, e);
        }
    }

    pub fn read(&self) -> Option<StatusRecord> {
        read_status(&self.path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Current record, `None` when the file is absent, empty, or not a record
pub fn read_status(path: &Path) -> Option<StatusRecord> {
    let content = std::fs::read_to_string(path).ok()?;
    if content.trim().is_empty() {
        return None;
    }
    serde_json::from_str(&content).ok()
}
