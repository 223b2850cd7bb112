// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Single-consumer job queue and the in-flight path set

use chrono::{DateTime, Local};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tracing::warn;
use uuid::Uuid;

/// A screenshot the watcher decided to answer
#[derive(Debug, Clone)]
pub struct ScreenshotEvent {
    pub path: PathBuf,
    pub detected_at: DateTime<Local>,
}

impl ScreenshotEvent {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            detected_at: Local::now(),
        }
    }
}

#[derive(Debug)]
pub struct ProcessingJob {
    /// Correlates the log lines of one job
    pub id: Uuid,
    pub event: ScreenshotEvent,
}

impl ProcessingJob {
    pub fn new(event: ScreenshotEvent) -> Self {
        Self {
            id: Uuid::new_v4(),
            event,
        }
    }

    pub fn path(&self) -> &Path {
        &self.event.path
    }

    pub fn filename(&self) -> String {
        self.event
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.event.path.display().to_string())
    }
}

enum QueueMessage {
    Job(ProcessingJob),
    Shutdown,
}

/// Producer side of the queue. Cheap to clone.
#[derive(Clone)]
pub struct ProcessingQueue {
    tx: UnboundedSender<QueueMessage>,
}

/// Consumer side, owned by the single worker
pub struct JobReceiver {
    rx: UnboundedReceiver<QueueMessage>,
}

impl ProcessingQueue {
    pub fn new() -> (Self, JobReceiver) {
        let (tx, rx) = unbounded_channel();
        (Self { tx }, JobReceiver { rx })
    }

    /// Queue a job. Never blocks.
    pub fn enqueue(&self, job: ProcessingJob) {
        if let Err(e) = self.tx.send(QueueMessage::Job(job)) {
            if let QueueMessage::Job(job) = e.0 {
                warn!("Worker has stopped, dropping {:?}", job.path());
            }
        }
    }

    /// Ask the worker to stop once every job queued before this call is done
    pub fn shutdown(&self) {
        let _ = self.tx.send(QueueMessage::Shutdown);
    }
}

impl JobReceiver {
    /// Next job in FIFO order; `None` after the shutdown sentinel or when every producer is gone
    pub async fn next(&mut self) -> Option<ProcessingJob> {
        match self.rx.recv().await? {
            QueueMessage::Job(job) => Some(job),
            QueueMessage::Shutdown => None,
        }
    }
}

/// Paths that have been claimed for processing during this run
#[derive(Debug, Default)]
pub struct InFlightSet {
    paths: Mutex<HashSet<PathBuf>>,
}

impl InFlightSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim a path; false when it is already claimed
    pub fn try_claim(&self, path: &Path) -> bool {
        self.lock().insert(path.to_path_buf())
    }

    /// Give a claim back so a later event for the same path is evaluated again
    pub fn release(&self, path: &Path) {
        self.lock().remove(path);
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.lock().contains(path)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashSet<PathBuf>> {
        // the set stays consistent even if a holder panicked
        self.paths.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
