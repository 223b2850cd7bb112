// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! File system watcher feeding new screenshots into the processing queue

use notify::event::{CreateKind, ModifyKind, RenameMode};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};
use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, info, warn};

use crate::classifier::{is_candidate, is_screenshot};
use crate::queue::{InFlightSet, ProcessingJob, ProcessingQueue, ScreenshotEvent};
use crate::worker::{run_worker, Processor, WorkerSummary};
use crate::{Result, SnapsolveError};

/// Wait between noticing a file and checking that it has content
pub const SETTLE_DELAY: Duration = Duration::from_millis(500);

/// Events emitted by the watcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    /// A file appeared, either created in place or renamed into the directory
    FileCreated(PathBuf),
    /// Watcher error
    Error(String),
}

/// File system watcher
pub struct FileWatcher {
    watcher: RecommendedWatcher,
    event_rx: UnboundedReceiver<notify::Result<Event>>,
}

impl FileWatcher {
    /// Create a new file watcher
    pub fn new() -> Result<Self> {
        let (tx, rx) = unbounded_channel();

        let config = Config::default()
            .with_poll_interval(Duration::from_secs(2));

        let watcher = RecommendedWatcher::new(
            move |event| {
                let _ = tx.send(event);
            },
            config,
        )?;

        Ok(Self {
            watcher,
            event_rx: rx,
        })
    }

    /// Add a directory to watch
    pub fn watch(&mut self, path: &Path) -> Result<()> {
        // Create directory if it doesn't exist
        if !path.exists() {
            std::fs::create_dir_all(path)?;
            info!("Created watch directory: {:?}", path);
        }

        self.watcher.watch(path, RecursiveMode::NonRecursive)?;
        info!("Watching: {:?}", path);

        Ok(())
    }

    /// Next relevant event; `None` once the underlying watcher is gone
    pub async fn next_event(&mut self) -> Option<WatchEvent> {
        loop {
            match self.event_rx.recv().await? {
                Ok(event) => {
                    if let Some(converted) = Self::convert_event(event) {
                        return Some(converted);
                    }
                }
                Err(e) => return Some(WatchEvent::Error(e.to_string())),
            }
        }
    }

    /// Convert notify event to our event type
    fn convert_event(event: Event) -> Option<WatchEvent> {
        match event.kind {
            EventKind::Create(CreateKind::Folder) => None,
            EventKind::Create(_) => {
                event.paths.first().map(|p| WatchEvent::FileCreated(p.clone()))
            }
            // Screenshot tools often write a hidden file and rename it into place
            EventKind::Modify(ModifyKind::Name(RenameMode::To)) => {
                event.paths.first().map(|p| WatchEvent::FileCreated(p.clone()))
            }
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
                event.paths.last().map(|p| WatchEvent::FileCreated(p.clone()))
            }
            // FSEvents does not say which side of a rename this is
            EventKind::Modify(ModifyKind::Name(RenameMode::Any)) => event
                .paths
                .first()
                .filter(|p| p.exists())
                .map(|p| WatchEvent::FileCreated(p.clone())),
            _ => None,
        }
    }
}

/// What happened to one detected path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Not a screenshot
    Rejected,
    /// Already queued or processed during this run
    AlreadyInFlight,
    /// Vanished or still empty after settling
    Invalid,
    /// Handed to the queue
    Submitted,
}

/// Classifies detected paths and submits the valid ones exactly once
#[derive(Clone)]
pub struct ScreenshotIntake {
    queue: ProcessingQueue,
    in_flight: Arc<InFlightSet>,
    settle_delay: Duration,
}

impl ScreenshotIntake {
    pub fn new(queue: ProcessingQueue, in_flight: Arc<InFlightSet>) -> Self {
        Self {
            queue,
            in_flight,
            settle_delay: SETTLE_DELAY,
        }
    }

    pub fn with_settle_delay(mut self, settle_delay: Duration) -> Self {
        self.settle_delay = settle_delay;
        self
    }

    pub fn in_flight(&self) -> &InFlightSet {
        &self.in_flight
    }

    /// Walk one path through classify, claim, settle, validate, submit
    pub async fn consider(&self, path: PathBuf) -> Disposition {
        debug!("File detected: {:?}", path);

        if !is_screenshot(&path) {
            debug!("Not a screenshot, skipping: {:?}", path);
            return Disposition::Rejected;
        }

        if !self.in_flight.try_claim(&path) {
            debug!("Already processing, skipping: {:?}", path);
            return Disposition::AlreadyInFlight;
        }

        tokio::time::sleep(self.settle_delay).await;

        let size = tokio::fs::metadata(&path)
            .await
            .ok()
            .filter(|m| m.is_file())
            .map(|m| m.len());

        match size {
            Some(len) if is_candidate(&path, len) => {
                info!("New screenshot detected: {:?}", path);
                self.queue.enqueue(ProcessingJob::new(ScreenshotEvent::new(path)));
                Disposition::Submitted
            }
            _ => {
                debug!("File vanished or empty after settling: {:?}", path);
                self.in_flight.release(&path);
                Disposition::Invalid
            }
        }
    }
}

/// Owns the subscription, the intake and the worker for one watched directory
pub struct ScreenshotWatcher {
    files: FileWatcher,
    intake: ScreenshotIntake,
    queue: ProcessingQueue,
    worker: JoinHandle<WorkerSummary>,
}

impl ScreenshotWatcher {
    /// Subscribe to `dir` and start the worker. Must be called inside a Tokio runtime.
    pub fn start(dir: &Path, processor: Arc<Processor>) -> Result<Self> {
        let mut files = FileWatcher::new()?;
        files.watch(dir)?;

        let (queue, jobs) = ProcessingQueue::new();
        let worker = tokio::spawn(run_worker(jobs, processor));
        let intake = ScreenshotIntake::new(queue.clone(), Arc::new(InFlightSet::new()));

        Ok(Self {
            files,
            intake,
            queue,
            worker,
        })
    }

    pub fn with_settle_delay(mut self, settle_delay: Duration) -> Self {
        self.intake = self.intake.with_settle_delay(settle_delay);
        self
    }

    /// Feed screenshots already sitting in `dir` through the intake, oldest first
    pub async fn submit_existing(&self, dir: &Path) -> Result<usize> {
        let mut files: Vec<(std::time::SystemTime, PathBuf)> = std::fs::read_dir(dir)?
            .filter_map(|e| e.ok())
            .filter_map(|e| {
                let meta = e.metadata().ok()?;
                let modified = meta.modified().ok()?;
                meta.is_file().then(|| (modified, e.path()))
            })
            .collect();
        files.sort();

        let mut submitted = 0;
        for (_, path) in files {
            if self.intake.consider(path).await == Disposition::Submitted {
                submitted += 1;
            }
        }
        Ok(submitted)
    }

    /// Handle events until `shutdown` flips to true, then drain.
    ///
    /// The subscription is dropped first, pending settle tasks finish, and the
    /// worker completes every queued job before this returns.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> Result<WorkerSummary> {
        let Self {
            mut files,
            intake,
            queue,
            worker,
        } = self;
        let mut pending = JoinSet::new();

        info!("Scanner active. Waiting for screenshots...");

        while !*shutdown.borrow() {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                event = files.next_event() => match event {
                    Some(WatchEvent::FileCreated(path)) => {
                        let intake = intake.clone();
                        pending.spawn(async move { intake.consider(path).await });
                    }
                    Some(WatchEvent::Error(e)) => warn!("Watch error: {}", e),
                    None => {
                        warn!("Watcher disconnected");
                        break;
                    }
                },
                Some(_) = pending.join_next(), if !pending.is_empty() => {}
            }
        }

        info!("Stopping watcher...");
        drop(files);
        while pending.join_next().await.is_some() {}

        queue.shutdown();
        worker
            .await
            .map_err(|e| SnapsolveError::Worker(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::DataChange;
    use tempfile::tempdir;

    fn event(kind: EventKind, paths: &[&str]) -> Event {
        paths
            .iter()
            .fold(Event::new(kind), |event, p| event.add_path(PathBuf::from(p)))
    }

    #[test]
    fn test_create_and_rename_into_place_are_creations() {
        let created = event(EventKind::Create(CreateKind::File), &["/s/Screenshot 1.png"]);
        assert_eq!(
            FileWatcher::convert_event(created),
            Some(WatchEvent::FileCreated(PathBuf::from("/s/Screenshot 1.png")))
        );

        let renamed = event(
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)),
            &["/s/.Screenshot 1.png", "/s/Screenshot 1.png"],
        );
        assert_eq!(
            FileWatcher::convert_event(renamed),
            Some(WatchEvent::FileCreated(PathBuf::from("/s/Screenshot 1.png")))
        );

        let moved_in = event(
            EventKind::Modify(ModifyKind::Name(RenameMode::To)),
            &["/s/Screenshot 2.png"],
        );
        assert_eq!(
            FileWatcher::convert_event(moved_in),
            Some(WatchEvent::FileCreated(PathBuf::from("/s/Screenshot 2.png")))
        );

        let moved_out = event(
            EventKind::Modify(ModifyKind::Name(RenameMode::From)),
            &["/s/Screenshot 2.png"],
        );
        assert_eq!(FileWatcher::convert_event(moved_out), None);
    }

    #[test]
    fn test_ambiguous_rename_counts_only_if_path_exists() {
        let dir = tempdir().unwrap();
        let present = dir.path().join("Screenshot 3.png");
        std::fs::write(&present, b"png").unwrap();
        let gone = dir.path().join("Screenshot 4.png");

        let arrived = event(
            EventKind::Modify(ModifyKind::Name(RenameMode::Any)),
            &[present.to_str().unwrap()],
        );
        assert_eq!(
            FileWatcher::convert_event(arrived),
            Some(WatchEvent::FileCreated(present))
        );

        let departed = event(
            EventKind::Modify(ModifyKind::Name(RenameMode::Any)),
            &[gone.to_str().unwrap()],
        );
        assert_eq!(FileWatcher::convert_event(departed), None);
    }

    #[test]
    fn test_other_events_ignored() {
        let modified = event(
            EventKind::Modify(ModifyKind::Data(DataChange::Content)),
            &["/s/Screenshot 1.png"],
        );
        assert_eq!(FileWatcher::convert_event(modified), None);

        let folder = event(EventKind::Create(CreateKind::Folder), &["/s/Screenshots"]);
        assert_eq!(FileWatcher::convert_event(folder), None);
    }

    fn intake() -> (ScreenshotIntake, crate::queue::JobReceiver) {
        let (queue, jobs) = ProcessingQueue::new();
        let intake = ScreenshotIntake::new(queue, Arc::new(InFlightSet::new()))
            .with_settle_delay(Duration::from_millis(10));
        (intake, jobs)
    }

    #[tokio::test]
    async fn test_non_screenshot_rejected_without_claim() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("notes.png");
        std::fs::write(&path, b"x").unwrap();
        let (intake, _jobs) = intake();

        assert_eq!(intake.consider(path.clone()).await, Disposition::Rejected);
        assert!(!intake.in_flight().contains(&path));
    }

    #[tokio::test]
    async fn test_empty_file_released_for_reevaluation() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("Screenshot 1.png");
        std::fs::write(&path, b"").unwrap();
        let (intake, _jobs) = intake();

        assert_eq!(intake.consider(path.clone()).await, Disposition::Invalid);
        assert!(!intake.in_flight().contains(&path));

        std::fs::write(&path, b"png").unwrap();
        assert_eq!(intake.consider(path).await, Disposition::Submitted);
    }

    #[tokio::test]
    async fn test_duplicate_detection_submits_once() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("Screenshot 2.png");
        std::fs::write(&path, b"png").unwrap();
        let (intake, mut jobs) = intake();

        let (first, second) =
            tokio::join!(intake.consider(path.clone()), intake.consider(path.clone()));
        let mut outcomes = vec![first, second];
        outcomes.sort_by_key(|d| *d == Disposition::Submitted);
        assert_eq!(outcomes, vec![Disposition::AlreadyInFlight, Disposition::Submitted]);

        // still suppressed after the job was queued
        assert_eq!(intake.consider(path.clone()).await, Disposition::AlreadyInFlight);

        drop(intake);
        assert_eq!(jobs.next().await.unwrap().path(), path.as_path());
        assert!(jobs.next().await.is_none());
    }
}
