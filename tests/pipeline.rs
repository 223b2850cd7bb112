// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! End-to-end job pipeline with a scripted provider

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::{tempdir, TempDir};
use tokio::sync::watch;

use snapsolve::answer_log::AnswerLog;
use snapsolve::notifier::Notifier;
use snapsolve::provider::{AnswerProvider, ProviderResult};
use snapsolve::queue::{ProcessingJob, ProcessingQueue, ScreenshotEvent};
use snapsolve::status::{Phase, StatusPublisher};
use snapsolve::watcher::ScreenshotWatcher;
use snapsolve::worker::{run_worker, Processor, WorkerSummary};
use snapsolve::ProviderError;

/// Replies from a script, one reply per call, and records what it was sent
struct Scripted {
    replies: Mutex<Vec<ProviderResult<String>>>,
    calls: Arc<AtomicUsize>,
    seen: Arc<Mutex<Vec<(String, Vec<u8>, String)>>>,
}

impl Scripted {
    fn new(replies: Vec<ProviderResult<String>>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().rev().collect()),
            calls: Arc::new(AtomicUsize::new(0)),
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl AnswerProvider for Scripted {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn model(&self) -> &str {
        "script-1"
    }

    async fn answer(&self, prompt: &str, image: &[u8], mime_type: &str) -> ProviderResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen
            .lock()
            .unwrap()
            .push((prompt.to_string(), image.to_vec(), mime_type.to_string()));
        self.replies
            .lock()
            .unwrap()
            .pop()
            .unwrap_or_else(|| Ok("default answer".to_string()))
    }
}

struct Fixture {
    dir: TempDir,
    calls: Arc<AtomicUsize>,
    seen: Arc<Mutex<Vec<(String, Vec<u8>, String)>>>,
    processor: Arc<Processor>,
}

impl Fixture {
    fn new(replies: Vec<ProviderResult<String>>) -> Self {
        let dir = tempdir().unwrap();
        std::fs::create_dir(dir.path().join("shots")).unwrap();

        let provider = Scripted::new(replies);
        let calls = provider.calls.clone();
        let seen = provider.seen.clone();

        let processor = Processor::new(
            Box::new(provider),
            "Answer the question".to_string(),
            AnswerLog::new(dir.path().join("answers.md")),
            StatusPublisher::new(dir.path().join("status.json")),
            dir.path().join("shots").join("_processed"),
            Notifier::new(false),
        );
        processor.answers().ensure_exists().unwrap();

        Self {
            dir,
            calls,
            seen,
            processor: Arc::new(processor),
        }
    }

    fn shots(&self) -> PathBuf {
        self.dir.path().join("shots")
    }

    fn screenshot(&self, name: &str, contents: &[u8]) -> PathBuf {
        let path = self.shots().join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    fn log_text(&self) -> String {
        std::fs::read_to_string(self.processor.answers().path()).unwrap()
    }

    fn phase(&self) -> Phase {
        self.processor.status().read().unwrap().status
    }
}

fn job(path: &Path) -> ProcessingJob {
    ProcessingJob::new(ScreenshotEvent::new(path.to_path_buf()))
}

#[tokio::test]
async fn test_success_logs_archives_and_completes() {
    let fixture = Fixture::new(vec![Ok("  B. Paris \n".to_string())]);
    let shot = fixture.screenshot("Screenshot 1.png", b"\x89PNG fake");

    let archived = fixture.processor.process(&job(&shot)).await.unwrap();

    assert!(!shot.exists());
    assert_eq!(archived, fixture.shots().join("_processed").join("Screenshot 1.png"));
    assert_eq!(std::fs::read(&archived).unwrap(), b"\x89PNG fake");

    let log = fixture.log_text();
    assert!(log.starts_with("# Screenshot Answers"));
    assert!(log.contains("## Screenshot: Screenshot 1.png"));
    assert!(log.contains("B. Paris"));

    let record = fixture.processor.status().read().unwrap();
    assert_eq!(record.status, Phase::Completed);
    assert_eq!(record.filename, "Screenshot 1.png");
    assert_eq!(record.details, "Answer added to viewer");

    let seen = fixture.seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].0, "Answer the question");
    assert_eq!(seen[0].1, b"\x89PNG fake");
    assert_eq!(seen[0].2, "image/png");
}

#[tokio::test]
async fn test_failure_leaves_file_and_log_untouched() {
    let fixture = Fixture::new(vec![Err(ProviderError::Status {
        status: 500,
        body: "overloaded".to_string(),
    })]);
    let shot = fixture.screenshot("Screenshot 2.jpg", b"jpeg");
    let before = fixture.log_text();

    let result = fixture.processor.process(&job(&shot)).await;

    assert!(result.is_err());
    assert!(shot.exists());
    assert!(!fixture.shots().join("_processed").join("Screenshot 2.jpg").exists());
    assert_eq!(fixture.log_text(), before);

    let record = fixture.processor.status().read().unwrap();
    assert_eq!(record.status, Phase::Error);
    assert!(record.details.contains("overloaded"));
}

#[tokio::test]
async fn test_worker_processes_in_order_and_survives_failures() {
    let fixture = Fixture::new(vec![
        Ok("first".to_string()),
        Err(ProviderError::Malformed("no text".to_string())),
        Ok("third".to_string()),
    ]);
    let (queue, jobs) = ProcessingQueue::new();
    let worker = tokio::spawn(run_worker(jobs, fixture.processor.clone()));

    for name in ["Screenshot a.png", "Screenshot b.png", "Screenshot c.png"] {
        queue.enqueue(job(&fixture.screenshot(name, b"png")));
    }
    queue.shutdown();

    let summary = worker.await.unwrap();
    assert_eq!(summary, WorkerSummary { completed: 2, failed: 1 });
    assert_eq!(fixture.calls.load(Ordering::SeqCst), 3);

    let document = fixture.processor.answers().load().unwrap();
    assert_eq!(document.len(), 2);
    assert!(document.entries()[0].contains("Screenshot c.png"));
    assert!(document.entries()[1].contains("Screenshot a.png"));
    assert!(fixture.shots().join("Screenshot b.png").exists());
}

#[tokio::test]
async fn test_archive_collision_gets_suffix() {
    let fixture = Fixture::new(vec![Ok("one".to_string()), Ok("two".to_string())]);

    let first = fixture.screenshot("Screenshot.png", b"one");
    fixture.processor.process(&job(&first)).await.unwrap();
    let second = fixture.screenshot("Screenshot.png", b"two");
    let archived = fixture.processor.process(&job(&second)).await.unwrap();

    assert_eq!(archived, fixture.shots().join("_processed").join("Screenshot_1.png"));
    assert_eq!(fixture.phase(), Phase::Completed);
    assert_eq!(fixture.processor.answers().load().unwrap().len(), 2);
}

#[tokio::test]
async fn test_watcher_answers_existing_and_new_screenshots() {
    let fixture = Fixture::new(vec![]);
    fixture.screenshot("Screenshot old.png", b"old");
    fixture.screenshot("notes.txt", b"ignore me");

    let watcher = ScreenshotWatcher::start(&fixture.shots(), fixture.processor.clone())
        .unwrap()
        .with_settle_delay(Duration::from_millis(50));

    assert_eq!(watcher.submit_existing(&fixture.shots()).await.unwrap(), 1);
    // a second pass does not resubmit
    assert_eq!(watcher.submit_existing(&fixture.shots()).await.unwrap(), 0);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let run = tokio::spawn(watcher.run(shutdown_rx));

    tokio::time::sleep(Duration::from_millis(200)).await;
    fixture.screenshot("Screenshot new.png", b"new");

    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    while fixture.calls.load(Ordering::SeqCst) < 2 && tokio::time::Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    shutdown_tx.send(true).unwrap();
    let summary = run.await.unwrap().unwrap();

    assert_eq!(summary.completed, 2);
    assert_eq!(summary.failed, 0);
    assert!(fixture.shots().join("notes.txt").exists());
    assert!(fixture.shots().join("_processed").join("Screenshot old.png").exists());
    assert!(fixture.shots().join("_processed").join("Screenshot new.png").exists());
}
