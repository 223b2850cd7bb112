// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! The queue worker: answer, log, archive, report

use chrono::Local;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

use crate::answer_log::{AnswerEntry, AnswerLog};
use crate::archive::archive_file;
use crate::classifier::mime_type;
use crate::config::AppConfig;
use crate::notifier::{truncate, Notifier};
use crate::provider::AnswerProvider;
use crate::queue::{JobReceiver, ProcessingJob};
use crate::status::{Phase, StatusPublisher};
use crate::Result;

/// Everything a job needs, built once at startup
pub struct Processor {
    provider: Box<dyn AnswerProvider>,
    prompt: String,
    answers: AnswerLog,
    status: StatusPublisher,
    processed_dir: PathBuf,
    notifier: Notifier,
}

/// Outcome counts of one worker run
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WorkerSummary {
    pub completed: usize,
    pub failed: usize,
}

impl Processor {
    pub fn new(
        provider: Box<dyn AnswerProvider>,
        prompt: String,
        answers: AnswerLog,
        status: StatusPublisher,
        processed_dir: PathBuf,
        notifier: Notifier,
    ) -> Self {
        Self {
            provider,
            prompt,
            answers,
            status,
            processed_dir,
            notifier,
        }
    }

    pub fn from_config(config: &AppConfig, provider: Box<dyn AnswerProvider>) -> Self {
        Self::new(
            provider,
            config.prompt.clone(),
            AnswerLog::new(config.answers_path()),
            StatusPublisher::new(config.status_path()),
            config.processed_dir(),
            Notifier::new(config.enable_notifications),
        )
    }

    pub fn answers(&self) -> &AnswerLog {
        &self.answers
    }

    pub fn status(&self) -> &StatusPublisher {
        &self.status
    }

    pub fn provider(&self) -> &dyn AnswerProvider {
        self.provider.as_ref()
    }

    /// Run one job. Failures are reported through the status record and
    /// a notification, then returned; they never leave a partial log entry.
    pub async fn process(&self, job: &ProcessingJob) -> Result<PathBuf> {
        let filename = job.filename();
        let queued_for = (Local::now() - job.event.detected_at).num_milliseconds() as f64 / 1000.0;
        info!("[{}] Processing {} (queued {:.1}s)", job.id, filename, queued_for);

        match self.run(job, &filename).await {
            Ok(archived) => {
                self.notifier
                    .notify("Screenshot Answered", &format!("Answer added to {}", self.answers_name()));
                self.status.publish(&filename, Phase::Completed, "Answer added to viewer");
                info!("[{}] Done, archived to {:?}", job.id, archived);
                Ok(archived)
            }
            Err(e) => {
                error!("[{}] Error processing {}: {}", job.id, filename, e);
                let detail = e.to_string();
                self.notifier.notify(
                    "Error",
                    &format!("Failed to process screenshot: {}", truncate(&detail, 50)),
                );
                self.status.publish(&filename, Phase::Error, &detail);
                Err(e)
            }
        }
    }

    async fn run(&self, job: &ProcessingJob, filename: &str) -> Result<PathBuf> {
        self.status.publish(filename, Phase::Processing, "Reading file...");
        let image = tokio::fs::read(job.path()).await?;
        let size_kb = image.len() as f64 / 1024.0;
        info!("[{}] Read {:.1} KB", job.id, size_kb);

        self.status.publish(
            filename,
            Phase::Processing,
            &format!("Size: {:.1} KB - Sending to AI...", size_kb),
        );
        let mime = mime_type(job.path()).unwrap_or("image/png");
        info!(
            "[{}] Sending to {} ({})",
            job.id,
            self.provider.name(),
            self.provider.model()
        );
        let started = Instant::now();
        let answer = self.provider.answer(&self.prompt, &image, mime).await?;
        info!(
            "[{}] Received answer ({} chars) in {:.1}s",
            job.id,
            answer.chars().count(),
            started.elapsed().as_secs_f64()
        );

        self.answers.insert_newest(&AnswerEntry::new(filename, answer))?;
        info!("[{}] Added to top of {:?}", job.id, self.answers.path());

        archive_file(job.path(), &self.processed_dir)
    }

    fn answers_name(&self) -> String {
        self.answers
            .path()
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Consume jobs one at a time until the shutdown sentinel arrives
pub async fn run_worker(mut jobs: JobReceiver, processor: Arc<Processor>) -> WorkerSummary {
    let mut summary = WorkerSummary::default();

    while let Some(job) = jobs.next().await {
        match processor.process(&job).await {
            Ok(_) => summary.completed += 1,
            Err(_) => summary.failed += 1,
        }
        info!("Ready for next screenshot");
    }

    info!(
        "Worker stopped ({} completed, {} failed)",
        summary.completed, summary.failed
    );
    summary
}
