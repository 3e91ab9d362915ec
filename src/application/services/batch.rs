use futures::future::join_all;
use indicatif::{ProgressBar, ProgressStyle};
use std::fmt::Display;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::{error, info, warn};

use crate::domain::DomainError;

#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub name: String,
    pub batch_size: usize,
    /// Minimum wall-clock time per batch.
    pub pace: Option<Duration>,
    /// Failures tolerated before the remaining batches are skipped.
    pub error_budget: usize,
    pub show_progress: bool,
}

impl BatchOptions {
    pub fn new(name: impl Into<String>, batch_size: usize, error_budget: usize) -> Self {
        Self {
            name: name.into(),
            batch_size,
            pace: None,
            error_budget,
            show_progress: false,
        }
    }

    pub fn with_pace(mut self, pace: Duration) -> Self {
        self.pace = Some(pace);
        self
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }
}

/// Outcome tallies for a single run. Owned by the run, never shared across runs.
#[derive(Debug, Default)]
pub struct RunContext {
    succeeded: AtomicUsize,
    skipped: AtomicUsize,
    failed: AtomicUsize,
}

impl RunContext {
    pub fn record(&self, item: &str, outcome: Result<(), DomainError>) {
        match outcome {
            Ok(()) => {
                self.succeeded.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) if e.is_skippable() => {
                info!(item, reason = %e, "skipping previously processed item");
                self.skipped.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                error!(item, error = %e, "item failed");
                self.failed.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    pub fn succeeded(&self) -> usize {
        self.succeeded.load(Ordering::Relaxed)
    }

    pub fn skipped(&self) -> usize {
        self.skipped.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> usize {
        self.failed.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchReport {
    pub total: usize,
    pub processed: usize,
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
    pub aborted: bool,
}

/// Drives a work list in fixed-size concurrent batches.
///
/// Every item of a batch runs concurrently on the calling task. When a pace is
/// set, a sleep of that length joins the same fan-out, so a batch never takes
/// less than the pace but fast batches are not held back further. After each
/// batch the failure count is compared with the budget; once it is exceeded
/// the remaining batches are skipped. Nothing already applied is rolled back.
pub struct BatchRunner {
    options: BatchOptions,
}

impl BatchRunner {
    pub fn new(options: BatchOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &BatchOptions {
        &self.options
    }

    pub async fn run<T, F, Fut>(&self, items: Vec<T>, action: F) -> BatchReport
    where
        T: Display,
        F: Fn(T) -> Fut,
        Fut: Future<Output = Result<(), DomainError>>,
    {
        let total = items.len();
        let batch_size = self.options.batch_size.max(1);
        let ctx = RunContext::default();
        let progress = self.progress_bar(total);

        info!(
            run = %self.options.name,
            total,
            batch_size,
            pace_ms = self.options.pace.map(|p| p.as_millis() as u64),
            "starting batch run"
        );

        let mut processed = 0;
        let mut aborted = false;
        let mut items = items.into_iter().peekable();

        while items.peek().is_some() {
            let batch: Vec<T> = items.by_ref().take(batch_size).collect();
            let count = batch.len();

            let ctx_ref = &ctx;
            let work = join_all(batch.into_iter().map(|item| {
                let label = item.to_string();
                let fut = action(item);
                async move { ctx_ref.record(&label, fut.await) }
            }));

            match self.options.pace {
                Some(pace) => {
                    tokio::join!(work, tokio::time::sleep(pace));
                }
                None => {
                    work.await;
                }
            }

            processed += count;
            progress.inc(count as u64);

            if ctx.failed() > self.options.error_budget {
                warn!(
                    run = %self.options.name,
                    failed = ctx.failed(),
                    budget = self.options.error_budget,
                    remaining = total - processed,
                    "too many errors, stopping run"
                );
                aborted = true;
                break;
            }
        }

        progress.finish_and_clear();

        let report = BatchReport {
            total,
            processed,
            succeeded: ctx.succeeded(),
            skipped: ctx.skipped(),
            failed: ctx.failed(),
            aborted,
        };
        info!(run = %self.options.name, ?report, "batch run complete");
        report
    }

    fn progress_bar(&self, total: usize) -> ProgressBar {
        if !self.options.show_progress {
            return ProgressBar::hidden();
        }
        let style = ProgressStyle::with_template("{msg} [{bar:40}] {pos}/{len} ({eta})")
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        ProgressBar::new(total as u64)
            .with_style(style)
            .with_message(self.options.name.clone())
    }
}
