//! Batched apply driver.
//!
//! Rows are applied one at a time in source order. Batches only set the
//! cadence at which the driver pauses; they are not transactional.

use std::collections::VecDeque;
use std::future::Future;
use std::time::Duration;

use catalog_core::ImportSettings;

use crate::pipeline::PipelineKind;
use crate::report::{DetailLog, ImportOutcome, ImportReport, OutcomeStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOptions {
    pub batch_size: usize,
    /// Pause between batches. Zero yields to the runtime instead.
    pub batch_delay: Duration,
}

impl From<&ImportSettings> for BatchOptions {
    fn from(settings: &ImportSettings) -> Self {
        Self {
            batch_size: settings.batch_size.max(1),
            batch_delay: settings.batch_delay(),
        }
    }
}

/// Rows applied so far out of the rows that will be applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub processed: usize,
    pub total: usize,
}

impl Progress {
    /// Whole percent, rounded down; 100 only once every row is done.
    #[must_use]
    pub fn percent(self) -> usize {
        if self.total == 0 {
            100
        } else {
            self.processed * 100 / self.total
        }
    }
}

/// Mutable state of one run. Owned by the caller, lent to the driver.
#[derive(Debug, Clone)]
pub struct BatchRunState {
    pub batch_index: usize,
    pub batch_count: usize,
    pub processed: usize,
    pub total: usize,
    pub success: usize,
    pub errors: usize,
    pub skipped: usize,
    pub log: DetailLog,
    /// Counted outcomes whose detail lines wait for their place in row order.
    held: VecDeque<ImportOutcome>,
}

impl BatchRunState {
    #[must_use]
    pub fn new(settings: &ImportSettings) -> Self {
        Self {
            batch_index: 0,
            batch_count: 0,
            processed: 0,
            total: 0,
            success: 0,
            errors: 0,
            skipped: 0,
            log: DetailLog::new(settings.detail_head, settings.detail_tail),
            held: VecDeque::new(),
        }
    }

    /// Counts an outcome and keeps its detail line.
    ///
    /// Held lines from earlier rows are written first.
    pub fn record(&mut self, outcome: &ImportOutcome) {
        self.count(outcome.status);
        self.release_before(outcome.row_number);
        self.log.push(outcome.detail_line());
    }

    /// Counts an outcome now but writes its detail line only once an outcome
    /// for a later row is recorded, or the report is built.
    ///
    /// Outcomes must be held in ascending row order.
    pub fn hold(&mut self, outcome: ImportOutcome) {
        self.count(outcome.status);
        self.held.push_back(outcome);
    }

    fn count(&mut self, status: OutcomeStatus) {
        match status {
            OutcomeStatus::Success => self.success += 1,
            OutcomeStatus::Error => self.errors += 1,
            OutcomeStatus::Skipped => self.skipped += 1,
        }
    }

    fn release_before(&mut self, row_number: usize) {
        while let Some(held) = self.held.pop_front() {
            if held.row_number >= row_number {
                self.held.push_front(held);
                break;
            }
            self.log.push(held.detail_line());
        }
    }

    /// Counts a dropped row (no id, no name) without a detail line.
    pub fn skip_silently(&mut self) {
        self.skipped += 1;
    }

    #[must_use]
    pub fn progress(&self) -> Progress {
        Progress {
            processed: self.processed,
            total: self.total,
        }
    }

    #[must_use]
    pub fn into_report(
        mut self,
        kind: PipelineKind,
        total_rows: usize,
        dry_run: bool,
    ) -> ImportReport {
        self.release_before(usize::MAX);
        ImportReport {
            kind,
            dry_run,
            total_rows,
            success: self.success,
            errors: self.errors,
            skipped: self.skipped,
            omitted_details: self.log.omitted(),
            details: self.log.lines(),
        }
    }
}

/// Applies every item in order, awaiting each before starting the next.
///
/// `apply` turns an item into an outcome and must not fail; errors are
/// outcomes. `on_progress` runs after every item, or once with `0/0` when
/// there is nothing to apply.
pub async fn run_batches<T, F, Fut, P>(
    items: Vec<T>,
    options: BatchOptions,
    state: &mut BatchRunState,
    mut apply: F,
    mut on_progress: P,
) where
    F: FnMut(T) -> Fut,
    Fut: Future<Output = ImportOutcome>,
    P: FnMut(Progress),
{
    let batch_size = options.batch_size.max(1);
    state.total = items.len();
    state.processed = 0;
    state.batch_count = items.len().div_ceil(batch_size);
    if state.total == 0 {
        on_progress(state.progress());
        return;
    }

    let mut items = items.into_iter();
    for batch_index in 0..state.batch_count {
        state.batch_index = batch_index;

        for item in items.by_ref().take(batch_size) {
            let outcome = apply(item).await;
            if outcome.status == OutcomeStatus::Error {
                tracing::warn!(
                    row = outcome.row_number,
                    error = %outcome.message,
                    "import row failed"
                );
            }
            state.record(&outcome);
            state.processed += 1;
            on_progress(state.progress());
        }

        tracing::debug!(
            batch = batch_index + 1,
            batches = state.batch_count,
            processed = state.processed,
            "import batch complete"
        );

        if batch_index + 1 < state.batch_count {
            pause(options.batch_delay).await;
        }
    }
}

async fn pause(delay: Duration) {
    if delay.is_zero() {
        tokio::task::yield_now().await;
    } else {
        tokio::time::sleep(delay).await;
    }
}
