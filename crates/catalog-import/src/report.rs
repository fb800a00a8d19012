//! Per-row outcomes and the final import report.

use std::collections::VecDeque;
use std::fmt;

use serde::Serialize;

use crate::pipeline::PipelineKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    Success,
    Error,
    Skipped,
}

/// What happened to one source row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportOutcome {
    /// 1-based position in the source file (header is row 1) or upload order.
    pub row_number: usize,
    pub status: OutcomeStatus,
    pub message: String,
    pub before: Option<String>,
    pub after: Option<String>,
}

impl ImportOutcome {
    fn new(row_number: usize, status: OutcomeStatus, message: impl Into<String>) -> Self {
        Self {
            row_number,
            status,
            message: message.into(),
            before: None,
            after: None,
        }
    }

    pub fn success(row_number: usize, message: impl Into<String>) -> Self {
        Self::new(row_number, OutcomeStatus::Success, message)
    }

    pub fn error(row_number: usize, message: impl Into<String>) -> Self {
        Self::new(row_number, OutcomeStatus::Error, message)
    }

    pub fn skipped(row_number: usize, message: impl Into<String>) -> Self {
        Self::new(row_number, OutcomeStatus::Skipped, message)
    }

    /// Attaches the old and new value of the attribute this row changed.
    #[must_use]
    pub fn with_change(mut self, before: impl fmt::Display, after: impl fmt::Display) -> Self {
        self.before = Some(before.to_string());
        self.after = Some(after.to_string());
        self
    }

    /// `row N: message`, with `(before -> after)` when a change is attached.
    #[must_use]
    pub fn detail_line(&self) -> String {
        match (&self.before, &self.after) {
            (Some(before), Some(after)) => format!(
                "row {}: {} ({before} -> {after})",
                self.row_number, self.message
            ),
            _ => format!("row {}: {}", self.row_number, self.message),
        }
    }
}

/// Detail lines capped to the first `head` and last `tail` entries.
///
/// `total()` always counts every pushed line.
#[derive(Debug, Clone)]
pub struct DetailLog {
    head_cap: usize,
    tail_cap: usize,
    head: Vec<String>,
    tail: VecDeque<String>,
    total: usize,
}

impl DetailLog {
    #[must_use]
    pub fn new(head_cap: usize, tail_cap: usize) -> Self {
        Self {
            head_cap,
            tail_cap,
            head: Vec::with_capacity(head_cap),
            tail: VecDeque::with_capacity(tail_cap),
            total: 0,
        }
    }

    pub fn push(&mut self, line: String) {
        self.total += 1;
        if self.head.len() < self.head_cap {
            self.head.push(line);
            return;
        }
        if self.tail_cap == 0 {
            return;
        }
        if self.tail.len() == self.tail_cap {
            self.tail.pop_front();
        }
        self.tail.push_back(line);
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.total
    }

    /// Lines pushed but no longer retained.
    #[must_use]
    pub fn omitted(&self) -> usize {
        self.total - self.head.len() - self.tail.len()
    }

    /// Retained lines in order, with `... N more ...` where lines were dropped.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        let mut lines = Vec::with_capacity(self.head.len() + self.tail.len() + 1);
        lines.extend(self.head.iter().cloned());
        let omitted = self.omitted();
        if omitted > 0 {
            lines.push(format!("... {omitted} more ..."));
        }
        lines.extend(self.tail.iter().cloned());
        lines
    }
}

/// Final result of one import run. Counts are exact even when `details`
/// is truncated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub kind: PipelineKind,
    pub dry_run: bool,
    pub total_rows: usize,
    pub success: usize,
    pub errors: usize,
    pub skipped: usize,
    pub omitted_details: usize,
    /// One line per reported row, in source row order.
    pub details: Vec<String>,
}

impl fmt::Display for ImportReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = if self.dry_run { "would apply" } else { "applied" };
        writeln!(
            f,
            "{} import: {} rows, {} {verb}, {} errors, {} skipped",
            self.kind, self.total_rows, self.success, self.errors, self.skipped
        )?;
        for line in &self.details {
            writeln!(f, "  {line}")?;
        }
        Ok(())
    }
}
