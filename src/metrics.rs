//! Execution counters for graph runs.
//!
//! [`ExecutionMetrics`] is a cheap, cloneable handle over shared atomic
//! counters. Hand one to a [`RunConfig`](crate::RunConfig), keep a clone, and
//! read it back once the output stream has been drained:
//!
//! ```
//! use boundflow::*;
//!
//! let metrics = ExecutionMetrics::new();
//! let runner = Runner::new(RunConfig::default().with_metrics(metrics.clone()));
//!
//! let g = graph_from_iter("n").sort(["x"]);
//! let rows = vec![row! { "x" => 2 }, row! { "x" => 1 }];
//! let out: Vec<Row> = runner
//!     .run(&g, &Bindings::new().bind("n", move || rows.clone()))?
//!     .collect::<Result<_>>()?;
//!
//! assert_eq!(out.len(), 2);
//! assert_eq!(metrics.snapshot().sort_passes, 1);
//! assert_eq!(metrics.snapshot().spilled_runs, 0);
//! # Ok::<(), boundflow::PipelineError>(())
//! ```
//!
//! `peak_buffered_rows` is the largest number of rows the sort engine held in
//! memory at once (one chunk while spilling, or heap plus in-memory tail
//! while merging). It is the figure to watch when tuning
//! [`SortConfig::chunk_size`](crate::SortConfig).

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
struct Counters {
    source_rows: AtomicU64,
    sort_passes: AtomicU64,
    spilled_runs: AtomicU64,
    spilled_rows: AtomicU64,
    merge_passes: AtomicU64,
    peak_buffered_rows: AtomicU64,
    reduce_groups: AtomicU64,
    join_keys: AtomicU64,
    folded_rows: AtomicU64,
}

/// Shared handle to the counters of one or more runs.
#[derive(Clone, Debug, Default)]
pub struct ExecutionMetrics {
    inner: Arc<Counters>,
}

/// Point-in-time copy of the counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    /// Rows pulled from sources.
    pub source_rows: u64,
    /// External sort passes started.
    pub sort_passes: u64,
    /// Sorted runs written to temporary storage (including intermediate merges).
    pub spilled_runs: u64,
    /// Rows written to temporary storage.
    pub spilled_rows: u64,
    /// Intermediate merge passes needed to respect the merge fan-in.
    pub merge_passes: u64,
    /// Largest number of rows a sort held in memory at once.
    pub peak_buffered_rows: u64,
    /// Groups handed to reducers.
    pub reduce_groups: u64,
    /// Keys handed to joiners.
    pub join_keys: u64,
    /// Rows consumed by folds.
    pub folded_rows: u64,
}

fn as_u64(n: usize) -> u64 {
    u64::try_from(n).unwrap_or(u64::MAX)
}

impl ExecutionMetrics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        let c = &self.inner;
        MetricsSnapshot {
            source_rows: c.source_rows.load(Ordering::Relaxed),
            sort_passes: c.sort_passes.load(Ordering::Relaxed),
            spilled_runs: c.spilled_runs.load(Ordering::Relaxed),
            spilled_rows: c.spilled_rows.load(Ordering::Relaxed),
            merge_passes: c.merge_passes.load(Ordering::Relaxed),
            peak_buffered_rows: c.peak_buffered_rows.load(Ordering::Relaxed),
            reduce_groups: c.reduce_groups.load(Ordering::Relaxed),
            join_keys: c.join_keys.load(Ordering::Relaxed),
            folded_rows: c.folded_rows.load(Ordering::Relaxed),
        }
    }

    /// Zero every counter.
    pub fn reset(&self) {
        let c = &self.inner;
        for counter in [
            &c.source_rows,
            &c.sort_passes,
            &c.spilled_runs,
            &c.spilled_rows,
            &c.merge_passes,
            &c.peak_buffered_rows,
            &c.reduce_groups,
            &c.join_keys,
            &c.folded_rows,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }

    /// Snapshot as a JSON object.
    #[must_use]
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self.snapshot()).unwrap_or(Value::Null)
    }

    /// Print the snapshot to stdout.
    pub fn print(&self) {
        println!("{:#}", self.to_json());
    }

    /// Write the snapshot as pretty JSON.
    ///
    /// # Errors
    /// Returns an error if the file cannot be created or written.
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let mut f = File::create(path).with_context(|| format!("create {}", path.display()))?;
        serde_json::to_writer_pretty(&mut f, &self.snapshot())
            .with_context(|| format!("write metrics to {}", path.display()))?;
        f.write_all(b"\n")?;
        Ok(())
    }

    pub(crate) fn record_source_row(&self) {
        self.inner.source_rows.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_sort_pass(&self) {
        self.inner.sort_passes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_spilled_run(&self, rows: usize) {
        self.inner.spilled_runs.fetch_add(1, Ordering::Relaxed);
        self.inner
            .spilled_rows
            .fetch_add(as_u64(rows), Ordering::Relaxed);
    }

    pub(crate) fn record_merge_pass(&self) {
        self.inner.merge_passes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn observe_buffered(&self, rows: usize) {
        self.inner
            .peak_buffered_rows
            .fetch_max(as_u64(rows), Ordering::Relaxed);
    }

    pub(crate) fn record_reduce_group(&self) {
        self.inner.reduce_groups.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_join_key(&self) {
        self.inner.join_keys.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_folded_row(&self) {
        self.inner.folded_rows.fetch_add(1, Ordering::Relaxed);
    }
}
