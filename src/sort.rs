//! External sort engine.
//!
//! Rows are pulled in chunks of at most [`SortConfig::chunk_size`]. A chunk is
//! sorted in memory by key (stable) and, unless the whole input fit in that
//! first chunk, written to a scratch file as a sorted *run*. The runs are then
//! merged back through a min-heap of one head row per run. Ties are broken by
//! run index, and runs are numbered in arrival order, so equal keys keep their
//! input order end to end.
//!
//! When there are more spilled runs than [`SortConfig::merge_fan_in`], groups
//! of consecutive runs are first merged into longer runs until the final merge
//! stays within the fan-in.
//!
//! All scratch files live in one temporary directory per sort pass. The
//! directory is removed when the pass finishes, fails, or its stream is
//! dropped early.

mod spill;

use crate::error::{PipelineError, Result};
use crate::metrics::ExecutionMetrics;
use crate::operators::Rows;
use crate::{Key, Row};
use spill::{SpillReader, SpillWriter};
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::mem;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use tracing::debug;

/// Tuning knobs for [`Graph::sort`](crate::Graph::sort).
#[derive(Clone, Debug)]
pub struct SortConfig {
    /// Maximum rows sorted in memory before a run is spilled.
    pub chunk_size: usize,
    /// Maximum runs merged at once.
    pub merge_fan_in: usize,
    /// Parent directory for scratch files; the system temp dir when `None`.
    pub spill_dir: Option<PathBuf>,
}

impl Default for SortConfig {
    fn default() -> Self {
        Self {
            chunk_size: 65_536,
            merge_fan_in: 64,
            spill_dir: None,
        }
    }
}

impl SortConfig {
    /// Rows per in-memory chunk (at least 1).
    #[must_use]
    pub fn with_chunk_size(mut self, rows: usize) -> Self {
        self.chunk_size = rows.max(1);
        self
    }

    /// Runs per merge (at least 2).
    #[must_use]
    pub fn with_merge_fan_in(mut self, runs: usize) -> Self {
        self.merge_fan_in = runs.max(2);
        self
    }

    #[must_use]
    pub fn with_spill_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.spill_dir = Some(dir.into());
        self
    }

    fn create_spill_dir(&self) -> Result<TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("boundflow-sort-");
        match &self.spill_dir {
            Some(dir) => builder.tempdir_in(dir),
            None => builder.tempdir(),
        }
        .map_err(|e| PipelineError::resource("create spill directory", e))
    }
}

/// Lazy sorted view of `input`. Nothing is pulled until the first `next`.
pub(crate) fn external_sort(
    input: Rows,
    keys: Arc<[String]>,
    config: SortConfig,
    metrics: ExecutionMetrics,
) -> Rows {
    Box::new(SortStream {
        state: SortState::Pending(input),
        keys,
        config,
        metrics,
    })
}

enum SortState {
    Pending(Rows),
    Merging(Merger),
    Done,
}

struct SortStream {
    state: SortState,
    keys: Arc<[String]>,
    config: SortConfig,
    metrics: ExecutionMetrics,
}

impl SortStream {
    fn prepare(&self, mut input: Rows) -> Result<Merger> {
        self.metrics.record_sort_pass();
        let chunk_size = self.config.chunk_size.max(1);
        let fan_in = self.config.merge_fan_in.max(2);

        let mut chunk = read_chunk(&mut input, &self.keys, chunk_size)?;
        if chunk.len() < chunk_size {
            self.metrics.observe_buffered(chunk.len());
            sort_chunk(&mut chunk);
            return Ok(Merger {
                source: MergeSource::Memory(chunk.into_iter()),
                spill: None,
            });
        }

        let dir = self.config.create_spill_dir()?;
        debug!(dir = %dir.path().display(), chunk_size, "sort input exceeds one chunk, spilling");
        let mut spilled = Vec::new();
        let mut tail = loop {
            self.metrics.observe_buffered(chunk.len());
            sort_chunk(&mut chunk);
            spilled.push(self.spill_chunk(dir.path(), chunk)?);
            chunk = read_chunk(&mut input, &self.keys, chunk_size)?;
            if chunk.len() < chunk_size {
                break chunk;
            }
        };
        drop(input);

        while spilled.len() > fan_in {
            spilled = self.merge_pass(dir.path(), spilled, fan_in)?;
        }

        sort_chunk(&mut tail);
        let tail_len = tail.len();
        let mut runs: Vec<Run> = spilled.into_iter().map(Run::Spilled).collect();
        if !tail.is_empty() {
            runs.push(Run::Memory(tail.into_iter()));
        }
        debug!(runs = runs.len(), "final merge");
        let merge = KWayMerge::new(runs, Arc::clone(&self.keys))?;
        self.metrics.observe_buffered(merge.heap.len() + tail_len);
        Ok(Merger {
            source: MergeSource::KWay(merge),
            spill: Some(dir),
        })
    }

    fn spill_chunk(&self, dir: &Path, chunk: Vec<(Key, Row)>) -> Result<SpillReader> {
        let mut writer = SpillWriter::create(dir)?;
        for (_, row) in &chunk {
            writer.write(row)?;
        }
        self.metrics.record_spilled_run(writer.rows());
        debug!(rows = writer.rows(), "spilled sorted run");
        writer.finish()
    }

    /// Merge consecutive groups of `fan_in` runs into single runs.
    fn merge_pass(
        &self,
        dir: &Path,
        runs: Vec<SpillReader>,
        fan_in: usize,
    ) -> Result<Vec<SpillReader>> {
        self.metrics.record_merge_pass();
        debug!(runs = runs.len(), fan_in, "intermediate merge pass");
        let mut merged = Vec::with_capacity(runs.len().div_ceil(fan_in));
        let mut runs = runs.into_iter().peekable();
        while runs.peek().is_some() {
            let group: Vec<Run> = runs.by_ref().take(fan_in).map(Run::Spilled).collect();
            let mut merge = KWayMerge::new(group, Arc::clone(&self.keys))?;
            let mut writer = SpillWriter::create(dir)?;
            while let Some(row) = merge.next_row()? {
                writer.write(&row)?;
            }
            self.metrics.record_spilled_run(writer.rows());
            merged.push(writer.finish()?);
        }
        Ok(merged)
    }
}

impl Iterator for SortStream {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        if matches!(self.state, SortState::Pending(_)) {
            let SortState::Pending(input) = mem::replace(&mut self.state, SortState::Done) else {
                return None;
            };
            match self.prepare(input) {
                Ok(merger) => self.state = SortState::Merging(merger),
                Err(e) => return Some(Err(e)),
            }
        }
        let SortState::Merging(merger) = &mut self.state else {
            return None;
        };
        match merger.next_row() {
            Ok(Some(row)) => Some(Ok(row)),
            Ok(None) => {
                let SortState::Merging(merger) = mem::replace(&mut self.state, SortState::Done)
                else {
                    return None;
                };
                merger.close().err().map(Err)
            }
            Err(e) => {
                self.state = SortState::Done;
                Some(Err(e))
            }
        }
    }
}

fn read_chunk(input: &mut Rows, keys: &[String], limit: usize) -> Result<Vec<(Key, Row)>> {
    let mut chunk = Vec::with_capacity(limit.min(4096));
    for item in input.by_ref().take(limit) {
        let row = item?;
        let key = row.key(keys)?;
        chunk.push((key, row));
    }
    Ok(chunk)
}

fn sort_chunk(chunk: &mut [(Key, Row)]) {
    chunk.sort_by(|a, b| a.0.cmp(&b.0));
}

struct Merger {
    source: MergeSource,
    spill: Option<TempDir>,
}

enum MergeSource {
    Memory(std::vec::IntoIter<(Key, Row)>),
    KWay(KWayMerge),
}

impl Merger {
    fn next_row(&mut self) -> Result<Option<Row>> {
        match &mut self.source {
            MergeSource::Memory(rows) => Ok(rows.next().map(|(_, row)| row)),
            MergeSource::KWay(merge) => merge.next_row(),
        }
    }

    /// Release scratch storage, reporting a failure to remove it.
    fn close(self) -> Result<()> {
        let Merger { source, spill } = self;
        drop(source);
        match spill {
            Some(dir) => dir
                .close()
                .map_err(|e| PipelineError::resource("remove spill directory", e)),
            None => Ok(()),
        }
    }
}

enum Run {
    Memory(std::vec::IntoIter<(Key, Row)>),
    Spilled(SpillReader),
}

impl Run {
    fn next_entry(&mut self, keys: &[String]) -> Result<Option<(Key, Row)>> {
        match self {
            Run::Memory(rows) => Ok(rows.next()),
            Run::Spilled(reader) => match reader.next() {
                Some(row) => {
                    let row = row?;
                    Ok(Some((row.key(keys)?, row)))
                }
                None => Ok(None),
            },
        }
    }
}

/// Head row of one run. The heap is a max-heap, so the ordering is reversed
/// to pop the smallest `(key, run)` first.
struct HeapEntry {
    key: Key,
    run: usize,
    row: Row,
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .key
            .cmp(&self.key)
            .then_with(|| other.run.cmp(&self.run))
    }
}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for HeapEntry {}

struct KWayMerge {
    runs: Vec<Run>,
    heap: BinaryHeap<HeapEntry>,
    keys: Arc<[String]>,
}

impl KWayMerge {
    fn new(mut runs: Vec<Run>, keys: Arc<[String]>) -> Result<Self> {
        let mut heap = BinaryHeap::with_capacity(runs.len());
        for (run, source) in runs.iter_mut().enumerate() {
            if let Some((key, row)) = source.next_entry(&keys)? {
                heap.push(HeapEntry { key, run, row });
            }
        }
        Ok(Self { runs, heap, keys })
    }

    fn next_row(&mut self) -> Result<Option<Row>> {
        let Some(top) = self.heap.pop() else {
            return Ok(None);
        };
        if let Some((key, row)) = self.runs[top.run].next_entry(&self.keys)? {
            self.heap.push(HeapEntry {
                key,
                run: top.run,
                row,
            });
        }
        Ok(Some(top.row))
    }
}
