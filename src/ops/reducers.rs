//! Grouped aggregations.
//!
//! Every reducer here streams its group once. Output rows start with the key
//! columns of the group followed by the aggregate columns, except [`First`]
//! and [`TopN`], which emit input rows as they are.

use crate::error::{PipelineError, Result};
use crate::group::Group;
use crate::operators::{Reducer, Rows, no_rows, once_row, rows_from};
use crate::row::GroupKey;
use crate::{Row, Value};
use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashMap};

fn add_into(acc: &mut Value, column: &str, row: &Row) -> Result<()> {
    let v = row.require(column)?;
    *acc = acc
        .checked_add(v)
        .ok_or_else(|| PipelineError::type_mismatch(column, "number", v))?;
    Ok(())
}

/// The first row of every group.
#[derive(Clone, Copy, Debug, Default)]
pub struct First;

impl Reducer for First {
    fn reduce(&self, _key: &GroupKey<'_>, group: &mut Group<'_>) -> Result<Rows> {
        Ok(group.next().map_or_else(no_rows, once_row))
    }
}

/// Number of rows per group, as an integer.
#[derive(Clone, Debug)]
pub struct Count {
    column: String,
}

impl Count {
    #[must_use]
    pub fn new(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
        }
    }
}

impl Reducer for Count {
    fn reduce(&self, key: &GroupKey<'_>, group: &mut Group<'_>) -> Result<Rows> {
        let n = group.count();
        Ok(once_row(key.to_row().with(self.column.as_str(), n)))
    }
}

/// Like [`Count`], but emits the counted row once per input row, so the
/// output has as many rows as the input.
#[derive(Clone, Debug)]
pub struct RepeatCount {
    column: String,
}

impl RepeatCount {
    #[must_use]
    pub fn new(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
        }
    }
}

impl Reducer for RepeatCount {
    fn reduce(&self, key: &GroupKey<'_>, group: &mut Group<'_>) -> Result<Rows> {
        let n = group.count();
        let row = key.to_row().with(self.column.as_str(), n);
        Ok(Box::new(std::iter::repeat_n(row, n).map(Ok)))
    }
}

/// Sum of one numeric column.
#[derive(Clone, Debug)]
pub struct Sum {
    column: String,
}

impl Sum {
    #[must_use]
    pub fn new(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
        }
    }
}

impl Reducer for Sum {
    fn reduce(&self, key: &GroupKey<'_>, group: &mut Group<'_>) -> Result<Rows> {
        let mut total = Value::Int(0);
        for row in group {
            add_into(&mut total, &self.column, &row)?;
        }
        Ok(once_row(key.to_row().with(self.column.as_str(), total)))
    }
}

/// Sums of several numeric columns.
#[derive(Clone, Debug)]
pub struct MultiSum {
    columns: Vec<String>,
}

impl MultiSum {
    #[must_use]
    pub fn new<I>(columns: I) -> Self
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        Self {
            columns: columns.into_iter().map(|c| c.as_ref().to_string()).collect(),
        }
    }
}

impl Reducer for MultiSum {
    fn reduce(&self, key: &GroupKey<'_>, group: &mut Group<'_>) -> Result<Rows> {
        let mut totals = vec![Value::Int(0); self.columns.len()];
        for row in group {
            for (total, column) in totals.iter_mut().zip(&self.columns) {
                add_into(total, column, &row)?;
            }
        }
        let mut out = key.to_row();
        for (column, total) in self.columns.iter().zip(totals) {
            out.insert(column.as_str(), total);
        }
        Ok(once_row(out))
    }
}

/// Arithmetic mean of one numeric column, as a float.
#[derive(Clone, Debug)]
pub struct Mean {
    column: String,
    result: String,
}

impl Mean {
    #[must_use]
    pub fn new(column: impl Into<String>, result: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            result: result.into(),
        }
    }
}

impl Reducer for Mean {
    #[allow(clippy::cast_precision_loss)]
    fn reduce(&self, key: &GroupKey<'_>, group: &mut Group<'_>) -> Result<Rows> {
        let (mut sum, mut n) = (0.0, 0usize);
        for row in group {
            sum += row.require_f64(&self.column)?;
            n += 1;
        }
        if n == 0 {
            return Ok(no_rows());
        }
        Ok(once_row(
            key.to_row().with(self.result.as_str(), sum / n as f64),
        ))
    }
}

/// Ranked candidate: larger values first, earlier rows first among ties.
struct Ranked {
    value: Value,
    seq: usize,
    row: Row,
}

impl Ord for Ranked {
    fn cmp(&self, other: &Self) -> Ordering {
        self.value
            .cmp(&other.value)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for Ranked {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Ranked {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Ranked {}

/// The `n` rows with the largest values in a column, largest first.
///
/// Holds at most `n` rows per group. Ties keep input order.
#[derive(Clone, Debug)]
pub struct TopN {
    column: String,
    n: usize,
}

impl TopN {
    #[must_use]
    pub fn new(column: impl Into<String>, n: usize) -> Self {
        Self {
            column: column.into(),
            n,
        }
    }
}

impl Reducer for TopN {
    fn reduce(&self, _key: &GroupKey<'_>, group: &mut Group<'_>) -> Result<Rows> {
        let mut heap: BinaryHeap<Reverse<Ranked>> = BinaryHeap::with_capacity(self.n + 1);
        for (seq, row) in group.enumerate() {
            let value = row.require(&self.column)?.clone();
            heap.push(Reverse(Ranked { value, seq, row }));
            if heap.len() > self.n {
                heap.pop();
            }
        }
        let mut ranked: Vec<Ranked> = heap.into_iter().map(|Reverse(r)| r).collect();
        ranked.sort_by(|a, b| b.cmp(a));
        Ok(rows_from(ranked.into_iter().map(|r| r.row).collect()))
    }
}

/// Relative frequency of each distinct value of a column within the group.
///
/// Emits one row per distinct value, in order of first appearance:
/// key columns, the value, and `count / group_len` as a float.
#[derive(Clone, Debug)]
pub struct TermFrequency {
    words: String,
    result: String,
}

impl TermFrequency {
    #[must_use]
    pub fn new(words: impl Into<String>, result: impl Into<String>) -> Self {
        Self {
            words: words.into(),
            result: result.into(),
        }
    }
}

impl Reducer for TermFrequency {
    #[allow(clippy::cast_precision_loss)]
    fn reduce(&self, key: &GroupKey<'_>, group: &mut Group<'_>) -> Result<Rows> {
        let mut index: HashMap<Value, usize> = HashMap::new();
        let mut counts: Vec<(Value, usize)> = Vec::new();
        let mut total = 0usize;
        for row in group {
            let word = row.require(&self.words)?;
            match index.get(word) {
                Some(&i) => counts[i].1 += 1,
                None => {
                    index.insert(word.clone(), counts.len());
                    counts.push((word.clone(), 1));
                }
            }
            total += 1;
        }
        let base = key.to_row();
        let out = counts
            .into_iter()
            .map(|(word, count)| {
                base.clone()
                    .with(self.words.as_str(), word)
                    .with(self.result.as_str(), count as f64 / total as f64)
            })
            .collect();
        Ok(rows_from(out))
    }
}
