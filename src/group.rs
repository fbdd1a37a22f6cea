//! Key-grouped execution over sorted streams: reduce, join and fold.
//!
//! [`GroupedInput`] walks a stream that is sorted by some key columns and
//! exposes it one maximal run of equal keys at a time, holding a single
//! lookahead row. Reducers see a run through [`Group`], a single-pass iterator
//! that stops at the first row of the next key. Joiners get the left run as a
//! [`LeftGroup`], which streams the same way, and the right run buffered.

use crate::error::{PipelineError, Result};
use crate::metrics::ExecutionMetrics;
use crate::operators::{Folder, JoinMode, Joiner, Reducer, Rows};
use crate::row::GroupKey;
use crate::{Key, Row};
use std::cell::RefCell;
use std::cmp::Ordering;
use std::rc::Rc;
use std::sync::Arc;
use tracing::trace;

pub(crate) struct GroupedInput {
    input: Rows,
    keys: Arc<[String]>,
    pending: Option<(Key, Row)>,
    exhausted: bool,
    check_sorted: bool,
    last_key: Option<Key>,
    failed: Option<PipelineError>,
}

impl GroupedInput {
    pub(crate) fn new(input: Rows, keys: Arc<[String]>, check_sorted: bool) -> Self {
        Self {
            input,
            keys,
            pending: None,
            exhausted: false,
            check_sorted,
            last_key: None,
            failed: None,
        }
    }

    /// Make sure the lookahead slot holds the next row, if any is left.
    fn fill(&mut self) -> Result<()> {
        if self.pending.is_some() || self.exhausted {
            return Ok(());
        }
        let Some(item) = self.input.next() else {
            self.exhausted = true;
            return Ok(());
        };
        let row = item?;
        let key = row.key(&self.keys)?;
        if self.check_sorted {
            if let Some(previous) = &self.last_key
                && key < *previous
            {
                return Err(PipelineError::UnsortedInput {
                    previous: previous.clone(),
                    current: key,
                });
            }
            self.last_key = Some(key.clone());
        }
        self.pending = Some((key, row));
        Ok(())
    }

    /// Key of the next group, without consuming anything.
    pub(crate) fn next_key(&mut self) -> Result<Option<Key>> {
        self.fill()?;
        Ok(self.pending.as_ref().map(|(key, _)| key.clone()))
    }

    /// Next row of the group keyed `key`; `None` once the key changes.
    fn next_in_group(&mut self, key: &Key) -> Result<Option<Row>> {
        self.fill()?;
        match &self.pending {
            Some((k, _)) if k == key => Ok(self.pending.take().map(|(_, row)| row)),
            _ => Ok(None),
        }
    }

    fn collect_group(&mut self, key: &Key) -> Result<Vec<Row>> {
        let mut rows = Vec::new();
        while let Some(row) = self.next_in_group(key)? {
            rows.push(row);
        }
        Ok(rows)
    }

    fn skip_group(&mut self, key: &Key) -> Result<()> {
        while self.next_in_group(key)?.is_some() {}
        Ok(())
    }
}

/// The rows of one group, in input order.
///
/// Iteration ends at the group boundary. If the upstream fails mid-group the
/// iterator simply ends; the engine then reports the error in place of
/// whatever the reducer returned.
pub struct Group<'a> {
    input: &'a mut GroupedInput,
    key: &'a Key,
    done: bool,
}

impl<'a> Group<'a> {
    pub(crate) fn new(input: &'a mut GroupedInput, key: &'a Key) -> Self {
        Self {
            input,
            key,
            done: false,
        }
    }
}

impl Iterator for Group<'_> {
    type Item = Row;

    fn next(&mut self) -> Option<Row> {
        if self.done {
            return None;
        }
        match self.input.next_in_group(self.key) {
            Ok(Some(row)) => Some(row),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.input.failed = Some(e);
                self.done = true;
                None
            }
        }
    }
}

/// The left-hand rows of one join key, pulled from the input on demand.
///
/// Unlike [`Group`] it owns its handle on the input, so a joiner can move it
/// into the stream it returns. Rows left unread are skipped before the next
/// key is read.
pub struct LeftGroup {
    input: Option<Rc<RefCell<GroupedInput>>>,
    key: Key,
    done: bool,
}

impl LeftGroup {
    fn new(input: Rc<RefCell<GroupedInput>>, key: Key) -> Self {
        Self {
            input: Some(input),
            key,
            done: false,
        }
    }

    fn absent() -> Self {
        Self {
            input: None,
            key: Key::default(),
            done: true,
        }
    }

    /// Whether the key has no rows on the left side.
    #[must_use]
    pub fn is_absent(&self) -> bool {
        self.input.is_none()
    }
}

impl Iterator for LeftGroup {
    type Item = Row;

    fn next(&mut self) -> Option<Row> {
        if self.done {
            return None;
        }
        let mut input = self.input.as_ref()?.borrow_mut();
        match input.next_in_group(&self.key) {
            Ok(Some(row)) => Some(row),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                input.failed = Some(e);
                self.done = true;
                None
            }
        }
    }
}

impl std::fmt::Debug for LeftGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LeftGroup")
            .field("key", &self.key)
            .field("absent", &self.is_absent())
            .finish_non_exhaustive()
    }
}

/// Drive a fallible "next batch" producer, flattening batches into rows and
/// stopping at the first error.
struct Batches<F> {
    produce: F,
    current: Option<Rows>,
    done: bool,
}

impl<F> Iterator for Batches<F>
where
    F: FnMut() -> Result<Option<Rows>>,
{
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.done {
                return None;
            }
            if let Some(out) = &mut self.current {
                match out.next() {
                    Some(Ok(row)) => return Some(Ok(row)),
                    Some(Err(e)) => {
                        self.done = true;
                        return Some(Err(e));
                    }
                    None => self.current = None,
                }
            }
            match (self.produce)() {
                Ok(Some(rows)) => self.current = Some(rows),
                Ok(None) => self.done = true,
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

pub(crate) fn batches<F>(produce: F) -> Rows
where
    F: FnMut() -> Result<Option<Rows>> + 'static,
{
    Box::new(Batches {
        produce,
        current: None,
        done: false,
    })
}

pub(crate) fn reduce_stream(
    mut input: GroupedInput,
    reducer: Arc<dyn Reducer>,
    metrics: ExecutionMetrics,
) -> Rows {
    batches(move || {
        let Some(key) = input.next_key()? else {
            return Ok(None);
        };
        metrics.record_reduce_group();
        trace!(key = ?key, reducer = reducer.label(), "reduce group");
        let columns = Arc::clone(&input.keys);
        let group_key = GroupKey::new(&columns, &key);
        let mut group = Group::new(&mut input, &key);
        let out = reducer.reduce(&group_key, &mut group);
        group.by_ref().for_each(drop);
        if let Some(e) = input.failed.take() {
            return Err(e);
        }
        out.map(Some)
    })
}

pub(crate) fn join_stream(
    left: GroupedInput,
    mut right: GroupedInput,
    joiner: Arc<dyn Joiner>,
    metrics: ExecutionMetrics,
) -> Rows {
    let mode = joiner.mode();
    let columns = Arc::clone(&left.keys);
    let left = Rc::new(RefCell::new(left));
    // Key of the left group handed to the previous joiner call.
    let mut open: Option<Key> = None;
    batches(move || {
        if let Some(key) = open.take() {
            let mut input = left.borrow_mut();
            if let Some(e) = input.failed.take() {
                return Err(e);
            }
            input.skip_group(&key)?;
        }
        loop {
            let left_key = left.borrow_mut().next_key()?;
            let (key, take_left, take_right) = match (left_key, right.next_key()?) {
                (None, None) => return Ok(None),
                (Some(l), None) => {
                    if !mode.keeps_left() {
                        return Ok(None);
                    }
                    (l, true, false)
                }
                (None, Some(r)) => {
                    if !mode.keeps_right() {
                        return Ok(None);
                    }
                    (r, false, true)
                }
                (Some(l), Some(r)) => match l.cmp(&r) {
                    Ordering::Less => (l, true, false),
                    Ordering::Greater => (r, false, true),
                    Ordering::Equal => (l, true, true),
                },
            };
            if !invokes(mode, take_left, take_right) {
                if take_left {
                    left.borrow_mut().skip_group(&key)?;
                } else {
                    right.skip_group(&key)?;
                }
                continue;
            }
            let right_rows: Arc<[Row]> = if take_right {
                right.collect_group(&key)?.into()
            } else {
                Vec::new().into()
            };
            let left_rows = if take_left {
                open = Some(key.clone());
                LeftGroup::new(Rc::clone(&left), key.clone())
            } else {
                LeftGroup::absent()
            };
            metrics.record_join_key();
            trace!(
                key = ?key,
                left = take_left,
                right = right_rows.len(),
                "join key"
            );
            return joiner
                .join(&GroupKey::new(&columns, &key), left_rows, right_rows)
                .map(Some);
        }
    })
}

fn invokes(mode: JoinMode, has_left: bool, has_right: bool) -> bool {
    match (has_left, has_right) {
        (true, true) => true,
        (true, false) => mode.keeps_left(),
        (false, true) => mode.keeps_right(),
        (false, false) => false,
    }
}

/// One-row stream holding the fold of the whole input. Nothing is pulled
/// until the first `next`.
pub(crate) fn fold_stream(
    input: Rows,
    folder: Arc<dyn Folder>,
    initial: Row,
    metrics: ExecutionMetrics,
) -> Rows {
    let mut input = Some(input);
    Box::new(std::iter::from_fn(move || {
        let rows = input.take()?;
        let mut acc = initial.clone();
        for item in rows {
            let row = match item {
                Ok(row) => row,
                Err(e) => return Some(Err(e)),
            };
            metrics.record_folded_row();
            acc = match folder.fold(acc, row) {
                Ok(acc) => acc,
                Err(e) => return Some(Err(e)),
            };
        }
        Some(Ok(acc))
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operators::rows_from;
    use crate::row;

    fn keyed(values: &[i64]) -> GroupedInput {
        let rows = values.iter().map(|v| row! { "k" => *v }).collect();
        GroupedInput::new(rows_from(rows), Arc::from(vec!["k".to_string()]), true)
    }

    #[test]
    fn walks_groups_in_order() -> Result<()> {
        let mut input = keyed(&[1, 1, 2, 3, 3, 3]);
        let mut sizes = Vec::new();
        while let Some(key) = input.next_key()? {
            sizes.push((key[0].clone(), input.collect_group(&key)?.len()));
        }
        assert_eq!(
            sizes,
            vec![
                (crate::Value::Int(1), 2),
                (crate::Value::Int(2), 1),
                (crate::Value::Int(3), 3)
            ]
        );
        Ok(())
    }

    #[test]
    fn descending_key_is_rejected() -> Result<()> {
        let mut input = keyed(&[1, 2, 1]);
        let first = input.next_key()?.unwrap_or_default();
        input.skip_group(&first)?;
        let second = input.next_key()?.unwrap_or_default();
        let err = input.skip_group(&second).unwrap_err();
        assert!(matches!(err, PipelineError::UnsortedInput { .. }));
        Ok(())
    }
}
