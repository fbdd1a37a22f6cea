//! Operator contracts implemented by user code.
//!
//! Four capability traits cover every node kind that runs user logic:
//!
//! | trait | called with | produces |
//! |---|---|---|
//! | [`Mapper`] | one row | zero or more rows |
//! | [`Reducer`] | a key and the lazy run of rows sharing it | zero or more rows |
//! | [`Folder`] | the accumulator and one row | the next accumulator |
//! | [`Joiner`] | a key, the streamed left group and the buffered right group | zero or more rows |
//!
//! Implementations should be pure: the same inputs give the same outputs and
//! nothing is carried from one call to the next. A graph can then be executed
//! any number of times with identical results.
//!
//! Output is returned as [`Rows`], a boxed owned iterator, so an operator can
//! emit lazily (e.g. `Split` yields one word at a time) without borrowing from
//! its input.

use crate::error::Result;
use crate::group::{Group, LeftGroup};
use crate::row::{GroupKey, Row};
use std::any::type_name;
use std::sync::Arc;

/// Lazily produced row stream. Errors are yielded in place of the row that
/// could not be produced.
pub type Rows = Box<dyn Iterator<Item = Result<Row>>>;

/// Stream with exactly one row.
#[must_use]
pub fn once_row(row: Row) -> Rows {
    Box::new(std::iter::once(Ok(row)))
}

/// Empty stream.
#[must_use]
pub fn no_rows() -> Rows {
    Box::new(std::iter::empty())
}

/// Stream over already built rows.
#[must_use]
pub fn rows_from(rows: Vec<Row>) -> Rows {
    Box::new(rows.into_iter().map(Ok))
}

/// Row-wise transform: `Row -> 0..n rows`.
///
/// A mapper must only look at the row it is given.
pub trait Mapper: Send + Sync {
    /// Transform one row.
    ///
    /// # Errors
    /// Typically `MissingColumn` / `TypeMismatch` when the row lacks what the
    /// mapper needs.
    fn map(&self, row: Row) -> Result<Rows>;

    /// Label shown by [`Graph::explain`](crate::Graph::explain).
    fn label(&self) -> &'static str {
        short_type_name(type_name::<Self>())
    }
}

impl<F> Mapper for F
where
    F: Fn(Row) -> Result<Rows> + Send + Sync,
{
    fn map(&self, row: Row) -> Result<Rows> {
        self(row)
    }

    fn label(&self) -> &'static str {
        "closure"
    }
}

/// Grouped aggregation over one maximal run of rows sharing a key.
///
/// `group` is a single-pass view over the run; it may be consumed partially.
/// Whatever the reducer leaves unread is skipped by the engine. The engine
/// itself holds at most one lookahead row, so buffering beyond that is the
/// reducer's choice.
pub trait Reducer: Send + Sync {
    /// Reduce one group.
    ///
    /// # Errors
    /// Any error aborts the run at this group.
    fn reduce(&self, key: &GroupKey<'_>, group: &mut Group<'_>) -> Result<Rows>;

    fn label(&self) -> &'static str {
        short_type_name(type_name::<Self>())
    }
}

/// Whole-stream accumulation into a single row.
///
/// The accumulator is the only state kept across the table; raw rows are not.
pub trait Folder: Send + Sync {
    /// Combine the accumulator with the next row.
    ///
    /// # Errors
    /// Any error aborts the run.
    fn fold(&self, acc: Row, row: Row) -> Result<Row>;

    fn label(&self) -> &'static str {
        short_type_name(type_name::<Self>())
    }
}

impl<F> Folder for F
where
    F: Fn(Row, Row) -> Result<Row> + Send + Sync,
{
    fn fold(&self, acc: Row, row: Row) -> Result<Row> {
        self(acc, row)
    }

    fn label(&self) -> &'static str {
        "closure"
    }
}

/// Which keys a [`Joiner`] is invoked for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum JoinMode {
    /// Keys present on both sides.
    Inner,
    /// Every left key; the right group is empty when absent.
    Left,
    /// Every right key; the left group is absent when the key is.
    Right,
    /// Union of keys.
    Outer,
}

impl JoinMode {
    /// Whether keys found only on the left are passed to the joiner.
    #[must_use]
    pub fn keeps_left(self) -> bool {
        matches!(self, Self::Left | Self::Outer)
    }

    /// Whether keys found only on the right are passed to the joiner.
    #[must_use]
    pub fn keeps_right(self) -> bool {
        matches!(self, Self::Right | Self::Outer)
    }
}

/// Sort-merge join callback, invoked once per key the [`JoinMode`] selects.
///
/// The right group is buffered for the duration of the key. The left group
/// is streamed: the returned rows may pull from it lazily, and anything left
/// unread is skipped. Memory is bounded by the largest right-hand group, so
/// put the side with the smaller groups on the right.
pub trait Joiner: Send + Sync {
    fn mode(&self) -> JoinMode;

    /// Combine the two groups for one key.
    ///
    /// # Errors
    /// Any error aborts the run at this key.
    fn join(&self, key: &GroupKey<'_>, left: LeftGroup, right: Arc<[Row]>) -> Result<Rows>;

    fn label(&self) -> &'static str {
        short_type_name(type_name::<Self>())
    }
}

/// `boundflow::ops::Count` -> `Count`
fn short_type_name(full: &'static str) -> &'static str {
    let head = full.split('<').next().unwrap_or(full);
    head.rsplit("::").next().unwrap_or(head)
}
