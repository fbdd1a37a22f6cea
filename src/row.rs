//! Rows, key tuples and the [`row!`](crate::row) constructor.
//!
//! A [`Row`] maps column names to [`Value`]s. Column names are unique and
//! insertion order is kept so output formatting is deterministic, but two rows
//! holding the same cells in a different order compare equal.
//!
//! Operators treat rows they receive as owned inputs and hand back new rows;
//! nothing downstream can observe a row changing after it was produced.

use crate::error::{PipelineError, Result};
use crate::Value;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FormatResult};

/// Tuple of key-column values extracted from a row, compared lexicographically.
pub type Key = Vec<Value>;

/// One record: an ordered map from column name to [`Value`].
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Row {
    cells: Vec<(String, Value)>,
}

impl Row {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_capacity(n: usize) -> Self {
        Self {
            cells: Vec::with_capacity(n),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    #[must_use]
    pub fn contains(&self, column: &str) -> bool {
        self.position(column).is_some()
    }

    fn position(&self, column: &str) -> Option<usize> {
        self.cells.iter().position(|(c, _)| c == column)
    }

    #[must_use]
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.cells.iter().find(|(c, _)| c == column).map(|(_, v)| v)
    }

    /// Look up a column, failing with [`PipelineError::MissingColumn`] if absent.
    ///
    /// # Errors
    /// Returns `MissingColumn` when the row has no such column.
    pub fn require(&self, column: &str) -> Result<&Value> {
        self.get(column)
            .ok_or_else(|| PipelineError::missing_column(column))
    }

    /// Look up a text column.
    ///
    /// # Errors
    /// `MissingColumn` if absent, `TypeMismatch` if the value is not text.
    pub fn require_str(&self, column: &str) -> Result<&str> {
        let v = self.require(column)?;
        v.as_str()
            .ok_or_else(|| PipelineError::type_mismatch(column, "text", v))
    }

    /// Look up a numeric column as `f64`.
    ///
    /// # Errors
    /// `MissingColumn` if absent, `TypeMismatch` if the value is not numeric.
    pub fn require_f64(&self, column: &str) -> Result<f64> {
        let v = self.require(column)?;
        v.as_f64()
            .ok_or_else(|| PipelineError::type_mismatch(column, "number", v))
    }

    /// Set a column, replacing an existing value in place (its position is kept).
    ///
    /// Returns the previous value, if any.
    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        let column = column.into();
        let value = value.into();
        match self.position(&column) {
            Some(i) => Some(std::mem::replace(&mut self.cells[i].1, value)),
            None => {
                self.cells.push((column, value));
                None
            }
        }
    }

    /// Builder-style [`Row::insert`].
    #[must_use]
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(column, value);
        self
    }

    pub fn remove(&mut self, column: &str) -> Option<Value> {
        let i = self.position(column)?;
        Some(self.cells.remove(i).1)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(c, _)| c.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.cells.iter().map(|(c, v)| (c.as_str(), v))
    }

    /// Extract the key tuple for `keys`.
    ///
    /// # Errors
    /// Returns `MissingColumn` for the first key column the row lacks.
    pub fn key(&self, keys: &[String]) -> Result<Key> {
        keys.iter().map(|k| self.require(k).cloned()).collect()
    }

    /// New row containing only `columns`, in the given order.
    ///
    /// # Errors
    /// Returns `MissingColumn` for the first column the row lacks.
    pub fn project<S: AsRef<str>>(&self, columns: &[S]) -> Result<Row> {
        let mut out = Row::with_capacity(columns.len());
        for c in columns {
            let c = c.as_ref();
            out.cells.push((c.to_string(), self.require(c)?.clone()));
        }
        Ok(out)
    }
}

impl PartialEq for Row {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .cells
                .iter()
                .all(|(c, v)| other.get(c).is_some_and(|o| o == v))
    }
}

impl Eq for Row {}

impl Display for Row {
    fn fmt(&self, f: &mut Formatter<'_>) -> FormatResult {
        write!(f, "{{")?;
        for (i, (c, v)) in self.cells.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{c:?}: {v}")?;
        }
        write!(f, "}}")
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut row = Row::new();
        for (k, v) in iter {
            row.insert(k, v);
        }
        row
    }
}

impl IntoIterator for Row {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.cells.into_iter()
    }
}

/// Borrowed view of the key shared by one group: column names plus values.
#[derive(Clone, Copy, Debug)]
pub struct GroupKey<'a> {
    pub columns: &'a [String],
    pub values: &'a [Value],
}

impl<'a> GroupKey<'a> {
    #[must_use]
    pub fn new(columns: &'a [String], values: &'a [Value]) -> Self {
        Self { columns, values }
    }

    /// Value of one key column, if it is part of the key.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&'a Value> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|i| &self.values[i])
    }

    /// A row holding just the key columns.
    #[must_use]
    pub fn to_row(&self) -> Row {
        self.columns
            .iter()
            .zip(self.values)
            .map(|(c, v)| (c.clone(), v.clone()))
            .collect()
    }
}

/// Build a [`Row`] from `column => value` pairs.
///
/// ```
/// use boundflow::{row, Value};
///
/// let r = row! { "text" => "hello", "count" => 2 };
/// assert_eq!(r.get("count"), Some(&Value::Int(2)));
/// ```
#[macro_export]
macro_rules! row {
    () => {
        $crate::Row::new()
    };
    ($($col:expr => $val:expr),+ $(,)?) => {{
        let mut row = $crate::Row::new();
        $( row.insert($col, $crate::Value::from($val)); )+
        row
    }};
}
