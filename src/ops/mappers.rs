//! Row-wise transforms.

use crate::error::{PipelineError, Result};
use crate::operators::{Mapper, Rows, no_rows, once_row};
use crate::{Row, Value};
use anyhow::anyhow;
use std::sync::Arc;

fn owned_columns<I>(columns: I) -> Vec<String>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    columns.into_iter().map(|c| c.as_ref().to_string()).collect()
}

/// Emits every row unchanged.
#[derive(Clone, Copy, Debug, Default)]
pub struct Identity;

impl Mapper for Identity {
    fn map(&self, row: Row) -> Result<Rows> {
        Ok(once_row(row))
    }
}

/// Strips ASCII punctuation from a text column.
#[derive(Clone, Debug)]
pub struct FilterPunctuation {
    column: String,
}

impl FilterPunctuation {
    #[must_use]
    pub fn new(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
        }
    }
}

impl Mapper for FilterPunctuation {
    fn map(&self, mut row: Row) -> Result<Rows> {
        let cleaned: String = row
            .require_str(&self.column)?
            .chars()
            .filter(|c| !c.is_ascii_punctuation())
            .collect();
        row.insert(self.column.as_str(), cleaned);
        Ok(once_row(row))
    }
}

/// Lowercases a text column.
#[derive(Clone, Debug)]
pub struct LowerCase {
    column: String,
}

impl LowerCase {
    #[must_use]
    pub fn new(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
        }
    }
}

impl Mapper for LowerCase {
    fn map(&self, mut row: Row) -> Result<Rows> {
        let lowered = row.require_str(&self.column)?.to_lowercase();
        row.insert(self.column.as_str(), lowered);
        Ok(once_row(row))
    }
}

/// Splits a text column, emitting one copy of the row per part.
///
/// [`Split::whitespace`] splits on runs of whitespace and never yields empty
/// parts. [`Split::on`] splits on an exact separator and keeps empty parts.
#[derive(Clone, Debug)]
pub struct Split {
    column: String,
    separator: Option<String>,
}

impl Split {
    #[must_use]
    pub fn whitespace(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            separator: None,
        }
    }

    #[must_use]
    pub fn on(column: impl Into<String>, separator: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            separator: Some(separator.into()),
        }
    }
}

impl Mapper for Split {
    fn map(&self, row: Row) -> Result<Rows> {
        let text = row.require_str(&self.column)?;
        let parts: Vec<String> = match &self.separator {
            None => text.split_whitespace().map(str::to_string).collect(),
            Some(sep) => text.split(sep.as_str()).map(str::to_string).collect(),
        };
        let column = self.column.clone();
        Ok(Box::new(
            parts
                .into_iter()
                .map(move |part| Ok(row.clone().with(column.as_str(), part))),
        ))
    }
}

type Predicate = Arc<dyn Fn(&Row) -> Result<bool> + Send + Sync>;

/// Keeps the rows a predicate accepts.
#[derive(Clone)]
pub struct Filter {
    predicate: Predicate,
}

impl Filter {
    #[must_use]
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&Row) -> bool + Send + Sync + 'static,
    {
        Self {
            predicate: Arc::new(move |row: &Row| -> Result<bool> { Ok(predicate(row)) }),
        }
    }

    /// Predicate that may fail, e.g. on a missing column.
    #[must_use]
    pub fn try_new<F>(predicate: F) -> Self
    where
        F: Fn(&Row) -> Result<bool> + Send + Sync + 'static,
    {
        Self {
            predicate: Arc::new(predicate),
        }
    }
}

impl Mapper for Filter {
    fn map(&self, row: Row) -> Result<Rows> {
        Ok(if (self.predicate)(&row)? {
            once_row(row)
        } else {
            no_rows()
        })
    }
}

/// Keeps only the listed columns, in the listed order.
#[derive(Clone, Debug)]
pub struct Project {
    columns: Vec<String>,
}

impl Project {
    #[must_use]
    pub fn new<I>(columns: I) -> Self
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        Self {
            columns: owned_columns(columns),
        }
    }
}

impl Mapper for Project {
    fn map(&self, row: Row) -> Result<Rows> {
        Ok(once_row(row.project(&self.columns)?))
    }
}

/// Stores the product of several numeric columns.
///
/// Integers stay integers unless the product overflows.
#[derive(Clone, Debug)]
pub struct Product {
    columns: Vec<String>,
    result: String,
}

impl Product {
    #[must_use]
    pub fn new<I>(columns: I, result: impl Into<String>) -> Self
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        Self {
            columns: owned_columns(columns),
            result: result.into(),
        }
    }
}

impl Mapper for Product {
    fn map(&self, mut row: Row) -> Result<Rows> {
        let mut product = Value::Int(1);
        for column in &self.columns {
            let v = row.require(column)?;
            product = product
                .checked_mul(v)
                .ok_or_else(|| PipelineError::type_mismatch(column, "number", v))?;
        }
        row.insert(self.result.as_str(), product);
        Ok(once_row(row))
    }
}

/// Stores `numerator / denominator` as a float.
#[derive(Clone, Debug)]
pub struct Divide {
    numerator: String,
    denominator: String,
    result: String,
}

impl Divide {
    #[must_use]
    pub fn new(
        numerator: impl Into<String>,
        denominator: impl Into<String>,
        result: impl Into<String>,
    ) -> Self {
        Self {
            numerator: numerator.into(),
            denominator: denominator.into(),
            result: result.into(),
        }
    }
}

impl Mapper for Divide {
    fn map(&self, mut row: Row) -> Result<Rows> {
        let n = row.require_f64(&self.numerator)?;
        let d = row.require_f64(&self.denominator)?;
        if d == 0.0 {
            return Err(anyhow!("division by zero: `{}` is 0", self.denominator).into());
        }
        row.insert(self.result.as_str(), n / d);
        Ok(once_row(row))
    }
}

/// Inverse document frequency: `ln(doc_count / word_docs)`.
///
/// Emits a new row holding only the word column and the result.
#[derive(Clone, Debug)]
pub struct Idf {
    doc_count: String,
    word_docs: String,
    word: String,
    result: String,
}

impl Idf {
    #[must_use]
    pub fn new(
        doc_count: impl Into<String>,
        word_docs: impl Into<String>,
        word: impl Into<String>,
        result: impl Into<String>,
    ) -> Self {
        Self {
            doc_count: doc_count.into(),
            word_docs: word_docs.into(),
            word: word.into(),
            result: result.into(),
        }
    }
}

impl Mapper for Idf {
    fn map(&self, row: Row) -> Result<Rows> {
        let total = row.require_f64(&self.doc_count)?;
        let containing = row.require_f64(&self.word_docs)?;
        let word = row.require(&self.word)?.clone();
        Ok(once_row(
            Row::new()
                .with(self.word.as_str(), word)
                .with(self.result.as_str(), (total / containing).ln()),
        ))
    }
}

/// Pointwise mutual information: `ln(doc_freq / total_freq)`.
#[derive(Clone, Debug)]
pub struct Pmi {
    doc_freq: String,
    total_freq: String,
    result: String,
}

impl Pmi {
    #[must_use]
    pub fn new(
        doc_freq: impl Into<String>,
        total_freq: impl Into<String>,
        result: impl Into<String>,
    ) -> Self {
        Self {
            doc_freq: doc_freq.into(),
            total_freq: total_freq.into(),
            result: result.into(),
        }
    }
}

impl Mapper for Pmi {
    fn map(&self, mut row: Row) -> Result<Rows> {
        let ratio = row.require_f64(&self.doc_freq)? / row.require_f64(&self.total_freq)?;
        row.insert(self.result.as_str(), ratio.ln());
        Ok(once_row(row))
    }
}
