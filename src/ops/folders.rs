use crate::error::{PipelineError, Result};
use crate::operators::Folder;
use crate::{Row, Value};

/// Adds each listed column of every row into the accumulator.
///
/// A column missing from the accumulator starts at integer zero.
#[derive(Clone, Debug)]
pub struct SumFolder {
    columns: Vec<String>,
}

impl SumFolder {
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

impl Folder for SumFolder {
    fn fold(&self, mut acc: Row, row: Row) -> Result<Row> {
        for column in &self.columns {
            let v = row.require(column)?;
            let current = acc.get(column).cloned().unwrap_or(Value::Int(0));
            let sum = current
                .checked_add(v)
                .ok_or_else(|| PipelineError::type_mismatch(column, "number", v))?;
            acc.insert(column.as_str(), sum);
        }
        Ok(acc)
    }
}
