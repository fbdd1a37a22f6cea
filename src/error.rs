//! Error taxonomy for graph execution.
//!
//! Every failure surfaces through the output stream of a run, at the point
//! where the offending row would have been produced. Rows already yielded stay
//! valid, and the [`Graph`](crate::Graph) itself remains reusable.

use crate::Value;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T, E = PipelineError> = std::result::Result<T, E>;

/// Errors raised while running a graph.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// A row reaching an operator lacks a column the operator needs.
    #[error("missing column `{column}`")]
    MissingColumn { column: String },

    /// A column holds a value of a kind the operator cannot work with.
    #[error("column `{column}`: expected {expected}, found {found}")]
    TypeMismatch {
        column: String,
        expected: &'static str,
        found: &'static str,
    },

    /// `run` was called without a binding for a referenced source name.
    #[error("no binding for source `{name}`")]
    UnboundSource { name: String },

    /// A source parser failed to produce a row from raw input.
    #[error("malformed input in `{source_name}` at line {line}")]
    MalformedInput {
        source_name: String,
        line: usize,
        #[source]
        source: anyhow::Error,
    },

    /// A file-backed source could not be opened or read.
    #[error("reading source {}", path.display())]
    SourceIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Scoped temporary storage could not be allocated, written, read or released.
    #[error("temporary storage: {context}")]
    Resource {
        context: String,
        #[source]
        source: io::Error,
    },

    /// A spilled row could not be encoded or decoded.
    #[error("spill codec")]
    SpillCodec(#[from] postcard::Error),

    /// A reduce or join input was observed out of key order.
    #[error("input not sorted by key: {current:?} follows {previous:?}")]
    UnsortedInput {
        previous: Vec<Value>,
        current: Vec<Value>,
    },

    /// A user-supplied operator failed.
    #[error(transparent)]
    Operator(#[from] anyhow::Error),
}

impl PipelineError {
    pub(crate) fn missing_column(column: &str) -> Self {
        Self::MissingColumn {
            column: column.to_string(),
        }
    }

    pub(crate) fn resource(context: impl Into<String>, source: io::Error) -> Self {
        Self::Resource {
            context: context.into(),
            source,
        }
    }

    pub(crate) fn type_mismatch(column: &str, expected: &'static str, found: &Value) -> Self {
        Self::TypeMismatch {
            column: column.to_string(),
            expected,
            found: found.kind_name(),
        }
    }
}
