//! # Boundflow
//!
//! Bounded-memory **computation graphs** over tabular row streams.
//!
//! A graph is composed once from a handful of primitives and can then be run
//! any number of times against named, lazily produced row streams. No
//! operator holds the whole table in memory: sorting spills to temporary
//! files and merges them back, and grouped operators stream one key at a time.
//!
//! ## Quick Start
//!
//! ```
//! use boundflow::*;
//! use boundflow::ops::{Count, FilterPunctuation, LowerCase, Split};
//!
//! # fn main() -> anyhow::Result<()> {
//! let counts = graph_from_iter("docs")
//!     .map(FilterPunctuation::new("text"))
//!     .map(LowerCase::new("text"))
//!     .map(Split::whitespace("text"))
//!     .sort(["text"])
//!     .reduce(Count::new("count"), ["text"])
//!     .sort(["count", "text"]);
//!
//! let bindings = Bindings::new().bind("docs", || {
//!     vec![row! { "text" => "Hello, world!" }, row! { "text" => "hello" }]
//! });
//! let out = counts.collect(&bindings)?;
//!
//! assert_eq!(
//!     out,
//!     vec![
//!         row! { "text" => "world", "count" => 1 },
//!         row! { "text" => "hello", "count" => 2 },
//!     ]
//! );
//! # Ok(())
//! # }
//! ```
//!
//! ## Core Concepts
//!
//! ### Rows and values
//!
//! A [`Row`] maps column names to [`Value`]s. Values carry a total order
//! (see [`value`]) so that rows with heterogeneous columns can still be
//! sorted, grouped and joined.
//!
//! ### Graphs
//!
//! A [`Graph`] is a handle to the terminal node of a DAG stored in a
//! [`Pipeline`] arena. Builders never modify existing nodes:
//!
//! - [`map`](Graph::map) applies a [`Mapper`] to every row
//! - [`sort`](Graph::sort) sorts by key columns with the external sort engine
//! - [`reduce`](Graph::reduce) hands each run of equal keys to a [`Reducer`]
//! - [`fold`](Graph::fold) accumulates the whole stream into one row with a [`Folder`]
//! - [`join`](Graph::join) merges two sorted streams key by key with a [`Joiner`]
//!
//! Reduce and join expect input sorted by their keys. The [`Runner`] checks
//! this by default and reports [`PipelineError::UnsortedInput`].
//!
//! ### Running
//!
//! [`Bindings`] map each source name to a factory producing a fresh row
//! stream. [`Runner::run`] (or [`Graph::run`]) returns a lazy stream: nothing
//! is read until it is pulled, and dropping it releases every temporary file.
//!
//! ## Modules
//!
//! - [`ops`]: ready-made mappers, reducers, folders and joiners
//! - [`algorithms`]: word count, tf-idf, PMI and road speed graphs
//! - [`io`]: JSON-lines rows with transparent compression
//! - [`testing`]: assertions, instrumented sources and fixtures

pub mod algorithms;
pub mod error;
pub mod graph;
pub mod group;
pub mod io;
pub mod metrics;
pub mod node;
pub mod node_id;
pub mod operators;
pub mod ops;
pub mod pipeline;
pub mod row;
pub mod runner;
pub mod sort;
pub mod testing;
pub mod value;

// Re-exports for ergonomic access
pub use error::{PipelineError, Result};
pub use graph::{Graph, NO_KEYS, graph_from_file, graph_from_iter};
pub use group::{Group, LeftGroup};
pub use metrics::{ExecutionMetrics, MetricsSnapshot};
pub use node_id::NodeId;
pub use operators::{Folder, JoinMode, Joiner, Mapper, Reducer, Rows, no_rows, once_row, rows_from};
pub use pipeline::Pipeline;
pub use row::{GroupKey, Key, Row};
pub use runner::{Bindings, RunConfig, Runner};
pub use sort::SortConfig;
pub use value::Value;

#[cfg(feature = "io-jsonl")]
pub use io::jsonl::{jsonl_source, parse_json_row, read_jsonl, write_jsonl};
