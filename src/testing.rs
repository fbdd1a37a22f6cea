//! Testing utilities for boundflow graphs.
//!
//! - **Assertions**: compare run output with expected rows, with or without
//!   regard to order, and check sortedness.
//! - **Instrumented sources**: [`CountingSource`] records how often it is
//!   opened and how many rows were pulled, for laziness and bounded-memory
//!   checks.
//! - **Fixtures**: small datasets used across the test suite.
//!
//! # Quick Start
//!
//! ```
//! use boundflow::*;
//! use boundflow::ops::Count;
//! use boundflow::testing::*;
//!
//! # fn main() -> anyhow::Result<()> {
//! let source = CountingSource::new(join_left());
//! let graph = graph_from_iter("rows").reduce(Count::new("n"), NO_KEYS);
//! let out = graph.collect(&source.bind_to(Bindings::new(), "rows"))?;
//!
//! assert_rows_equal(&out, &[row! { "n" => 3 }]);
//! assert_eq!(source.pulled(), 3);
//! # Ok(())
//! # }
//! ```

pub mod assertions;
pub mod fixtures;
pub mod instrument;

pub use assertions::*;
pub use fixtures::*;
pub use instrument::*;
