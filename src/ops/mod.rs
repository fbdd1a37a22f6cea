//! Built-in operators.
//!
//! - Mappers: [`Identity`], [`FilterPunctuation`], [`LowerCase`], [`Split`],
//!   [`Filter`], [`Project`], [`Product`], [`Divide`], [`Idf`], [`Pmi`].
//! - Road-traffic mappers: [`SphericalLength`], [`WeekdayHour`], [`TimeDiff`],
//!   [`TravelTime`], [`Speed`].
//! - Reducers: [`First`], [`Count`], [`RepeatCount`], [`Sum`], [`MultiSum`],
//!   [`Mean`], [`TopN`], [`TermFrequency`].
//! - Folders: [`SumFolder`].
//! - Joiners: [`InnerJoiner`], [`LeftJoiner`], [`RightJoiner`], [`OuterJoiner`].
//!
//! Column names are fixed at construction. A row lacking a column an
//! operator reads fails with `MissingColumn`; a value of the wrong kind fails
//! with `TypeMismatch`.
//!
//! # Examples
//! ```
//! use boundflow::*;
//! use boundflow::ops::{Product, Project, Sum};
//!
//! let totals = graph_from_iter("orders")
//!     .map(Product::new(["qty", "price"], "amount"))
//!     .map(Project::new(["customer", "amount"]))
//!     .sort(["customer"])
//!     .reduce(Sum::new("amount"), ["customer"]);
//!
//! let orders = vec![
//!     row! { "customer" => "b", "qty" => 2, "price" => 5 },
//!     row! { "customer" => "a", "qty" => 1, "price" => 7 },
//!     row! { "customer" => "b", "qty" => 1, "price" => 1 },
//! ];
//! let out = totals.collect(&Bindings::new().bind("orders", move || orders.clone()))?;
//! assert_eq!(
//!     out,
//!     vec![
//!         row! { "customer" => "a", "amount" => 7 },
//!         row! { "customer" => "b", "amount" => 11 },
//!     ]
//! );
//! # Ok::<(), boundflow::PipelineError>(())
//! ```

mod folders;
mod joiners;
mod mappers;
mod reducers;
mod roads;

pub use folders::*;
pub use joiners::*;
pub use mappers::*;
pub use reducers::*;
pub use roads::*;
