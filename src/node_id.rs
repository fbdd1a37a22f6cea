//! Stable handle for a node in a [`Pipeline`](crate::pipeline::Pipeline) arena.
//!
//! Node ids are arena indices. The arena is append-only, so an id stays valid
//! for as long as its pipeline lives and always refers to the same node.

use std::fmt::{Display, Formatter, Result as FormatResult};

/// Index of a node in its pipeline arena.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct NodeId(usize);

impl NodeId {
    pub(crate) fn new(v: usize) -> Self {
        Self(v)
    }

    /// Return the underlying arena index.
    #[must_use]
    pub fn raw(&self) -> usize {
        self.0
    }
}

impl Display for NodeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> FormatResult {
        write!(f, "#{}", self.0)
    }
}
