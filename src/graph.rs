//! Fluent graph construction.
//!
//! A [`Graph`] is a handle to one node of a [`Pipeline`] arena; the DAG it
//! describes is everything reachable through parent links. Each builder
//! method appends a node and returns a **new** handle, leaving the receiver
//! untouched, so a graph can be branched, reused and executed repeatedly:
//!
//! ```
//! use boundflow::*;
//! use boundflow::ops::{Count, LowerCase, Split};
//!
//! let words = graph_from_iter("docs")
//!     .map(LowerCase::new("text"))
//!     .map(Split::whitespace("text"));
//!
//! let counts = words
//!     .sort(["text"])
//!     .reduce(Count::new("count"), ["text"])
//!     .sort(["count", "text"]);
//!
//! let docs = vec![row! { "text" => "b a B" }];
//! let out = counts.collect(&Bindings::new().bind("docs", move || docs.clone()))?;
//! assert_eq!(out, vec![row! { "text" => "a", "count" => 1 }, row! { "text" => "b", "count" => 2 }]);
//! # Ok::<(), boundflow::PipelineError>(())
//! ```
//!
//! Reduce and join nodes do **not** sort their inputs: insert a `sort` on the
//! same keys upstream. The runner's sortedness check (on by default) reports
//! out-of-order input instead of silently mis-grouping.

use crate::error::Result;
use crate::node::{Node, SourceKind};
use crate::operators::{Folder, Joiner, Mapper, Reducer, Rows};
use crate::pipeline::{Pipeline, reachable_from};
use crate::runner::{Bindings, Runner};
use crate::{NodeId, Row};
use std::fmt::{Display, Formatter, Result as FormatResult};
use std::path::PathBuf;
use std::sync::Arc;

/// Empty key list: the whole stream forms one group (reduce) or one key (join).
pub const NO_KEYS: [&str; 0] = [];

/// Handle to the terminal node of a computation graph.
#[derive(Clone)]
pub struct Graph {
    pipeline: Pipeline,
    id: NodeId,
}

/// Start a graph (in a fresh arena) at a source bound by name at run time.
#[must_use]
pub fn graph_from_iter(name: impl Into<String>) -> Graph {
    Pipeline::default().source(name)
}

/// Start a graph (in a fresh arena) at a line-oriented file parsed row by row.
#[must_use]
pub fn graph_from_file<F>(path: impl Into<PathBuf>, parser: F) -> Graph
where
    F: Fn(&str) -> anyhow::Result<Row> + Send + Sync + 'static,
{
    Pipeline::default().file_source(path, parser)
}

fn key_list<I>(keys: I) -> Arc<[String]>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    keys.into_iter().map(|k| k.as_ref().to_string()).collect()
}

impl Graph {
    pub(crate) fn new(pipeline: Pipeline, id: NodeId) -> Self {
        Self { pipeline, id }
    }

    #[must_use]
    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    #[must_use]
    pub fn id(&self) -> NodeId {
        self.id
    }

    fn push(&self, node: Node) -> Graph {
        Graph::new(self.pipeline.clone(), self.pipeline.insert_node(node))
    }

    /// Apply `mapper` to every row.
    #[must_use]
    pub fn map(&self, mapper: impl Mapper + 'static) -> Graph {
        self.push(Node::Map {
            parent: self.id,
            mapper: Arc::new(mapper),
        })
    }

    /// Sort ascending by `keys` with the external sort engine.
    ///
    /// An empty key list keeps the input order.
    #[must_use]
    pub fn sort<I>(&self, keys: I) -> Graph
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        self.push(Node::Sort {
            parent: self.id,
            keys: key_list(keys),
        })
    }

    /// Reduce each run of rows sharing `keys`. Input must be sorted by `keys`.
    #[must_use]
    pub fn reduce<I>(&self, reducer: impl Reducer + 'static, keys: I) -> Graph
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        self.push(Node::Reduce {
            parent: self.id,
            keys: key_list(keys),
            reducer: Arc::new(reducer),
        })
    }

    /// Fold the whole stream into one row, starting from `initial`.
    #[must_use]
    pub fn fold(&self, folder: impl Folder + 'static, initial: Row) -> Graph {
        self.push(Node::Fold {
            parent: self.id,
            folder: Arc::new(folder),
            initial,
        })
    }

    /// Sort-merge join with `other` on `keys`. Both inputs must be sorted by `keys`.
    ///
    /// This graph is the streamed left side; `other` is the right side, whose
    /// per-key groups are held in memory one at a time.
    /// `other` may come from a different pipeline; its nodes are then copied
    /// into this graph's arena.
    #[must_use]
    pub fn join<I>(&self, joiner: impl Joiner + 'static, other: &Graph, keys: I) -> Graph
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let right = if self.pipeline.same_as(&other.pipeline) {
            other.id
        } else {
            self.pipeline.import(other)
        };
        self.push(Node::Join {
            left: self.id,
            right,
            keys: key_list(keys),
            joiner: Arc::new(joiner),
        })
    }

    /// Names of the sources a run must bind, in declaration order.
    #[must_use]
    pub fn source_names(&self) -> Vec<String> {
        let nodes = self.pipeline.snapshot();
        let mut names: Vec<String> = Vec::new();
        for id in reachable_from(&nodes, self.id) {
            if let Node::Source {
                name,
                kind: SourceKind::Bound,
            } = &nodes[id.raw()]
                && !names.contains(name)
            {
                names.push(name.clone());
            }
        }
        names
    }

    /// Render the DAG rooted at this node as an indented tree.
    #[must_use]
    pub fn explain(&self) -> String {
        let nodes = self.pipeline.snapshot();
        Explain {
            nodes: &nodes,
            root: self.id,
        }
        .to_string()
    }

    /// Execute with the default [`Runner`].
    ///
    /// # Errors
    /// `UnboundSource` if a referenced source has no binding. Everything else
    /// is reported through the returned stream.
    pub fn run(&self, bindings: &Bindings) -> Result<Rows> {
        Runner::default().run(self, bindings)
    }

    /// Execute with the default [`Runner`] and gather every row.
    ///
    /// # Errors
    /// The first error the run produces.
    pub fn collect(&self, bindings: &Bindings) -> Result<Vec<Row>> {
        self.run(bindings)?.collect()
    }
}

struct Explain<'a> {
    nodes: &'a [Node],
    root: NodeId,
}

impl Display for Explain<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> FormatResult {
        write_tree(f, self.nodes, self.root, "", "")
    }
}

fn write_tree(
    f: &mut Formatter<'_>,
    nodes: &[Node],
    id: NodeId,
    lead: &str,
    indent: &str,
) -> FormatResult {
    let node = &nodes[id.raw()];
    writeln!(f, "{lead}{} {id}", node.describe())?;
    let parents = node.parents();
    for (i, parent) in parents.iter().enumerate() {
        let last = i + 1 == parents.len();
        let (branch, next) = if last { ("└─ ", "   ") } else { ("├─ ", "│  ") };
        write_tree(
            f,
            nodes,
            *parent,
            &format!("{indent}{branch}"),
            &format!("{indent}{next}"),
        )?;
    }
    Ok(())
}
