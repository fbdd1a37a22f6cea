//! Graph execution.
//!
//! [`Runner::run`] turns the DAG ending at a [`Graph`] into one lazy pull
//! stream. Each node becomes an iterator over its parents' iterators; nothing
//! is read from any source until the returned stream is pulled. A node that
//! is reachable along several paths is instantiated once per path, so every
//! consumer sees the full stream and no output is buffered for sharing.
//!
//! Sources are bound per run through [`Bindings`]: a name maps to a factory
//! that opens a fresh row stream each time it is called.

use crate::error::{PipelineError, Result};
use crate::graph::Graph;
use crate::group::{GroupedInput, batches, fold_stream, join_stream, reduce_stream};
use crate::io::compression::open_reader;
use crate::metrics::ExecutionMetrics;
use crate::node::{LineParser, Node, SourceKind};
use crate::operators::Rows;
use crate::sort::{SortConfig, external_sort};
use crate::{NodeId, Row};
use std::collections::HashMap;
use std::fmt;
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

type SourceFactory = Arc<dyn Fn() -> Rows + Send + Sync>;

/// Run-time bindings from source names to row factories.
#[derive(Clone, Default)]
pub struct Bindings {
    sources: HashMap<String, SourceFactory>,
}

impl Bindings {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name` to a factory of infallible rows.
    ///
    /// The factory is called once per source reference per run, on first pull.
    #[must_use]
    pub fn bind<F, I>(mut self, name: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> I + Send + Sync + 'static,
        I: IntoIterator<Item = Row>,
        I::IntoIter: 'static,
    {
        let factory: SourceFactory = Arc::new(move || Box::new(factory().into_iter().map(Ok)) as Rows);
        self.sources.insert(name.into(), factory);
        self
    }

    /// Bind `name` to a factory whose stream may report errors in place of rows.
    #[must_use]
    pub fn bind_fallible<F, I>(mut self, name: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> I + Send + Sync + 'static,
        I: IntoIterator<Item = Result<Row>>,
        I::IntoIter: 'static,
    {
        let factory: SourceFactory = Arc::new(move || Box::new(factory().into_iter()) as Rows);
        self.sources.insert(name.into(), factory);
        self
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.sources.contains_key(name)
    }

    /// Bound names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.sources.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    fn factory(&self, name: &str) -> Result<SourceFactory> {
        self.sources
            .get(name)
            .cloned()
            .ok_or_else(|| PipelineError::UnboundSource {
                name: name.to_string(),
            })
    }
}

impl fmt::Debug for Bindings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bindings")
            .field("sources", &self.names())
            .finish()
    }
}

/// Execution settings shared by every node of a run.
#[derive(Clone, Debug)]
pub struct RunConfig {
    pub sort: SortConfig,
    /// Verify that reduce and join inputs arrive in key order.
    pub check_sorted: bool,
    pub metrics: ExecutionMetrics,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            sort: SortConfig::default(),
            check_sorted: true,
            metrics: ExecutionMetrics::default(),
        }
    }
}

impl RunConfig {
    #[must_use]
    pub fn with_sort(mut self, sort: SortConfig) -> Self {
        self.sort = sort;
        self
    }

    #[must_use]
    pub fn with_check_sorted(mut self, check: bool) -> Self {
        self.check_sorted = check;
        self
    }

    #[must_use]
    pub fn with_metrics(mut self, metrics: ExecutionMetrics) -> Self {
        self.metrics = metrics;
        self
    }
}

/// Executes graphs with a fixed [`RunConfig`].
#[derive(Clone, Debug, Default)]
pub struct Runner {
    config: RunConfig,
}

impl Runner {
    #[must_use]
    pub fn new(config: RunConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Execute the graph, returning its lazy output stream.
    ///
    /// Runs are independent: the same graph can be executed any number of
    /// times, sequentially or concurrently, with the same or different bindings.
    ///
    /// # Errors
    /// `UnboundSource` if a source the graph reads has no binding. Every other
    /// failure is yielded by the stream where it happens, after which the
    /// stream ends.
    pub fn run(&self, graph: &Graph, bindings: &Bindings) -> Result<Rows> {
        let names = graph.source_names();
        if let Some(missing) = names.iter().find(|name| !bindings.contains(name)) {
            return Err(PipelineError::UnboundSource {
                name: missing.clone(),
            });
        }
        debug!(terminal = %graph.id(), sources = ?names, "starting run");
        let nodes = graph.pipeline().snapshot();
        self.instantiate(&nodes, graph.id(), bindings)
    }

    fn instantiate(&self, nodes: &[Node], id: NodeId, bindings: &Bindings) -> Result<Rows> {
        let metrics = self.config.metrics.clone();
        Ok(match &nodes[id.raw()] {
            Node::Source {
                name,
                kind: SourceKind::Bound,
            } => {
                let factory = bindings.factory(name)?;
                deferred(move || {
                    Box::new(factory().inspect(move |row| {
                        if row.is_ok() {
                            metrics.record_source_row();
                        }
                    })) as Rows
                })
            }
            Node::Source {
                name,
                kind: SourceKind::File { path, parser },
            } => {
                let (name, path, parser) = (name.clone(), path.clone(), Arc::clone(parser));
                deferred(move || file_rows(name, path, parser, metrics))
            }
            Node::Map { parent, mapper } => {
                let mut input = self.instantiate(nodes, *parent, bindings)?;
                let mapper = Arc::clone(mapper);
                batches(move || match input.next() {
                    Some(row) => mapper.map(row?).map(Some),
                    None => Ok(None),
                })
            }
            Node::Sort { parent, keys } => external_sort(
                self.instantiate(nodes, *parent, bindings)?,
                Arc::clone(keys),
                self.config.sort.clone(),
                metrics,
            ),
            Node::Reduce {
                parent,
                keys,
                reducer,
            } => reduce_stream(
                self.grouped(nodes, *parent, keys, bindings)?,
                Arc::clone(reducer),
                metrics,
            ),
            Node::Fold {
                parent,
                folder,
                initial,
            } => fold_stream(
                self.instantiate(nodes, *parent, bindings)?,
                Arc::clone(folder),
                initial.clone(),
                metrics,
            ),
            Node::Join {
                left,
                right,
                keys,
                joiner,
            } => join_stream(
                self.grouped(nodes, *left, keys, bindings)?,
                self.grouped(nodes, *right, keys, bindings)?,
                Arc::clone(joiner),
                metrics,
            ),
        })
    }

    fn grouped(
        &self,
        nodes: &[Node],
        id: NodeId,
        keys: &Arc<[String]>,
        bindings: &Bindings,
    ) -> Result<GroupedInput> {
        Ok(GroupedInput::new(
            self.instantiate(nodes, id, bindings)?,
            Arc::clone(keys),
            self.config.check_sorted,
        ))
    }
}

/// Stream that calls `open` on its first pull.
fn deferred(open: impl FnOnce() -> Rows + 'static) -> Rows {
    let mut open = Some(open);
    let mut rows: Option<Rows> = None;
    Box::new(std::iter::from_fn(move || {
        if let Some(open) = open.take() {
            rows = Some(open());
        }
        rows.as_mut()?.next()
    }))
}

struct FileRows {
    name: String,
    path: PathBuf,
    reader: Box<dyn BufRead>,
    parser: LineParser,
    metrics: ExecutionMetrics,
    line_no: usize,
    line: String,
    done: bool,
}

fn file_rows(name: String, path: PathBuf, parser: LineParser, metrics: ExecutionMetrics) -> Rows {
    match open_reader(&path) {
        Ok(reader) => {
            debug!(path = %path.display(), "opened file source");
            Box::new(FileRows {
                name,
                path,
                reader,
                parser,
                metrics,
                line_no: 0,
                line: String::new(),
                done: false,
            })
        }
        Err(source) => Box::new(std::iter::once(Err(PipelineError::SourceIo { path, source }))),
    }
}

impl Iterator for FileRows {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            self.line.clear();
            match self.reader.read_line(&mut self.line) {
                Ok(0) => self.done = true,
                Ok(_) => {
                    self.line_no += 1;
                    let line = self.line.trim_end_matches(['\n', '\r']);
                    if line.trim().is_empty() {
                        continue;
                    }
                    return Some(match (self.parser)(line) {
                        Ok(row) => {
                            self.metrics.record_source_row();
                            Ok(row)
                        }
                        Err(source) => {
                            self.done = true;
                            Err(PipelineError::MalformedInput {
                                source_name: self.name.clone(),
                                line: self.line_no,
                                source,
                            })
                        }
                    });
                }
                Err(source) => {
                    self.done = true;
                    return Some(Err(PipelineError::SourceIo {
                        path: self.path.clone(),
                        source,
                    }));
                }
            }
        }
        None
    }
}
