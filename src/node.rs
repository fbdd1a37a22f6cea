use crate::operators::{Folder, Joiner, Mapper, Reducer};
use crate::{NodeId, Row};
use std::path::PathBuf;
use std::sync::Arc;

/// Parser turning one line of a file source into a row.
pub type LineParser = Arc<dyn Fn(&str) -> anyhow::Result<Row> + Send + Sync>;

/// Where a source node gets its rows from.
#[derive(Clone)]
pub enum SourceKind {
    /// Rows come from the factory bound to the source name at run time.
    Bound,
    /// Rows come from a line-oriented file, one parsed row per non-blank line.
    File { path: PathBuf, parser: LineParser },
}

/// One operator in the DAG. Parents are referenced by [`NodeId`] in the same arena.
#[derive(Clone)]
pub enum Node {
    Source {
        name: String,
        kind: SourceKind,
    },
    Map {
        parent: NodeId,
        mapper: Arc<dyn Mapper>,
    },
    /// External sort by `keys`, ascending.
    Sort {
        parent: NodeId,
        keys: Arc<[String]>,
    },
    /// Grouped reduce; input must already be sorted by `keys`.
    Reduce {
        parent: NodeId,
        keys: Arc<[String]>,
        reducer: Arc<dyn Reducer>,
    },
    Fold {
        parent: NodeId,
        folder: Arc<dyn Folder>,
        initial: Row,
    },
    /// Sort-merge join; both inputs must already be sorted by `keys`.
    Join {
        left: NodeId,
        right: NodeId,
        keys: Arc<[String]>,
        joiner: Arc<dyn Joiner>,
    },
}

impl Node {
    /// Parent ids in input order (left before right for joins).
    #[must_use]
    pub fn parents(&self) -> Vec<NodeId> {
        match self {
            Self::Source { .. } => Vec::new(),
            Self::Map { parent, .. }
            | Self::Sort { parent, .. }
            | Self::Reduce { parent, .. }
            | Self::Fold { parent, .. } => vec![*parent],
            Self::Join { left, right, .. } => vec![*left, *right],
        }
    }

    /// Copy of this node with parent ids rewritten through `remap`.
    pub(crate) fn remapped(&self, remap: impl Fn(NodeId) -> NodeId) -> Self {
        let mut node = self.clone();
        match &mut node {
            Self::Source { .. } => {}
            Self::Map { parent, .. }
            | Self::Sort { parent, .. }
            | Self::Reduce { parent, .. }
            | Self::Fold { parent, .. } => *parent = remap(*parent),
            Self::Join { left, right, .. } => {
                *left = remap(*left);
                *right = remap(*right);
            }
        }
        node
    }

    /// One-line description used by [`Graph::explain`](crate::Graph::explain).
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Source {
                name,
                kind: SourceKind::Bound,
            } => format!("Source({name})"),
            Self::Source {
                kind: SourceKind::File { path, .. },
                ..
            } => format!("FileSource({})", path.display()),
            Self::Map { mapper, .. } => format!("Map({})", mapper.label()),
            Self::Sort { keys, .. } => format!("Sort{keys:?}"),
            Self::Reduce { keys, reducer, .. } => format!("Reduce({}, {keys:?})", reducer.label()),
            Self::Fold { folder, .. } => format!("Fold({})", folder.label()),
            Self::Join { keys, joiner, .. } => format!(
                "Join({}, {:?}, {keys:?})",
                joiner.label(),
                joiner.mode()
            ),
        }
    }
}
