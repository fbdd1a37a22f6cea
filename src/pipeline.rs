use crate::graph::Graph;
use crate::node::{LineParser, Node, SourceKind};
use crate::node_id::NodeId;
use crate::Row;
use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock};

/// -------- Pipeline arena --------
/// Append-only node storage shared by every [`Graph`] built from it. Nodes are
/// never modified or removed, so any `Graph` handle stays valid and can be run
/// again after further nodes are appended.
#[derive(Clone, Default)]
pub struct Pipeline {
    pub(crate) inner: Arc<RwLock<PipelineInner>>,
}

#[derive(Default)]
pub struct PipelineInner {
    pub nodes: Vec<Node>,
}

impl Pipeline {
    pub(crate) fn insert_node(&self, node: Node) -> NodeId {
        let mut g = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let id = NodeId::new(g.nodes.len());
        g.nodes.push(node);
        id
    }

    /// Clone of the node table. Nodes hold operators behind `Arc`, so this is cheap.
    pub(crate) fn snapshot(&self) -> Vec<Node> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .nodes
            .clone()
    }

    /// Number of nodes in the arena.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .nodes
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether two handles share the same arena.
    #[must_use]
    pub fn same_as(&self, other: &Pipeline) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Declare a named entry point whose rows are bound at run time.
    #[must_use]
    pub fn source(&self, name: impl Into<String>) -> Graph {
        let id = self.insert_node(Node::Source {
            name: name.into(),
            kind: SourceKind::Bound,
        });
        Graph::new(self.clone(), id)
    }

    /// Declare an entry point reading `path` line by line through `parser`.
    ///
    /// The file is opened lazily, on the first pull of each run.
    #[must_use]
    pub fn file_source<F>(&self, path: impl Into<PathBuf>, parser: F) -> Graph
    where
        F: Fn(&str) -> anyhow::Result<Row> + Send + Sync + 'static,
    {
        let path = path.into();
        let parser: LineParser = Arc::new(parser);
        let id = self.insert_node(Node::Source {
            name: path.display().to_string(),
            kind: SourceKind::File { path, parser },
        });
        Graph::new(self.clone(), id)
    }

    /// Copy the sub-DAG ending at `graph` (from another arena) into this one.
    ///
    /// Returns the id of the imported terminal node. Parents always have
    /// smaller ids than their children, so ascending id order is a valid
    /// insertion order.
    pub(crate) fn import(&self, graph: &Graph) -> NodeId {
        let nodes = graph.pipeline().snapshot();
        let reachable = reachable_from(&nodes, graph.id());
        let mut remap: HashMap<NodeId, NodeId> = HashMap::with_capacity(reachable.len());
        for old in reachable {
            let node = nodes[old.raw()].remapped(|p| remap[&p]);
            remap.insert(old, self.insert_node(node));
        }
        remap[&graph.id()]
    }
}

/// Ids of every node reachable from `terminal` through parent links, ascending.
pub(crate) fn reachable_from(nodes: &[Node], terminal: NodeId) -> BTreeSet<NodeId> {
    let mut seen = BTreeSet::new();
    let mut stack = vec![terminal];
    while let Some(id) = stack.pop() {
        if seen.insert(id) {
            stack.extend(nodes[id.raw()].parents());
        }
    }
    seen
}
