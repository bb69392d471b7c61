//! Arena-backed scene graph
//!
//! All nodes of one scene live in a single [`SlotMap`]. The root is created
//! with the graph and can never be detached or deleted. Nodes created with
//! [`SceneGraph::create_node`] start detached and only become live once they
//! are linked under something reachable from the root.

use std::collections::HashSet;

use slotmap::SlotMap;

use super::node::{Node, NodeId, NodeKey, NodeKind};

/// Structural errors, returned before any mutation happens
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SceneError {
    /// Handle refers to a disposed node
    #[error("node handle is stale")]
    StaleHandle,

    /// Linking would make a node its own ancestor
    #[error("cannot parent {node} under {parent}: {node} is an ancestor of {parent}")]
    Cycle {
        /// Node being moved
        node: NodeId,
        /// Proposed parent
        parent: NodeId,
    },

    /// Node must be detached before it can be added elsewhere
    #[error("{node} already has a parent")]
    AlreadyParented {
        /// Node being added
        node: NodeId,
    },

    /// The root cannot be detached, reparented or deleted
    #[error("operation not permitted on the scene root")]
    RootOperation,

    /// No live node carries this id
    #[error("no node with id {0}")]
    NotFound(NodeId),
}

/// Structural summary of one node, used to compare graph shapes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopologyEntry {
    /// Node id
    pub id: NodeId,
    /// Node name
    pub name: String,
    /// Parent id
    pub parent: Option<NodeId>,
    /// Child ids in order
    pub children: Vec<NodeId>,
    /// Renderable flag
    pub is_renderable: bool,
}

/// Hierarchical scene owning every node through an arena
#[derive(Debug, Clone)]
pub struct SceneGraph {
    nodes: SlotMap<NodeKey, Node>,
    root: NodeKey,
}

impl SceneGraph {
    /// Create a graph whose root is a scene node with the given name
    pub fn new(root_name: impl Into<String>) -> Self {
        Self::with_root(Node::with_kind(root_name, NodeKind::Scene))
    }

    /// Create a graph around an existing root node
    pub fn with_root(mut root: Node) -> Self {
        root.parent = None;
        root.children.clear();
        let mut nodes = SlotMap::with_key();
        let root = nodes.insert(root);
        Self { nodes, root }
    }

    /// Root handle
    pub const fn root(&self) -> NodeKey {
        self.root
    }

    /// Root node
    pub fn root_node(&self) -> &Node {
        &self.nodes[self.root]
    }

    /// Look up a node
    pub fn get(&self, key: NodeKey) -> Option<&Node> {
        self.nodes.get(key)
    }

    /// Look up a node mutably
    pub fn get_mut(&mut self, key: NodeKey) -> Option<&mut Node> {
        self.nodes.get_mut(key)
    }

    /// Look up a node, failing on stale handles
    pub fn node(&self, key: NodeKey) -> Result<&Node, SceneError> {
        self.nodes.get(key).ok_or(SceneError::StaleHandle)
    }

    /// Look up a node mutably, failing on stale handles
    pub fn node_mut(&mut self, key: NodeKey) -> Result<&mut Node, SceneError> {
        self.nodes.get_mut(key).ok_or(SceneError::StaleHandle)
    }

    /// Whether the handle still resolves
    pub fn contains(&self, key: NodeKey) -> bool {
        self.nodes.contains_key(key)
    }

    /// Store a node detached from the tree
    pub fn insert(&mut self, mut node: Node) -> NodeKey {
        node.parent = None;
        node.children.clear();
        let id = node.id();
        let key = self.nodes.insert(node);
        log::debug!("Inserted node {id}");
        key
    }

    /// Create a detached locator node
    pub fn create_node(&mut self, name: impl Into<String>) -> NodeKey {
        self.insert(Node::new(name))
    }

    /// Append `child` as the last child of `parent`
    pub fn add_child(&mut self, parent: NodeKey, child: NodeKey) -> Result<(), SceneError> {
        self.check_link(parent, child)?;
        let child_node = &self.nodes[child];
        if child_node.parent.is_some() {
            return Err(SceneError::AlreadyParented { node: child_node.id() });
        }
        self.link(parent, child);
        Ok(())
    }

    /// Unlink a node from its parent, leaving it detached
    pub fn detach(&mut self, key: NodeKey) -> Result<(), SceneError> {
        if key == self.root {
            return Err(SceneError::RootOperation);
        }
        let parent = self.node(key)?.parent;
        if let Some(parent) = parent {
            if let Some(parent_node) = self.nodes.get_mut(parent) {
                parent_node.children.retain(|&c| c != key);
            }
            self.nodes[key].parent = None;
        }
        Ok(())
    }

    /// Move `node` under `new_parent`, appending it as the last child
    ///
    /// Fully validated before anything changes, so a rejected move leaves the
    /// graph untouched.
    pub fn set_parent(&mut self, node: NodeKey, new_parent: NodeKey) -> Result<(), SceneError> {
        self.check_link(new_parent, node)?;
        self.detach(node)?;
        self.link(new_parent, node);
        Ok(())
    }

    /// Whether `ancestor` lies on the parent chain of `node`
    pub fn is_ancestor(&self, ancestor: NodeKey, node: NodeKey) -> bool {
        self.ancestors(node).any(|k| k == ancestor)
    }

    /// Parent chain of a node, nearest first
    pub fn ancestors(&self, key: NodeKey) -> impl Iterator<Item = NodeKey> + '_ {
        std::iter::successors(self.nodes.get(key).and_then(Node::parent), move |&k| {
            self.nodes.get(k).and_then(Node::parent)
        })
    }

    /// Dispose a single node
    ///
    /// Its children are not promoted: they keep existing in the arena with
    /// no parent and are no longer reachable from the root.
    pub fn delete_node(&mut self, key: NodeKey) -> Result<NodeId, SceneError> {
        if key == self.root {
            return Err(SceneError::RootOperation);
        }
        self.detach(key)?;
        let node = self.nodes.remove(key).ok_or(SceneError::StaleHandle)?;
        for &child in &node.children {
            if let Some(child) = self.nodes.get_mut(child) {
                child.parent = None;
            }
        }
        if !node.children.is_empty() {
            log::debug!("Deleting {} orphaned {} children", node.id(), node.children.len());
        }
        log::info!("Deleted node {} '{}'", node.id(), node.name());
        Ok(node.id())
    }

    /// Dispose a node and all of its descendants, children before parents
    ///
    /// Returns the disposed ids in disposal order.
    pub fn delete_subtree(&mut self, key: NodeKey) -> Result<Vec<NodeId>, SceneError> {
        if key == self.root {
            return Err(SceneError::RootOperation);
        }
        let parent = self.node(key)?.parent;

        let mut disposed = Vec::new();
        for k in self.post_order(key) {
            if let Some(node) = self.nodes.remove(k) {
                disposed.push(node.id());
            }
        }
        if let Some(parent) = parent.and_then(|p| self.nodes.get_mut(p)) {
            parent.children.retain(|&c| c != key);
        }

        log::info!("Deleted subtree of {} nodes", disposed.len());
        Ok(disposed)
    }

    /// Set the renderable flag on a node and every descendant
    ///
    /// Returns how many nodes were written.
    pub fn set_renderable_recursive(&mut self, key: NodeKey, flag: bool) -> Result<usize, SceneError> {
        self.node(key)?;
        let keys: Vec<_> = self.depth_first(key).collect();
        for &k in &keys {
            self.nodes[k].is_renderable = flag;
        }
        Ok(keys.len())
    }

    /// Depth-first search below `from` (inclusive) for a node id
    pub fn find_by_id(&self, from: NodeKey, id: NodeId) -> Option<NodeKey> {
        self.depth_first(from).find(|&k| self.nodes[k].id() == id)
    }

    /// Depth-first search below `from` (inclusive) for a node name
    pub fn find_by_name(&self, from: NodeKey, name: &str) -> Option<NodeKey> {
        self.depth_first(from).find(|&k| self.nodes[k].name() == name)
    }

    /// Pre-order traversal starting at `from`
    pub fn depth_first(&self, from: NodeKey) -> DepthFirst<'_> {
        let stack = if self.nodes.contains_key(from) { vec![from] } else { Vec::new() };
        DepthFirst { graph: self, stack }
    }

    /// Rename a node
    pub fn rename(&mut self, key: NodeKey, name: impl Into<String>) -> Result<(), SceneError> {
        self.node_mut(key)?.set_name(name);
        Ok(())
    }

    /// Number of nodes in the arena, detached ones included
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of live nodes, reachable from the root
    pub fn reachable_count(&self) -> usize {
        self.depth_first(self.root).count()
    }

    /// Dispose every node that is not reachable from the root
    pub fn purge_detached(&mut self) -> Vec<NodeId> {
        let live: HashSet<NodeKey> = self.depth_first(self.root).collect();
        let mut purged = Vec::new();
        self.nodes.retain(|key, node| {
            let keep = live.contains(&key);
            if !keep {
                purged.push(node.id());
            }
            keep
        });
        if !purged.is_empty() {
            log::debug!("Purged {} detached nodes", purged.len());
        }
        purged
    }

    /// Every node in the arena, in no particular order
    pub fn iter(&self) -> impl Iterator<Item = (NodeKey, &Node)> {
        self.nodes.iter()
    }

    /// Structural summary of all nodes sorted by id
    pub fn topology_snapshot(&self) -> Vec<TopologyEntry> {
        let id_of = |k: &NodeKey| self.nodes.get(*k).map(Node::id);
        let mut entries: Vec<_> = self
            .nodes
            .values()
            .map(|node| TopologyEntry {
                id: node.id(),
                name: node.name().to_string(),
                parent: node.parent.as_ref().and_then(id_of),
                children: node.children.iter().filter_map(id_of).collect(),
                is_renderable: node.is_renderable,
            })
            .collect();
        entries.sort_by_key(|entry| entry.id);
        entries
    }

    fn check_link(&self, parent: NodeKey, child: NodeKey) -> Result<(), SceneError> {
        let parent_node = self.node(parent)?;
        let child_node = self.node(child)?;
        if child == self.root {
            return Err(SceneError::RootOperation);
        }
        if child == parent || self.is_ancestor(child, parent) {
            return Err(SceneError::Cycle {
                node: child_node.id(),
                parent: parent_node.id(),
            });
        }
        Ok(())
    }

    fn link(&mut self, parent: NodeKey, child: NodeKey) {
        self.nodes[parent].children.push(child);
        self.nodes[child].parent = Some(parent);
    }

    fn post_order(&self, key: NodeKey) -> Vec<NodeKey> {
        let mut pending = vec![key];
        let mut visited = Vec::new();
        while let Some(k) = pending.pop() {
            if let Some(node) = self.nodes.get(k) {
                visited.push(k);
                pending.extend(node.children.iter().copied());
            }
        }
        // reversed pre-order with children pushed left to right puts every
        // child before its parent and keeps siblings left to right
        visited.reverse();
        visited
    }
}

/// Pre-order iterator over a subtree
pub struct DepthFirst<'a> {
    graph: &'a SceneGraph,
    stack: Vec<NodeKey>,
}

impl Iterator for DepthFirst<'_> {
    type Item = NodeKey;

    fn next(&mut self) -> Option<NodeKey> {
        while let Some(key) = self.stack.pop() {
            if let Some(node) = self.graph.nodes.get(key) {
                self.stack.extend(node.children.iter().rev().copied());
                return Some(key);
            }
        }
        None
    }
}
