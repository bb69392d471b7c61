//! Scene persistence
//!
//! Scenes are written as a flat [`SceneDocument`] rather than as the arena
//! itself: handles and ids only mean something inside one process, so a
//! loaded scene always gets fresh ones. Nodes are listed in pre-order and
//! point at their parent by index, which keeps files of deep hierarchies
//! as shallow as those of wide ones. Expansion state is not stored.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::foundation::math::Transform;
use crate::scene::{Component, Node, NodeKey, NodeKind, SceneGraph, TransformComponent};

/// Persistence errors
#[derive(thiserror::Error, Debug)]
pub enum PersistenceError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Document root is not a scene node
    #[error("document has no scene root")]
    MissingRoot,

    /// A node points at a parent that is not listed before it
    #[error("node {index} has invalid parent {parent:?}")]
    BadParent {
        /// Position of the offending node
        index: usize,
        /// Parent index it carries
        parent: Option<usize>,
    },
}

/// Reads and writes scene files
pub trait SceneSerializer: Send + Sync {
    /// Read a scene
    fn load(&self, path: &Path) -> Result<SceneGraph, PersistenceError>;

    /// Write a scene snapshot
    fn save(&self, document: &SceneDocument, path: &Path) -> Result<(), PersistenceError>;
}

/// One node of a document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDocument {
    /// Index of the parent in [`SceneDocument::nodes`], `None` for the root
    #[serde(default)]
    pub parent: Option<usize>,
    /// Display name
    pub name: String,
    /// Node kind
    pub kind: NodeKind,
    /// Local transform
    pub transform: Transform,
    /// Renderable flag
    #[serde(default = "default_renderable")]
    pub is_renderable: bool,
    /// Attached components
    #[serde(default)]
    pub components: Vec<Component>,
}

const fn default_renderable() -> bool {
    true
}

/// Serializable snapshot of the live part of a scene
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneDocument {
    /// Nodes in pre-order; the first one is the root
    pub nodes: Vec<NodeDocument>,
}

impl SceneDocument {
    /// Snapshot every node reachable from the root
    pub fn capture(graph: &SceneGraph) -> Self {
        let mut nodes = Vec::with_capacity(graph.node_count());
        let mut stack: Vec<(NodeKey, Option<usize>)> = vec![(graph.root(), None)];
        while let Some((key, parent)) = stack.pop() {
            let Some(node) = graph.get(key) else {
                continue;
            };
            let index = nodes.len();
            nodes.push(capture_node(node, parent));
            stack.extend(node.children().iter().rev().map(|&child| (child, Some(index))));
        }
        Self { nodes }
    }

    /// Number of nodes in the document
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Build a new graph with freshly allocated ids
    pub fn build(&self) -> Result<SceneGraph, PersistenceError> {
        let Some((root, rest)) = self.nodes.split_first() else {
            return Err(PersistenceError::MissingRoot);
        };
        if root.kind != NodeKind::Scene || root.parent.is_some() {
            return Err(PersistenceError::MissingRoot);
        }

        let mut graph = SceneGraph::with_root(make_node(root));
        let mut keys = Vec::with_capacity(self.nodes.len());
        keys.push(graph.root());
        for (offset, document) in rest.iter().enumerate() {
            let index = offset + 1;
            let parent = document
                .parent
                .filter(|&parent| parent < index)
                .map(|parent| keys[parent])
                .ok_or(PersistenceError::BadParent { index, parent: document.parent })?;
            let child = graph.insert(make_node(document));
            graph
                .add_child(parent, child)
                .map_err(|e| PersistenceError::Parse(e.to_string()))?;
            keys.push(child);
        }
        Ok(graph)
    }
}

fn capture_node(node: &Node, parent: Option<usize>) -> NodeDocument {
    NodeDocument {
        parent,
        name: node.name().to_string(),
        kind: node.kind(),
        transform: node.transform.local().clone(),
        is_renderable: node.is_renderable(),
        components: node.components().to_vec(),
    }
}

fn make_node(document: &NodeDocument) -> Node {
    let mut node = Node::with_kind(document.name.clone(), document.kind);
    node.transform = TransformComponent::new(document.transform.clone());
    node.is_renderable = document.is_renderable;
    for component in &document.components {
        node.add_component(component.clone());
    }
    node
}

/// RON scene files
#[derive(Debug, Clone, Default)]
pub struct RonSceneSerializer {
    pretty: ron::ser::PrettyConfig,
}

impl RonSceneSerializer {
    /// Pretty-printing serializer
    pub fn new() -> Self {
        Self::default()
    }
}

impl SceneSerializer for RonSceneSerializer {
    fn load(&self, path: &Path) -> Result<SceneGraph, PersistenceError> {
        let contents = std::fs::read_to_string(path)?;
        let document: SceneDocument =
            ron::from_str(&contents).map_err(|e| PersistenceError::Parse(e.to_string()))?;
        let graph = document.build()?;
        log::info!("Loaded {} nodes from {}", graph.node_count(), path.display());
        Ok(graph)
    }

    fn save(&self, document: &SceneDocument, path: &Path) -> Result<(), PersistenceError> {
        let contents = ron::ser::to_string_pretty(document, self.pretty.clone())
            .map_err(|e| PersistenceError::Serialize(e.to_string()))?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, contents)?;
        log::info!("Saved {} nodes to {}", document.node_count(), path.display());
        Ok(())
    }
}
