//! Scene graph node

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use super::components::{Component, LightComponent, MeshComponent, Primitive};
use super::transform::TransformComponent;

slotmap::new_key_type! {
    /// Arena handle for a node inside one [`SceneGraph`](super::SceneGraph)
    ///
    /// Handles are versioned: once a node is disposed, its handle never
    /// resolves again, even if the slot is reused.
    pub struct NodeKey;
}

static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique node identity
///
/// Unlike [`NodeKey`], an id is meaningful outside a particular arena and is
/// what crosses the UI boundary (drag payloads, inspector labels). Ids are
/// never reused within a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    fn next() -> Self {
        Self(NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw integer value
    pub const fn raw(self) -> u64 {
        self.0
    }

    /// Rebuild an id from its raw value (e.g. a decoded drag payload)
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What a node represents, mostly for display and default components
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    /// Scene root
    Scene,
    /// Pure transform node
    Locator,
    /// Node carrying a mesh
    Mesh,
    /// Node carrying a light
    Light,
}

/// A node of the scene graph
#[derive(Debug, Clone)]
pub struct Node {
    id: NodeId,
    name: String,
    kind: NodeKind,
    pub(crate) parent: Option<NodeKey>,
    pub(crate) children: Vec<NodeKey>,
    pub(crate) is_renderable: bool,

    /// Expanded in the tree view; transient UI state, never persisted
    pub is_open: bool,

    /// Local transform and cached world transform
    pub transform: TransformComponent,

    components: Vec<Component>,
}

impl Node {
    /// Create a detached locator node with a fresh id
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_kind(name, NodeKind::Locator)
    }

    /// Create a detached node of the given kind with a fresh id
    pub fn with_kind(name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            id: NodeId::next(),
            name: name.into(),
            kind,
            parent: None,
            children: Vec::new(),
            is_renderable: true,
            is_open: false,
            transform: TransformComponent::default(),
            components: Vec::new(),
        }
    }

    /// Create a light node with default light settings
    pub fn light(name: impl Into<String>) -> Self {
        let mut node = Self::with_kind(name, NodeKind::Light);
        node.components.push(Component::Light(LightComponent::default()));
        node
    }

    /// Create a mesh node for a built-in primitive
    pub fn mesh(name: impl Into<String>, primitive: Primitive) -> Self {
        let mut node = Self::with_kind(name, NodeKind::Mesh);
        node.components.push(Component::Mesh(MeshComponent::new(primitive)));
        node
    }

    /// Node identity
    pub const fn id(&self) -> NodeId {
        self.id
    }

    /// Display name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rename the node
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Node kind
    pub const fn kind(&self) -> NodeKind {
        self.kind
    }

    /// Parent handle, `None` for the root and for detached nodes
    pub const fn parent(&self) -> Option<NodeKey> {
        self.parent
    }

    /// Children in draw order
    pub fn children(&self) -> &[NodeKey] {
        &self.children
    }

    /// Whether the node has no children
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Whether the renderer should draw this node
    pub const fn is_renderable(&self) -> bool {
        self.is_renderable
    }

    /// Attached capability records
    pub fn components(&self) -> &[Component] {
        &self.components
    }

    /// Mutable access to a capability record by index
    pub fn component_mut(&mut self, index: usize) -> Option<&mut Component> {
        self.components.get_mut(index)
    }

    /// Attach a capability record, returning its index
    pub fn add_component(&mut self, component: Component) -> usize {
        self.components.push(component);
        self.components.len() - 1
    }

    /// Detach a capability record by index
    pub fn remove_component(&mut self, index: usize) -> Option<Component> {
        (index < self.components.len()).then(|| self.components.remove(index))
    }

    /// Whether a component with the given kind name is attached
    pub fn has_component(&self, kind_name: &str) -> bool {
        self.components.iter().any(|c| c.kind_name() == kind_name)
    }

    /// First attached light, if any
    pub fn light_component(&self) -> Option<&LightComponent> {
        self.components.iter().find_map(|c| match c {
            Component::Light(light) => Some(light),
            _ => None,
        })
    }

    /// First attached mesh, if any
    pub fn mesh_component(&self) -> Option<&MeshComponent> {
        self.components.iter().find_map(|c| match c {
            Component::Mesh(mesh) => Some(mesh),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique() {
        let a = Node::new("a");
        let b = Node::new("b");
        assert_ne!(a.id(), b.id());
        assert_eq!(NodeId::from_raw(a.id().raw()), a.id());
    }

    #[test]
    fn test_new_node_is_detached_and_renderable() {
        let node = Node::new("Locator#1");
        assert!(node.parent().is_none());
        assert!(node.is_leaf());
        assert!(node.is_renderable());
        assert!(!node.is_open);
        assert_eq!(node.kind(), NodeKind::Locator);
    }

    #[test]
    fn test_component_helpers() {
        let mut node = Node::light("Light#1");
        assert!(node.has_component("Light"));
        assert!(node.light_component().is_some());
        assert!(node.mesh_component().is_none());

        let index = node.add_component(Component::Mesh(MeshComponent::new(Primitive::Quad {
            width: 1.0,
            height: 1.0,
        })));
        assert_eq!(index, 1);
        assert!(node.remove_component(5).is_none());
        assert!(node.remove_component(index).is_some());
        assert!(!node.has_component("Mesh"));
    }
}
