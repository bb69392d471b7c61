//! Editing operations behind the tree view and the property panel
//!
//! Every operation that can move a node in space, directly or by changing
//! its ancestors, requests a transform update before returning. The
//! presentation layer only calls these and never writes transforms itself.

use crate::foundation::math::{quat_from_euler_degrees, Transform, Vec3};
use crate::scene::{
    accept_drop, begin_drag, Component, DragPayload, DropOutcome, FieldError, FieldValue, Node,
    NodeId, NodeKey, Primitive, SceneError, SceneGraph, TransformPropagator,
};

use super::Selection;

/// Errors from property panel edits
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum EditError {
    /// Structural scene error
    #[error(transparent)]
    Scene(#[from] SceneError),

    /// Component field rejected the value
    #[error(transparent)]
    Field(#[from] FieldError),

    /// Node has no component at this index
    #[error("node has no component at index {0}")]
    NoSuchComponent(usize),
}

/// Editing context over one scene
pub struct SceneEditor<'a> {
    scene: &'a mut SceneGraph,
    propagator: &'a mut TransformPropagator,
    selection: &'a mut Selection,
}

impl<'a> SceneEditor<'a> {
    /// Edit `scene`, keeping world transforms current through `propagator`
    pub fn new(
        scene: &'a mut SceneGraph,
        propagator: &'a mut TransformPropagator,
        selection: &'a mut Selection,
    ) -> Self {
        Self { scene, propagator, selection }
    }

    /// Scene being edited
    pub fn scene(&self) -> &SceneGraph {
        self.scene
    }

    /// Current selection
    pub fn selection(&self) -> &Selection {
        self.selection
    }

    /// Add a locator under the clicked node
    pub fn add_locator(&mut self, name: impl Into<String>) -> Result<NodeKey, SceneError> {
        self.add_node(Node::new(name))
    }

    /// Add a point light under the clicked node
    pub fn add_light(&mut self, name: impl Into<String>) -> Result<NodeKey, SceneError> {
        self.add_node(Node::light(name))
    }

    /// Add a primitive mesh under the clicked node
    pub fn add_mesh(&mut self, name: impl Into<String>, primitive: Primitive) -> Result<NodeKey, SceneError> {
        self.add_node(Node::mesh(name, primitive))
    }

    /// Add a prepared node under the clicked node
    ///
    /// The parent is expanded in the tree view and the new node becomes the
    /// clicked one.
    pub fn add_node(&mut self, node: Node) -> Result<NodeKey, SceneError> {
        let parent = self.selection.insertion_target(self.scene);
        let (id, kind) = (node.id(), node.kind());
        let key = self.scene.insert(node);
        if let Err(error) = self.scene.add_child(parent, key) {
            self.scene.delete_node(key)?;
            return Err(error);
        }
        self.scene.node_mut(parent)?.is_open = true;
        self.selection.click(key);
        self.propagator.request_update(self.scene, key)?;
        log::info!("Added {kind:?} node {id}");
        Ok(key)
    }

    /// Mark a node as clicked
    pub fn click(&mut self, key: NodeKey) -> Result<(), SceneError> {
        self.scene.node(key)?;
        self.selection.click(key);
        Ok(())
    }

    /// Expand or collapse a node in the tree view
    pub fn set_open(&mut self, key: NodeKey, open: bool) -> Result<(), SceneError> {
        self.scene.node_mut(key)?.is_open = open;
        Ok(())
    }

    /// Delete one node
    ///
    /// Its children are not promoted to the former parent. They drop out of
    /// the scene with it and are disposed along with anything else no longer
    /// reachable from the root.
    pub fn delete(&mut self, key: NodeKey) -> Result<NodeId, SceneError> {
        let (parent, refocus) = self.prepare_delete(key)?;
        let id = self.scene.delete_node(key)?;
        self.scene.purge_detached();
        if refocus {
            self.selection.refocus(parent);
        }
        Ok(id)
    }

    /// Delete a node and everything below it
    pub fn delete_subtree(&mut self, key: NodeKey) -> Result<Vec<NodeId>, SceneError> {
        let (parent, refocus) = self.prepare_delete(key)?;
        let ids = self.scene.delete_subtree(key)?;
        if refocus {
            self.selection.refocus(parent);
        }
        Ok(ids)
    }

    /// Rename a node
    pub fn rename(&mut self, key: NodeKey, name: impl Into<String>) -> Result<(), SceneError> {
        self.scene.rename(key, name)
    }

    /// Set a node's local translation
    pub fn set_translation(&mut self, key: NodeKey, position: Vec3) -> Result<(), SceneError> {
        self.edit_transform(key, |t| t.position = position)
    }

    /// Set a node's local rotation from euler angles in degrees
    pub fn set_rotation_euler(&mut self, key: NodeKey, degrees: Vec3) -> Result<(), SceneError> {
        self.edit_transform(key, |t| t.rotation = quat_from_euler_degrees(degrees))
    }

    /// Set a node's local scale
    pub fn set_scale(&mut self, key: NodeKey, scale: Vec3) -> Result<(), SceneError> {
        self.edit_transform(key, |t| t.scale = scale)
    }

    /// Replace a node's local transform
    pub fn set_local_transform(&mut self, key: NodeKey, transform: Transform) -> Result<(), SceneError> {
        self.edit_transform(key, |t| *t = transform)
    }

    /// Show or hide a node and its whole subtree
    pub fn set_renderable(&mut self, key: NodeKey, flag: bool) -> Result<usize, SceneError> {
        self.scene.set_renderable_recursive(key, flag)
    }

    /// Attach a component, returning its index
    pub fn add_component(&mut self, key: NodeKey, component: Component) -> Result<usize, SceneError> {
        let index = self.scene.node_mut(key)?.add_component(component);
        self.propagator.request_update(self.scene, key)?;
        Ok(index)
    }

    /// Detach a component by index
    pub fn remove_component(&mut self, key: NodeKey, index: usize) -> Result<Component, EditError> {
        let component = self
            .scene
            .node_mut(key)?
            .remove_component(index)
            .ok_or(EditError::NoSuchComponent(index))?;
        self.propagator.request_update(self.scene, key)?;
        Ok(component)
    }

    /// Write one component field through its schema
    pub fn set_component_field(
        &mut self,
        key: NodeKey,
        index: usize,
        field: &str,
        value: FieldValue,
    ) -> Result<(), EditError> {
        self.scene
            .node_mut(key)?
            .component_mut(index)
            .ok_or(EditError::NoSuchComponent(index))?
            .set_field(field, value)?;
        self.propagator.request_update(self.scene, key)?;
        Ok(())
    }

    /// Start dragging a tree row
    pub fn begin_drag(&self, key: NodeKey) -> Result<DragPayload, SceneError> {
        begin_drag(self.scene, key)
    }

    /// Release a drag over a tree row
    pub fn drop_on(&mut self, payload: &DragPayload, target: NodeKey) -> DropOutcome {
        let outcome = accept_drop(self.scene, self.propagator, payload, target);
        if let DropOutcome::Reparented { target, .. } = outcome {
            if let Some(node) = self.scene.get_mut(target) {
                node.is_open = true;
            }
        }
        outcome
    }

    /// Fill an empty scene with the startup nodes
    ///
    /// Three nested locators with a point light under the first one.
    pub fn populate_default_scene(&mut self) -> Result<(), SceneError> {
        self.selection.clear();
        let first = self.add_locator("Test Locator 1")?;
        self.add_locator("Test Locator 2")?;
        self.add_locator("Test Locator 3")?;

        self.selection.click(first);
        let light = self.add_light("Default Light")?;
        self.set_translation(light, Vec3::new(100.0, 100.0, 100.0))?;
        self.selection.clear();
        Ok(())
    }

    fn prepare_delete(&self, key: NodeKey) -> Result<(Option<NodeKey>, bool), SceneError> {
        let parent = self.scene.node(key)?.parent();
        Ok((parent, self.selection.affected_by_delete(self.scene, key)))
    }

    fn edit_transform(&mut self, key: NodeKey, edit: impl FnOnce(&mut Transform)) -> Result<(), SceneError> {
        let node = self.scene.node_mut(key)?;
        let mut local = node.transform.local().clone();
        edit(&mut local);
        node.transform.set_local(local);
        self.propagator.request_update(self.scene, key)
    }
}
