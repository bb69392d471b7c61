//! World transform propagation
//!
//! Every node caches its world matrix. Editing a local transform only marks
//! the node and its subtree stale through [`TransformPropagator::request_update`];
//! the matrices are recomputed top-down in [`TransformPropagator::propagate`]
//! during the update phase, before anything renders.

use serde::{Deserialize, Serialize};

use super::graph::{SceneError, SceneGraph};
use super::node::NodeKey;
use crate::foundation::math::{Mat4, Transform};

/// Local transform plus cached world matrix
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformComponent {
    local: Transform,
    #[serde(skip, default = "Mat4::identity")]
    world: Mat4,
    #[serde(skip, default = "stale")]
    needs_update: bool,
}

const fn stale() -> bool {
    true
}

impl Default for TransformComponent {
    fn default() -> Self {
        Self::new(Transform::identity())
    }
}

impl TransformComponent {
    /// Wrap a local transform; the world matrix is stale until propagated
    pub fn new(local: Transform) -> Self {
        Self {
            local,
            world: Mat4::identity(),
            needs_update: true,
        }
    }

    /// Local transform relative to the parent
    pub const fn local(&self) -> &Transform {
        &self.local
    }

    /// Replace the local transform
    ///
    /// Only this node is flagged. Descendants are flagged by
    /// [`TransformPropagator::request_update`], which every edit path must call.
    pub fn set_local(&mut self, local: Transform) {
        self.local = local;
        self.needs_update = true;
    }

    /// Cached world matrix, valid when [`needs_update`](Self::needs_update) is false
    pub const fn world(&self) -> &Mat4 {
        &self.world
    }

    /// Whether the cached world matrix is stale
    pub const fn needs_update(&self) -> bool {
        self.needs_update
    }
}

/// Tracks invalidated subtrees and recomputes world matrices
#[derive(Debug, Default)]
pub struct TransformPropagator {
    pending: Vec<NodeKey>,
}

impl TransformPropagator {
    /// Create an idle propagator
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `key` and every descendant stale
    pub fn request_update(&mut self, graph: &mut SceneGraph, key: NodeKey) -> Result<(), SceneError> {
        graph.node(key)?;
        let subtree: Vec<_> = graph.depth_first(key).collect();
        for k in subtree {
            if let Some(node) = graph.get_mut(k) {
                node.transform.needs_update = true;
            }
        }
        if !self.pending.contains(&key) {
            self.pending.push(key);
        }
        Ok(())
    }

    /// Number of invalidated subtrees waiting for the next propagation
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Recompute stale world matrices top-down
    ///
    /// Walks the live tree in pre-order. A node is recomputed when it is
    /// flagged or its parent was recomputed in the same pass, so a parent is
    /// always current before any of its children. Returns the number of
    /// nodes recomputed.
    pub fn propagate(&mut self, graph: &mut SceneGraph) -> usize {
        if self.pending.is_empty() {
            return 0;
        }
        let roots = self.pending.len();
        self.pending.clear();

        let mut recomputed = 0;
        let mut stack = vec![(graph.root(), Mat4::identity(), false)];
        while let Some((key, parent_world, parent_changed)) = stack.pop() {
            let Some(node) = graph.get_mut(key) else {
                continue;
            };
            let changed = parent_changed || node.transform.needs_update;
            if changed {
                node.transform.world = parent_world * node.transform.local.to_matrix();
                node.transform.needs_update = false;
                recomputed += 1;
            }
            let world = node.transform.world;
            stack.extend(node.children().iter().rev().map(|&child| (child, world, changed)));
        }

        log::debug!("Propagated transforms for {roots} subtrees, {recomputed} nodes recomputed");
        recomputed
    }

    /// Compute a node's world matrix by walking its parent chain
    ///
    /// Ignores cached matrices entirely, so it can be used to check them.
    pub fn world_transform(graph: &SceneGraph, key: NodeKey) -> Option<Mat4> {
        let local = graph.get(key)?.transform.local.to_matrix();
        let chain: Vec<_> = graph.ancestors(key).collect();
        let parents = chain
            .iter()
            .rev()
            .filter_map(|&k| graph.get(k))
            .fold(Mat4::identity(), |world, node| world * node.transform.local.to_matrix());
        Some(parents * local)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::{matrix_translation, Vec3};
    use approx::assert_relative_eq;

    fn translate(graph: &mut SceneGraph, key: NodeKey, x: f32, y: f32, z: f32) {
        graph
            .get_mut(key)
            .unwrap()
            .transform
            .set_local(Transform::from_position(Vec3::new(x, y, z)));
    }

    #[test]
    fn test_request_update_marks_subtree() {
        let mut graph = SceneGraph::new("R");
        let a = graph.create_node("A");
        let b = graph.create_node("B");
        graph.add_child(graph.root(), a).unwrap();
        graph.add_child(a, b).unwrap();

        let mut propagator = TransformPropagator::new();
        let root = graph.root();
        propagator.request_update(&mut graph, root).unwrap();
        propagator.propagate(&mut graph);
        assert!(!graph.get(b).unwrap().transform.needs_update());

        propagator.request_update(&mut graph, a).unwrap();
        assert!(graph.get(a).unwrap().transform.needs_update());
        assert!(graph.get(b).unwrap().transform.needs_update());
        assert!(!graph.root_node().transform.needs_update());
        assert_eq!(propagator.pending_count(), 1);
    }

    #[test]
    fn test_propagate_composes_parent_chain() {
        let mut graph = SceneGraph::new("R");
        let a = graph.create_node("A");
        let b = graph.create_node("B");
        graph.add_child(graph.root(), a).unwrap();
        graph.add_child(a, b).unwrap();
        translate(&mut graph, a, 1.0, 0.0, 0.0);
        translate(&mut graph, b, 0.0, 2.0, 0.0);

        let mut propagator = TransformPropagator::new();
        let root = graph.root();
        propagator.request_update(&mut graph, root).unwrap();
        assert_eq!(propagator.propagate(&mut graph), 3);

        let world = *graph.get(b).unwrap().transform.world();
        assert_relative_eq!(matrix_translation(&world), Vec3::new(1.0, 2.0, 0.0));
        assert_relative_eq!(world, TransformPropagator::world_transform(&graph, b).unwrap());
        assert_eq!(propagator.pending_count(), 0);
    }

    #[test]
    fn test_only_dirty_subtree_recomputed() {
        let mut graph = SceneGraph::new("R");
        let a = graph.create_node("A");
        let b = graph.create_node("B");
        let c = graph.create_node("C");
        graph.add_child(graph.root(), a).unwrap();
        graph.add_child(a, b).unwrap();
        graph.add_child(graph.root(), c).unwrap();

        let mut propagator = TransformPropagator::new();
        let root = graph.root();
        propagator.request_update(&mut graph, root).unwrap();
        propagator.propagate(&mut graph);

        translate(&mut graph, a, 0.0, 0.0, 5.0);
        propagator.request_update(&mut graph, a).unwrap();
        assert_eq!(propagator.propagate(&mut graph), 2);
        assert_eq!(propagator.propagate(&mut graph), 0);

        let world = *graph.get(b).unwrap().transform.world();
        assert_relative_eq!(matrix_translation(&world), Vec3::new(0.0, 0.0, 5.0));
    }

    #[test]
    fn test_stale_without_request_update() {
        let mut graph = SceneGraph::new("R");
        let a = graph.create_node("A");
        let b = graph.create_node("B");
        graph.add_child(graph.root(), a).unwrap();
        graph.add_child(a, b).unwrap();

        let mut propagator = TransformPropagator::new();
        let root = graph.root();
        propagator.request_update(&mut graph, root).unwrap();
        propagator.propagate(&mut graph);

        // editing the local transform alone never reaches the child
        translate(&mut graph, a, 3.0, 0.0, 0.0);
        assert_eq!(propagator.propagate(&mut graph), 0);
        let cached = *graph.get(b).unwrap().transform.world();
        let expected = TransformPropagator::world_transform(&graph, b).unwrap();
        assert_relative_eq!(matrix_translation(&cached), Vec3::zeros());
        assert_relative_eq!(matrix_translation(&expected), Vec3::new(3.0, 0.0, 0.0));
    }

    #[test]
    fn test_request_update_on_stale_handle() {
        let mut graph = SceneGraph::new("R");
        let a = graph.create_node("A");
        graph.delete_node(a).unwrap();

        let mut propagator = TransformPropagator::new();
        assert_eq!(propagator.request_update(&mut graph, a), Err(SceneError::StaleHandle));
        assert_eq!(propagator.pending_count(), 0);
    }
}
