//! Structural properties of the scene graph under longer edit sequences

use approx::assert_relative_eq;
use scene_editor::scene::{
    accept_drop, begin_drag, DropOutcome, DropRejection, NodeKey, SceneError, SceneGraph,
    TransformPropagator,
};
use scene_editor::foundation::math::{Transform, Vec3};

/// Small deterministic generator so failures reproduce
struct Lcg(u64);

impl Lcg {
    fn next_u64(&mut self) -> u64 {
        self.0 = self.0.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1_442_695_040_888_963_407);
        self.0 >> 33
    }

    fn pick<T: Copy>(&mut self, items: &[T]) -> T {
        items[(self.next_u64() % items.len() as u64) as usize]
    }
}

fn assert_acyclic(graph: &SceneGraph) {
    let bound = graph.node_count();
    for (key, _) in graph.iter() {
        let depth = graph.ancestors(key).take(bound + 1).count();
        assert!(depth <= bound, "parent chain of {key:?} does not terminate");
        assert!(!graph.is_ancestor(key, key));
    }
}

fn populated(count: usize) -> (SceneGraph, Vec<NodeKey>) {
    let mut graph = SceneGraph::new("R");
    let mut keys = vec![graph.root()];
    for i in 0..count {
        let key = graph.create_node(format!("N{i}"));
        keys.push(key);
    }
    (graph, keys)
}

#[test]
fn test_random_links_never_form_cycles() {
    let (mut graph, keys) = populated(12);
    let mut rng = Lcg(7);

    for _ in 0..2_000 {
        let a = rng.pick(&keys);
        let b = rng.pick(&keys);
        let before = graph.topology_snapshot();
        let result = if rng.next_u64() % 2 == 0 {
            graph.add_child(a, b)
        } else {
            graph.set_parent(b, a)
        };
        if result.is_err() {
            assert_eq!(graph.topology_snapshot(), before, "failed link mutated the graph");
        }
        assert_acyclic(&graph);
    }
}

#[test]
fn test_reparent_into_descendant_is_rejected_without_change() {
    let (mut graph, keys) = populated(4);
    let [root, s, a, b, t] = keys[..] else { unreachable!() };
    graph.add_child(root, s).unwrap();
    graph.add_child(s, a).unwrap();
    graph.add_child(a, b).unwrap();
    graph.add_child(b, t).unwrap();
    let before = graph.topology_snapshot();

    let result = graph.set_parent(s, t);

    assert!(matches!(result, Err(SceneError::Cycle { .. })));
    assert_eq!(graph.topology_snapshot(), before);
}

#[test]
fn test_delete_subtree_scenario() {
    let mut graph = SceneGraph::new("R");
    let l1 = graph.create_node("L1");
    let l2 = graph.create_node("L2");
    graph.add_child(graph.root(), l1).unwrap();
    graph.add_child(l1, l2).unwrap();
    let l1_id = graph.get(l1).unwrap().id();
    let l2_id = graph.get(l2).unwrap().id();

    let disposed = graph.delete_subtree(l1).unwrap();

    assert_eq!(disposed, [l2_id, l1_id]);
    assert!(graph.root_node().children().is_empty());
    assert_eq!(graph.find_by_id(graph.root(), l1_id), None);
    assert_eq!(graph.find_by_id(graph.root(), l2_id), None);
}

#[test]
fn test_renderable_flag_covers_existing_descendants_only() {
    let mut graph = SceneGraph::new("R");
    let n = graph.create_node("N");
    let children: Vec<_> = (0..3).map(|i| graph.create_node(format!("C{i}"))).collect();
    graph.add_child(graph.root(), n).unwrap();
    graph.add_child(n, children[0]).unwrap();
    graph.add_child(children[0], children[1]).unwrap();
    graph.add_child(n, children[2]).unwrap();
    graph.set_renderable_recursive(children[1], false).unwrap();

    graph.set_renderable_recursive(n, false).unwrap();
    for key in graph.depth_first(n) {
        assert!(!graph.get(key).unwrap().is_renderable());
    }

    // hidden before it joins, added before the restoring call
    let early = graph.create_node("Early");
    graph.set_renderable_recursive(early, false).unwrap();
    graph.add_child(n, early).unwrap();

    // hidden before it joins, added after the restoring call
    let late = graph.create_node("Late");
    graph.set_renderable_recursive(late, false).unwrap();

    graph.set_renderable_recursive(n, true).unwrap();
    graph.add_child(n, late).unwrap();

    for &key in children.iter().chain([&n, &early]) {
        assert!(graph.get(key).unwrap().is_renderable());
    }
    assert!(!graph.get(late).unwrap().is_renderable());
    assert!(graph.root_node().is_renderable());
}

#[test]
fn test_eager_propagation_matches_lazy_walk() {
    let (mut graph, keys) = populated(10);
    let mut rng = Lcg(42);
    let mut propagator = TransformPropagator::new();

    for &key in &keys[1..] {
        let parent = rng.pick(&keys);
        if graph.add_child(parent, key).is_err() {
            graph.add_child(graph.root(), key).unwrap();
        }
    }
    let root = graph.root();
    propagator.request_update(&mut graph, root).unwrap();
    propagator.propagate(&mut graph);

    for round in 0..50u8 {
        let key = rng.pick(&keys[1..]);
        let offset = f32::from(round);
        graph.get_mut(key).unwrap().transform.set_local(Transform::from_euler_degrees(
            Vec3::new(offset, 1.0, -offset),
            Vec3::new(0.0, offset * 7.0, 0.0),
            Vec3::new(1.0, 1.0, 1.0),
        ));
        propagator.request_update(&mut graph, key).unwrap();

        if round % 3 == 0 {
            let target = rng.pick(&keys);
            let _ = graph.set_parent(key, target);
            propagator.request_update(&mut graph, key).unwrap();
        }

        propagator.propagate(&mut graph);
        for k in graph.depth_first(graph.root()) {
            let node = graph.get(k).unwrap();
            assert!(!node.transform.needs_update());
            let lazy = TransformPropagator::world_transform(&graph, k).unwrap();
            assert_relative_eq!(*node.transform.world(), lazy, epsilon = 1e-3, max_relative = 1e-4);
        }
    }
}

#[test]
fn test_drop_after_source_deleted_is_a_no_op() {
    let mut graph = SceneGraph::new("R");
    let s = graph.create_node("S");
    let t = graph.create_node("T");
    graph.add_child(graph.root(), s).unwrap();
    graph.add_child(graph.root(), t).unwrap();
    let mut propagator = TransformPropagator::new();

    let payload = begin_drag(&graph, s).unwrap();
    let id = graph.get(s).unwrap().id();
    graph.delete_subtree(s).unwrap();
    let before = graph.topology_snapshot();

    let outcome = accept_drop(&mut graph, &mut propagator, &payload, t);

    assert_eq!(outcome, DropOutcome::Ignored(DropRejection::StaleSource(id)));
    assert_eq!(graph.topology_snapshot(), before);
    assert_eq!(propagator.pending_count(), 0);
}
