//! Render phase input
//!
//! The render phase never touches the graph beyond this read-only collection
//! pass. It snapshots every renderable node that carries a mesh or a light,
//! in tree order, with its cached world matrix.

use super::components::{LightComponent, MeshComponent};
use super::graph::SceneGraph;
use super::node::{NodeId, NodeKind};
use crate::foundation::math::Mat4;

/// One drawable entry
#[derive(Debug, Clone, PartialEq)]
pub struct RenderItem {
    /// Source node
    pub id: NodeId,
    /// Source node kind
    pub kind: NodeKind,
    /// World matrix at collection time
    pub world: Mat4,
    /// Geometry, if the node carries a mesh
    pub mesh: Option<MeshComponent>,
    /// Light, if the node carries a renderable light
    pub light: Option<LightComponent>,
}

/// Everything the renderer draws in one frame
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderList {
    items: Vec<RenderItem>,
    stale: usize,
}

impl RenderList {
    /// Collect renderable items from the live tree
    pub fn collect(graph: &SceneGraph) -> Self {
        let mut list = Self::default();
        for key in graph.depth_first(graph.root()) {
            let Some(node) = graph.get(key) else { continue };
            if !node.is_renderable() {
                continue;
            }
            let mesh = node.mesh_component().cloned();
            let light = node.light_component().filter(|l| l.is_renderable).cloned();
            if mesh.is_none() && light.is_none() {
                continue;
            }
            if node.transform.needs_update() {
                list.stale += 1;
            }
            list.items.push(RenderItem {
                id: node.id(),
                kind: node.kind(),
                world: *node.transform.world(),
                mesh,
                light,
            });
        }
        if list.stale > 0 {
            log::warn!("{} render items have stale world transforms", list.stale);
        }
        list
    }

    /// Collected items in tree order
    pub fn items(&self) -> &[RenderItem] {
        &self.items
    }

    /// Number of items
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether nothing is drawn
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Items whose world matrix had not been propagated yet
    pub const fn stale_count(&self) -> usize {
        self.stale
    }

    /// Number of mesh items
    pub fn mesh_count(&self) -> usize {
        self.items.iter().filter(|item| item.mesh.is_some()).count()
    }

    /// Number of light items
    pub fn light_count(&self) -> usize {
        self.items.iter().filter(|item| item.light.is_some()).count()
    }
}

/// Consumer of the render phase
pub trait Renderer {
    /// Draw one frame
    fn render(&mut self, list: &RenderList);
}

/// Renderer that only remembers what it was asked to draw
#[derive(Debug, Default)]
pub struct RecordingRenderer {
    /// Frames rendered so far
    pub frames_rendered: u64,
    /// Last frame's input
    pub last: Option<RenderList>,
}

impl Renderer for RecordingRenderer {
    fn render(&mut self, list: &RenderList) {
        self.frames_rendered += 1;
        self.last = Some(list.clone());
    }
}
