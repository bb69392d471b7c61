//! Scene graph
//!
//! Nodes live in a slotmap arena owned by [`SceneGraph`]. Children are held
//! as ordered handle lists; the parent link is a plain handle used only for
//! navigation and validation, never for lifetime.
//!
//! ## Architecture
//!
//! ```text
//! UI interaction
//!      ↓
//! SceneGraph mutation (add / reparent / delete)
//!      ↓
//! TransformPropagator::request_update
//!      ↓
//! propagate (update phase) → RenderList → Renderer (render phase)
//! ```

mod node;
mod components;
mod graph;
mod transform;
mod drag_drop;
mod render_list;

pub use node::{Node, NodeId, NodeKey, NodeKind};
pub use components::{
    CollisionComponent, CollisionShape, Component, FieldError, FieldKind, FieldSchema, FieldValue,
    LightComponent, LightFalloff, LightType, MeshComponent, Primitive, ScriptComponent,
};
pub use graph::{DepthFirst, SceneError, SceneGraph, TopologyEntry};
pub use transform::{TransformComponent, TransformPropagator};
pub use drag_drop::{
    accept_drop, begin_drag, DragPayload, DropOutcome, DropRejection, NODE_PAYLOAD_PROTOCOL,
};
pub use render_list::{RecordingRenderer, RenderItem, RenderList, Renderer};
