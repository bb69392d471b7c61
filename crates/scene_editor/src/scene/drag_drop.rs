//! Drag-and-drop reparenting
//!
//! The tree view hands a [`DragPayload`] to the UI when a row starts
//! dragging and passes it back to [`accept_drop`] when the row is released
//! over another node. Only the node id crosses the UI boundary, so a payload
//! can outlive the node it names; such drops resolve to nothing and are
//! ignored.

use super::graph::{SceneError, SceneGraph};
use super::node::{NodeId, NodeKey};
use super::transform::TransformPropagator;

/// Tag identifying scene node payloads
pub const NODE_PAYLOAD_PROTOCOL: &str = "SCENE_GRAPH_NODE";

/// Opaque drag payload as exchanged with the UI
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DragPayload {
    /// Protocol tag
    pub tag: String,
    /// Encoded node id
    pub data: Vec<u8>,
}

impl DragPayload {
    /// Encode a node id
    pub fn encode(id: NodeId) -> Self {
        Self {
            tag: NODE_PAYLOAD_PROTOCOL.to_string(),
            data: id.raw().to_le_bytes().to_vec(),
        }
    }

    /// Decode the node id, if this is a well-formed node payload
    pub fn decode(&self) -> Option<NodeId> {
        if self.tag != NODE_PAYLOAD_PROTOCOL {
            return None;
        }
        let bytes: [u8; 8] = self.data.as_slice().try_into().ok()?;
        Some(NodeId::from_raw(u64::from_le_bytes(bytes)))
    }
}

/// Why a drop did nothing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropRejection {
    /// Payload does not carry a scene node
    ForeignPayload,
    /// Dragged node no longer exists in the scene
    StaleSource(NodeId),
    /// Drop target no longer exists
    StaleTarget,
    /// The graph refused the move
    Rejected(SceneError),
}

/// Result of a drop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropOutcome {
    /// Source now sits under the target
    Reparented {
        /// Moved node
        source: NodeKey,
        /// New parent
        target: NodeKey,
    },
    /// Nothing changed
    Ignored(DropRejection),
}

/// Start dragging a node
pub fn begin_drag(graph: &SceneGraph, key: NodeKey) -> Result<DragPayload, SceneError> {
    Ok(DragPayload::encode(graph.node(key)?.id()))
}

/// Complete a drop of `payload` onto `target`
///
/// On success the moved node's world transform is invalidated, since its
/// ancestor chain changed.
pub fn accept_drop(
    graph: &mut SceneGraph,
    propagator: &mut TransformPropagator,
    payload: &DragPayload,
    target: NodeKey,
) -> DropOutcome {
    let outcome = resolve_drop(graph, propagator, payload, target);
    if let DropOutcome::Ignored(reason) = &outcome {
        log::warn!("Ignored drop: {reason:?}");
    }
    outcome
}

fn resolve_drop(
    graph: &mut SceneGraph,
    propagator: &mut TransformPropagator,
    payload: &DragPayload,
    target: NodeKey,
) -> DropOutcome {
    let Some(id) = payload.decode() else {
        return DropOutcome::Ignored(DropRejection::ForeignPayload);
    };
    let Some(source) = graph.find_by_id(graph.root(), id) else {
        return DropOutcome::Ignored(DropRejection::StaleSource(id));
    };
    if !graph.contains(target) {
        return DropOutcome::Ignored(DropRejection::StaleTarget);
    }

    if let Err(error) = graph.set_parent(source, target) {
        return DropOutcome::Ignored(DropRejection::Rejected(error));
    }
    if let Err(error) = propagator.request_update(graph, source) {
        return DropOutcome::Ignored(DropRejection::Rejected(error));
    }
    log::debug!("Reparented {id} by drop");
    DropOutcome::Reparented { source, target }
}
