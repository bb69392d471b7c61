//! # Scene Editor
//!
//! Editing core for a real-time 3D scene: a hierarchical scene graph that an
//! operator mutates interactively while a renderer consumes it every frame,
//! plus the request protocol the UI uses to pause, load, save, resume and
//! terminate the render side.
//!
//! ## Features
//!
//! - **Arena Scene Graph**: Slotmap-backed nodes with weak parent handles
//! - **Transform Propagation**: Subtree invalidation and top-down world transforms
//! - **Drag-and-Drop Reparenting**: Two-phase handshake with cycle rejection
//! - **Request Dispatcher**: Strict FIFO, one active request, blocking waits
//! - **Background Worker**: Scene (de)serialization off the UI thread
//! - **Persistence**: RON scene documents behind a serializer trait
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use scene_editor::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = EditorConfig::default();
//!     let engine = Engine::new(
//!         &config,
//!         Arc::new(RonSceneSerializer::new()),
//!         Box::new(RecordingRenderer::default()),
//!     )?;
//!     let mut window = EditorWindow::new(engine, &config);
//!
//!     let locator = window.editor().add_locator("Locator#1")?;
//!     window.editor().set_translation(locator, Vec3::new(1.0, 0.0, 0.0))?;
//!     window.frame()?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod foundation;
pub mod config;
pub mod scene;
pub mod request;
pub mod persistence;
pub mod editor;

mod engine;

pub use engine::{Engine, EngineError, FrameReport, RenderState};

/// Common imports for editor users
pub mod prelude {
    pub use crate::{
        Engine, EngineError, FrameReport, RenderState,
        config::{Config, ConfigError, DispatcherConfig, EditorConfig},
        editor::{EditorWindow, SceneEditor, Selection, StatusLog},
        foundation::math::{Mat4, Quat, Transform, Vec3},
        persistence::{RonSceneSerializer, SceneDocument, SceneSerializer},
        request::{
            Dispatcher, Request, RequestKind, RequestPayload, RequestQueue, RequestStatus,
            wait_for_request,
        },
        scene::{
            Component, DragPayload, DropOutcome, Node, NodeId, NodeKey, NodeKind, Primitive,
            RecordingRenderer, Renderer, SceneError, SceneGraph, TransformPropagator,
        },
    };
}
