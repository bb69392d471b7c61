//! Editor layer
//!
//! Explicit context objects standing between the presentation layer and the
//! engine. [`EditorWindow`] owns the engine and the window request queue;
//! [`SceneEditor`] is a short-lived borrow of the active scene used for every
//! interactive edit.

mod scene_editor;
mod selection;
mod status;
mod window;

pub use scene_editor::{EditError, SceneEditor};
pub use selection::Selection;
pub use status::StatusLog;
pub use window::{EditorWindow, DEFAULT_SCENE_FILE};
