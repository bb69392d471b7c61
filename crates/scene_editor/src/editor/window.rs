//! Editor window
//!
//! The window owns the engine and a second request queue for window-level
//! commands. Menu actions land on that queue; [`EditorWindow::handle_requests`]
//! works them off one at a time at the start of every frame, issuing engine
//! requests and waiting on them where an action spans several steps.

use std::path::{Path, PathBuf};

use crate::config::EditorConfig;
use crate::engine::{Engine, EngineError, FrameReport};
use crate::request::{
    Dispatcher, Progress, Request, RequestError, RequestHandler, RequestKind, RequestOutcome,
    RequestPayload, RequestQueue, Step,
};

use super::{SceneEditor, Selection, StatusLog};

/// File name used when saving without an explicit path
pub const DEFAULT_SCENE_FILE: &str = "scene_output.ron";

/// Top-level editor context
pub struct EditorWindow {
    engine: Engine,
    selection: Selection,
    dispatcher: Dispatcher,
    status: StatusLog,
    scene_directory: PathBuf,
    open: bool,
    worker_lost: bool,
}

impl EditorWindow {
    /// Wrap an engine
    pub fn new(engine: Engine, config: &EditorConfig) -> Self {
        Self {
            engine,
            selection: Selection::default(),
            dispatcher: Dispatcher::new(RequestQueue::new()),
            status: StatusLog::new(config.status_log_capacity),
            scene_directory: config.scene_directory.clone(),
            open: true,
            worker_lost: false,
        }
    }

    /// Engine context
    pub const fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Engine context, mutably
    pub fn engine_mut(&mut self) -> &mut Engine {
        &mut self.engine
    }

    /// Editing context over the active scene
    pub fn editor(&mut self) -> SceneEditor<'_> {
        self.engine.edit(&mut self.selection)
    }

    /// Current selection
    pub const fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Status lines
    pub const fn status(&self) -> &StatusLog {
        &self.status
    }

    /// Handle for queueing window requests
    pub fn window_queue(&self) -> RequestQueue {
        self.dispatcher.queue().clone()
    }

    /// Whether the window is still open
    pub const fn is_open(&self) -> bool {
        self.open
    }

    /// Where [`save_scene`](Self::save_scene) writes by default
    pub fn default_save_path(&self) -> PathBuf {
        self.scene_directory.join(DEFAULT_SCENE_FILE)
    }

    /// Queue opening a scene file
    pub fn request_open_file(&self, path: impl Into<PathBuf>) -> Request {
        self.dispatcher
            .queue()
            .issue(RequestKind::OpenFile, RequestPayload::Path(path.into()))
    }

    /// Queue shutting down: terminate rendering, then close the window
    pub fn request_close(&self) -> Request {
        self.engine.send_request(RequestKind::TerminateRender, RequestPayload::None);
        self.dispatcher.queue().issue(RequestKind::CloseWindow, RequestPayload::None)
    }

    /// Replace the active scene with one read from `path`
    ///
    /// Pauses rendering, loads on the worker, swaps the scene in and resumes.
    /// Rendering is resumed even if the load fails.
    pub fn open_file(&mut self, path: &Path) -> Result<(), EngineError> {
        log::info!("Opening {}", path.display());
        self.engine.send_and_wait(RequestKind::PauseRender, RequestPayload::None)?;

        let load = self
            .engine
            .send_and_wait(RequestKind::LoadScene, RequestPayload::Path(path.to_path_buf()))?;
        self.status.record(&load);
        let swapped = match load.take_outcome() {
            Some(RequestOutcome::Scene(scene)) => self.engine.replace_scene(scene).map(|_| ()),
            None => Err(EngineError::Request(RequestError::Persistence(
                load.message().unwrap_or_default(),
            ))),
        };
        if swapped.is_ok() {
            self.selection.clear();
        }

        self.engine.send_and_wait(RequestKind::ResumeRender, RequestPayload::None)?;
        swapped
    }

    /// Save the live scene through the worker and wait for it
    ///
    /// The returned request carries the result message.
    pub fn save_scene(&mut self, path: &Path) -> Result<Request, EngineError> {
        let document = self.engine.snapshot();
        let save = self.engine.send_and_wait(
            RequestKind::SaveScene,
            RequestPayload::Document {
                path: path.to_path_buf(),
                document,
            },
        )?;
        self.status.record(&save);
        Ok(save)
    }

    /// Run one step of the window queue
    pub fn handle_requests(&mut self) -> Result<Step, EngineError> {
        let dispatcher = self.dispatcher.clone();
        let step = dispatcher.process(self);
        if let Step::Completed(_) = step {
            log::debug!("Window queue has {} open requests", dispatcher.queue().len());
        }
        if self.worker_lost {
            return Err(EngineError::WorkerLost);
        }
        Ok(step)
    }

    /// Run one editor frame: window requests, then the engine frame
    pub fn frame(&mut self) -> Result<FrameReport, EngineError> {
        self.handle_requests()?;
        self.engine.frame()
    }
}

impl RequestHandler for EditorWindow {
    fn start(&mut self, request: &Request) -> Result<Progress, RequestError> {
        let result = match request.kind() {
            RequestKind::OpenFile => {
                let RequestPayload::Path(path) = request.payload() else {
                    return Err(RequestError::InvalidPayload { kind: request.kind() });
                };
                self.open_file(path)
                    .map(|()| format!("Opened {}", path.display()))
            }
            RequestKind::CloseWindow => {
                self.open = false;
                Ok("Window closed".to_string())
            }
            kind => return Err(RequestError::Unsupported(kind)),
        };

        match result {
            Ok(message) => {
                request.note(message);
                self.status.record(request);
                Ok(Progress::Finished)
            }
            Err(error) => {
                if matches!(error, EngineError::WorkerLost) {
                    self.worker_lost = true;
                }
                let error = match error {
                    EngineError::Request(error) => error,
                    other => RequestError::Persistence(other.to_string()),
                };
                request.note(error.to_string());
                self.status.record(request);
                Err(error)
            }
        }
    }
}
