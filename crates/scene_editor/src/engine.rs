//! Engine context
//!
//! Owns the active scene slot, the transform propagator, the renderer and
//! the engine request queue. A frame is the update phase (requests, then
//! transform propagation) followed by the render phase, strictly in that
//! order, so the graph is never mutated while it is being read for drawing.

use std::sync::Arc;
use std::time::Duration;

use crate::config::EditorConfig;
use crate::editor::{SceneEditor, Selection};
use crate::foundation::time::FrameClock;
use crate::persistence::{PersistenceError, SceneDocument, SceneSerializer};
use crate::request::{
    wait_for_request, wait_for_request_timeout, Dispatcher, Progress, Request, RequestDriver,
    RequestError, RequestHandler, RequestKind, RequestPayload, RequestQueue, RequestStatus, Step,
    WorkDispatcher, WorkJob, WorkerError,
};
use crate::scene::{RenderList, Renderer, SceneError, SceneGraph, TransformPropagator};

/// Engine errors
#[derive(thiserror::Error, Debug)]
pub enum EngineError {
    /// Structural scene error
    #[error("Scene error: {0}")]
    Scene(#[from] SceneError),

    /// Request failed or timed out
    #[error("Request error: {0}")]
    Request(#[from] RequestError),

    /// Scene file error
    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    /// Worker thread error
    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),

    /// Scene swap attempted while rendering
    #[error("scene can only be replaced while rendering is paused")]
    RenderActive,

    /// The scene worker thread died
    #[error("scene worker thread lost")]
    WorkerLost,

    /// Rendering was terminated
    #[error("rendering has been terminated")]
    Terminated,
}

/// Render loop state, driven by render requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderState {
    /// Frames are rendered
    Active,
    /// Render phase is skipped; the scene may be swapped
    Paused,
    /// Render phase is gone for good; later requests are drained
    Terminated,
}

/// What one frame did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameReport {
    /// Frame number, starting at 1
    pub frame: u64,
    /// Time since the previous frame
    pub delta: Duration,
    /// Consumer step taken on the engine queue
    pub step: Step,
    /// Nodes whose world transform was recomputed
    pub recomputed: usize,
    /// Items handed to the renderer, zero when not rendering
    pub rendered: usize,
    /// Render state at the end of the frame
    pub render_state: RenderState,
}

/// Engine-side request handler
struct RenderControl {
    state: RenderState,
    worker: WorkDispatcher,
}

impl RequestHandler for RenderControl {
    fn start(&mut self, request: &Request) -> Result<Progress, RequestError> {
        if self.state == RenderState::Terminated {
            log::warn!("Draining {} {} after terminate", request.kind(), request.id());
            request.finish_with_message(RequestError::Drained.to_string());
            return Ok(Progress::Finished);
        }

        match request.kind() {
            RequestKind::PauseRender => {
                self.state = RenderState::Paused;
                Ok(Progress::Finished)
            }
            RequestKind::ResumeRender => {
                self.state = RenderState::Active;
                Ok(Progress::Finished)
            }
            RequestKind::TerminateRender => {
                self.state = RenderState::Terminated;
                Ok(Progress::Finished)
            }
            RequestKind::LoadScene => {
                let RequestPayload::Path(path) = request.payload() else {
                    return Err(RequestError::InvalidPayload { kind: request.kind() });
                };
                self.submit(WorkJob::LoadScene {
                    request: request.clone(),
                    path: path.clone(),
                })
            }
            RequestKind::SaveScene => {
                let RequestPayload::Document { path, document } = request.payload() else {
                    return Err(RequestError::InvalidPayload { kind: request.kind() });
                };
                self.submit(WorkJob::SaveScene {
                    request: request.clone(),
                    path: path.clone(),
                    document: document.clone(),
                })
            }
            kind @ (RequestKind::OpenFile | RequestKind::CloseWindow) => {
                Err(RequestError::Unsupported(kind))
            }
        }
    }
}

impl RenderControl {
    fn submit(&self, job: WorkJob) -> Result<Progress, RequestError> {
        self.worker
            .submit(job)
            .map(|()| Progress::Deferred)
            .map_err(|e| RequestError::Persistence(e.to_string()))
    }
}

/// Engine context
pub struct Engine {
    scene: SceneGraph,
    propagator: TransformPropagator,
    renderer: Box<dyn Renderer>,
    control: RenderControl,
    dispatcher: Dispatcher,
    clock: FrameClock,
    poll_interval: Duration,
    wait_timeout: Option<Duration>,
    worker_lost: bool,
}

impl Engine {
    /// Create an engine with an empty scene and start its worker
    pub fn new(
        config: &EditorConfig,
        serializer: Arc<dyn SceneSerializer>,
        renderer: Box<dyn Renderer>,
    ) -> Result<Self, EngineError> {
        log::info!("Initializing engine...");

        let mut scene = SceneGraph::new(config.default_scene_name.clone());
        let mut propagator = TransformPropagator::new();
        let root = scene.root();
        propagator.request_update(&mut scene, root)?;

        Ok(Self {
            scene,
            propagator,
            renderer,
            control: RenderControl {
                state: RenderState::Active,
                worker: WorkDispatcher::spawn(serializer)?,
            },
            dispatcher: Dispatcher::new(RequestQueue::new()),
            clock: FrameClock::new(),
            poll_interval: config.dispatcher.poll_interval(),
            wait_timeout: config.dispatcher.wait_timeout(),
            worker_lost: false,
        })
    }

    /// Active scene
    pub const fn scene(&self) -> &SceneGraph {
        &self.scene
    }

    /// Handle for issuing engine requests
    pub fn request_queue(&self) -> RequestQueue {
        self.dispatcher.queue().clone()
    }

    /// Current render state
    pub const fn render_state(&self) -> RenderState {
        self.control.state
    }

    /// Frames run so far
    pub const fn frame_count(&self) -> u64 {
        self.clock.frame_count()
    }

    /// Queue an engine request
    pub fn send_request(&self, kind: RequestKind, payload: RequestPayload) -> Request {
        self.dispatcher.queue().issue(kind, payload)
    }

    /// Block until `request` finishes, driving the engine queue meanwhile
    ///
    /// Honors the configured wait timeout. Fails with
    /// [`EngineError::WorkerLost`] if the worker died along the way.
    pub fn wait(&mut self, request: &Request) -> Result<(), EngineError> {
        let (poll_interval, wait_timeout) = (self.poll_interval, self.wait_timeout);
        match wait_timeout {
            Some(timeout) => wait_for_request_timeout(request, self, poll_interval, timeout)?,
            None => wait_for_request(request, self, poll_interval),
        }
        self.check_worker()
    }

    /// Queue a request and wait for it
    pub fn send_and_wait(&mut self, kind: RequestKind, payload: RequestPayload) -> Result<Request, EngineError> {
        let request = self.send_request(kind, payload);
        self.wait(&request)?;
        Ok(request)
    }

    /// Swap in a new scene, returning the old one
    ///
    /// Only allowed while rendering is paused.
    pub fn replace_scene(&mut self, mut scene: SceneGraph) -> Result<SceneGraph, EngineError> {
        match self.control.state {
            RenderState::Paused => {}
            RenderState::Active => return Err(EngineError::RenderActive),
            RenderState::Terminated => return Err(EngineError::Terminated),
        }

        self.propagator = TransformPropagator::new();
        let root = scene.root();
        self.propagator.request_update(&mut scene, root)?;
        log::info!(
            "Replacing scene '{}' with '{}' ({} nodes)",
            self.scene.root_node().name(),
            scene.root_node().name(),
            scene.node_count()
        );
        Ok(std::mem::replace(&mut self.scene, scene))
    }

    /// Snapshot the live scene for saving
    pub fn snapshot(&self) -> SceneDocument {
        SceneDocument::capture(&self.scene)
    }

    /// Editing context over the active scene
    pub fn edit<'a>(&'a mut self, selection: &'a mut Selection) -> SceneEditor<'a> {
        SceneEditor::new(&mut self.scene, &mut self.propagator, selection)
    }

    /// Run one consumer step on the engine queue
    pub fn process_requests(&mut self) -> Step {
        self.detect_worker_loss();
        self.dispatcher.process(&mut self.control)
    }

    /// Run one frame: requests, propagation, then rendering
    pub fn frame(&mut self) -> Result<FrameReport, EngineError> {
        let delta = self.clock.tick();

        let step = self.process_requests();
        self.check_worker()?;
        let recomputed = self.propagator.propagate(&mut self.scene);

        let rendered = if self.control.state == RenderState::Active {
            let list = RenderList::collect(&self.scene);
            self.renderer.render(&list);
            list.len()
        } else {
            0
        };

        Ok(FrameReport {
            frame: self.clock.frame_count(),
            delta,
            step,
            recomputed,
            rendered,
            render_state: self.control.state,
        })
    }

    /// Fail if the worker thread has died
    pub fn check_worker(&mut self) -> Result<(), EngineError> {
        self.detect_worker_loss();
        if self.worker_lost {
            Err(EngineError::WorkerLost)
        } else {
            Ok(())
        }
    }

    fn detect_worker_loss(&mut self) {
        if !self.worker_lost && !self.control.worker.is_alive() {
            log::error!("Scene worker thread lost");
            self.worker_lost = true;
        }
        if !self.worker_lost {
            return;
        }
        // a job the worker took down with it would otherwise never finish
        if let Some(head) = self.dispatcher.queue().peek() {
            let worker_job = matches!(head.kind(), RequestKind::LoadScene | RequestKind::SaveScene);
            if worker_job && head.status() == RequestStatus::InProgress {
                head.finish_with_error(&RequestError::Persistence(WorkerError::Disconnected.to_string()));
            }
        }
    }
}

impl RequestDriver for Engine {
    fn drive(&mut self) {
        self.process_requests();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{Node, RecordingRenderer};
    use crate::persistence::RonSceneSerializer;

    fn engine() -> Engine {
        Engine::new(
            &EditorConfig::default(),
            Arc::new(RonSceneSerializer::new()),
            Box::new(RecordingRenderer::default()),
        )
        .unwrap()
    }

    #[test]
    fn test_pause_resume_cycle() {
        let mut engine = engine();
        assert_eq!(engine.render_state(), RenderState::Active);

        engine.send_and_wait(RequestKind::PauseRender, RequestPayload::None).unwrap();
        assert_eq!(engine.render_state(), RenderState::Paused);
        assert_eq!(engine.frame().unwrap().rendered, 0);

        engine.send_and_wait(RequestKind::ResumeRender, RequestPayload::None).unwrap();
        assert_eq!(engine.render_state(), RenderState::Active);
        assert!(!engine.request_queue().has_open_requests());
    }

    #[test]
    fn test_replace_scene_requires_pause() {
        let mut engine = engine();
        let replacement = SceneGraph::new("Other");
        assert!(matches!(engine.replace_scene(replacement.clone()), Err(EngineError::RenderActive)));

        engine.send_and_wait(RequestKind::PauseRender, RequestPayload::None).unwrap();
        let old = engine.replace_scene(replacement).unwrap();
        assert_eq!(old.root_node().name(), "DEFAULT_SCENE");
        assert_eq!(engine.scene().root_node().name(), "Other");
    }

    #[test]
    fn test_terminate_drains_later_requests() {
        let mut engine = engine();
        engine.send_and_wait(RequestKind::TerminateRender, RequestPayload::None).unwrap();

        let pause = engine.send_and_wait(RequestKind::PauseRender, RequestPayload::None).unwrap();
        assert_eq!(pause.message().as_deref(), Some("rendering terminated, request drained"));
        assert_eq!(engine.render_state(), RenderState::Terminated);
        assert!(matches!(
            engine.replace_scene(SceneGraph::new("Late")),
            Err(EngineError::Terminated)
        ));
    }

    #[test]
    fn test_window_requests_rejected_by_engine() {
        let mut engine = engine();
        let open = engine.send_and_wait(RequestKind::OpenFile, RequestPayload::None).unwrap();
        assert!(open.is_finished());
        assert_eq!(open.message().as_deref(), Some("unsupported request OPEN_FILE"));

        let load = engine.send_and_wait(RequestKind::LoadScene, RequestPayload::None).unwrap();
        assert_eq!(load.message().as_deref(), Some("invalid payload for LOAD_SCENE"));
    }

    #[test]
    fn test_frame_propagates_before_render() {
        let mut engine = engine();
        let mut selection = Selection::default();
        {
            let mut editor = engine.edit(&mut selection);
            editor.add_light("Light#1").unwrap();
        }

        let report = engine.frame().unwrap();
        assert_eq!(report.frame, 1);
        assert_eq!(report.rendered, 1);
        assert!(report.recomputed >= 2);
        assert_eq!(report.render_state, RenderState::Active);
        assert_eq!(engine.frame().unwrap().recomputed, 0);
    }

    #[test]
    fn test_snapshot_reflects_scene() {
        let mut engine = engine();
        engine.send_and_wait(RequestKind::PauseRender, RequestPayload::None).unwrap();

        let mut scene = SceneGraph::new("Snap");
        let light = scene.insert(Node::light("L"));
        scene.add_child(scene.root(), light).unwrap();
        engine.replace_scene(scene).unwrap();

        assert_eq!(engine.snapshot().node_count(), 2);
    }
}
