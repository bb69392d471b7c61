//! Cross-context request protocol
//!
//! A [`Request`] is issued by the UI side, queued on a [`RequestQueue`] and
//! advanced by exactly one consumer through a [`Dispatcher`]. Its status
//! only ever moves forward:
//!
//! ```text
//! Pending ──▶ InProgress ──▶ Finished
//! ```
//!
//! Failures never leave a request stuck. They finish it with a message on
//! the side channel so that anyone blocked in [`wait_for_request`] is
//! released.

mod queue;
mod dispatcher;
mod worker;

pub use queue::RequestQueue;
pub use dispatcher::{
    wait_for_request, wait_for_request_timeout, Dispatcher, Progress, RequestDriver,
    RequestHandler, Step,
};
pub use worker::{WorkDispatcher, WorkJob, WorkerError};

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::persistence::SceneDocument;
use crate::scene::SceneGraph;

static NEXT_REQUEST_ID: AtomicU64 = AtomicU64::new(1);

/// Request identity, used for logging
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "req-{}", self.0)
    }
}

/// Request lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RequestStatus {
    /// Queued, not yet looked at by the consumer
    Pending,
    /// Started by the consumer, possibly handed to a worker
    InProgress,
    /// Done; the consumer may drop it from the queue
    Finished,
}

/// Closed set of request kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    /// Idle the render loop
    PauseRender,
    /// Restart the render loop
    ResumeRender,
    /// Stop rendering for good; later requests are drained
    TerminateRender,
    /// Deserialize a scene on the worker
    LoadScene,
    /// Serialize a scene on the worker
    SaveScene,
    /// Open a scene file in the editor window
    OpenFile,
    /// Close the editor window
    CloseWindow,
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::PauseRender => "PAUSE_RENDER",
            Self::ResumeRender => "RESUME_RENDER",
            Self::TerminateRender => "TERMINATE_RENDER",
            Self::LoadScene => "LOAD_SCENE",
            Self::SaveScene => "SAVE_SCENE",
            Self::OpenFile => "OPEN_FILE",
            Self::CloseWindow => "CLOSE_WINDOW",
        };
        f.write_str(name)
    }
}

/// Kind-dependent request data
#[derive(Debug, Clone, Default)]
pub enum RequestPayload {
    /// No data
    #[default]
    None,
    /// A file path
    Path(PathBuf),
    /// A scene snapshot and where to write it
    Document {
        /// Destination
        path: PathBuf,
        /// Scene snapshot
        document: SceneDocument,
    },
}

impl RequestPayload {
    /// Path carried by the payload, if any
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::None => None,
            Self::Path(path) | Self::Document { path, .. } => Some(path),
        }
    }
}

/// Value produced by the consumer for the issuer
#[derive(Debug)]
pub enum RequestOutcome {
    /// A freshly loaded scene
    Scene(SceneGraph),
}

/// Failures absorbed into a finished request
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RequestError {
    /// The consumer has no handler for this kind
    #[error("unsupported request {0}")]
    Unsupported(RequestKind),

    /// Payload missing or of the wrong shape
    #[error("invalid payload for {kind}")]
    InvalidPayload {
        /// Request kind
        kind: RequestKind,
    },

    /// Scene (de)serialization failed
    #[error("persistence failed: {0}")]
    Persistence(String),

    /// Rendering was terminated before this request ran
    #[error("rendering terminated, request drained")]
    Drained,

    /// Waiting gave up before the request finished
    #[error("timed out waiting for request")]
    Timeout,

    /// The handler panicked while starting the request
    #[error("request handler panicked: {0}")]
    HandlerPanicked(String),
}

#[derive(Debug)]
struct RequestState {
    status: RequestStatus,
    message: Option<String>,
    outcome: Option<RequestOutcome>,
}

#[derive(Debug)]
struct RequestInner {
    id: RequestId,
    kind: RequestKind,
    payload: RequestPayload,
    state: Mutex<RequestState>,
    finished: Condvar,
}

/// Shared handle to one request
///
/// Clones refer to the same request; the issuer keeps one and the queue
/// holds another.
#[derive(Debug, Clone)]
pub struct Request(Arc<RequestInner>);

impl Request {
    /// Create a pending request without payload
    pub fn new(kind: RequestKind) -> Self {
        Self::with_payload(kind, RequestPayload::None)
    }

    /// Create a pending request
    pub fn with_payload(kind: RequestKind, payload: RequestPayload) -> Self {
        let id = RequestId(NEXT_REQUEST_ID.fetch_add(1, Ordering::Relaxed));
        Self(Arc::new(RequestInner {
            id,
            kind,
            payload,
            state: Mutex::new(RequestState {
                status: RequestStatus::Pending,
                message: None,
                outcome: None,
            }),
            finished: Condvar::new(),
        }))
    }

    /// Request identity
    pub fn id(&self) -> RequestId {
        self.0.id
    }

    /// Request kind
    pub fn kind(&self) -> RequestKind {
        self.0.kind
    }

    /// Request payload
    pub fn payload(&self) -> &RequestPayload {
        &self.0.payload
    }

    /// Current status
    pub fn status(&self) -> RequestStatus {
        self.lock().status
    }

    /// Whether the request has finished
    pub fn is_finished(&self) -> bool {
        self.status() == RequestStatus::Finished
    }

    /// Side-channel status message
    pub fn message(&self) -> Option<String> {
        self.lock().message.clone()
    }

    /// Whether both handles refer to the same request
    pub fn same_as(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Move the status forward
    ///
    /// Returns `false` and leaves the status alone when `status` is not
    /// ahead of the current one.
    pub fn advance(&self, status: RequestStatus) -> bool {
        let mut state = self.lock();
        if status <= state.status {
            if status < state.status {
                log::warn!(
                    "Ignoring status regression of {} {} from {:?} to {:?}",
                    self.kind(),
                    self.id(),
                    state.status,
                    status
                );
            }
            return false;
        }
        state.status = status;
        drop(state);

        if status == RequestStatus::Finished {
            self.0.finished.notify_all();
        }
        true
    }

    /// Set the side-channel message
    pub fn note(&self, message: impl Into<String>) {
        self.lock().message = Some(message.into());
    }

    /// Mark the request finished
    pub fn finish(&self) -> bool {
        self.advance(RequestStatus::Finished)
    }

    /// Finish with a status message
    ///
    /// A request that has already finished keeps its first message.
    pub fn finish_with_message(&self, message: impl Into<String>) -> bool {
        self.finish_with(|state| state.message = Some(message.into()))
    }

    /// Finish with a failure recorded on the side channel
    pub fn finish_with_error(&self, error: &RequestError) -> bool {
        log::error!("{} {} failed: {error}", self.kind(), self.id());
        self.finish_with_message(error.to_string())
    }

    /// Finish with a value for the issuer
    ///
    /// The outcome is dropped if the request has already finished.
    pub fn finish_with_outcome(&self, outcome: RequestOutcome) -> bool {
        self.finish_with(|state| state.outcome = Some(outcome))
    }

    fn finish_with(&self, update: impl FnOnce(&mut RequestState)) -> bool {
        let mut state = self.lock();
        if state.status == RequestStatus::Finished {
            return false;
        }
        update(&mut state);
        state.status = RequestStatus::Finished;
        drop(state);

        self.0.finished.notify_all();
        true
    }

    /// Take the value produced by the consumer
    pub fn take_outcome(&self) -> Option<RequestOutcome> {
        self.lock().outcome.take()
    }

    /// Block until finished, without driving the consumer
    pub fn wait(&self) {
        let state = self.lock();
        let _state = self
            .0
            .finished
            .wait_while(state, |s| s.status != RequestStatus::Finished)
            .unwrap_or_else(PoisonError::into_inner);
    }

    /// Block until finished or the timeout elapses
    ///
    /// Returns whether the request is finished.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let state = self.lock();
        let (state, _) = self
            .0
            .finished
            .wait_timeout_while(state, timeout, |s| s.status != RequestStatus::Finished)
            .unwrap_or_else(PoisonError::into_inner);
        state.status == RequestStatus::Finished
    }

    fn lock(&self) -> MutexGuard<'_, RequestState> {
        self.0.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
