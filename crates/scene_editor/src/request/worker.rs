//! Background worker for long-running request work
//!
//! Scene (de)serialization runs on a dedicated thread so the UI keeps
//! driving frames while a file loads. The worker only sees the data carried
//! by each [`WorkJob`]; it never touches the live scene graph. It finishes
//! the job's request itself, with an outcome or an error message.

use std::path::PathBuf;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam::channel::{unbounded, Receiver, Sender};

use super::{Request, RequestError, RequestOutcome};
use crate::persistence::{SceneDocument, SceneSerializer};

/// Work handed to the background thread
#[derive(Debug)]
pub enum WorkJob {
    /// Read a scene file
    LoadScene {
        /// Request finished by the worker
        request: Request,
        /// Source file
        path: PathBuf,
    },
    /// Write a scene snapshot
    SaveScene {
        /// Request finished by the worker
        request: Request,
        /// Destination file
        path: PathBuf,
        /// Snapshot taken on the UI side
        document: SceneDocument,
    },
}

impl WorkJob {
    /// Request this job completes
    pub const fn request(&self) -> &Request {
        match self {
            Self::LoadScene { request, .. } | Self::SaveScene { request, .. } => request,
        }
    }
}

/// Worker errors
#[derive(thiserror::Error, Debug)]
pub enum WorkerError {
    /// The worker thread is gone
    #[error("worker thread disconnected")]
    Disconnected,

    /// The worker thread could not be started
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Owner of the background worker thread
#[derive(Debug)]
pub struct WorkDispatcher {
    sender: Option<Sender<WorkJob>>,
    handle: Option<JoinHandle<()>>,
}

impl WorkDispatcher {
    /// Start the worker thread
    pub fn spawn(serializer: Arc<dyn SceneSerializer>) -> Result<Self, WorkerError> {
        let (sender, receiver) = unbounded();
        let handle = thread::Builder::new()
            .name("scene-worker".to_string())
            .spawn(move || run(&receiver, serializer.as_ref()))?;
        log::info!("Scene worker started");
        Ok(Self {
            sender: Some(sender),
            handle: Some(handle),
        })
    }

    /// Hand a job to the worker
    ///
    /// If the worker is gone the job's request is finished with a message
    /// so no waiter stays blocked on it.
    pub fn submit(&self, job: WorkJob) -> Result<(), WorkerError> {
        let Some(sender) = &self.sender else {
            job.request().finish_with_message(WorkerError::Disconnected.to_string());
            return Err(WorkerError::Disconnected);
        };
        sender.send(job).map_err(|error| {
            error.0.request().finish_with_message(WorkerError::Disconnected.to_string());
            WorkerError::Disconnected
        })
    }

    /// Whether the worker thread is still running
    pub fn is_alive(&self) -> bool {
        self.handle.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    /// Stop accepting jobs and join the thread after it drains its queue
    pub fn shutdown(&mut self) {
        self.sender.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("Scene worker panicked");
            } else {
                log::info!("Scene worker stopped");
            }
        }
    }
}

impl Drop for WorkDispatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run(receiver: &Receiver<WorkJob>, serializer: &dyn SceneSerializer) {
    for job in receiver {
        match job {
            WorkJob::LoadScene { request, path } => {
                log::debug!("Loading scene from {}", path.display());
                match serializer.load(&path) {
                    Ok(graph) => {
                        request.note(format!("Loaded {}", path.display()));
                        request.finish_with_outcome(RequestOutcome::Scene(graph));
                    }
                    Err(error) => {
                        request.finish_with_error(&RequestError::Persistence(error.to_string()));
                    }
                }
            }
            WorkJob::SaveScene { request, path, document } => {
                log::debug!("Saving scene to {}", path.display());
                match serializer.save(&document, &path) {
                    Ok(()) => {
                        request.finish_with_message(format!("Saved {}", path.display()));
                    }
                    Err(error) => {
                        request.finish_with_error(&RequestError::Persistence(error.to_string()));
                    }
                }
            }
        }
    }
}
