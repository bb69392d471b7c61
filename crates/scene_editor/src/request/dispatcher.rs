//! Single-consumer processing discipline

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::time::{Duration, Instant};

use super::{Request, RequestError, RequestId, RequestQueue, RequestStatus};

/// What starting a request achieved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// Work is done, the request can finish now
    Finished,
    /// Work continues elsewhere; whoever does it finishes the request
    Deferred,
}

/// Kind-specific startup work for a request
pub trait RequestHandler {
    /// Start `request`, which has just been marked in progress
    fn start(&mut self, request: &Request) -> Result<Progress, RequestError>;
}

/// Anything that can run one consumer step
pub trait RequestDriver {
    /// Advance the consumer by one step
    fn drive(&mut self);
}

/// What one consumer step did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Queue was empty
    Idle,
    /// Head request was started and is still running
    Started(RequestId),
    /// Head request is still running from an earlier step
    Waiting(RequestId),
    /// Head request finished and was removed
    Completed(RequestId),
}

/// Consumer side of a [`RequestQueue`]
///
/// Only the head of the queue is ever worked on. Requests behind it stay
/// untouched until it has finished and been fetched.
#[derive(Debug, Clone, Default)]
pub struct Dispatcher {
    queue: RequestQueue,
}

impl Dispatcher {
    /// Consume `queue`
    pub fn new(queue: RequestQueue) -> Self {
        Self { queue }
    }

    /// The consumed queue
    pub const fn queue(&self) -> &RequestQueue {
        &self.queue
    }

    /// Run one consumer step
    pub fn process<H: RequestHandler + ?Sized>(&self, handler: &mut H) -> Step {
        let Some(head) = self.queue.peek() else {
            return Step::Idle;
        };
        log::trace!("Peeked {} {} ({:?})", head.kind(), head.id(), head.status());

        // only the consumer that moves the head out of Pending starts it
        let started = head.status() == RequestStatus::Pending && head.advance(RequestStatus::InProgress);
        if started {
            log::info!("Starting {} {}", head.kind(), head.id());
            match panic::catch_unwind(AssertUnwindSafe(|| handler.start(&head))) {
                Ok(Ok(Progress::Finished)) => {
                    head.finish();
                }
                Ok(Ok(Progress::Deferred)) => {}
                Ok(Err(error)) => {
                    head.finish_with_error(&error);
                }
                Err(payload) => {
                    head.finish_with_error(&RequestError::HandlerPanicked(panic_message(&*payload)));
                }
            }
        }

        if head.is_finished() {
            if !self.queue.fetch_if_head(&head) {
                log::trace!("{} {} was already removed", head.kind(), head.id());
                return Step::Idle;
            }
            match head.message() {
                Some(message) => log::info!("Finished {} {}: {message}", head.kind(), head.id()),
                None => log::info!("Finished {} {}", head.kind(), head.id()),
            }
            Step::Completed(head.id())
        } else if started {
            Step::Started(head.id())
        } else {
            Step::Waiting(head.id())
        }
    }

    /// Run steps until the queue is empty or the head is still running
    ///
    /// Returns the number of requests completed.
    pub fn run_until_blocked<H: RequestHandler + ?Sized>(&self, handler: &mut H) -> usize {
        let mut completed = 0;
        while let Step::Completed(_) = self.process(handler) {
            completed += 1;
        }
        completed
    }
}

/// Block until `request` finishes, driving the consumer in between
///
/// Each round runs one driver step and then parks on the request for at
/// most `poll_interval`, so a request finished by another thread releases
/// the caller right away.
pub fn wait_for_request<D: RequestDriver + ?Sized>(request: &Request, driver: &mut D, poll_interval: Duration) {
    while !request.is_finished() {
        driver.drive();
        if request.wait_timeout(poll_interval) {
            break;
        }
    }
}

/// [`wait_for_request`] with an upper bound on the total wait
pub fn wait_for_request_timeout<D: RequestDriver + ?Sized>(
    request: &Request,
    driver: &mut D,
    poll_interval: Duration,
    timeout: Duration,
) -> Result<(), RequestError> {
    let deadline = Instant::now() + timeout;
    while !request.is_finished() {
        let now = Instant::now();
        if now >= deadline {
            log::warn!("Gave up waiting for {} {}", request.kind(), request.id());
            return Err(RequestError::Timeout);
        }
        driver.drive();
        if request.wait_timeout(poll_interval.min(deadline - now)) {
            break;
        }
    }
    Ok(())
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{RequestKind, RequestPayload};
    use std::sync::{Arc, Mutex};
    use std::thread;

    /// Finishes everything immediately except `LoadScene`, which it defers
    #[derive(Default)]
    struct DeferLoads {
        started: Vec<RequestKind>,
    }

    impl RequestHandler for DeferLoads {
        fn start(&mut self, request: &Request) -> Result<Progress, RequestError> {
            self.started.push(request.kind());
            match request.kind() {
                RequestKind::LoadScene => Ok(Progress::Deferred),
                RequestKind::SaveScene => Err(RequestError::InvalidPayload { kind: request.kind() }),
                RequestKind::CloseWindow => panic!("window already gone"),
                _ => Ok(Progress::Finished),
            }
        }
    }

    #[test]
    fn test_head_blocks_queue_until_finished() {
        let queue = RequestQueue::new();
        let dispatcher = Dispatcher::new(queue.clone());
        let mut handler = DeferLoads::default();

        let slow = queue.issue(RequestKind::LoadScene, RequestPayload::None);
        let fast = queue.issue(RequestKind::PauseRender, RequestPayload::None);

        assert_eq!(dispatcher.process(&mut handler), Step::Started(slow.id()));
        assert_eq!(dispatcher.process(&mut handler), Step::Waiting(slow.id()));
        assert_eq!(fast.status(), RequestStatus::Pending);
        assert_eq!(handler.started, [RequestKind::LoadScene]);

        slow.finish();
        assert_eq!(dispatcher.process(&mut handler), Step::Completed(slow.id()));
        assert_eq!(dispatcher.process(&mut handler), Step::Completed(fast.id()));
        assert_eq!(dispatcher.process(&mut handler), Step::Idle);
    }

    #[test]
    fn test_errors_finish_with_message() {
        let queue = RequestQueue::new();
        let dispatcher = Dispatcher::new(queue.clone());
        let mut handler = DeferLoads::default();

        let save = queue.issue(RequestKind::SaveScene, RequestPayload::None);
        let close = queue.issue(RequestKind::CloseWindow, RequestPayload::None);

        assert_eq!(dispatcher.run_until_blocked(&mut handler), 2);
        assert!(save.is_finished());
        assert_eq!(save.message().as_deref(), Some("invalid payload for SAVE_SCENE"));
        assert!(close.is_finished());
        assert_eq!(
            close.message().as_deref(),
            Some("request handler panicked: window already gone")
        );
        assert!(!queue.has_open_requests());
    }

    /// Records every start, finishing requests on the spot
    struct SharedLog(Arc<Mutex<Vec<RequestId>>>);

    impl RequestHandler for SharedLog {
        fn start(&mut self, request: &Request) -> Result<Progress, RequestError> {
            self.0.lock().unwrap().push(request.id());
            Ok(Progress::Finished)
        }
    }

    #[test]
    fn test_competing_consumers_start_each_request_once() {
        let queue = RequestQueue::new();
        let issued: Vec<_> = (0..200)
            .map(|_| queue.issue(RequestKind::PauseRender, RequestPayload::None))
            .collect();
        let starts = Arc::new(Mutex::new(Vec::new()));

        let consumers: Vec<_> = (0..4)
            .map(|_| {
                let dispatcher = Dispatcher::new(queue.clone());
                let mut handler = SharedLog(Arc::clone(&starts));
                thread::spawn(move || {
                    let mut completed = Vec::new();
                    while dispatcher.queue().has_open_requests() {
                        if let Step::Completed(id) = dispatcher.process(&mut handler) {
                            completed.push(id);
                        }
                    }
                    completed
                })
            })
            .collect();
        let mut completed: Vec<_> = consumers.into_iter().flat_map(|c| c.join().unwrap()).collect();

        let mut starts = starts.lock().unwrap().clone();
        let mut expected: Vec<_> = issued.iter().map(Request::id).collect();
        starts.sort();
        completed.sort();
        expected.sort();
        assert_eq!(starts, expected);
        assert_eq!(completed, expected);
        assert!(issued.iter().all(Request::is_finished));
    }

    struct TickCounter {
        ticks: usize,
        finish_at: usize,
        request: Request,
    }

    impl RequestDriver for TickCounter {
        fn drive(&mut self) {
            self.ticks += 1;
            if self.ticks == 1 {
                self.request.advance(RequestStatus::InProgress);
            }
            if self.ticks == self.finish_at {
                self.request.finish();
            }
        }
    }

    #[test]
    fn test_wait_returns_after_exact_tick() {
        let request = Request::new(RequestKind::PauseRender);
        let mut driver = TickCounter { ticks: 0, finish_at: 4, request: request.clone() };

        wait_for_request(&request, &mut driver, Duration::from_millis(1));

        assert!(request.is_finished());
        assert_eq!(driver.ticks, 4);
    }

    #[test]
    fn test_wait_timeout_gives_up() {
        let request = Request::new(RequestKind::PauseRender);
        let mut driver = TickCounter { ticks: 0, finish_at: usize::MAX, request: request.clone() };

        let result = wait_for_request_timeout(
            &request,
            &mut driver,
            Duration::from_millis(1),
            Duration::from_millis(20),
        );

        assert_eq!(result, Err(RequestError::Timeout));
        assert!(!request.is_finished());
        assert!(driver.ticks > 0);
    }
}
