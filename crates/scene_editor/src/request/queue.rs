use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::{Request, RequestKind, RequestPayload};

/// FIFO of requests shared between issuers and one consumer
///
/// Cloning the queue clones the handle, not the contents.
#[derive(Debug, Clone, Default)]
pub struct RequestQueue {
    inner: Arc<Mutex<VecDeque<Request>>>,
}

impl RequestQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a request at the tail
    pub fn enqueue(&self, request: Request) {
        log::debug!("Queued {} {}", request.kind(), request.id());
        self.lock().push_back(request);
    }

    /// Create, queue and return a request
    pub fn issue(&self, kind: RequestKind, payload: RequestPayload) -> Request {
        let request = Request::with_payload(kind, payload);
        self.enqueue(request.clone());
        request
    }

    /// Whether anything is queued
    pub fn has_open_requests(&self) -> bool {
        !self.lock().is_empty()
    }

    /// Head of the queue, left in place
    pub fn peek(&self) -> Option<Request> {
        self.lock().front().cloned()
    }

    /// Remove and return the head
    pub fn fetch(&self) -> Option<Request> {
        self.lock().pop_front()
    }

    /// Remove the head only if it is `request`
    ///
    /// Returns whether it was removed.
    pub fn fetch_if_head(&self, request: &Request) -> bool {
        let mut queue = self.lock();
        if queue.front().is_some_and(|head| head.same_as(request)) {
            queue.pop_front();
            true
        } else {
            false
        }
    }

    /// Number of queued requests
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the queue is empty
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<Request>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_peek_does_not_remove() {
        let queue = RequestQueue::new();
        assert!(!queue.has_open_requests());

        let first = queue.issue(RequestKind::PauseRender, RequestPayload::None);
        queue.issue(RequestKind::ResumeRender, RequestPayload::None);

        assert!(queue.peek().unwrap().same_as(&first));
        assert!(queue.peek().unwrap().same_as(&first));
        assert_eq!(queue.len(), 2);

        assert!(queue.fetch().unwrap().same_as(&first));
        assert_eq!(queue.peek().unwrap().kind(), RequestKind::ResumeRender);
    }

    #[test]
    fn test_fetch_if_head_only_removes_that_request() {
        let queue = RequestQueue::new();
        let first = queue.issue(RequestKind::PauseRender, RequestPayload::None);
        let second = queue.issue(RequestKind::ResumeRender, RequestPayload::None);

        assert!(!queue.fetch_if_head(&second));
        assert_eq!(queue.len(), 2);
        assert!(queue.fetch_if_head(&first));
        assert!(!queue.fetch_if_head(&first));
        assert!(queue.peek().unwrap().same_as(&second));
    }

    #[test]
    fn test_clones_share_contents() {
        let queue = RequestQueue::new();
        let issuer = queue.clone();
        issuer.issue(RequestKind::CloseWindow, RequestPayload::None);
        assert!(queue.has_open_requests());
    }
}
