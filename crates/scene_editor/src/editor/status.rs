use std::collections::VecDeque;

use crate::request::Request;

/// Bounded log of status lines shown by the editor
#[derive(Debug, Clone)]
pub struct StatusLog {
    lines: VecDeque<String>,
    capacity: usize,
}

impl StatusLog {
    /// Keep at most `capacity` lines, at least one
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            lines: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a line, dropping the oldest when full
    pub fn push(&mut self, line: impl Into<String>) {
        if self.lines.len() == self.capacity {
            self.lines.pop_front();
        }
        self.lines.push_back(line.into());
    }

    /// Record how a request ended
    pub fn record(&mut self, request: &Request) {
        let line = match request.message() {
            Some(message) => format!("{} {}: {message}", request.kind(), request.id()),
            None => format!("{} {}: {:?}", request.kind(), request.id(), request.status()),
        };
        self.push(line);
    }

    /// Lines, oldest first
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(String::as_str)
    }

    /// Most recent line, shown in the status bar
    pub fn last(&self) -> Option<&str> {
        self.lines.back().map(String::as_str)
    }

    /// Number of lines kept
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Whether nothing was logged
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::RequestKind;

    #[test]
    fn test_oldest_lines_dropped() {
        let mut log = StatusLog::new(2);
        log.push("one");
        log.push("two");
        log.push("three");
        assert_eq!(log.lines().collect::<Vec<_>>(), ["two", "three"]);
        assert_eq!(log.last(), Some("three"));
    }

    #[test]
    fn test_record_uses_message() {
        let mut log = StatusLog::new(4);
        let request = Request::new(RequestKind::SaveScene);
        request.finish_with_message("Saved scene.ron");
        log.record(&request);
        assert!(log.last().unwrap().ends_with(": Saved scene.ron"));
        assert!(log.last().unwrap().starts_with("SAVE_SCENE req-"));
    }
}
