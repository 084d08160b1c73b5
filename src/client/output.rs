use std::collections::VecDeque;

use super::decode::InboundMessage;
use super::observer::FeedObserver;

/// Appended after every rendered line
pub const LINE_BREAK: &str = "\r\n";

/// Append-only output region holding at most `capacity` lines.
///
/// When full, appending evicts the oldest line.
#[derive(Debug, Clone)]
pub struct OutputBuffer {
    lines: VecDeque<String>,
    capacity: usize,
    evicted: u64,
}

impl OutputBuffer {
    /// Create a buffer; a capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            lines: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
            evicted: 0,
        }
    }

    pub fn append(&mut self, text: impl Into<String>) {
        if self.lines.len() == self.capacity {
            self.lines.pop_front();
            self.evicted += 1;
        }
        self.lines.push_back(text.into());
    }

    /// Retained lines, oldest first
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(String::as_str)
    }

    pub fn last(&self) -> Option<&str> {
        self.lines.back().map(String::as_str)
    }

    /// Concatenation of every retained line, each followed by CRLF
    pub fn render(&self) -> String {
        let size = self.lines.iter().map(|l| l.len() + LINE_BREAK.len()).sum();
        let mut out = String::with_capacity(size);
        for line in &self.lines {
            out.push_str(line);
            out.push_str(LINE_BREAK);
        }
        out
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of lines dropped to stay within capacity
    pub fn evicted(&self) -> u64 {
        self.evicted
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }
}

impl FeedObserver for OutputBuffer {
    fn on_message(&mut self, message: &InboundMessage) {
        self.append(message.message.as_str());
        tracing::debug!(payload = %message.payload, "Rendered message");
    }
}
