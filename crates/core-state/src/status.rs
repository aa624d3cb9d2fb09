//! Per-screen side channels: queued messages, the last operation report,
//! the cooperative interrupt flag and the redraw request.
//!
//! Core operations never print. They queue a [`Message`] and leave it to the
//! status-line renderer (outside the engine) to drain the queue.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

/// Severity of a queued message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MsgKind {
    /// Ring the bell; text is shown only in verbose mode.
    Bell,
    Error,
    /// Informational; suppressed when the `warn` option is off.
    Info,
    /// Always displayed, never treated as an error.
    Display,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub kind: MsgKind,
    pub text: String,
}

#[derive(Debug, Default, Clone)]
pub struct MessageQueue {
    queue: VecDeque<Message>,
}

impl MessageQueue {
    pub fn push(&mut self, kind: MsgKind, text: impl Into<String>) {
        let text = text.into();
        debug!(target: "state.msg", ?kind, %text, "msg_queued");
        self.queue.push_back(Message { kind, text });
    }

    pub fn pop(&mut self) -> Option<Message> {
        self.queue.pop_front()
    }

    pub fn drain(&mut self) -> impl Iterator<Item = Message> + '_ {
        self.queue.drain(..)
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Whether any queued message has exactly this text.
    pub fn contains(&self, text: &str) -> bool {
        self.queue.iter().any(|m| m.text == text)
    }
}

/// Operation label and affected line count for the status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Report {
    pub label: &'static str,
    pub lines: usize,
}

impl Report {
    pub const fn new(label: &'static str, lines: usize) -> Self {
        Self { label, lines }
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = if self.lines == 1 { "" } else { "s" };
        write!(f, "{} line{s} {}", self.lines, self.label)
    }
}

/// Cooperative cancel flag, polled at line granularity by long scans.
///
/// Cloning shares the flag, so a signal handler or input thread can hold a
/// clone while the command loop polls another.
#[derive(Debug, Default, Clone)]
pub struct InterruptFlag(Arc<AtomicBool>);

impl InterruptFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn interrupt(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn clear(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Everything a core operation may report besides its return value.
#[derive(Debug, Default, Clone)]
pub struct Status {
    pub messages: MessageQueue,
    pub report: Option<Report>,
    pub interrupt: InterruptFlag,
    /// A full screen repaint is needed.
    pub redraw: bool,
}

impl Status {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn msg(&mut self, kind: MsgKind, text: impl Into<String>) {
        self.messages.push(kind, text);
    }

    pub fn interrupted(&self) -> bool {
        self.interrupt.is_set()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_pluralizes() {
        assert_eq!(Report::new("put", 1).to_string(), "1 line put");
        assert_eq!(Report::new("put", 3).to_string(), "3 lines put");
    }

    #[test]
    fn interrupt_is_shared_between_clones() {
        let a = InterruptFlag::new();
        let b = a.clone();
        b.interrupt();
        assert!(a.is_set());
        a.clear();
        assert!(!b.is_set());
    }

    #[test]
    fn queue_is_fifo() {
        let mut q = MessageQueue::default();
        q.push(MsgKind::Info, "one");
        q.push(MsgKind::Error, "two");
        assert!(q.contains("two"));
        assert_eq!(q.pop().unwrap().text, "one");
        assert_eq!(q.drain().count(), 1);
        assert!(q.is_empty());
    }
}
