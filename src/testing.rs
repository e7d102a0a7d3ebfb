//! Testing utilities for code built on bytestreams
//!
//! This module provides a scriptable sink test double and a shared event
//! journal so tests can observe what a wrapper did to the sinks it owns, and
//! in which order.
//!
//! # Examples
//!
//! ## Counting calls
//!
//! ```rust
//! use std::io::Write;
//! use bytestreams::testing::MockSink;
//!
//! let (mut sink, probe) = MockSink::new().split();
//! sink.write_all(b"hello").unwrap();
//!
//! assert_eq!(probe.write_calls(), 1);
//! assert_eq!(probe.data(), b"hello");
//! ```
//!
//! ## Observing teardown order
//!
//! ```rust
//! use bytestreams::testing::{Journal, MockSink};
//! use bytestreams::Sink;
//!
//! let journal = Journal::new();
//! let (mut a, _) = MockSink::named("a", &journal).closeable().split();
//! let (mut b, _) = MockSink::named("b", &journal).closeable().split();
//!
//! b.close().unwrap();
//! a.close().unwrap();
//! assert_eq!(journal.events(), vec!["b.close", "a.close"]);
//! ```

use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;

use crate::sink::{Capabilities, Sink};

/// An ordered record of events shared between test doubles and hooks.
#[derive(Debug, Clone, Default)]
pub struct Journal {
    events: Rc<RefCell<Vec<String>>>,
}

impl Journal {
    /// Create an empty journal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event.
    pub fn record(&self, event: impl Into<String>) {
        self.events.borrow_mut().push(event.into());
    }

    /// Snapshot of all events so far.
    pub fn events(&self) -> Vec<String> {
        self.events.borrow().clone()
    }
}

#[derive(Debug, Default)]
struct MockState {
    data: Vec<u8>,
    write_calls: usize,
    close_calls: usize,
    flush_calls: usize,
}

/// A scriptable in-memory sink.
///
/// By default it accepts every byte and reports no teardown capabilities.
/// Builder methods turn on capabilities, limit how many bytes are accepted,
/// and make close or flush fail.
#[derive(Debug)]
pub struct MockSink {
    state: Rc<RefCell<MockState>>,
    capabilities: Capabilities,
    budget: Option<usize>,
    write_error: io::ErrorKind,
    close_error: Option<io::ErrorKind>,
    flush_error: Option<io::ErrorKind>,
    name: String,
    journal: Option<Journal>,
}

impl Default for MockSink {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSink {
    /// Create an anonymous mock sink.
    pub fn new() -> Self {
        MockSink {
            state: Rc::default(),
            capabilities: Capabilities::NONE,
            budget: None,
            write_error: io::ErrorKind::BrokenPipe,
            close_error: None,
            flush_error: None,
            name: String::from("mock"),
            journal: None,
        }
    }

    /// Create a mock sink recording `"<name>.close"` and `"<name>.flush"`
    /// events into `journal`.
    pub fn named(name: impl Into<String>, journal: &Journal) -> Self {
        MockSink {
            name: name.into(),
            journal: Some(journal.clone()),
            ..Self::new()
        }
    }

    /// Report the close capability.
    pub fn closeable(mut self) -> Self {
        self.capabilities.close = true;
        self
    }

    /// Report the flush capability.
    pub fn flushable(mut self) -> Self {
        self.capabilities.flush = true;
        self
    }

    /// Accept at most `limit` bytes in total; once exhausted, writes fail.
    ///
    /// A write straddling the limit is accepted partially.
    pub fn accept_at_most(mut self, limit: usize) -> Self {
        self.budget = Some(limit);
        self
    }

    /// Kind of the error returned once the byte limit is exhausted.
    pub fn write_error(mut self, kind: io::ErrorKind) -> Self {
        self.write_error = kind;
        self
    }

    /// Make `close` fail with the given kind.
    pub fn fail_close(mut self, kind: io::ErrorKind) -> Self {
        self.close_error = Some(kind);
        self
    }

    /// Make `flush` fail with the given kind.
    pub fn fail_flush(mut self, kind: io::ErrorKind) -> Self {
        self.flush_error = Some(kind);
        self
    }

    /// Get a probe observing this sink.
    pub fn probe(&self) -> MockProbe {
        MockProbe {
            state: Rc::clone(&self.state),
        }
    }

    /// Split into the sink and a probe observing it.
    pub fn split(self) -> (MockSink, MockProbe) {
        let probe = self.probe();
        (self, probe)
    }

    fn record(&self, op: &str) {
        if let Some(journal) = &self.journal {
            journal.record(format!("{}.{}", self.name, op));
        }
    }

    fn failure(&self, kind: io::ErrorKind, op: &str) -> io::Error {
        io::Error::new(kind, format!("{} {} failed", self.name, op))
    }
}

impl Write for MockSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut state = self.state.borrow_mut();
        state.write_calls += 1;
        let accepted = match self.budget {
            Some(limit) => {
                let remaining = limit.saturating_sub(state.data.len());
                if remaining == 0 && !buf.is_empty() {
                    return Err(self.failure(self.write_error, "write"));
                }
                remaining.min(buf.len())
            }
            None => buf.len(),
        };
        state.data.extend_from_slice(&buf[..accepted]);
        Ok(accepted)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.state.borrow_mut().flush_calls += 1;
        self.record("flush");
        match self.flush_error {
            Some(kind) => Err(self.failure(kind, "flush")),
            None => Ok(()),
        }
    }
}

impl Sink for MockSink {
    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    fn close(&mut self) -> io::Result<()> {
        self.state.borrow_mut().close_calls += 1;
        self.record("close");
        match self.close_error {
            Some(kind) => Err(self.failure(kind, "close")),
            None => Ok(()),
        }
    }
}

/// Read-only view of a [`MockSink`]'s counters and data.
#[derive(Debug, Clone)]
pub struct MockProbe {
    state: Rc<RefCell<MockState>>,
}

impl MockProbe {
    /// Bytes accepted so far.
    pub fn data(&self) -> Vec<u8> {
        self.state.borrow().data.clone()
    }

    /// Number of `write` calls, failed ones included.
    pub fn write_calls(&self) -> usize {
        self.state.borrow().write_calls
    }

    /// Number of `close` calls.
    pub fn close_calls(&self) -> usize {
        self.state.borrow().close_calls
    }

    /// Number of `flush` calls.
    pub fn flush_calls(&self) -> usize {
        self.state.borrow().flush_calls
    }
}

/// Assert that an `io::Result` failed with the given `io::ErrorKind`.
///
/// # Example
///
/// ```rust
/// use std::io;
/// use bytestreams::assert_kind;
///
/// let result: io::Result<()> = Err(io::Error::from(io::ErrorKind::BrokenPipe));
/// assert_kind!(result, io::ErrorKind::BrokenPipe);
/// ```
#[macro_export]
macro_rules! assert_kind {
    ($result:expr, $kind:expr) => {
        match $result {
            Err(err) => {
                assert_eq!(err.kind(), $kind, "unexpected error: {}", err);
            }
            Ok(v) => {
                panic!("Expected Err of kind {:?}, got Ok: {:?}", $kind, v);
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_accepts_everything_by_default() {
        let (mut sink, probe) = MockSink::new().split();
        sink.write_all(b"abc").unwrap();
        sink.write_all(b"def").unwrap();
        assert_eq!(probe.data(), b"abcdef");
        assert_eq!(probe.write_calls(), 2);
        assert_eq!(sink.capabilities(), Capabilities::NONE);
    }

    #[test]
    fn mock_budget_accepts_partially_then_fails() {
        let (mut sink, probe) = MockSink::new().accept_at_most(4).split();
        assert_eq!(sink.write(b"abc").unwrap(), 3);
        assert_eq!(sink.write(b"def").unwrap(), 1);
        assert_kind!(sink.write(b"ghi"), io::ErrorKind::BrokenPipe);
        assert_eq!(probe.data(), b"abcd");
        assert_eq!(probe.write_calls(), 3);
    }

    #[test]
    fn mock_scripted_teardown_failures() {
        let journal = Journal::new();
        let mut sink = MockSink::named("s", &journal)
            .closeable()
            .flushable()
            .fail_close(io::ErrorKind::NotFound)
            .fail_flush(io::ErrorKind::TimedOut);

        assert_kind!(sink.flush(), io::ErrorKind::TimedOut);
        assert_kind!(sink.close(), io::ErrorKind::NotFound);
        assert_eq!(journal.events(), vec!["s.flush", "s.close"]);
        assert_eq!(sink.capabilities(), Capabilities::ALL);
    }

    #[test]
    fn mock_error_message_names_the_sink() {
        let mut sink = MockSink::named("disk", &Journal::new()).fail_close(io::ErrorKind::Other);
        let err = sink.close().unwrap_err();
        assert_eq!(err.to_string(), "disk close failed");
    }

    #[test]
    #[should_panic(expected = "Expected Err of kind")]
    fn assert_kind_panics_on_ok() {
        let result: io::Result<u8> = Ok(1);
        assert_kind!(result, io::ErrorKind::Other);
    }
}
