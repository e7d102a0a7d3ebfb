//! Proxy writer with sticky errors and byte accounting
//!
//! [`ProxyWriter`] sits in front of a [`Sink`]. The first write failure is
//! stored and every later write returns it without touching the sink again.
//! This lets a long sequence of writes skip per-call error handling and check
//! once at the end:
//!
//! ```
//! use std::io::Write;
//! use bytestreams::ProxyWriter;
//!
//! let mut pw = ProxyWriter::new(Vec::new());
//! let _ = pw.write(b"header\n");
//! let _ = pw.write_str("body\n");
//! let _ = pw.read_from(&mut &b"trailer\n"[..]);
//!
//! assert_eq!(pw.result().unwrap(), 20);
//! ```
//!
//! Close and flush go through a [`Teardown`] chain seeded with the sink's own
//! capabilities and extended by caller [`Options`]. Teardown runs whether or
//! not a write has failed.

use std::any::Any;
use std::error::Error as StdError;
use std::fmt;
use std::io::{self, Read, Write};
use std::sync::Arc;

use crate::sink::{Capabilities, Sink};
use crate::teardown::{Options, Teardown};

const COPY_BUF_SIZE: usize = 8 * 1024;

/// A write failure replayed by a [`ProxyWriter`].
///
/// Errors returned after a failure have the original's kind and message;
/// the stored original is available through [`original`](StickyError::original)
/// and as the `source()` of this error.
#[derive(Debug, Clone)]
pub struct StickyError {
    original: Arc<io::Error>,
}

impl StickyError {
    /// The error the underlying sink reported.
    pub fn original(&self) -> &io::Error {
        &self.original
    }

    /// Find the `StickyError` carried by an `io::Error`, if any.
    pub fn of(err: &io::Error) -> Option<&StickyError> {
        err.get_ref()?.downcast_ref::<StickyError>()
    }

    fn replay(&self) -> io::Error {
        io::Error::new(self.original.kind(), self.clone())
    }
}

impl fmt::Display for StickyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&*self.original, f)
    }
}

impl StdError for StickyError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(&*self.original)
    }
}

// Only `Ready -> Failed` is ever taken, once.
#[derive(Debug, Default)]
enum WriteState {
    #[default]
    Ready,
    Failed(StickyError),
}

impl WriteState {
    fn check(&self) -> io::Result<()> {
        match self {
            WriteState::Ready => Ok(()),
            WriteState::Failed(sticky) => Err(sticky.replay()),
        }
    }

    fn fail(&mut self, err: io::Error) -> io::Error {
        // Interrupted is retryable by io convention and never sticks.
        if err.kind() == io::ErrorKind::Interrupted {
            return err;
        }
        if let WriteState::Failed(sticky) = self {
            return sticky.replay();
        }
        #[cfg(feature = "tracing")]
        tracing::warn!("proxy writer failed, later writes are skipped: {}", err);
        let sticky = StickyError {
            original: Arc::new(err),
        };
        let replayed = sticky.replay();
        *self = WriteState::Failed(sticky);
        replayed
    }

    fn error(&self) -> Option<&io::Error> {
        match self {
            WriteState::Ready => None,
            WriteState::Failed(sticky) => Some(sticky.original()),
        }
    }
}

/// A writer that remembers its first failure.
///
/// # Write path
///
/// [`write`](Write::write), [`write_str`](ProxyWriter::write_str) and
/// [`read_from`](ProxyWriter::read_from) are gated the same way: once a
/// failure is stored they return it immediately; otherwise they forward to
/// the sink, add whatever it accepted to [`written`](ProxyWriter::written),
/// and store the failure if there is one. `ErrorKind::Interrupted` is passed
/// through without being stored.
///
/// # Teardown
///
/// [`Write::flush`] and [`Sink::close`] run the teardown chain. Do not write
/// after closing.
pub struct ProxyWriter {
    target: Box<dyn Sink>,
    state: WriteState,
    written: u64,
    teardown: Teardown<Box<dyn Sink>>,
}

impl ProxyWriter {
    /// Wrap `target`.
    ///
    /// If `target` already is a `ProxyWriter` it is returned as is.
    ///
    /// ```
    /// use std::io::Write;
    /// use bytestreams::ProxyWriter;
    ///
    /// let mut inner = ProxyWriter::new(Vec::new());
    /// inner.write_all(b"abc").unwrap();
    ///
    /// let outer = ProxyWriter::new(inner);
    /// assert_eq!(outer.written(), 3);
    /// ```
    pub fn new<W: Sink + 'static>(target: W) -> Self {
        Self::with_options(target, Options::new())
    }

    /// Wrap `target` with extra configuration.
    ///
    /// An existing `ProxyWriter` is reused only when `options` is empty.
    pub fn with_options<W: Sink + 'static>(target: W, options: Options) -> Self {
        let target = if options.is_empty() {
            match already_proxied(target) {
                Ok(existing) => {
                    #[cfg(feature = "tracing")]
                    tracing::trace!("reusing existing proxy writer");
                    return existing;
                }
                Err(target) => target,
            }
        } else {
            target
        };
        Self::wrap(Box::new(target), options)
    }

    fn wrap(target: Box<dyn Sink>, options: Options) -> Self {
        let capabilities = target.capabilities();
        let teardown = Teardown::configure(options, |teardown| {
            if capabilities.close {
                teardown.push_close(|target: &mut Box<dyn Sink>| target.close());
            }
            if capabilities.flush {
                teardown.push_flush(|target: &mut Box<dyn Sink>| target.flush());
            }
        });
        ProxyWriter {
            target,
            state: WriteState::Ready,
            written: 0,
            teardown,
        }
    }

    /// Write a string, gated like [`Write::write`].
    pub fn write_str(&mut self, data: &str) -> io::Result<usize> {
        self.write(data.as_bytes())
    }

    /// Copy everything from `src` into the sink, gated like [`Write::write`].
    ///
    /// Returns the number of bytes copied by this call. Read failures are
    /// stored the same way as write failures.
    pub fn read_from<R: Read + ?Sized>(&mut self, src: &mut R) -> io::Result<u64> {
        self.state.check()?;
        let mut buf = [0u8; COPY_BUF_SIZE];
        let mut copied = 0u64;
        loop {
            let n = match src.read(&mut buf) {
                Ok(0) => return Ok(copied),
                Ok(n) => n,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(self.state.fail(err)),
            };
            let mut chunk = &buf[..n];
            while !chunk.is_empty() {
                match self.target.write(chunk) {
                    Ok(0) => {
                        let err = io::Error::new(io::ErrorKind::WriteZero, "failed to write whole buffer");
                        return Err(self.state.fail(err));
                    }
                    Ok(accepted) => {
                        self.written += accepted as u64;
                        copied += accepted as u64;
                        chunk = &chunk[accepted..];
                    }
                    Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                    Err(err) => return Err(self.state.fail(err)),
                }
            }
        }
    }

    /// The stored write failure, if any.
    pub fn error(&self) -> Option<&io::Error> {
        self.state.error()
    }

    /// Whether a write failure has been stored.
    pub fn has_error(&self) -> bool {
        matches!(self.state, WriteState::Failed(_))
    }

    /// Total bytes the sink has accepted through this proxy.
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Bytes written so far, or the stored failure.
    ///
    /// Handy as the tail of a `write_to`-style function.
    pub fn result(&self) -> io::Result<u64> {
        self.state.check().map(|()| self.written)
    }

    /// The wrapped sink.
    pub fn get_ref(&self) -> &dyn Sink {
        &*self.target
    }

    /// The teardown chain.
    pub fn teardown(&self) -> &Teardown<Box<dyn Sink>> {
        &self.teardown
    }
}

// A constructor-level check for "this target is already a proxy".
fn already_proxied<W: 'static>(target: W) -> Result<ProxyWriter, W> {
    let mut slot = Some(target);
    if let Some(existing) = (&mut slot as &mut dyn Any)
        .downcast_mut::<Option<ProxyWriter>>()
        .and_then(Option::take)
    {
        return Ok(existing);
    }
    match slot {
        Some(target) => Err(target),
        None => unreachable!("target is only taken when it is a proxy"),
    }
}

impl Write for ProxyWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.state.check()?;
        match self.target.write(buf) {
            Ok(accepted) => {
                self.written += accepted as u64;
                Ok(accepted)
            }
            Err(err) => Err(self.state.fail(err)),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        self.teardown.flush(&mut self.target)
    }
}

impl Sink for ProxyWriter {
    fn capabilities(&self) -> Capabilities {
        Capabilities::ALL
    }

    fn close(&mut self) -> io::Result<()> {
        self.teardown.close(&mut self.target)
    }
}

impl fmt::Debug for ProxyWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyWriter")
            .field("state", &self.state)
            .field("written", &self.written)
            .field("teardown", &self.teardown)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assert_kind;
    use crate::testing::{Journal, MockSink};

    #[test]
    fn test_writes_forward_and_count() {
        let (mock, probe) = MockSink::new().split();
        let mut pw = ProxyWriter::new(mock);

        assert_eq!(pw.write(b"abc").unwrap(), 3);
        assert_eq!(pw.write_str("de").unwrap(), 2);
        assert_eq!(pw.read_from(&mut &b"fgh"[..]).unwrap(), 3);

        assert_eq!(probe.data(), b"abcdefgh");
        assert_eq!(pw.written(), 8);
        assert!(!pw.has_error());
        assert!(pw.error().is_none());
        assert_eq!(pw.result().unwrap(), 8);
    }

    #[test]
    fn test_failure_is_sticky_and_skips_sink() {
        let (mock, probe) = MockSink::new().accept_at_most(0).split();
        let mut pw = ProxyWriter::new(mock);

        assert_kind!(pw.write(b"x"), io::ErrorKind::BrokenPipe);
        assert_eq!(probe.write_calls(), 1);
        assert!(pw.has_error());

        assert_kind!(pw.write(b"y"), io::ErrorKind::BrokenPipe);
        assert_kind!(pw.write_str("z"), io::ErrorKind::BrokenPipe);
        assert_kind!(pw.read_from(&mut &b"w"[..]), io::ErrorKind::BrokenPipe);
        assert_eq!(probe.write_calls(), 1);
    }

    #[test]
    fn test_replayed_error_points_at_stored_original() {
        let mut pw = ProxyWriter::new(MockSink::new().accept_at_most(0));
        let first = pw.write(b"x").unwrap_err();
        let again = pw.write(b"x").unwrap_err();

        let stored = pw.error().expect("stored failure");
        for err in [&first, &again] {
            let sticky = StickyError::of(err).expect("sticky error");
            assert!(std::ptr::eq(sticky.original(), stored));
            assert_eq!(err.to_string(), stored.to_string());
            assert_eq!(err.kind(), stored.kind());
        }
    }

    #[test]
    fn test_counter_stops_at_failure() {
        let (mock, probe) = MockSink::new().accept_at_most(5).split();
        let mut pw = ProxyWriter::new(mock);

        assert_eq!(pw.write(b"abcd").unwrap(), 4);
        assert_eq!(pw.write(b"efgh").unwrap(), 1);
        assert!(pw.write(b"ijkl").is_err());
        assert!(pw.write(b"mnop").is_err());

        assert_eq!(pw.written(), 5);
        assert_eq!(probe.data(), b"abcde");
        assert!(pw.result().is_err());
    }

    #[test]
    fn test_read_from_counts_partial_progress_before_failure() {
        let (mock, _) = MockSink::new().accept_at_most(10).split();
        let mut pw = ProxyWriter::new(mock);

        let mut src = &[7u8; 64][..];
        assert_kind!(pw.read_from(&mut src), io::ErrorKind::BrokenPipe);
        assert_eq!(pw.written(), 10);
        assert!(pw.has_error());
    }

    #[test]
    fn test_read_error_becomes_sticky() {
        struct Broken;
        impl Read for Broken {
            fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::InvalidData, "bad source"))
            }
        }

        let (mock, probe) = MockSink::new().split();
        let mut pw = ProxyWriter::new(mock);
        assert_kind!(pw.read_from(&mut Broken), io::ErrorKind::InvalidData);
        assert_kind!(pw.write(b"a"), io::ErrorKind::InvalidData);
        assert_eq!(probe.write_calls(), 0);
    }

    #[test]
    fn test_interrupted_does_not_stick() {
        struct Flaky {
            interrupted: bool,
            out: Vec<u8>,
        }
        impl Write for Flaky {
            fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
                if !self.interrupted {
                    self.interrupted = true;
                    return Err(io::ErrorKind::Interrupted.into());
                }
                self.out.write(buf)
            }
            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }
        impl Sink for Flaky {}

        let mut pw = ProxyWriter::new(Flaky {
            interrupted: false,
            out: Vec::new(),
        });
        assert_kind!(pw.write(b"a"), io::ErrorKind::Interrupted);
        assert!(!pw.has_error());
        pw.write_all(b"bc").unwrap();
        assert_eq!(pw.written(), 2);
    }

    #[test]
    fn test_teardown_seeded_from_capabilities() {
        let (mock, probe) = MockSink::new().closeable().flushable().split();
        let mut pw = ProxyWriter::new(mock);
        assert_eq!((pw.teardown().closers(), pw.teardown().flushers()), (1, 1));

        pw.flush().unwrap();
        pw.close().unwrap();
        assert_eq!(probe.flush_calls(), 1);
        assert_eq!(probe.close_calls(), 1);
    }

    #[test]
    fn test_missing_capabilities_are_not_called() {
        let (mock, probe) = MockSink::new().split();
        let mut pw = ProxyWriter::new(mock);
        pw.flush().unwrap();
        pw.close().unwrap();
        assert_eq!(probe.flush_calls(), 0);
        assert_eq!(probe.close_calls(), 0);
    }

    #[test]
    fn test_teardown_runs_after_write_failure() {
        let (mock, probe) = MockSink::new().accept_at_most(0).closeable().split();
        let mut pw = ProxyWriter::new(mock);
        assert!(pw.write(b"x").is_err());
        pw.close().unwrap();
        assert_eq!(probe.close_calls(), 1);
    }

    #[test]
    fn test_target_closes_after_option_hooks() {
        let journal = Journal::new();
        let hook_journal = journal.clone();
        let options = Options::new().with_close(move || {
            hook_journal.record("hook.close");
            Ok(())
        });
        let mut pw = ProxyWriter::with_options(MockSink::named("target", &journal).closeable(), options);
        pw.close().unwrap();
        assert_eq!(journal.events(), vec!["hook.close", "target.close"]);
    }

    #[test]
    fn test_collapse_only_without_options() {
        let inner = ProxyWriter::new(MockSink::new());
        let same = ProxyWriter::new(inner);
        assert_eq!(same.teardown().closers(), 0);

        let nested = ProxyWriter::with_options(same, Options::new().keep_last_error());
        // The inner proxy always reports close and flush.
        assert_eq!(nested.teardown().closers(), 1);
        assert_eq!(nested.teardown().flushers(), 1);
    }

    #[test]
    fn test_collapse_keeps_state() {
        let mut inner = ProxyWriter::new(MockSink::new().accept_at_most(0));
        assert!(inner.write(b"x").is_err());
        let outer = ProxyWriter::new(inner);
        assert!(outer.has_error());
    }

    #[cfg(feature = "tracing")]
    mod tracing_tests {
        use super::*;
        use tracing_test::traced_test;

        #[test]
        #[traced_test]
        fn test_sticky_failure_is_logged() {
            let mut pw = ProxyWriter::new(MockSink::new().accept_at_most(0));
            let _ = pw.write(b"x");
            assert!(logs_contain("later writes are skipped"));
        }
    }
}
