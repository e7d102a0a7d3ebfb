//! Close and flush hook chains
//!
//! A [`Teardown`] holds two append-only lists of hooks, one for close and one
//! for flush, and a single [`ErrorPolicy`]. Running a list calls every hook
//! exactly once, most recently contributed first, and never stops early:
//! a failing hook does not keep older hooks from running.
//!
//! Outcomes fold as `reduce(newer, older)`, where `older` is the combined
//! outcome of every hook contributed before `newer`'s hook:
//!
//! ```text
//! reduce(h_n, reduce(h_n-1, ... reduce(h_1, None)))
//! ```
//!
//! [`Options`] is the caller-facing configuration: a policy plus extra hooks,
//! handed to [`ProxyWriter`](crate::ProxyWriter) or
//! [`StackWriter`](crate::StackWriter) at construction.
//!
//! # Examples
//!
//! ```
//! use std::io;
//! use bytestreams::{ErrorPolicy, Teardown};
//!
//! let mut teardown: Teardown<()> = Teardown::new(ErrorPolicy::KeepFirst);
//! teardown.push_close(|_| Err(io::Error::other("err1")));
//! teardown.push_close(|_| Ok(()));
//! teardown.push_close(|_| Err(io::Error::other("err3")));
//!
//! let err = teardown.close(&mut ()).unwrap_err();
//! assert_eq!(err.to_string(), "err1");
//! ```

use std::fmt;
use std::io::{self, Write};

use crate::policy::ErrorPolicy;
use crate::sink::Sink;

/// One contributed close or flush operation.
///
/// The argument is whatever the owning wrapper passes at teardown time; hooks
/// that need nothing from it ignore it.
pub type Hook<T> = Box<dyn FnMut(&mut T) -> io::Result<()>>;

type Callback = Box<dyn FnMut() -> io::Result<()>>;

/// Ordered close and flush hooks folded through one [`ErrorPolicy`].
pub struct Teardown<T: ?Sized> {
    policy: ErrorPolicy,
    on_close: Vec<Hook<T>>,
    on_flush: Vec<Hook<T>>,
}

impl<T: ?Sized + 'static> Teardown<T> {
    /// Create an empty chain with the given policy.
    pub fn new(policy: ErrorPolicy) -> Self {
        Teardown {
            policy,
            on_close: Vec::new(),
            on_flush: Vec::new(),
        }
    }

    /// Build a chain from caller options.
    ///
    /// `seed` contributes the wrapped resource's own hooks first, so that
    /// caller hooks are newer and run before them.
    pub(crate) fn configure(options: Options, seed: impl FnOnce(&mut Self)) -> Self {
        let Options {
            policy,
            on_close,
            on_flush,
        } = options;
        let mut teardown = Teardown::new(policy.unwrap_or_default());
        seed(&mut teardown);
        for mut hook in on_close {
            teardown.push_close(move |_| hook());
        }
        for mut hook in on_flush {
            teardown.push_flush(move |_| hook());
        }
        teardown
    }

    /// Contribute a close hook.
    pub fn push_close<F>(&mut self, hook: F)
    where
        F: FnMut(&mut T) -> io::Result<()> + 'static,
    {
        self.on_close.push(Box::new(hook));
    }

    /// Contribute a flush hook.
    pub fn push_flush<F>(&mut self, hook: F)
    where
        F: FnMut(&mut T) -> io::Result<()> + 'static,
    {
        self.on_flush.push(Box::new(hook));
    }

    /// Run every close hook and fold their outcomes.
    pub fn close(&mut self, target: &mut T) -> io::Result<()> {
        run(&self.policy, &mut self.on_close, target, "close")
    }

    /// Run every flush hook and fold their outcomes.
    pub fn flush(&mut self, target: &mut T) -> io::Result<()> {
        run(&self.policy, &mut self.on_flush, target, "flush")
    }
}

impl<T: ?Sized> Teardown<T> {
    /// The reduction policy, fixed for the chain's lifetime.
    pub fn policy(&self) -> &ErrorPolicy {
        &self.policy
    }

    /// Number of close hooks.
    pub fn closers(&self) -> usize {
        self.on_close.len()
    }

    /// Number of flush hooks.
    pub fn flushers(&self) -> usize {
        self.on_flush.len()
    }
}

fn run<T: ?Sized>(
    policy: &ErrorPolicy,
    hooks: &mut [Hook<T>],
    target: &mut T,
    op: &str,
) -> io::Result<()> {
    let outcomes: Vec<Option<io::Error>> = hooks
        .iter_mut()
        .rev()
        .map(|hook| {
            let outcome = hook(&mut *target).err();
            if let Some(err) = &outcome {
                log_failure(op, err);
            }
            outcome
        })
        .collect();

    match outcomes
        .into_iter()
        .rev()
        .fold(None, |older, newer| policy.reduce(newer, older))
    {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

#[cfg(feature = "tracing")]
fn log_failure(op: &str, err: &io::Error) {
    tracing::debug!("teardown {} hook failed: {}", op, err);
}

#[cfg(not(feature = "tracing"))]
fn log_failure(_op: &str, _err: &io::Error) {}

impl<T: ?Sized> fmt::Debug for Teardown<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Teardown")
            .field("policy", &self.policy)
            .field("closers", &self.on_close.len())
            .field("flushers", &self.on_flush.len())
            .finish()
    }
}

/// Construction-time configuration for wrappers.
///
/// Hooks are contributed in the order they are added, after the wrapped
/// sink's own capabilities. An `Options` with nothing set is
/// [empty](Options::is_empty), which lets [`ProxyWriter`](crate::ProxyWriter)
/// reuse an existing proxy instead of nesting a new one.
///
/// ```
/// use std::io;
/// use bytestreams::{Options, ProxyWriter, Sink};
///
/// let options = Options::new()
///     .accumulate_errors()
///     .with_close(|| Err(io::Error::other("release lock")))
///     .with_close(|| Err(io::Error::other("drop temp file")));
///
/// let mut pw = ProxyWriter::with_options(Vec::new(), options);
/// let err = pw.close().unwrap_err();
/// assert_eq!(err.to_string(), "drop temp file; release lock");
/// ```
#[derive(Default)]
pub struct Options {
    policy: Option<ErrorPolicy>,
    on_close: Vec<Callback>,
    on_flush: Vec<Callback>,
}

impl Options {
    /// Create empty options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether no policy and no hooks have been set.
    pub fn is_empty(&self) -> bool {
        self.policy.is_none() && self.on_close.is_empty() && self.on_flush.is_empty()
    }

    /// Use the given reduction policy.
    pub fn with_policy(mut self, policy: ErrorPolicy) -> Self {
        self.policy = Some(policy);
        self
    }

    /// Keep only the earliest contributed failure. This is the default.
    pub fn keep_first_error(self) -> Self {
        self.with_policy(ErrorPolicy::KeepFirst)
    }

    /// Keep only the most recently contributed failure.
    pub fn keep_last_error(self) -> Self {
        self.with_policy(ErrorPolicy::KeepLast)
    }

    /// Keep every failure in an [`ErrorChain`](crate::ErrorChain).
    pub fn accumulate_errors(self) -> Self {
        self.with_policy(ErrorPolicy::Accumulate)
    }

    /// Resolve failures with a caller-defined `(newer, older)` reduction.
    pub fn with_error_reducer<F>(self, reduce: F) -> Self
    where
        F: Fn(Option<io::Error>, Option<io::Error>) -> Option<io::Error> + 'static,
    {
        self.with_policy(ErrorPolicy::custom(reduce))
    }

    /// Add a close hook.
    pub fn with_close<F>(mut self, hook: F) -> Self
    where
        F: FnMut() -> io::Result<()> + 'static,
    {
        self.on_close.push(Box::new(hook));
        self
    }

    /// Add a flush hook.
    pub fn with_flush<F>(mut self, hook: F) -> Self
    where
        F: FnMut() -> io::Result<()> + 'static,
    {
        self.on_flush.push(Box::new(hook));
        self
    }

    /// Take ownership of `closer` and close it on teardown.
    pub fn with_closer<C: Sink + 'static>(self, mut closer: C) -> Self {
        self.with_close(move || closer.close())
    }

    /// Take ownership of `flusher` and flush it on teardown.
    pub fn with_flusher<W: Write + 'static>(self, mut flusher: W) -> Self {
        self.with_flush(move || flusher.flush())
    }
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options")
            .field("policy", &self.policy)
            .field("closers", &self.on_close.len())
            .field("flushers", &self.on_flush.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Journal;
    use crate::ErrorChain;

    fn outcome(journal: &Journal, name: &'static str, fail: bool) -> impl FnMut(&mut ()) -> io::Result<()> {
        let journal = journal.clone();
        move |_| {
            journal.record(name);
            if fail {
                Err(io::Error::other(name))
            } else {
                Ok(())
            }
        }
    }

    fn three_closers(policy: ErrorPolicy) -> (Teardown<()>, Journal) {
        let journal = Journal::new();
        let mut teardown = Teardown::new(policy);
        teardown.push_close(outcome(&journal, "err1", true));
        teardown.push_close(outcome(&journal, "nil", false));
        teardown.push_close(outcome(&journal, "err3", true));
        (teardown, journal)
    }

    #[test]
    fn test_every_hook_runs_once_newest_first() {
        let (mut teardown, journal) = three_closers(ErrorPolicy::KeepFirst);
        let _ = teardown.close(&mut ());
        assert_eq!(journal.events(), vec!["err3", "nil", "err1"]);
    }

    #[test]
    fn test_keep_first_returns_earliest_contributed() {
        let (mut teardown, _) = three_closers(ErrorPolicy::KeepFirst);
        assert_eq!(teardown.close(&mut ()).unwrap_err().to_string(), "err1");
    }

    #[test]
    fn test_keep_last_returns_latest_contributed() {
        let (mut teardown, _) = three_closers(ErrorPolicy::KeepLast);
        assert_eq!(teardown.close(&mut ()).unwrap_err().to_string(), "err3");
    }

    #[test]
    fn test_accumulate_returns_invocation_order() {
        let (mut teardown, _) = three_closers(ErrorPolicy::Accumulate);
        let err = teardown.close(&mut ()).unwrap_err();
        let chain = ErrorChain::as_chain(&err).expect("chain of failures");
        let names: Vec<String> = chain.iter().map(|e| e.to_string()).collect();
        assert_eq!(names, vec!["err3", "err1"]);
    }

    #[test]
    fn test_empty_chain_succeeds() {
        let mut teardown: Teardown<()> = Teardown::new(ErrorPolicy::Accumulate);
        assert!(teardown.close(&mut ()).is_ok());
        assert!(teardown.flush(&mut ()).is_ok());
    }

    #[test]
    fn test_close_and_flush_are_independent_lists() {
        let journal = Journal::new();
        let mut teardown = Teardown::new(ErrorPolicy::KeepFirst);
        teardown.push_close(outcome(&journal, "close", false));
        teardown.push_flush(outcome(&journal, "flush", true));

        assert!(teardown.close(&mut ()).is_ok());
        assert!(teardown.flush(&mut ()).is_err());
        assert_eq!(journal.events(), vec!["close", "flush"]);
        assert_eq!((teardown.closers(), teardown.flushers()), (1, 1));
    }

    #[test]
    fn test_repeated_runs_invoke_hooks_again() {
        let (mut teardown, journal) = three_closers(ErrorPolicy::KeepFirst);
        let _ = teardown.close(&mut ());
        let _ = teardown.close(&mut ());
        assert_eq!(journal.events().len(), 6);
    }

    #[test]
    fn test_hooks_receive_target() {
        let mut teardown: Teardown<Vec<u8>> = Teardown::new(ErrorPolicy::KeepFirst);
        teardown.push_flush(|buf| buf.write_all(b"1"));
        teardown.push_flush(|buf| buf.write_all(b"2"));

        let mut target = Vec::new();
        teardown.flush(&mut target).unwrap();
        assert_eq!(target, b"21");
    }

    #[test]
    fn test_custom_reducer_sees_newer_and_older() {
        let (mut teardown, _) = three_closers(ErrorPolicy::custom(|newer, older| match (newer, older) {
            (Some(n), Some(o)) => Some(io::Error::other(format!("{}+{}", n, o))),
            (n, o) => n.or(o),
        }));
        assert_eq!(teardown.close(&mut ()).unwrap_err().to_string(), "err3+err1");
    }

    #[test]
    fn test_configure_seeds_before_option_hooks() {
        let journal = Journal::new();
        let options = Options::new()
            .with_close({
                let journal = journal.clone();
                move || {
                    journal.record("option");
                    Ok(())
                }
            })
            .keep_last_error();
        assert!(!options.is_empty());

        let mut teardown: Teardown<()> = Teardown::configure(options, |t| {
            t.push_close(outcome(&journal, "seed", false));
        });
        teardown.close(&mut ()).unwrap();

        assert_eq!(journal.events(), vec!["option", "seed"]);
        assert!(matches!(teardown.policy(), ErrorPolicy::KeepLast));
    }

    #[test]
    fn test_options_default_is_empty() {
        assert!(Options::new().is_empty());
        assert!(!Options::new().keep_first_error().is_empty());
        assert!(!Options::new().with_flush(|| Ok(())).is_empty());
    }

    #[test]
    fn test_with_flusher_owns_writer() {
        let (mock, probe) = crate::testing::MockSink::new().split();
        let mut teardown: Teardown<()> =
            Teardown::configure(Options::new().with_flusher(mock), |_| {});
        teardown.flush(&mut ()).unwrap();
        assert_eq!(probe.flush_calls(), 1);
    }
}
