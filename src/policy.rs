//! Error reduction policies for teardown
//!
//! When several close or flush hooks run, each may fail. An [`ErrorPolicy`]
//! decides how two outcomes fold into one. The fold always has the shape
//! `reduce(newer, older)`: `newer` is the result of a more recently
//! contributed hook, `older` is what the hooks contributed before it
//! combined to.
//!
//! # Examples
//!
//! ```
//! use std::io;
//! use bytestreams::ErrorPolicy;
//!
//! let newer = || Some(io::Error::other("newer"));
//! let older = || Some(io::Error::other("older"));
//!
//! let first = ErrorPolicy::KeepFirst.reduce(newer(), older()).unwrap();
//! assert_eq!(first.to_string(), "older");
//!
//! let last = ErrorPolicy::KeepLast.reduce(newer(), older()).unwrap();
//! assert_eq!(last.to_string(), "newer");
//!
//! let all = ErrorPolicy::Accumulate.reduce(newer(), older()).unwrap();
//! assert_eq!(all.to_string(), "newer; older");
//! ```

use std::fmt;
use std::io;

use crate::semigroup::Semigroup;

/// A caller-supplied reduction: `(newer, older) -> combined`.
pub type Reducer = Box<dyn Fn(Option<io::Error>, Option<io::Error>) -> Option<io::Error>>;

/// Rule for combining two teardown outcomes into one.
#[derive(Default)]
pub enum ErrorPolicy {
    /// The earliest contributed failure wins.
    #[default]
    KeepFirst,
    /// The most recently contributed failure wins.
    KeepLast,
    /// Every failure is kept in an [`ErrorChain`](crate::ErrorChain), in
    /// invocation order.
    Accumulate,
    /// A caller-defined reduction.
    Custom(Reducer),
}

impl ErrorPolicy {
    /// Build a custom policy from a closure.
    ///
    /// ```
    /// use std::io;
    /// use bytestreams::ErrorPolicy;
    ///
    /// // Prefer whichever failure is not `Interrupted`.
    /// let policy = ErrorPolicy::custom(|newer, older| match (newer, older) {
    ///     (Some(n), Some(o)) if n.kind() == io::ErrorKind::Interrupted => Some(o),
    ///     (n, o) => n.or(o),
    /// });
    ///
    /// let out = policy
    ///     .reduce(
    ///         Some(io::Error::from(io::ErrorKind::Interrupted)),
    ///         Some(io::Error::from(io::ErrorKind::BrokenPipe)),
    ///     )
    ///     .unwrap();
    /// assert_eq!(out.kind(), io::ErrorKind::BrokenPipe);
    /// ```
    pub fn custom<F>(reduce: F) -> Self
    where
        F: Fn(Option<io::Error>, Option<io::Error>) -> Option<io::Error> + 'static,
    {
        ErrorPolicy::Custom(Box::new(reduce))
    }

    /// Combine the outcome of a newer hook with the combined outcome of the
    /// hooks contributed before it.
    pub fn reduce(&self, newer: Option<io::Error>, older: Option<io::Error>) -> Option<io::Error> {
        match self {
            ErrorPolicy::KeepFirst => older.or(newer),
            ErrorPolicy::KeepLast => newer.or(older),
            ErrorPolicy::Accumulate => newer.combine(older),
            ErrorPolicy::Custom(reduce) => reduce(newer, older),
        }
    }
}

impl fmt::Debug for ErrorPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorPolicy::KeepFirst => f.write_str("KeepFirst"),
            ErrorPolicy::KeepLast => f.write_str("KeepLast"),
            ErrorPolicy::Accumulate => f.write_str("Accumulate"),
            ErrorPolicy::Custom(_) => f.write_str("Custom(<function>)"),
        }
    }
}
