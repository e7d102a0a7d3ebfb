//! Aggregate of independent errors
//!
//! `ErrorChain` is what the [`Accumulate`](crate::ErrorPolicy::Accumulate)
//! policy produces when several teardown hooks fail. Unlike a context trail
//! (one error wrapped by many messages), the members of a chain are siblings:
//! none of them caused the others.
//!
//! Chains travel through `io::Result` by conversion into an `io::Error` of
//! kind `Other`; [`ErrorChain::as_chain`] recovers them on the other side.
//!
//! # Examples
//!
//! ```
//! use std::io;
//! use bytestreams::ErrorChain;
//!
//! let chain = ErrorChain::concat(
//!     io::Error::new(io::ErrorKind::BrokenPipe, "flush failed"),
//!     io::Error::new(io::ErrorKind::NotFound, "close failed"),
//! );
//!
//! assert_eq!(chain.to_string(), "flush failed; close failed");
//! assert!(chain.contains_kind(io::ErrorKind::NotFound));
//! assert!(!chain.contains_kind(io::ErrorKind::TimedOut));
//! ```

use std::error::Error as StdError;
use std::fmt;
use std::io;

/// An ordered collection of independent errors.
///
/// Order is occurrence order. A chain never holds another chain as a member:
/// [`concat`](ErrorChain::concat) splices nested chains in.
#[derive(Debug, Default)]
pub struct ErrorChain {
    errors: Vec<io::Error>,
}

impl ErrorChain {
    /// Create an empty chain.
    pub fn new() -> Self {
        Self { errors: Vec::new() }
    }

    /// Concatenate two errors into one chain.
    ///
    /// The elements of `a` come first, then the elements of `b`. Either
    /// operand that carries an `ErrorChain` is flattened into the result;
    /// two plain errors give the two-element chain `[a, b]`.
    ///
    /// ```
    /// use std::io;
    /// use bytestreams::ErrorChain;
    ///
    /// let ab: io::Error = ErrorChain::concat(io::Error::other("a"), io::Error::other("b")).into();
    /// let abc = ErrorChain::concat(ab, io::Error::other("c"));
    ///
    /// assert_eq!(abc.len(), 3);
    /// assert_eq!(abc.to_string(), "a; b; c");
    /// ```
    pub fn concat(a: io::Error, b: io::Error) -> Self {
        let mut errors = splice(a);
        errors.extend(splice(b));
        Self { errors }
    }

    /// Borrow the chain carried by an `io::Error`, if any.
    pub fn as_chain(err: &io::Error) -> Option<&ErrorChain> {
        err.get_ref()?.downcast_ref::<ErrorChain>()
    }

    /// Take the chain out of an `io::Error`, or give the error back.
    pub fn from_io(err: io::Error) -> Result<ErrorChain, io::Error> {
        if Self::as_chain(&err).is_none() {
            return Err(err);
        }
        let kind = err.kind();
        match err.into_inner().map(|inner| inner.downcast::<ErrorChain>()) {
            Some(Ok(chain)) => Ok(*chain),
            Some(Err(inner)) => Err(io::Error::new(kind, inner)),
            None => Err(io::Error::from(kind)),
        }
    }

    /// Number of member errors.
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Whether the chain has no members.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Iterate over the members in occurrence order.
    pub fn iter(&self) -> std::slice::Iter<'_, io::Error> {
        self.errors.iter()
    }

    /// The members as a slice.
    pub fn errors(&self) -> &[io::Error] {
        &self.errors
    }

    /// Consume the chain, returning its members.
    pub fn into_errors(self) -> Vec<io::Error> {
        self.errors
    }

    /// Whether any member, or any cause of a member, has the given kind.
    ///
    /// Nested chains are searched recursively.
    pub fn contains_kind(&self, kind: io::ErrorKind) -> bool {
        self.search(&mut |node| {
            node.downcast_ref::<io::Error>()
                .is_some_and(|err| err.kind() == kind)
        })
        .is_some()
    }

    /// Find the first error of type `E` among the members and their causes.
    ///
    /// This looks through `io::Error` payloads, `source()` chains and nested
    /// chains, member by member.
    ///
    /// ```
    /// use std::{fmt, io};
    /// use bytestreams::ErrorChain;
    ///
    /// #[derive(Debug)]
    /// struct DiskFull;
    ///
    /// impl fmt::Display for DiskFull {
    ///     fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    ///         f.write_str("disk full")
    ///     }
    /// }
    ///
    /// impl std::error::Error for DiskFull {}
    ///
    /// let chain = ErrorChain::concat(io::Error::other("first"), io::Error::other(DiskFull));
    /// assert!(chain.find::<DiskFull>().is_some());
    /// ```
    pub fn find<E: StdError + 'static>(&self) -> Option<&E> {
        self.search(&mut |node| node.is::<E>())
            .and_then(|node| node.downcast_ref::<E>())
    }

    /// Whether any member or cause is an `E` equal to `target`.
    pub fn contains<E: StdError + PartialEq + 'static>(&self, target: &E) -> bool {
        self.search(&mut |node| node.downcast_ref::<E>() == Some(target))
            .is_some()
    }

    fn search<'a>(
        &'a self,
        pred: &mut dyn FnMut(&'a (dyn StdError + 'static)) -> bool,
    ) -> Option<&'a (dyn StdError + 'static)> {
        self.errors.iter().find_map(|err| search(err, &mut *pred))
    }
}

// Walks one member: the error itself, its io payload, its sources. A nested
// chain hands over to its own members instead of being visited.
fn search<'a>(
    root: &'a (dyn StdError + 'static),
    pred: &mut dyn FnMut(&'a (dyn StdError + 'static)) -> bool,
) -> Option<&'a (dyn StdError + 'static)> {
    let mut current = Some(root);
    while let Some(node) = current {
        if let Some(chain) = chain_of(node) {
            return chain.search(pred);
        }
        if pred(node) {
            return Some(node);
        }
        current = match node.downcast_ref::<io::Error>().and_then(io::Error::get_ref) {
            Some(payload) => Some(payload as &(dyn StdError + 'static)),
            None => node.source(),
        };
    }
    None
}

fn chain_of<'a>(node: &'a (dyn StdError + 'static)) -> Option<&'a ErrorChain> {
    if let Some(chain) = node.downcast_ref::<ErrorChain>() {
        return Some(chain);
    }
    node.downcast_ref::<io::Error>().and_then(ErrorChain::as_chain)
}

fn splice(err: io::Error) -> Vec<io::Error> {
    match ErrorChain::from_io(err) {
        Ok(chain) => chain.errors,
        Err(err) => vec![err],
    }
}

impl fmt::Display for ErrorChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.errors.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}", err)?;
        }
        Ok(())
    }
}

impl StdError for ErrorChain {}

impl From<Vec<io::Error>> for ErrorChain {
    fn from(errors: Vec<io::Error>) -> Self {
        Self { errors }
    }
}

impl From<ErrorChain> for io::Error {
    fn from(chain: ErrorChain) -> Self {
        io::Error::other(chain)
    }
}

impl FromIterator<io::Error> for ErrorChain {
    fn from_iter<I: IntoIterator<Item = io::Error>>(iter: I) -> Self {
        Self {
            errors: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for ErrorChain {
    type Item = io::Error;
    type IntoIter = std::vec::IntoIter<io::Error>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}

impl<'a> IntoIterator for &'a ErrorChain {
    type Item = &'a io::Error;
    type IntoIter = std::slice::Iter<'a, io::Error>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.iter()
    }
}
