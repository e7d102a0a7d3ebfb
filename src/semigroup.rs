//! Semigroup trait for associative operations
//!
//! A Semigroup is a type with an associative binary operation. Here it is the
//! engine behind error accumulation during teardown: when several close or
//! flush hooks fail, their errors are combined rather than dropped.
//!
//! # Mathematical Properties
//!
//! For a type to be a valid Semigroup, the `combine` operation must be associative:
//! ```text
//! a.combine(b).combine(c) == a.combine(b.combine(c))
//! ```
//!
//! # Examples
//!
//! ```
//! use std::io;
//! use bytestreams::{ErrorChain, Semigroup};
//!
//! let a = io::Error::new(io::ErrorKind::BrokenPipe, "a");
//! let b = io::Error::new(io::ErrorKind::TimedOut, "b");
//!
//! let combined = a.combine(b);
//! let chain = ErrorChain::as_chain(&combined).unwrap();
//! assert_eq!(chain.len(), 2);
//! assert_eq!(combined.to_string(), "a; b");
//! ```
//!
//! `Option<T>` lifts any semigroup, treating `None` as "nothing to combine":
//!
//! ```
//! use bytestreams::Semigroup;
//!
//! assert_eq!(Some(vec![1]).combine(None), Some(vec![1]));
//! assert_eq!(None.combine(Some(vec![2])), Some(vec![2]));
//! assert_eq!(Some(vec![1]).combine(Some(vec![2])), Some(vec![1, 2]));
//! ```

use std::io;

use crate::chain::ErrorChain;

/// A type that supports an associative binary operation
///
/// # Laws
///
/// Implementations must satisfy the associativity law:
/// ```text
/// a.combine(b).combine(c) == a.combine(b.combine(c))
/// ```
///
/// # Note on Ownership
///
/// The `combine` method takes `self` by value, not by reference. `io::Error`
/// is not `Clone`, so combining always consumes both operands.
pub trait Semigroup: Sized {
    /// Combine this value with another value associatively
    fn combine(self, other: Self) -> Self;
}

impl<T> Semigroup for Vec<T> {
    #[inline]
    fn combine(mut self, other: Self) -> Self {
        self.extend(other);
        self
    }
}

impl<T: Semigroup> Semigroup for Option<T> {
    #[inline]
    fn combine(self, other: Self) -> Self {
        match (self, other) {
            (Some(a), Some(b)) => Some(a.combine(b)),
            (a, None) => a,
            (None, b) => b,
        }
    }
}

impl Semigroup for ErrorChain {
    #[inline]
    fn combine(self, other: Self) -> Self {
        let mut errors = self.into_errors();
        errors.extend(other);
        ErrorChain::from(errors)
    }
}

// Flattening concatenation: the result is never a chain nested in a chain.
impl Semigroup for io::Error {
    #[inline]
    fn combine(self, other: Self) -> Self {
        ErrorChain::concat(self, other).into()
    }
}
