//! Endless pattern reader
//!
//! [`Repeater`] emits one chunk of data indefinitely. Every read fills the
//! whole buffer with the infinite repetition of the pattern, continuing where
//! the previous read stopped. There is no end of stream and no short read.
//!
//! # Examples
//!
//! ```
//! use std::io::Read;
//! use bytestreams::Repeater;
//!
//! let mut repeater = Repeater::new(b"ab".to_vec());
//!
//! let mut first = [0u8; 5];
//! repeater.read_exact(&mut first).unwrap();
//! assert_eq!(&first, b"ababa");
//!
//! let mut second = [0u8; 3];
//! repeater.read_exact(&mut second).unwrap();
//! assert_eq!(&second, b"bab");
//! ```
//!
//! Combined with `Read::take` it produces fixed-size payloads of any length:
//!
//! ```
//! use std::io::{self, Read};
//! use bytestreams::Repeater;
//!
//! let mut payload = Vec::new();
//! Repeater::new("xyz").take(7).read_to_end(&mut payload).unwrap();
//! assert_eq!(payload, b"xyzxyzx");
//! ```

use std::fmt;
use std::io::{self, Read};
use std::pin::Pin;
use std::task::{Context, Poll};

/// Returned by [`Repeater::try_new`] for an empty pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmptyPattern;

impl fmt::Display for EmptyPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("repeater pattern must not be empty")
    }
}

impl std::error::Error for EmptyPattern {}

/// A reader that repeats a fixed pattern forever.
#[derive(Debug, Clone)]
pub struct Repeater<T = Vec<u8>> {
    pattern: T,
    offset: usize,
}

impl<T: AsRef<[u8]>> Repeater<T> {
    /// Create a repeater for `pattern`.
    ///
    /// # Panics
    ///
    /// Panics if `pattern` is empty.
    pub fn new(pattern: T) -> Self {
        match Self::try_new(pattern) {
            Ok(repeater) => repeater,
            Err(err) => panic!("{}", err),
        }
    }

    /// Create a repeater, rejecting an empty pattern.
    pub fn try_new(pattern: T) -> Result<Self, EmptyPattern> {
        if pattern.as_ref().is_empty() {
            return Err(EmptyPattern);
        }
        Ok(Repeater { pattern, offset: 0 })
    }

    /// Replace the pattern and start again from its first byte.
    ///
    /// Lets a pooled repeater be reused for a different payload.
    ///
    /// # Panics
    ///
    /// Panics if `pattern` is empty.
    pub fn reset(&mut self, pattern: T) {
        assert!(!pattern.as_ref().is_empty(), "{}", EmptyPattern);
        self.pattern = pattern;
        self.offset = 0;
    }

    /// Fill all of `dst` and advance.
    pub fn fill(&mut self, dst: &mut [u8]) {
        let pattern = self.pattern.as_ref();
        let period = pattern.len();
        let mut written = 0;
        while written < dst.len() {
            let offset = (self.offset + written) % period;
            written += slab(pattern, offset, &mut dst[written..]);
        }
        self.offset = (self.offset + dst.len() % period) % period;
    }

    /// The pattern being repeated.
    pub fn pattern(&self) -> &[u8] {
        self.pattern.as_ref()
    }

    /// Offset into the pattern of the next byte to be read.
    pub fn position(&self) -> usize {
        self.offset
    }

    /// Consume the repeater, returning its pattern.
    pub fn into_pattern(self) -> T {
        self.pattern
    }
}

// Copies at most one period: the pattern from `offset` to its end, then, if
// `dst` still has room, the pattern's start up to `offset`.
fn slab(pattern: &[u8], offset: usize, dst: &mut [u8]) -> usize {
    let head = &pattern[offset..];
    let n = head.len().min(dst.len());
    dst[..n].copy_from_slice(&head[..n]);
    if n == dst.len() {
        return n;
    }
    let tail = &pattern[..offset];
    let m = tail.len().min(dst.len() - n);
    dst[n..n + m].copy_from_slice(&tail[..m]);
    n + m
}

impl<T: AsRef<[u8]>> Read for Repeater<T> {
    fn read(&mut self, dst: &mut [u8]) -> io::Result<usize> {
        self.fill(dst);
        Ok(dst.len())
    }
}

impl<T: AsRef<[u8]> + Unpin> futures::io::AsyncRead for Repeater<T> {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        dst: &mut [u8],
    ) -> Poll<io::Result<usize>> {
        let repeater = self.get_mut();
        repeater.fill(dst);
        Poll::Ready(Ok(dst.len()))
    }
}
