//! # bytestreams
//!
//! Composable wrappers around byte sinks, and a reader that repeats a pattern
//! forever.
//!
//! ## Overview
//!
//! - [`ProxyWriter`] remembers the first write failure and short-circuits
//!   every later write, while counting the bytes the sink accepted.
//! - [`StackWriter`] builds a pipeline of writer stages and tears them down
//!   outermost first.
//! - [`Teardown`] runs close and flush hooks without stopping on failure and
//!   folds their errors through an [`ErrorPolicy`].
//! - [`ErrorChain`] keeps several independent errors and searches all of them.
//! - [`Repeater`] fills any read with the endless repetition of a pattern.
//!
//! ## Quick Example
//!
//! ```rust
//! use std::io::{self, BufWriter, Read};
//! use bytestreams::{ErrorChain, Options, ProxyWriter, Repeater, Sink, StackWriter};
//!
//! // A pipeline ending in a buffer, with an extra cleanup step.
//! let options = Options::new()
//!     .accumulate_errors()
//!     .with_close(|| Err(io::Error::new(io::ErrorKind::NotFound, "lock file missing")));
//! let mut stack = StackWriter::with_options(Vec::new(), options);
//! stack.push(BufWriter::new);
//!
//! // Write 1 KiB of a repeating pattern, checking for errors once.
//! let mut pw = ProxyWriter::new(stack);
//! let _ = pw.read_from(&mut Repeater::new("0123456789").take(1024));
//! assert_eq!(pw.result().unwrap(), 1024);
//!
//! let err = pw.close().unwrap_err();
//! assert!(ErrorChain::as_chain(&err).is_none());
//! assert_eq!(err.kind(), io::ErrorKind::NotFound);
//! ```

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod chain;
pub mod policy;
pub mod proxy;
pub mod repeater;
pub mod semigroup;
pub mod sink;
pub mod stack;
pub mod teardown;
pub mod testing;

// Re-exports
pub use chain::ErrorChain;
pub use policy::{ErrorPolicy, Reducer};
pub use proxy::{ProxyWriter, StickyError};
pub use repeater::{EmptyPattern, Repeater};
pub use semigroup::Semigroup;
pub use sink::{Capabilities, Sink};
pub use stack::{Layer, Stage, StackWriter};
pub use teardown::{Hook, Options, Teardown};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::chain::ErrorChain;
    pub use crate::policy::ErrorPolicy;
    pub use crate::proxy::ProxyWriter;
    pub use crate::repeater::Repeater;
    pub use crate::sink::Sink;
    pub use crate::stack::StackWriter;
    pub use crate::teardown::Options;
}
