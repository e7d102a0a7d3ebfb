//! Byte sinks and their teardown capabilities
//!
//! A [`Sink`] is an `io::Write` that also reports which teardown operations
//! it supports. Wrappers query [`Sink::capabilities`] exactly once, when they
//! take a sink over, and register hooks only for what is reported. Nothing is
//! re-probed on later calls.
//!
//! # Examples
//!
//! ```
//! use std::io::{self, Write};
//! use bytestreams::{Capabilities, Sink};
//!
//! struct Journal {
//!     lines: Vec<u8>,
//!     sealed: bool,
//! }
//!
//! impl Write for Journal {
//!     fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
//!         self.lines.write(buf)
//!     }
//!
//!     fn flush(&mut self) -> io::Result<()> {
//!         Ok(())
//!     }
//! }
//!
//! impl Sink for Journal {
//!     fn capabilities(&self) -> Capabilities {
//!         Capabilities::CLOSE
//!     }
//!
//!     fn close(&mut self) -> io::Result<()> {
//!         self.sealed = true;
//!         Ok(())
//!     }
//! }
//! ```

use std::io::{self, BufWriter, Cursor, LineWriter, Write};

/// Teardown operations a sink supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    /// `Sink::close` releases something and must be called.
    pub close: bool,
    /// `Write::flush` forces buffered data out and must be called.
    pub flush: bool,
}

impl Capabilities {
    /// Neither close nor flush.
    pub const NONE: Capabilities = Capabilities {
        close: false,
        flush: false,
    };
    /// Close only.
    pub const CLOSE: Capabilities = Capabilities {
        close: true,
        flush: false,
    };
    /// Flush only.
    pub const FLUSH: Capabilities = Capabilities {
        close: false,
        flush: true,
    };
    /// Close and flush.
    pub const ALL: Capabilities = Capabilities {
        close: true,
        flush: true,
    };
}

/// A byte sink with optional close and flush capabilities.
///
/// The defaults describe a sink with no teardown at all: `capabilities`
/// reports [`Capabilities::NONE`] and `close` does nothing.
pub trait Sink: Write {
    /// Which teardown operations this sink needs.
    fn capabilities(&self) -> Capabilities {
        Capabilities::NONE
    }

    /// Release the sink's resources.
    ///
    /// Further writes after a successful close are undefined for the caller.
    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Sink for Vec<u8> {}

impl Sink for io::Sink {}

impl Sink for Cursor<Vec<u8>> {}

impl<S: Sink + ?Sized> Sink for Box<S> {
    fn capabilities(&self) -> Capabilities {
        (**self).capabilities()
    }

    fn close(&mut self) -> io::Result<()> {
        (**self).close()
    }
}

// Buffered writers always need a flush; they close by draining then closing
// what they wrap.
impl<W: Sink> Sink for BufWriter<W> {
    fn capabilities(&self) -> Capabilities {
        Capabilities::ALL
    }

    fn close(&mut self) -> io::Result<()> {
        self.flush()?;
        self.get_mut().close()
    }
}

impl<W: Sink> Sink for LineWriter<W> {
    fn capabilities(&self) -> Capabilities {
        Capabilities::ALL
    }

    fn close(&mut self) -> io::Result<()> {
        self.flush()?;
        self.get_mut().close()
    }
}
