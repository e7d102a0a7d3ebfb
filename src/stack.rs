//! Layered writer pipelines
//!
//! A [`StackWriter`] builds a pipeline one stage at a time. Each stage is a
//! function that receives a [`Layer`] handle to the current top of the stack
//! and returns the sink that becomes the new top. When a stage's sink reports
//! close or flush capabilities they are added to the stack's teardown at push
//! time, so the most recently pushed stage tears down first: outer buffers
//! drain into inner stages while those are still open.
//!
//! # Examples
//!
//! ```
//! use std::io::{BufWriter, Write};
//! use bytestreams::{Sink, StackWriter};
//! use bytestreams::testing::MockSink;
//!
//! let (target, probe) = MockSink::new().split();
//!
//! let mut stack = StackWriter::new(target);
//! stack.push(BufWriter::new);
//!
//! stack.write_all(b"buffered").unwrap();
//! assert!(probe.data().is_empty());
//!
//! stack.close().unwrap();
//! assert_eq!(probe.data(), b"buffered");
//! ```

use std::cell::RefCell;
use std::fmt;
use std::io::{self, Write};
use std::rc::Rc;

use crate::sink::{Capabilities, Sink};
use crate::teardown::{Options, Teardown};

/// A boxed pipeline stage, for building stacks from collections.
pub type Stage = Box<dyn FnOnce(Layer) -> Box<dyn Sink>>;

/// Shared handle to one layer of a [`StackWriter`].
///
/// Stages write into the layer below through this handle. Its own flush and
/// close do nothing: the stack's teardown closes and flushes every layer
/// exactly once, so a stage's teardown must not cascade into the layer below.
#[derive(Clone)]
pub struct Layer {
    sink: Rc<RefCell<Box<dyn Sink>>>,
}

impl Layer {
    fn new(sink: Box<dyn Sink>) -> Self {
        Layer {
            sink: Rc::new(RefCell::new(sink)),
        }
    }

    fn inner_capabilities(&self) -> Capabilities {
        self.sink.borrow().capabilities()
    }

    fn close_layer(&self) -> io::Result<()> {
        self.sink.borrow_mut().close()
    }

    fn flush_layer(&self) -> io::Result<()> {
        self.sink.borrow_mut().flush()
    }
}

impl Write for Layer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.sink.borrow_mut().write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Sink for Layer {}

impl fmt::Debug for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Layer")
            .field("capabilities", &self.inner_capabilities())
            .finish_non_exhaustive()
    }
}

/// A pipeline of writer stages over one target.
///
/// Do not write after closing.
pub struct StackWriter {
    top: Layer,
    depth: usize,
    teardown: Teardown<()>,
}

impl StackWriter {
    /// Create a stack over `target`.
    pub fn new<W: Sink + 'static>(target: W) -> Self {
        Self::with_options(target, Options::new())
    }

    /// Create a stack over `target` with extra configuration.
    ///
    /// The target's own capabilities are contributed first, then the hooks
    /// from `options`.
    pub fn with_options<W: Sink + 'static>(target: W, options: Options) -> Self {
        let base = Layer::new(Box::new(target));
        let teardown = Teardown::configure(options, |teardown| contribute(teardown, &base));
        StackWriter {
            top: base,
            depth: 0,
            teardown,
        }
    }

    /// Put a stage on top of the stack.
    ///
    /// `stage` receives the current top and returns the new one.
    pub fn push<S, F>(&mut self, stage: F) -> &mut Self
    where
        S: Sink + 'static,
        F: FnOnce(Layer) -> S,
    {
        let layer = Layer::new(Box::new(stage(self.top.clone())));
        contribute(&mut self.teardown, &layer);
        self.top = layer;
        self.depth += 1;
        #[cfg(feature = "tracing")]
        tracing::trace!(depth = self.depth, "pushed writer stage");
        self
    }

    /// Push boxed stages in order.
    pub fn extend<I>(&mut self, stages: I) -> &mut Self
    where
        I: IntoIterator<Item = Stage>,
    {
        for stage in stages {
            self.push(stage);
        }
        self
    }

    /// Number of stages pushed on top of the target.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// The teardown chain.
    pub fn teardown(&self) -> &Teardown<()> {
        &self.teardown
    }
}

// Capabilities are read once here; the hooks never re-check them.
fn contribute(teardown: &mut Teardown<()>, layer: &Layer) {
    let capabilities = layer.inner_capabilities();
    if capabilities.close {
        let layer = layer.clone();
        teardown.push_close(move |_| layer.close_layer());
    }
    if capabilities.flush {
        let layer = layer.clone();
        teardown.push_flush(move |_| layer.flush_layer());
    }
}

impl Write for StackWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.top.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.teardown.flush(&mut ())
    }
}

impl Sink for StackWriter {
    fn capabilities(&self) -> Capabilities {
        Capabilities::ALL
    }

    fn close(&mut self) -> io::Result<()> {
        self.teardown.close(&mut ())
    }
}

impl fmt::Debug for StackWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StackWriter")
            .field("depth", &self.depth)
            .field("teardown", &self.teardown)
            .finish_non_exhaustive()
    }
}
