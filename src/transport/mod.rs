//! Transport layer for I/O abstraction
//!
//! A transport is one client-side byte stream to one crane controller. It
//! knows nothing about framing; the connection loop feeds whatever it reads
//! straight to the frame assembler.

use crate::error::Result;

mod mock;
mod tcp;
pub use mock::{MockTransport, ScriptStep};
pub use tcp::TcpTransport;

/// Outcome of one read attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// `n > 0` bytes were written to the front of the buffer
    Received(usize),
    /// Read timeout elapsed with no data; the connection is still up
    TimedOut,
    /// Peer closed the stream
    Closed,
}

/// Transport trait for a crane controller connection
pub trait Transport: Send {
    /// Open the connection, bounded by the transport's connect timeout
    fn connect(&mut self) -> Result<()>;

    /// Read up to `buffer.len()` bytes, blocking at most one read timeout
    fn read(&mut self, buffer: &mut [u8]) -> Result<ReadOutcome>;

    /// Close the connection; safe to call when already closed
    fn close(&mut self);

    fn is_connected(&self) -> bool;
}
