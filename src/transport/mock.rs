//! Mock transport for testing
//!
//! Plays back a script of connection events. Clones share the script and
//! the counters, so a test can keep one handle while the connection loop
//! owns the other.

use super::{ReadOutcome, Transport};
use crate::error::{Error, Result};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::io;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Stand-in for the read timeout once the script is exhausted
const IDLE_READ: Duration = Duration::from_millis(2);

/// One scripted event
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptStep {
    /// Next connect attempt fails; a read hitting this step reports peer close
    Refuse,
    /// Deliver bytes (split across reads if larger than the read buffer)
    Data(Vec<u8>),
    /// One read times out
    Timeout,
    /// Peer closes the stream
    Close,
    /// Read fails with an I/O error of this kind
    Fail(io::ErrorKind),
    /// Read panics
    Panic,
}

#[derive(Default)]
struct MockTransportInner {
    script: VecDeque<ScriptStep>,
    connected: bool,
    connects: usize,
    closes: usize,
}

/// Mock transport for unit testing
#[derive(Clone, Default)]
pub struct MockTransport {
    inner: Arc<Mutex<MockTransportInner>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append steps to the script
    pub fn push(&self, step: ScriptStep) {
        self.inner.lock().script.push_back(step);
    }

    /// Append bytes to be read
    pub fn inject_read(&self, data: &[u8]) {
        self.push(ScriptStep::Data(data.to_vec()));
    }

    /// Steps not played yet
    pub fn remaining(&self) -> usize {
        self.inner.lock().script.len()
    }

    /// Successful connects so far
    pub fn connects(&self) -> usize {
        self.inner.lock().connects
    }

    /// Times an open connection was closed
    pub fn closes(&self) -> usize {
        self.inner.lock().closes
    }
}

impl Transport for MockTransport {
    fn connect(&mut self) -> Result<()> {
        let mut inner = self.inner.lock();
        if inner.script.front() == Some(&ScriptStep::Refuse) {
            inner.script.pop_front();
            return Err(Error::Io(io::Error::from(io::ErrorKind::ConnectionRefused)));
        }
        inner.connected = true;
        inner.connects += 1;
        Ok(())
    }

    fn read(&mut self, buffer: &mut [u8]) -> Result<ReadOutcome> {
        let mut inner = self.inner.lock();
        if !inner.connected {
            return Err(Error::NotConnected);
        }

        match inner.script.pop_front() {
            // Idle link once the script runs out
            None => {
                drop(inner);
                thread::sleep(IDLE_READ);
                Ok(ReadOutcome::TimedOut)
            }
            Some(ScriptStep::Timeout) => Ok(ReadOutcome::TimedOut),
            Some(ScriptStep::Data(mut data)) => {
                let n = data.len().min(buffer.len());
                buffer[..n].copy_from_slice(&data[..n]);
                if n < data.len() {
                    inner.script.push_front(ScriptStep::Data(data.split_off(n)));
                }
                Ok(ReadOutcome::Received(n))
            }
            Some(ScriptStep::Refuse) => {
                inner.script.push_front(ScriptStep::Refuse);
                Ok(ReadOutcome::Closed)
            }
            Some(ScriptStep::Close) => Ok(ReadOutcome::Closed),
            Some(ScriptStep::Fail(kind)) => Err(Error::Io(io::Error::from(kind))),
            Some(ScriptStep::Panic) => {
                drop(inner);
                panic!("scripted transport panic");
            }
        }
    }

    fn close(&mut self) {
        let mut inner = self.inner.lock();
        if inner.connected {
            inner.connected = false;
            inner.closes += 1;
        }
    }

    fn is_connected(&self) -> bool {
        self.inner.lock().connected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripted_reads() {
        let mut mock = MockTransport::new();
        mock.push(ScriptStep::Refuse);
        mock.inject_read(&[1, 2, 3, 4, 5]);
        mock.push(ScriptStep::Close);

        assert!(mock.connect().is_err());
        mock.connect().unwrap();
        assert_eq!(mock.connects(), 1);

        let mut buf = [0u8; 3];
        assert_eq!(mock.read(&mut buf).unwrap(), ReadOutcome::Received(3));
        assert_eq!(buf, [1, 2, 3]);
        assert_eq!(mock.read(&mut buf).unwrap(), ReadOutcome::Received(2));
        assert_eq!(&buf[..2], &[4, 5]);
        assert_eq!(mock.read(&mut buf).unwrap(), ReadOutcome::Closed);
        assert_eq!(mock.read(&mut buf).unwrap(), ReadOutcome::TimedOut);

        mock.close();
        mock.close();
        assert_eq!(mock.closes(), 1);
        assert!(!mock.is_connected());
    }

    #[test]
    fn test_clones_share_script() {
        let handle = MockTransport::new();
        let mut owned = handle.clone();
        handle.push(ScriptStep::Fail(io::ErrorKind::ConnectionReset));

        owned.connect().unwrap();
        let mut buf = [0u8; 8];
        assert!(owned.read(&mut buf).is_err());
        assert_eq!(handle.remaining(), 0);
        assert!(handle.is_connected());
    }
}
