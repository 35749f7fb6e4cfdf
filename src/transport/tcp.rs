//! TCP transport implementation

use super::{ReadOutcome, Transport};
use crate::core::types::Endpoint;
use crate::error::{Error, Result};
use std::io::{ErrorKind, Read};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

/// Client TCP connection to one crane controller
pub struct TcpTransport {
    address: String,
    /// Addresses from the last successful lookup
    resolved: Vec<SocketAddr>,
    connect_timeout: Duration,
    read_timeout: Duration,
    stream: Option<TcpStream>,
}

impl TcpTransport {
    /// Create an unconnected transport for `endpoint`
    ///
    /// The host name is looked up on the first [`Transport::connect`] and
    /// again only after a connect attempt fails on every cached address.
    /// That lookup uses the system resolver, which blocks the calling thread
    /// and is bounded by neither timeout below. Endpoints given as IP
    /// literals never touch the resolver.
    ///
    /// # Arguments
    /// * `connect_timeout` - Upper bound for one connect attempt per address
    /// * `read_timeout` - Upper bound for one blocking read; also bounds stop latency
    pub fn new(endpoint: &Endpoint, connect_timeout: Duration, read_timeout: Duration) -> Self {
        Self {
            address: endpoint.address(),
            resolved: Vec::new(),
            connect_timeout,
            read_timeout,
            stream: None,
        }
    }

    fn resolve(&self) -> Result<Vec<SocketAddr>> {
        let addrs: Vec<SocketAddr> = self
            .address
            .to_socket_addrs()
            .map_err(|e| Error::Resolve(format!("{}: {}", self.address, e)))?
            .collect();
        if addrs.is_empty() {
            return Err(Error::Resolve(format!("{}: no addresses", self.address)));
        }
        Ok(addrs)
    }
}

impl Transport for TcpTransport {
    fn connect(&mut self) -> Result<()> {
        self.close();

        if self.resolved.is_empty() {
            self.resolved = self.resolve()?;
            log::debug!("{} resolved to {:?}", self.address, self.resolved);
        }

        let mut last_err = None;
        for &addr in &self.resolved {
            match TcpStream::connect_timeout(&addr, self.connect_timeout) {
                Ok(stream) => {
                    // Read timeout lets the owning loop check its stop flag
                    stream.set_read_timeout(Some(self.read_timeout))?;
                    if let Err(e) = stream.set_nodelay(true) {
                        log::debug!("Failed to set TCP_NODELAY on {}: {}", addr, e);
                    }
                    self.stream = Some(stream);
                    return Ok(());
                }
                Err(e) => last_err = Some(e),
            }
        }

        // The name may point elsewhere by the next attempt
        self.resolved.clear();
        Err(match last_err {
            Some(e) => Error::Io(e),
            None => Error::NotConnected,
        })
    }

    fn read(&mut self, buffer: &mut [u8]) -> Result<ReadOutcome> {
        let stream = self.stream.as_mut().ok_or(Error::NotConnected)?;
        match stream.read(buffer) {
            Ok(0) => Ok(ReadOutcome::Closed),
            Ok(n) => Ok(ReadOutcome::Received(n)),
            Err(e) if e.kind() == ErrorKind::WouldBlock => Ok(ReadOutcome::TimedOut),
            Err(e) if e.kind() == ErrorKind::TimedOut => Ok(ReadOutcome::TimedOut),
            Err(e) if e.kind() == ErrorKind::Interrupted => Ok(ReadOutcome::TimedOut),
            Err(e) => Err(e.into()),
        }
    }

    fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            let _ = stream.shutdown(Shutdown::Both);
        }
    }

    fn is_connected(&self) -> bool {
        self.stream.is_some()
    }
}

impl Drop for TcpTransport {
    fn drop(&mut self) {
        self.close();
    }
}
