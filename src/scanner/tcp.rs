//! TCP connect probing.
//!
//! Performs standard TCP connect scans using the operating system's socket
//! API. A probe completes the handshake and drops the connection straight
//! away; no data is exchanged.

use crate::error::ConnectError;
use crate::scanner::traits::{PortResult, Transport};
use crate::services;
use async_trait::async_trait;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Real transport backed by `tokio::net::TcpStream`.
///
/// Does not require elevated privileges.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpTransport;

impl TcpTransport {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn connect(&self, addr: SocketAddr, limit: Duration) -> Result<(), ConnectError> {
        // The socket lives inside the connect future or the stream; both
        // close it on drop, including when the timeout cancels the future.
        match timeout(limit, TcpStream::connect(addr)).await {
            Ok(Ok(stream)) => {
                drop(stream);
                Ok(())
            }
            Ok(Err(e)) => Err(ConnectError::from(e)),
            Err(_) => Err(ConnectError::TimedOut),
        }
    }
}

/// Single-port TCP probe.
///
/// Holds the transport and the per-attempt timeout; cheap to share across
/// tasks behind an `Arc`.
#[derive(Clone)]
pub struct PortProbe {
    transport: Arc<dyn Transport>,
    timeout: Duration,
}

impl PortProbe {
    /// Create a probe.
    ///
    /// # Arguments
    /// * `transport` - Connection layer to use
    /// * `timeout` - Upper bound on each connection attempt
    pub fn new(transport: Arc<dyn Transport>, timeout: Duration) -> Self {
        Self { transport, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Probe one port with exactly one connection attempt.
    ///
    /// Open ports carry their service name. Refusals and timeouts come back
    /// as closed/filtered results; unexpected transport failures are logged
    /// and come back as `Error` results. None of these are returned as `Err`.
    ///
    /// The timeout is enforced here as well as passed to the transport, so a
    /// transport that ignores it still cannot hold a probe past the limit.
    pub async fn probe(&self, target: IpAddr, port: u16) -> PortResult {
        let addr = SocketAddr::new(target, port);

        let outcome = timeout(self.timeout, self.transport.connect(addr, self.timeout))
            .await
            .unwrap_or(Err(ConnectError::TimedOut));

        match outcome {
            Ok(()) => {
                let service = services::resolve(port);
                debug!(port, service, "port open");
                PortResult::open(port, service)
            }
            Err(err) => {
                match &err {
                    ConnectError::Transport(reason) => {
                        warn!(port, %reason, "probe failed at transport level");
                    }
                    other => debug!(port, outcome = %other, "port not open"),
                }
                PortResult::not_open(port, &err)
            }
        }
    }
}

impl std::fmt::Debug for PortProbe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PortProbe")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}
