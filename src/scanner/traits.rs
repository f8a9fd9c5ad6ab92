//! Scanner seams and per-port result types.
//!
//! [`Transport`] and [`Resolver`] abstract the two pieces of network I/O a
//! scan performs, so the coordinator can be driven by the real tokio
//! implementations or by in-memory doubles in tests.

use crate::error::{ConnectError, ScanError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

/// Status of a probed port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortState {
    /// Port accepted a TCP connection.
    Open,
    /// Connection was actively refused.
    Closed,
    /// No answer within the timeout, or the host/network was unreachable.
    Filtered,
    /// Unexpected transport failure, e.g. socket exhaustion.
    Error,
}

impl PortState {
    pub fn is_open(self) -> bool {
        self == Self::Open
    }
}

impl fmt::Display for PortState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => write!(f, "open"),
            Self::Closed => write!(f, "closed"),
            Self::Filtered => write!(f, "filtered"),
            Self::Error => write!(f, "error"),
        }
    }
}

impl From<&ConnectError> for PortState {
    fn from(err: &ConnectError) -> Self {
        match err {
            ConnectError::Refused => Self::Closed,
            ConnectError::TimedOut | ConnectError::Unreachable(_) => Self::Filtered,
            ConnectError::Transport(_) => Self::Error,
        }
    }
}

/// Result of probing a single port.
///
/// `service` is only ever set for open ports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortResult {
    /// The port number that was probed.
    pub port: u16,
    /// Status determined by the probe.
    pub state: PortState,
    /// Service name from the service table.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    /// Why the port is not open, when the transport said more than "no".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
}

impl PortResult {
    /// An open port with its service name.
    pub fn open(port: u16, service: impl Into<String>) -> Self {
        Self {
            port,
            state: PortState::Open,
            service: Some(service.into()),
            error_detail: None,
        }
    }

    /// A port that did not accept the connection.
    pub fn not_open(port: u16, err: &ConnectError) -> Self {
        let error_detail = match err {
            ConnectError::Refused | ConnectError::TimedOut => None,
            ConnectError::Unreachable(detail) | ConnectError::Transport(detail) => {
                Some(detail.clone())
            }
        };
        Self {
            port,
            state: PortState::from(err),
            service: None,
            error_detail,
        }
    }

    pub fn is_open(&self) -> bool {
        self.state.is_open()
    }
}

/// Connection layer used by port probes.
///
/// Implementations make exactly one connection attempt per call and must not
/// keep the connection: it is released before `connect` returns, on every
/// path.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Try to connect to `addr`, giving up after `timeout`.
    async fn connect(&self, addr: SocketAddr, timeout: Duration) -> Result<(), ConnectError>;
}

/// Turns a target host string into the address to scan.
#[async_trait]
pub trait Resolver: Send + Sync {
    /// Resolve `host`, failing with [`ScanError::HostUnresolvable`].
    async fn resolve(&self, host: &str) -> Result<IpAddr, ScanError>;
}
