//! Error types for portprobe.
//!
//! Uses `thiserror` for ergonomic error definitions.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Scan-level errors.
///
/// These either reject a request before any probing starts (`InvalidRange`,
/// `InvalidConfig`) or abort a running scan as a whole (`HostUnresolvable`).
/// Per-port connect failures are never represented here; see [`ConnectError`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScanError {
    #[error("invalid port range: {start}-{end} (ports must satisfy 0 <= start <= end <= 65535)")]
    InvalidRange { start: u32, end: u32 },

    #[error("cannot resolve host '{host}': {reason}")]
    HostUnresolvable { host: String, reason: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("scan task failed: {0}")]
    TaskFailed(String),
}

impl ScanError {
    /// Whether this error was raised before the scan started.
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::InvalidRange { .. } | Self::InvalidConfig(_))
    }
}

/// Outcome of a failed connect attempt against a single port.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectError {
    #[error("connection refused")]
    Refused,

    #[error("connection timed out")]
    TimedOut,

    #[error("unreachable: {0}")]
    Unreachable(String),

    #[error("transport error: {0}")]
    Transport(String),
}

impl From<io::Error> for ConnectError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted => Self::Refused,
            io::ErrorKind::TimedOut => Self::TimedOut,
            _ => {
                let message = err.to_string();
                let lower = message.to_lowercase();
                if lower.contains("unreachable") || lower.contains("no route") {
                    Self::Unreachable(message)
                } else {
                    Self::Transport(message)
                }
            }
        }
    }
}

/// Errors raised while loading settings.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {reason}")]
    ReadFailed { path: PathBuf, reason: String },

    #[error("invalid settings format: {0}")]
    InvalidFormat(String),

    #[error("{0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors surfaced by the command-line front end.
#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl CliError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Scan(e) if e.is_rejection() => 2,
            Self::Config(_) => 2,
            _ => 1,
        }
    }
}

pub type CliResult<T> = Result<T, CliError>;
