//! Scan request definition.

use super::PortRange;
use crate::error::ScanError;
use serde::Serialize;
use std::fmt;

/// A validated request to scan one host over an inclusive port range.
///
/// Fields are private: the only way to obtain a `ScanRequest` is through the
/// validating constructors, and it cannot change once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanRequest {
    host: String,
    range: PortRange,
}

impl ScanRequest {
    /// Build a request from raw bounds.
    ///
    /// Fails with [`ScanError::InvalidRange`] when `start > end`.
    pub fn new(host: impl Into<String>, start: u16, end: u16) -> Result<Self, ScanError> {
        Ok(Self::with_range(host, PortRange::new(start, end)?))
    }

    /// Build a request from an already validated range.
    pub fn with_range(host: impl Into<String>, range: PortRange) -> Self {
        Self {
            host: host.into().trim().to_string(),
            range,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn range(&self) -> PortRange {
        self.range
    }

    /// Number of probes this request expands into.
    pub fn port_count(&self) -> usize {
        self.range.len()
    }
}

impl fmt::Display for ScanRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ports {}", self.host, self.range)
    }
}
