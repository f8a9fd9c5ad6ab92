//! Events and summaries delivered to scan consumers.

use crate::error::ScanError;
use crate::scanner::traits::{PortResult, PortState};
use crate::types::{ScanId, ScanRequest};
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use std::fmt;
use std::net::IpAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// One item of a scan's event stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ScanEvent {
    /// A port accepted a connection.
    Open { port: u16, service: String },
    /// A port that is not open. Only emitted when closed ports are reported.
    NotOpen(PortResult),
    /// Scan-level failure. Always the last event of its stream.
    Failed {
        #[serde(serialize_with = "serialize_display")]
        error: ScanError,
    },
}

impl ScanEvent {
    /// Map a probe result to the event a consumer should see, if any.
    pub fn from_result(result: PortResult, report_closed: bool) -> Option<Self> {
        match result.state {
            PortState::Open => Some(Self::Open {
                port: result.port,
                service: result.service.unwrap_or_default(),
            }),
            _ if report_closed => Some(Self::NotOpen(result)),
            _ => None,
        }
    }

    /// Port this event is about, if it is a per-port event.
    pub fn port(&self) -> Option<u16> {
        match self {
            Self::Open { port, .. } => Some(*port),
            Self::NotOpen(result) => Some(result.port),
            Self::Failed { .. } => None,
        }
    }
}

/// Renders the classic one-line form, e.g. `[OPEN] Port 80 (http)`.
impl fmt::Display for ScanEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open { port, service } => write!(f, "[OPEN] Port {} ({})", port, service),
            Self::NotOpen(result) => {
                let tag = result.state.to_string().to_uppercase();
                match &result.error_detail {
                    Some(detail) => write!(f, "[{}] Port {}: {}", tag, result.port, detail),
                    None => write!(f, "[{}] Port {}", tag, result.port),
                }
            }
            Self::Failed { error } => write!(f, "[!] Scan failed: {}", error),
        }
    }
}

fn serialize_display<T: fmt::Display, S: Serializer>(value: &T, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(value)
}

/// Live progress counters for a running scan.
#[derive(Debug, Clone)]
pub struct ScanProgress {
    completed: Arc<AtomicU64>,
    total: u64,
}

impl ScanProgress {
    pub(crate) fn new(total: u64) -> Self {
        Self {
            completed: Arc::new(AtomicU64::new(0)),
            total,
        }
    }

    pub(crate) fn advance(&self) {
        self.completed.fetch_add(1, Ordering::Relaxed);
    }

    /// Probes that have finished so far.
    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::Relaxed)
    }

    /// Probes the request expands into.
    pub fn total(&self) -> u64 {
        self.total
    }
}

/// Final accounting of one scan.
#[derive(Debug, Clone, Serialize)]
pub struct ScanSummary {
    pub id: ScanId,
    pub host: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<IpAddr>,
    pub start_port: u16,
    pub end_port: u16,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    /// Ports that received a probe.
    pub probed: u64,
    pub open: u64,
    pub closed: u64,
    pub filtered: u64,
    pub errors: u64,
    /// Scan stopped admitting probes because it was cancelled.
    pub cancelled: bool,
    /// Scan aborted with a scan-level error.
    pub failed: bool,
}

impl ScanSummary {
    pub(crate) fn new(id: ScanId, request: &ScanRequest) -> Self {
        Self {
            id,
            host: request.host().to_string(),
            address: None,
            start_port: request.range().start(),
            end_port: request.range().end(),
            started_at: Utc::now(),
            elapsed_ms: 0,
            probed: 0,
            open: 0,
            closed: 0,
            filtered: 0,
            errors: 0,
            cancelled: false,
            failed: false,
        }
    }

    pub(crate) fn record(&mut self, state: PortState) {
        self.probed += 1;
        match state {
            PortState::Open => self.open += 1,
            PortState::Closed => self.closed += 1,
            PortState::Filtered => self.filtered += 1,
            PortState::Error => self.errors += 1,
        }
    }

    /// Number of ports the request covered.
    pub fn requested(&self) -> u64 {
        u64::from(self.end_port - self.start_port) + 1
    }

    /// True when every requested port was probed.
    pub fn is_complete(&self) -> bool {
        !self.cancelled && !self.failed && self.probed == self.requested()
    }
}
