//! # portprobe - a concurrent TCP connect port scanner
//!
//! Given a host and an inclusive port range, portprobe tries one TCP
//! connection per port on a bounded worker pool and streams an event for
//! each open port the moment it is found. Closed and filtered ports stay
//! silent unless asked for.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use portprobe::scanner::{ScanConfig, ScanCoordinator};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), portprobe::ScanError> {
//!     let coordinator = ScanCoordinator::new(ScanConfig::default())?;
//!     let mut scan = coordinator.start_scan("localhost", 1, 1024)?;
//!
//!     while let Some(event) = scan.next_event().await {
//!         println!("{}", event); // e.g. "[OPEN] Port 22 (ssh)"
//!     }
//!
//!     let summary = scan.finish().await?;
//!     println!("{} ports probed", summary.probed);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`types`] - Validated port ranges, scan requests and scan IDs
//! - [`scanner`] - Coordinator, worker pool, probes and the transport/resolver seams
//! - [`services`] - Port to service-name table
//! - [`config`] - Settings file handling
//! - [`error`] - Error types
//! - [`cli`] and [`output`] - The bundled command-line front end

pub mod cli;
pub mod config;
pub mod error;
pub mod output;
pub mod scanner;
pub mod services;
pub mod types;

// Re-export commonly used types
pub use error::{CliError, ConnectError, ScanError};
pub use scanner::{
    PortResult, PortState, ScanConfig, ScanCoordinator, ScanEvent, ScanHandle, ScanSummary,
};
pub use types::{PortRange, ScanId, ScanRequest};
