//! Core type definitions using newtype patterns for type safety.
//!
//! These types make invalid scan requests unrepresentable: a `ScanRequest`
//! always carries a non-inverted port range.

mod port;
mod request;
mod scan_id;

pub use port::PortRange;
pub use request::ScanRequest;
pub use scan_id::ScanId;
