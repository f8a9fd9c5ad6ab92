//! Port range type with validation.
//!
//! `PortRange` is an inclusive, non-empty `start..=end` span of TCP ports.
//! It can only be built through validating constructors, so a scan never
//! sees an inverted or out-of-range request.

use crate::error::ScanError;
use serde::Serialize;
use std::fmt;
use std::ops::RangeInclusive;

/// An inclusive range of TCP ports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PortRange {
    start: u16,
    end: u16,
}

impl PortRange {
    /// Highest valid port number.
    pub const MAX: u16 = u16::MAX;

    /// Create a new port range, rejecting `start > end`.
    pub fn new(start: u16, end: u16) -> Result<Self, ScanError> {
        if start > end {
            return Err(ScanError::InvalidRange {
                start: start.into(),
                end: end.into(),
            });
        }
        Ok(Self { start, end })
    }

    /// Create a range from wider integers.
    ///
    /// Bounds above 65535 are reported as `InvalidRange` instead of being
    /// truncated, which lets front ends pass user input straight through.
    pub fn from_raw(start: u32, end: u32) -> Result<Self, ScanError> {
        let invalid = || ScanError::InvalidRange { start, end };
        let start16 = u16::try_from(start).map_err(|_| invalid())?;
        let end16 = u16::try_from(end).map_err(|_| invalid())?;
        Self::new(start16, end16)
    }

    /// Create a range containing a single port.
    pub const fn single(port: u16) -> Self {
        Self {
            start: port,
            end: port,
        }
    }

    pub const fn start(&self) -> u16 {
        self.start
    }

    pub const fn end(&self) -> u16 {
        self.end
    }

    /// Number of ports in this range.
    pub const fn len(&self) -> usize {
        (self.end - self.start) as usize + 1
    }

    /// Always false: a valid range holds at least one port.
    pub const fn is_empty(&self) -> bool {
        false
    }

    /// Whether `port` falls inside this range.
    pub const fn contains(&self, port: u16) -> bool {
        port >= self.start && port <= self.end
    }

    /// Iterate over all ports in ascending order.
    pub fn iter(&self) -> RangeInclusive<u16> {
        self.start..=self.end
    }
}

impl IntoIterator for PortRange {
    type Item = u16;
    type IntoIter = RangeInclusive<u16>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl fmt::Display for PortRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}
