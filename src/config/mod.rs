//! Configuration management for portprobe.
//!
//! Provides XDG-compliant settings storage.

mod settings;

pub use settings::{Paths, Settings};
