//! Application settings and paths.
//!
//! Settings live in a JSON file in the XDG config directory
//! (`~/.config/portprobe/settings.json` on Linux). A missing file means
//! defaults; an explicitly requested file must exist.

use crate::error::{ConfigError, ConfigResult};
use crate::scanner::{ScanConfig, DEFAULT_MAX_CONCURRENCY, DEFAULT_TIMEOUT};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Application directory paths following the XDG Base Directory Specification.
#[derive(Debug, Clone)]
pub struct Paths {
    /// Configuration directory (~/.config/portprobe)
    pub config_dir: PathBuf,
}

impl Paths {
    /// Locate the platform directories, if the home directory is known.
    pub fn discover() -> Option<Self> {
        let project = ProjectDirs::from("com", "portprobe", "portprobe")?;
        Some(Self {
            config_dir: project.config_dir().to_path_buf(),
        })
    }

    /// Get the path to the settings file.
    pub fn settings_file(&self) -> PathBuf {
        self.config_dir.join("settings.json")
    }
}

/// User-tunable scan settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Per-probe connect timeout in milliseconds.
    pub timeout_ms: u64,
    /// Maximum number of concurrent probes.
    pub max_concurrency: usize,
    /// Report closed and filtered ports as well as open ones.
    pub report_closed: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT.as_millis() as u64,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            report_closed: false,
        }
    }
}

impl Settings {
    /// Load settings.
    ///
    /// With `explicit` set, that file is read and must exist. Otherwise the
    /// default location is used when present, falling back to defaults.
    pub fn load(explicit: Option<&Path>) -> ConfigResult<Self> {
        if let Some(path) = explicit {
            return Self::load_from(path);
        }

        match Paths::discover().map(|p| p.settings_file()) {
            Some(file) if file.exists() => Self::load_from(&file),
            _ => {
                debug!("no settings file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Load settings from a specific file.
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let settings: Self =
            serde_json::from_str(&content).map_err(|e| ConfigError::InvalidFormat(e.to_string()))?;
        settings.validate()?;
        debug!(path = %path.display(), "loaded settings");
        Ok(settings)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.timeout_ms == 0 {
            return Err(ConfigError::Invalid("timeout_ms must be greater than zero".into()));
        }
        if self.max_concurrency == 0 {
            return Err(ConfigError::Invalid("max_concurrency must be at least 1".into()));
        }
        Ok(())
    }

    /// Scan configuration derived from these settings.
    pub fn scan_config(&self) -> ScanConfig {
        ScanConfig {
            timeout: Duration::from_millis(self.timeout_ms),
            max_concurrency: self.max_concurrency,
            report_closed: self.report_closed,
        }
    }
}
