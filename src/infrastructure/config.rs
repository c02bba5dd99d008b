/// Run configuration for TraceMatrix, read from a TOML file.
///
/// ```toml
/// depth_limit = 4
/// debug = false
/// log_path = "target/tracematrix/calls.log"
/// shutdown_grace_ms = 5000
/// ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::tracker::TrackerConfig;
use crate::error::{TraceError, TraceResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraceConfig {
    /// Deepest recorded call depth, `0` for unlimited.
    pub depth_limit: usize,
    pub debug: bool,
    /// Destination of the call log.
    pub log_path: PathBuf,
    /// How long shutdown waits for pending writes.
    pub shutdown_grace_ms: u64,
}

impl TraceConfig {
    pub const DEFAULT_LOG_PATH: &'static str = "tracematrix.log";
    pub const DEFAULT_GRACE_MS: u64 = 5000;

    pub fn load(path: &Path) -> TraceResult<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Like `load`, but a missing file yields the defaults.
    pub fn load_or_default(path: &Path) -> TraceResult<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn from_toml(content: &str) -> TraceResult<Self> {
        toml::from_str(content).map_err(|e| TraceError::Config {
            message: e.to_string(),
        })
    }

    pub fn tracker_config(&self) -> TrackerConfig {
        TrackerConfig {
            depth_limit: self.depth_limit,
            debug: self.debug,
        }
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            depth_limit: 0,
            debug: false,
            log_path: PathBuf::from(Self::DEFAULT_LOG_PATH),
            shutdown_grace_ms: Self::DEFAULT_GRACE_MS,
        }
    }
}
