// Process-wide instrumentation configuration
//
// Two flags are global: whether accounting is enabled at all, and whether
// every transition emits a diagnostic line. Both are expected to be set once
// at startup. Changes are eventually visible (Relaxed ordering); missing a
// handful of transitions around a toggle is an accepted approximation.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

static STATS_ENABLED: AtomicBool = AtomicBool::new(true);
static DEBUG_TRANSITIONS: AtomicBool = AtomicBool::new(false);

/// Upper bound on pre-allocated replay workers
pub const MAX_WORKERS: usize = 1 << 16;

/// Turn accounting on
pub fn enable() {
    STATS_ENABLED.store(true, Ordering::Relaxed);
}

/// Turn accounting off; live transitions become no-ops
pub fn disable() {
    STATS_ENABLED.store(false, Ordering::Relaxed);
}

pub fn is_enabled() -> bool {
    STATS_ENABLED.load(Ordering::Relaxed)
}

/// Emit one `tracing::trace!` line per transition
pub fn set_debug(on: bool) {
    DEBUG_TRANSITIONS.store(on, Ordering::Relaxed);
}

pub fn debug_enabled() -> bool {
    DEBUG_TRANSITIONS.load(Ordering::Relaxed)
}

/// Startup configuration for accounting
///
/// # Example
/// ```
/// use taskclock::config::StatsConfig;
///
/// let config = StatsConfig::from_toml_str("debug = true\nworkers = 8").unwrap();
/// assert!(config.enabled);
/// assert!(config.debug);
/// assert_eq!(config.workers, 8);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatsConfig {
    /// Collect per-task statistics in live accumulators
    ///
    /// Replay folds a trace that was already captured and ignores it.
    /// Default: true
    pub enabled: bool,

    /// Diagnostic line per transition
    ///
    /// Default: false
    pub debug: bool,

    /// Number of workers to pre-allocate for trace replay
    ///
    /// Replay grows the worker table on demand, so 0 is fine.
    /// Default: 0
    pub workers: usize,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            debug: false,
            workers: 0,
        }
    }
}

impl StatsConfig {
    /// Parse from TOML text; missing keys take their defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: StatsConfig =
            toml::from_str(content).context("Failed to parse stats configuration")?;
        config.validate().map_err(anyhow::Error::msg)?;
        Ok(config)
    }

    /// Load from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).with_context(|| {
            format!("Failed to read config file: {}", path.as_ref().display())
        })?;
        Self::from_toml_str(&content)
    }

    /// Validate configuration
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.workers > MAX_WORKERS {
            return Err(format!(
                "workers must be <= {}, got {}",
                MAX_WORKERS, self.workers
            ));
        }
        Ok(())
    }

    /// Publish the flags to the process-wide toggles
    pub fn install(&self) {
        if self.enabled {
            enable();
        } else {
            disable();
        }
        set_debug(self.debug);
    }
}
