//! Configuration for the memory optimiser
//!
//! Settings come from three places, highest priority first: command-line
//! flags, an optional TOML file, and the built-in defaults below. The merged
//! result is a [`MonitorConfig`] that is validated once and never changes
//! while the loop runs.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::error::{OptimiserError, Result};

/// Directory / file naming
pub const APP_NAME: &str = "memory-optimiser";
pub const LOG_FILE_NAME: &str = "memory_optimiser.log";

/// Seconds between checks (5 minutes)
pub const DEFAULT_INTERVAL_SECS: u64 = 300;
/// Memory usage percentage that triggers optimisation
pub const DEFAULT_THRESHOLD_PERCENT: f64 = 75.0;
/// Pause after a purge before measuring what it freed
pub const DEFAULT_SETTLE_MS: u64 = 500;

/// Validated runtime configuration
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorConfig {
    pub interval_seconds: u64,
    pub threshold_percent: f64,
    /// Purge without asking when the threshold is met
    pub auto_optimise: bool,
    /// One synthetic tick, then exit
    pub test_mode: bool,
    pub settle_delay: Duration,
    /// argv of the reclaim primitive
    pub reclaim_command: Vec<String>,
    /// Desktop notifications on/off (log output is unaffected)
    pub notifications: bool,
    pub log_dir: PathBuf,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval_seconds: DEFAULT_INTERVAL_SECS,
            threshold_percent: DEFAULT_THRESHOLD_PERCENT,
            auto_optimise: false,
            test_mode: false,
            settle_delay: Duration::from_millis(DEFAULT_SETTLE_MS),
            reclaim_command: default_reclaim_command(),
            notifications: true,
            log_dir: default_log_dir(),
        }
    }
}

impl MonitorConfig {
    /// Merge file settings and flag overrides over the defaults, then validate.
    pub fn resolve(file: Option<FileConfig>, overrides: ConfigOverrides) -> Result<Self> {
        let config = Self::merge(file, overrides);
        config.validate()?;
        Ok(config)
    }

    /// Merge without validating. Test mode runs on whatever this produces.
    pub fn merge(file: Option<FileConfig>, overrides: ConfigOverrides) -> Self {
        let mut config = Self::default();

        if let Some(file) = file {
            config.apply_file(file);
        }
        config.apply_overrides(overrides);
        config
    }

    fn apply_file(&mut self, file: FileConfig) {
        if let Some(interval) = file.interval_seconds {
            self.interval_seconds = interval;
        }
        if let Some(threshold) = file.threshold_percent {
            self.threshold_percent = threshold;
        }
        if let Some(auto) = file.auto_optimise {
            self.auto_optimise = auto;
        }
        if let Some(ms) = file.settle_ms {
            self.settle_delay = Duration::from_millis(ms);
        }
        if let Some(command) = file.reclaim_command {
            self.reclaim_command = command;
        }
        if let Some(notifications) = file.notifications {
            self.notifications = notifications;
        }
        if let Some(dir) = file.log_dir {
            self.log_dir = dir;
        }
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(interval) = overrides.interval_seconds {
            self.interval_seconds = interval;
        }
        if let Some(threshold) = overrides.threshold_percent {
            self.threshold_percent = threshold;
        }
        // Boolean flags can only switch a behaviour on
        self.auto_optimise |= overrides.auto_optimise;
        self.test_mode |= overrides.test_mode;
        if overrides.no_notify {
            self.notifications = false;
        }
        if let Some(dir) = overrides.log_dir {
            self.log_dir = dir;
        }
    }

    /// Reject values the loop cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.interval_seconds == 0 {
            return Err(OptimiserError::config(
                "interval must be a positive number of seconds",
            ));
        }

        if !threshold_in_range(self.threshold_percent) {
            return Err(OptimiserError::config(format!(
                "threshold must be within (0, 100], got {}",
                self.threshold_percent
            )));
        }

        if self.reclaim_command.first().map_or(true, |p| p.trim().is_empty()) {
            return Err(OptimiserError::config("reclaim command must not be empty"));
        }

        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }

    pub fn log_file(&self) -> PathBuf {
        self.log_dir.join(LOG_FILE_NAME)
    }
}

/// True for thresholds in `(0, 100]`
pub fn threshold_in_range(threshold: f64) -> bool {
    threshold.is_finite() && threshold > 0.0 && threshold <= 100.0
}

/// Values supplied on the command line. `None`/`false` means "not given".
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub interval_seconds: Option<u64>,
    pub threshold_percent: Option<f64>,
    pub auto_optimise: bool,
    pub test_mode: bool,
    pub no_notify: bool,
    pub log_dir: Option<PathBuf>,
}

/// On-disk TOML configuration. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval_seconds: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold_percent: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_optimise: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settle_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reclaim_command: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notifications: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<PathBuf>,
}

impl FileConfig {
    /// Load config from TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| OptimiserError::ConfigParse {
            path: path.to_path_buf(),
            details: e.to_string(),
        })?;

        toml::from_str(&content).map_err(|e| OptimiserError::ConfigParse {
            path: path.to_path_buf(),
            details: e.to_string(),
        })
    }

    /// Save config to TOML file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(|e| OptimiserError::ConfigParse {
            path: path.to_path_buf(),
            details: e.to_string(),
        })?;
        std::fs::write(path, content).map_err(|source| OptimiserError::Io {
            context: "writing config file",
            source,
        })
    }
}

/// Platform reclaim primitive
///
/// - macOS: `purge` flushes inactive pages and the disk cache
/// - Linux: writing 3 to `vm.drop_caches` frees pagecache, dentries and inodes
pub fn default_reclaim_command() -> Vec<String> {
    let argv: &[&str] = if cfg!(target_os = "macos") {
        &["sudo", "purge"]
    } else if cfg!(target_os = "linux") {
        &["sudo", "sysctl", "-q", "-w", "vm.drop_caches=3"]
    } else {
        &["purge"]
    };

    argv.iter().map(|s| s.to_string()).collect()
}

/// Log directory
/// - Linux: $XDG_STATE_HOME/memory-optimiser (default ~/.local/state/memory-optimiser)
/// - macOS: ~/Library/Application Support/memory-optimiser
/// - elsewhere: ./logs
pub fn default_log_dir() -> PathBuf {
    if let Some(state_dir) = dirs::state_dir() {
        return state_dir.join(APP_NAME);
    }
    if let Some(data_dir) = dirs::data_dir() {
        return data_dir.join(APP_NAME);
    }
    PathBuf::from("logs")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MonitorConfig::default();
        assert_eq!(config.interval_seconds, 300);
        assert_eq!(config.threshold_percent, 75.0);
        assert!(!config.auto_optimise);
        assert!(!config.test_mode);
        assert!(config.notifications);
        assert!(config.validate().is_ok());
        assert!(config.log_file().ends_with(LOG_FILE_NAME));
    }

    #[test]
    fn test_invalid_values_rejected() {
        for (interval, threshold) in [(0, 75.0), (60, 0.0), (60, 150.0), (60, -5.0), (60, f64::NAN)] {
            let overrides = ConfigOverrides {
                interval_seconds: Some(interval),
                threshold_percent: Some(threshold),
                ..Default::default()
            };
            let err = MonitorConfig::resolve(None, overrides).unwrap_err();
            assert!(
                matches!(err, OptimiserError::ConfigInvalid { .. }),
                "interval={interval} threshold={threshold} gave {err:?}"
            );
        }
    }

    #[test]
    fn test_threshold_upper_bound_inclusive() {
        let overrides = ConfigOverrides {
            threshold_percent: Some(100.0),
            ..Default::default()
        };
        let config = MonitorConfig::resolve(None, overrides).unwrap();
        assert_eq!(config.threshold_percent, 100.0);
    }

    #[test]
    fn test_empty_reclaim_command_rejected() {
        let file = FileConfig {
            reclaim_command: Some(vec![]),
            ..Default::default()
        };
        assert!(MonitorConfig::resolve(Some(file), ConfigOverrides::default()).is_err());
    }

    #[test]
    fn test_flags_override_file() {
        let file = FileConfig {
            interval_seconds: Some(120),
            threshold_percent: Some(80.0),
            auto_optimise: Some(false),
            notifications: Some(true),
            settle_ms: Some(0),
            ..Default::default()
        };
        let overrides = ConfigOverrides {
            threshold_percent: Some(70.0),
            auto_optimise: true,
            no_notify: true,
            ..Default::default()
        };

        let config = MonitorConfig::resolve(Some(file), overrides).unwrap();
        assert_eq!(config.interval_seconds, 120);
        assert_eq!(config.threshold_percent, 70.0);
        assert!(config.auto_optimise);
        assert!(!config.notifications);
        assert_eq!(config.settle_delay, Duration::ZERO);
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("optimiser.toml");

        let file = FileConfig {
            interval_seconds: Some(60),
            threshold_percent: Some(82.5),
            reclaim_command: Some(vec!["purge".into()]),
            ..Default::default()
        };
        file.save(&path).unwrap();

        let loaded = FileConfig::load(&path).unwrap();
        assert_eq!(loaded, file);
    }

    #[test]
    fn test_file_parse_errors() {
        let dir = tempfile::tempdir().unwrap();

        let missing = FileConfig::load(&dir.path().join("missing.toml")).unwrap_err();
        assert!(matches!(missing, OptimiserError::ConfigParse { .. }));

        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "interval_seconds = \"soon\"\n").unwrap();
        let bad = FileConfig::load(&path).unwrap_err();
        assert!(matches!(bad, OptimiserError::ConfigParse { .. }));

        std::fs::write(&path, "colour = \"blue\"\n").unwrap();
        assert!(FileConfig::load(&path).is_err());
    }
}
