//! Error taxonomy for the memory optimiser

use std::path::PathBuf;

use thiserror::Error;

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, OptimiserError>;

/// Everything that can go wrong while monitoring or reclaiming memory.
///
/// Only configuration errors and a failed *first* sample stop the process;
/// the loop logs the rest and carries on with the next tick.
#[derive(Debug, Error)]
pub enum OptimiserError {
    /// Configuration rejected before the loop starts
    #[error("invalid configuration: {details}")]
    ConfigInvalid { details: String },

    /// Config file could not be read or parsed
    #[error("failed to load config file {}: {details}", .path.display())]
    ConfigParse { path: PathBuf, details: String },

    /// The OS memory counters could not be read
    #[error("memory statistics unavailable: {details}")]
    StatsUnavailable { details: String },

    /// The privileged purge command did not succeed
    #[error("memory reclaim failed: {details}")]
    ReclaimFailed { details: String },

    #[error("I/O failure while {context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
}

impl OptimiserError {
    pub fn config(details: impl Into<String>) -> Self {
        Self::ConfigInvalid {
            details: details.into(),
        }
    }

    pub fn stats(details: impl Into<String>) -> Self {
        Self::StatsUnavailable {
            details: details.into(),
        }
    }

    pub fn reclaim(details: impl Into<String>) -> Self {
        Self::ReclaimFailed {
            details: details.into(),
        }
    }

    /// Process exit code when this error ends the run
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::ConfigInvalid { .. } | Self::ConfigParse { .. } => 2,
            Self::StatsUnavailable { .. } | Self::ReclaimFailed { .. } | Self::Io { .. } => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(OptimiserError::config("bad").exit_code(), 2);
        assert_eq!(
            OptimiserError::ConfigParse {
                path: PathBuf::from("x.toml"),
                details: "oops".into(),
            }
            .exit_code(),
            2
        );
        assert_eq!(OptimiserError::stats("no counters").exit_code(), 1);
        assert_ne!(OptimiserError::reclaim("denied").exit_code(), 0);
    }

    #[test]
    fn test_error_display() {
        let err = OptimiserError::config("interval must be positive");
        assert_eq!(
            err.to_string(),
            "invalid configuration: interval must be positive"
        );

        let err = OptimiserError::reclaim("exit status 1");
        assert!(err.to_string().contains("reclaim failed"));
    }
}
