//! Privileged memory reclaim via an external command

use std::io;
use std::process::{Command, Stdio};

use tracing::{debug, info};

use super::Reclaimer;
use crate::core::error::{OptimiserError, Result};

/// Runs the configured purge command (`sudo purge` on macOS)
///
/// `sudo` asks for a password on the controlling terminal when the
/// credentials are not cached; that prompt is outside our control.
#[derive(Debug, Clone)]
pub struct CommandReclaimer {
    argv: Vec<String>,
}

impl CommandReclaimer {
    pub fn new(argv: Vec<String>) -> Self {
        Self { argv }
    }

    pub fn command_line(&self) -> String {
        self.argv.join(" ")
    }
}

impl Reclaimer for CommandReclaimer {
    fn reclaim(&mut self) -> Result<()> {
        let (program, args) = self
            .argv
            .split_first()
            .ok_or_else(|| OptimiserError::reclaim("no reclaim command configured"))?;

        info!("Attempting to free up inactive memory...");
        debug!("Running `{}`", self.command_line());

        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::inherit())
            .output()
            .map_err(|e| match e.kind() {
                io::ErrorKind::NotFound => {
                    OptimiserError::reclaim(format!("command not found: {}", program))
                }
                io::ErrorKind::PermissionDenied => {
                    OptimiserError::reclaim(format!("permission denied running {}", program))
                }
                _ => OptimiserError::reclaim(format!("failed to run {}: {}", program, e)),
            })?;

        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let stderr = stderr.trim();
        Err(OptimiserError::reclaim(if stderr.is_empty() {
            format!("`{}` exited with {}", self.command_line(), output.status)
        } else {
            format!("`{}` exited with {}: {}", self.command_line(), output.status, stderr)
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_missing_command() {
        let mut reclaimer = CommandReclaimer::new(argv(&["definitely-not-a-purge-binary-xyz"]));
        let err = reclaimer.reclaim().unwrap_err();
        assert!(matches!(err, OptimiserError::ReclaimFailed { .. }));
        assert!(err.to_string().contains("command not found"));
    }

    #[test]
    fn test_empty_command() {
        let mut reclaimer = CommandReclaimer::new(vec![]);
        assert!(reclaimer.reclaim().is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_exit_status() {
        assert!(CommandReclaimer::new(argv(&["true"])).reclaim().is_ok());

        let err = CommandReclaimer::new(argv(&["sh", "-c", "echo denied >&2; exit 3"]))
            .reclaim()
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("denied"), "{msg}");
    }
}
