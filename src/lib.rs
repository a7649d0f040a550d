//! Memory Optimiser
//!
//! Watches host memory usage and frees inactive memory through the OS purge
//! primitive when usage reaches a configurable threshold.
//!
//! ## Features
//!
//! - **Monitoring**: fixed-interval sampling of total/used/free/active/inactive/wired memory
//! - **Threshold decision**: inclusive percentage comparison, no hysteresis
//! - **Reclaim**: `sudo purge` on macOS, `vm.drop_caches` on Linux
//! - **Interactive mode**: notify and ask before purging
//! - **Test mode**: one simulated check without sampling or privileges
//!
//! ## Safety
//!
//! - Nothing is purged in interactive mode without an explicit "yes"
//! - Purge failures are logged and never stop the loop
//! - An interrupt never leaves a purge half-started

pub mod core;
pub mod demo;
pub mod logging;
pub mod monitor;
pub mod platform;

// Re-exports
pub use core::config::{ConfigOverrides, FileConfig, MonitorConfig};
pub use core::error::{OptimiserError, Result};
pub use monitor::{
    Confirmer, MemorySnapshot, Monitor, MonitorState, RunSummary, ShutdownSignal, StdinConfirmer,
    TickOutcome,
};
pub use platform::{
    CommandReclaimer, DesktopNotifier, MemoryStatsProvider, Notifier, Reclaimer,
    SystemStatsReader,
};
