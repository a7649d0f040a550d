//! Platform abstraction for memory statistics, reclaim and notifications
//!
//! The monitor loop only talks to the OS through the three traits below, so
//! tests and test mode can swap in scripted implementations:
//!
//! ```text
//!            +-------------+
//!            |   Monitor   |
//!            +------+------+
//!                   |
//!     +-------------+-------------+
//!     |             |             |
//! +---v----+   +----v-----+  +----v-----+
//! | Stats  |   | Reclaim  |  | Notifier |
//! +--------+   +----------+  +----------+
//!  sysinfo +    sudo purge /   osascript /
//!  meminfo /    drop_caches    notify-send
//!  vm_stat
//! ```

pub mod notify;
pub mod reclaim;
pub mod stats;

use crate::core::error::Result;
use crate::monitor::snapshot::MemorySnapshot;

pub use notify::DesktopNotifier;
pub use reclaim::CommandReclaimer;
pub use stats::SystemStatsReader;

/// Source of memory snapshots
pub trait MemoryStatsProvider {
    /// Read current host memory state. Fails with `StatsUnavailable`.
    fn snapshot(&mut self) -> Result<MemorySnapshot>;
}

/// The OS memory-reclaim primitive
pub trait Reclaimer {
    /// Run the purge once. Fails with `ReclaimFailed`.
    fn reclaim(&mut self) -> Result<()>;
}

/// Fire-and-forget user notifications
pub trait Notifier {
    fn notify(&mut self, message: &str);
}

/// Returns the current platform name
pub fn platform_name() -> &'static str {
    if cfg!(target_os = "macos") {
        "macos"
    } else if cfg!(target_os = "linux") {
        "linux"
    } else if cfg!(target_os = "windows") {
        "windows"
    } else {
        "unsupported"
    }
}

/// Check if the platform has a built-in reclaim primitive
pub fn is_platform_supported() -> bool {
    cfg!(any(target_os = "macos", target_os = "linux"))
}

/// Whether the process runs with root privileges
pub fn is_root() -> bool {
    #[cfg(unix)]
    {
        // SAFETY: geteuid has no preconditions and cannot fail
        unsafe { libc::geteuid() == 0 }
    }

    #[cfg(not(unix))]
    {
        false
    }
}

/// "Darwin 23.4.0"-style description for the startup log
pub fn system_description() -> String {
    let name = sysinfo::System::name().unwrap_or_else(|| platform_name().to_string());
    let release = sysinfo::System::kernel_version()
        .or_else(sysinfo::System::os_version)
        .unwrap_or_else(|| "unknown".to_string());
    format!("{} {}", name, release)
}
