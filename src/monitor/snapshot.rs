//! Point-in-time memory readings and the threshold decision

use std::fmt;

use chrono::{DateTime, Local};

const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Page-state counters that not every platform reports
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryBreakdown {
    pub active: u64,
    pub inactive: u64,
    /// Memory the kernel will never page out (macOS "wired down",
    /// Linux `Unevictable`)
    pub wired: u64,
}

/// One reading of host memory counters, all in bytes
#[derive(Debug, Clone, PartialEq)]
pub struct MemorySnapshot {
    pub total: u64,
    pub used: u64,
    /// Available memory: free pages plus caches the OS can drop
    pub free: u64,
    pub active: u64,
    pub inactive: u64,
    pub wired: u64,
    /// `used / total * 100`, always within `[0, 100]`
    pub used_percent: f64,
    pub taken_at: DateTime<Local>,
}

impl MemorySnapshot {
    /// Build a snapshot from total and available memory. `free` is capped at
    /// `total` so the derived figures stay consistent.
    pub fn new(total: u64, free: u64, breakdown: MemoryBreakdown) -> Self {
        let free = free.min(total);
        let used = total - free;

        Self {
            total,
            used,
            free,
            active: breakdown.active,
            inactive: breakdown.inactive,
            wired: breakdown.wired,
            used_percent: usage_percent(used, total),
            taken_at: Local::now(),
        }
    }

    pub fn total_gb(&self) -> f64 {
        bytes_to_gb(self.total)
    }

    pub fn used_gb(&self) -> f64 {
        bytes_to_gb(self.used)
    }

    pub fn free_gb(&self) -> f64 {
        bytes_to_gb(self.free)
    }

    pub fn active_gb(&self) -> f64 {
        bytes_to_gb(self.active)
    }

    pub fn inactive_gb(&self) -> f64 {
        bytes_to_gb(self.inactive)
    }

    pub fn wired_gb(&self) -> f64 {
        bytes_to_gb(self.wired)
    }

    /// Multi-line report used by test mode
    pub fn report(&self) -> String {
        format!(
            "  Total Memory: {:.2} GB\n\
             \x20 Used Memory: {:.2} GB ({:.1}%)\n\
             \x20 Free Memory: {:.2} GB\n\
             \x20 Active Memory: {:.2} GB\n\
             \x20 Inactive Memory: {:.2} GB\n\
             \x20 Wired Memory: {:.2} GB",
            self.total_gb(),
            self.used_gb(),
            self.used_percent,
            self.free_gb(),
            self.active_gb(),
            self.inactive_gb(),
            self.wired_gb(),
        )
    }
}

impl fmt::Display for MemorySnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Memory Status: {:.1}% used ({:.2}GB/{:.2}GB) - Free: {:.2}GB, Active: {:.2}GB, Inactive: {:.2}GB, Wired: {:.2}GB",
            self.used_percent,
            self.used_gb(),
            self.total_gb(),
            self.free_gb(),
            self.active_gb(),
            self.inactive_gb(),
            self.wired_gb(),
        )
    }
}

/// Percentage of `total` that is `used`, clamped to `[0, 100]`
pub fn usage_percent(used: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    ((used as f64 / total as f64) * 100.0).clamp(0.0, 100.0)
}

/// Threshold decision. Inclusive: usage exactly at the threshold triggers.
pub fn should_optimise(snapshot: &MemorySnapshot, threshold_percent: f64) -> bool {
    snapshot.used_percent >= threshold_percent
}

/// Change in available memory between two readings. Negative when memory
/// filled up again faster than the purge released it.
pub fn freed_bytes(before: &MemorySnapshot, after: &MemorySnapshot) -> i64 {
    after.free as i64 - before.free as i64
}

pub fn bytes_to_gb(bytes: u64) -> f64 {
    bytes as f64 / BYTES_PER_GB
}

pub fn signed_bytes_to_gb(bytes: i64) -> f64 {
    bytes as f64 / BYTES_PER_GB
}

#[cfg(test)]
mod tests {
    use super::*;

    const GB: u64 = 1024 * 1024 * 1024;

    fn snapshot_at(percent: f64) -> MemorySnapshot {
        let total = 100 * GB;
        let used = (total as f64 * percent / 100.0) as u64;
        MemorySnapshot::new(total, total - used, MemoryBreakdown::default())
    }

    #[test]
    fn test_used_percent_bounds() {
        let empty = MemorySnapshot::new(0, 0, MemoryBreakdown::default());
        assert_eq!(empty.used_percent, 0.0);

        let full = MemorySnapshot::new(16 * GB, 0, MemoryBreakdown::default());
        assert_eq!(full.used_percent, 100.0);

        // Free larger than total cannot push usage below zero
        let odd = MemorySnapshot::new(8 * GB, 9 * GB, MemoryBreakdown::default());
        assert_eq!(odd.used, 0);
        assert_eq!(odd.used_percent, 0.0);

        for used in [0, 1, GB, 7 * GB, 16 * GB] {
            let s = MemorySnapshot::new(16 * GB, 16 * GB - used, MemoryBreakdown::default());
            assert!((0.0..=100.0).contains(&s.used_percent));
        }
    }

    #[test]
    fn test_derived_fields() {
        let s = MemorySnapshot::new(
            16 * GB,
            4 * GB,
            MemoryBreakdown {
                active: 6 * GB,
                inactive: 3 * GB,
                wired: 2 * GB,
            },
        );
        assert_eq!(s.used, 12 * GB);
        assert_eq!(s.used_percent, 75.0);
        assert_eq!(s.total_gb(), 16.0);
        assert_eq!(s.inactive_gb(), 3.0);
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let s = snapshot_at(75.0);
        assert_eq!(s.used_percent, 75.0);
        assert!(should_optimise(&s, 75.0));
        assert!(should_optimise(&s, 74.9));
        assert!(!should_optimise(&s, 75.1));
    }

    #[test]
    fn test_decision_scenarios() {
        assert!(should_optimise(&snapshot_at(82.0), 70.0));
        assert!(!should_optimise(&snapshot_at(60.0), 75.0));
        assert!(should_optimise(&snapshot_at(100.0), 100.0));
    }

    #[test]
    fn test_freed_bytes() {
        let before = MemorySnapshot::new(16 * GB, 2 * GB, MemoryBreakdown::default());
        let after = MemorySnapshot::new(16 * GB, 5 * GB, MemoryBreakdown::default());
        assert_eq!(freed_bytes(&before, &after), 3 * GB as i64);
        assert_eq!(freed_bytes(&after, &before), -(3 * GB as i64));
        assert_eq!(signed_bytes_to_gb(freed_bytes(&before, &after)), 3.0);
    }

    #[test]
    fn test_status_line() {
        let s = MemorySnapshot::new(
            16 * GB,
            4 * GB,
            MemoryBreakdown {
                active: 6 * GB,
                inactive: 3 * GB,
                wired: 2 * GB,
            },
        );
        assert_eq!(
            s.to_string(),
            "Memory Status: 75.0% used (12.00GB/16.00GB) - Free: 4.00GB, Active: 6.00GB, Inactive: 3.00GB, Wired: 2.00GB"
        );
        assert!(s.report().contains("Used Memory: 12.00 GB (75.0%)"));
    }
}
