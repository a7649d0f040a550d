//! Host memory statistics
//!
//! Totals come from `sysinfo`; the active/inactive/wired breakdown is
//! platform specific:
//! - Linux: `/proc/meminfo` (`Active`, `Inactive`, `Unevictable`)
//! - macOS: `vm_stat` page counts multiplied by the reported page size
//! - elsewhere: zeros

use sysinfo::System;
use tracing::debug;

use super::MemoryStatsProvider;
use crate::core::error::{OptimiserError, Result};
use crate::monitor::snapshot::{MemoryBreakdown, MemorySnapshot};

/// Page size assumed when `vm_stat` does not print one
const DEFAULT_PAGE_SIZE: u64 = 4096;

/// Reads real memory counters from the running host
pub struct SystemStatsReader {
    sys: System,
}

impl SystemStatsReader {
    pub fn new() -> Self {
        Self { sys: System::new() }
    }

    fn read_breakdown() -> Result<MemoryBreakdown> {
        #[cfg(target_os = "linux")]
        {
            let content = std::fs::read_to_string("/proc/meminfo")
                .map_err(|e| OptimiserError::stats(format!("cannot read /proc/meminfo: {}", e)))?;
            Ok(parse_meminfo(&content))
        }

        #[cfg(target_os = "macos")]
        {
            let output = std::process::Command::new("vm_stat")
                .output()
                .map_err(|e| OptimiserError::stats(format!("cannot run vm_stat: {}", e)))?;
            if !output.status.success() {
                return Err(OptimiserError::stats(format!(
                    "vm_stat exited with {}",
                    output.status
                )));
            }
            parse_vm_stat(&String::from_utf8_lossy(&output.stdout))
        }

        #[cfg(not(any(target_os = "linux", target_os = "macos")))]
        {
            Ok(MemoryBreakdown::default())
        }
    }
}

impl Default for SystemStatsReader {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStatsProvider for SystemStatsReader {
    fn snapshot(&mut self) -> Result<MemorySnapshot> {
        self.sys.refresh_memory();

        let total = self.sys.total_memory();
        if total == 0 {
            return Err(OptimiserError::stats(
                "operating system reported zero total memory",
            ));
        }
        let available = self.sys.available_memory();
        let breakdown = Self::read_breakdown()?;

        debug!(
            "Raw counters: total={} available={} {:?}",
            total, available, breakdown
        );

        Ok(MemorySnapshot::new(total, available, breakdown))
    }
}

/// Parse a value like "1234 kB" to bytes
fn parse_kb_value(value: &str) -> u64 {
    let mut parts = value.split_whitespace();
    let Some(number) = parts.next().and_then(|n| n.parse::<u64>().ok()) else {
        return 0;
    };
    // Counters such as HugePages_Total have no unit
    if parts.next().is_some_and(|unit| unit.eq_ignore_ascii_case("kb")) {
        number * 1024
    } else {
        number
    }
}

/// Extract the page-state breakdown from `/proc/meminfo` text
pub fn parse_meminfo(content: &str) -> MemoryBreakdown {
    let mut breakdown = MemoryBreakdown::default();

    for line in content.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };

        match key.trim() {
            "Active" => breakdown.active = parse_kb_value(value),
            "Inactive" => breakdown.inactive = parse_kb_value(value),
            "Unevictable" => breakdown.wired = parse_kb_value(value),
            _ => {}
        }
    }

    breakdown
}

/// Extract the page-state breakdown from `vm_stat` output
///
/// ```text
/// Mach Virtual Memory Statistics: (page size of 16384 bytes)
/// Pages free:                               12345.
/// Pages active:                            234567.
/// ```
pub fn parse_vm_stat(content: &str) -> Result<MemoryBreakdown> {
    let mut lines = content.lines();
    let header = lines
        .next()
        .ok_or_else(|| OptimiserError::stats("vm_stat produced no output"))?;
    let page_size = parse_page_size(header).unwrap_or(DEFAULT_PAGE_SIZE);

    let mut breakdown = MemoryBreakdown::default();
    let mut seen = 0usize;

    for line in lines {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let Ok(pages) = value.trim().trim_end_matches('.').parse::<u64>() else {
            continue;
        };

        match key.trim() {
            "Pages active" => breakdown.active = pages * page_size,
            "Pages inactive" => breakdown.inactive = pages * page_size,
            "Pages wired down" => breakdown.wired = pages * page_size,
            _ => continue,
        }
        seen += 1;
    }

    if seen == 0 {
        return Err(OptimiserError::stats(
            "vm_stat output had no page counters",
        ));
    }

    Ok(breakdown)
}

fn parse_page_size(header: &str) -> Option<u64> {
    let (_, rest) = header.split_once("page size of")?;
    rest.split_whitespace().next()?.parse().ok()
}
