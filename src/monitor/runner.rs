//! The monitor loop: sample, decide, reclaim, sleep, repeat

use tracing::{debug, error, info, warn};

use super::confirm::Confirmer;
use super::shutdown::ShutdownSignal;
use super::snapshot::{freed_bytes, should_optimise, signed_bytes_to_gb, MemorySnapshot};
use crate::core::config::MonitorConfig;
use crate::core::error::Result;
use crate::platform::{self, MemoryStatsProvider, Notifier, Reclaimer};

pub const CONFIRM_QUESTION: &str = "Would you like to optimise memory now?";

/// Lifecycle of a [`Monitor`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Starting,
    Running,
    Stopping,
    Stopped,
}

/// What a single tick ended up doing
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// Usage under the threshold, nothing to do
    BelowThreshold,
    /// Purge ran; `freed_bytes` is `None` when the follow-up reading failed
    Reclaimed { freed_bytes: Option<i64> },
    /// Purge was attempted and failed
    ReclaimFailed,
    /// Operator said no (or did not answer)
    Declined,
    /// Shutdown arrived before the purge could run
    Interrupted,
    /// Counters could not be read this tick
    StatsUnavailable,
}

/// Counters over the lifetime of a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub ticks: u64,
    pub triggered: u64,
    pub reclaims: u64,
    pub reclaim_failures: u64,
    pub stats_failures: u64,
}

/// Memory monitor, generic over its OS collaborators
pub struct Monitor<S, R, C, N> {
    config: MonitorConfig,
    stats: S,
    reclaimer: R,
    confirmer: C,
    notifier: N,
    state: MonitorState,
    summary: RunSummary,
}

impl<S, R, C, N> Monitor<S, R, C, N>
where
    S: MemoryStatsProvider,
    R: Reclaimer,
    C: Confirmer,
    N: Notifier,
{
    /// Validate the configuration and build a monitor in `Starting` state.
    /// Nothing is sampled until [`run`](Self::run) or [`tick`](Self::tick).
    pub fn new(
        config: MonitorConfig,
        stats: S,
        reclaimer: R,
        confirmer: C,
        notifier: N,
    ) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            config,
            stats,
            reclaimer,
            confirmer,
            notifier,
            state: MonitorState::Starting,
            summary: RunSummary::default(),
        })
    }

    pub fn state(&self) -> MonitorState {
        self.state
    }

    pub fn summary(&self) -> &RunSummary {
        &self.summary
    }

    /// Run until `shutdown` fires.
    ///
    /// The first sample is mandatory: if it fails the run ends with
    /// `StatsUnavailable`. Later failures only skip their tick.
    pub async fn run(&mut self, shutdown: ShutdownSignal) -> Result<RunSummary> {
        self.log_startup();

        if shutdown.is_requested() {
            self.stop();
            return Ok(self.summary.clone());
        }

        let first = match self.stats.snapshot() {
            Ok(snapshot) => snapshot,
            Err(e) => {
                error!("Initial memory sample failed: {}", e);
                self.summary.stats_failures += 1;
                self.state = MonitorState::Stopped;
                info!("Memory Optimiser ended");
                return Err(e);
            }
        };

        self.state = MonitorState::Running;
        let mut pending = Some(first);

        loop {
            let outcome = match pending.take() {
                Some(snapshot) => self.evaluate(snapshot, &shutdown).await,
                None => self.tick(&shutdown).await,
            };
            debug!("Tick outcome: {:?}", outcome);

            if shutdown.is_requested() {
                break;
            }

            tokio::select! {
                biased;
                _ = shutdown.requested() => break,
                _ = tokio::time::sleep(self.config.interval()) => {}
            }
        }

        self.stop();
        Ok(self.summary.clone())
    }

    /// One full iteration without the trailing sleep
    pub async fn tick(&mut self, shutdown: &ShutdownSignal) -> TickOutcome {
        match self.stats.snapshot() {
            Ok(snapshot) => self.evaluate(snapshot, shutdown).await,
            Err(e) => {
                self.summary.stats_failures += 1;
                error!("{}; skipping this check", e);
                TickOutcome::StatsUnavailable
            }
        }
    }

    /// Decide on an already-taken snapshot and act on the decision
    pub async fn evaluate(
        &mut self,
        snapshot: MemorySnapshot,
        shutdown: &ShutdownSignal,
    ) -> TickOutcome {
        self.summary.ticks += 1;
        info!("{}", snapshot);

        let threshold = self.config.threshold_percent;
        if !should_optimise(&snapshot, threshold) {
            debug!(
                "Memory usage ({:.1}%) below threshold ({:.1}%)",
                snapshot.used_percent, threshold
            );
            return TickOutcome::BelowThreshold;
        }

        self.summary.triggered += 1;
        warn!(
            "Memory usage ({:.1}%) exceeds threshold ({:.1}%)",
            snapshot.used_percent, threshold
        );

        if !self.config.auto_optimise {
            self.notifier.notify(&format!(
                "Memory usage is high: {:.1}%. Consider freeing up memory.",
                snapshot.used_percent
            ));
            info!("Notification sent to user about high memory usage");

            let answer = tokio::select! {
                biased;
                _ = shutdown.requested() => None,
                answer = self.confirmer.confirm(CONFIRM_QUESTION) => Some(answer),
            };

            match answer {
                None => return self.interrupted(),
                Some(false) => {
                    info!("Memory optimisation cancelled");
                    return TickOutcome::Declined;
                }
                Some(true) => {}
            }
        }

        if shutdown.is_requested() {
            return self.interrupted();
        }

        self.reclaim(&snapshot, shutdown).await
    }

    async fn reclaim(&mut self, before: &MemorySnapshot, shutdown: &ShutdownSignal) -> TickOutcome {
        if let Err(e) = self.reclaimer.reclaim() {
            self.summary.reclaim_failures += 1;
            error!("{}", e);
            self.notifier
                .notify(&format!("Failed to optimise memory: {}", e));
            return TickOutcome::ReclaimFailed;
        }

        self.summary.reclaims += 1;
        info!("Successfully freed up inactive memory");

        // Wait for memory to settle
        let settled = tokio::select! {
            biased;
            _ = shutdown.requested() => false,
            _ = tokio::time::sleep(self.config.settle_delay) => true,
        };
        if !settled {
            info!("Memory optimised (shutdown requested before measuring)");
            return TickOutcome::Reclaimed { freed_bytes: None };
        }

        match self.stats.snapshot() {
            Ok(after) => {
                let freed = freed_bytes(before, &after);
                let message = format!(
                    "Memory optimised: {:.2} GB freed",
                    signed_bytes_to_gb(freed)
                );
                info!("{}", message);
                self.notifier.notify(&message);
                TickOutcome::Reclaimed {
                    freed_bytes: Some(freed),
                }
            }
            Err(e) => {
                warn!("Could not measure freed memory: {}", e);
                self.notifier.notify("Memory optimised");
                TickOutcome::Reclaimed { freed_bytes: None }
            }
        }
    }

    fn interrupted(&self) -> TickOutcome {
        info!("Shutdown requested, skipping pending memory optimisation");
        TickOutcome::Interrupted
    }

    fn log_startup(&self) {
        info!("Memory Optimiser started");
        info!("System: {}", platform::system_description());
        info!("Monitoring interval: {} seconds", self.config.interval_seconds);
        info!("Memory threshold: {:.1}%", self.config.threshold_percent);
        info!(
            "Auto-optimisation: {}",
            if self.config.auto_optimise { "Enabled" } else { "Disabled" }
        );
        if !platform::is_platform_supported() {
            warn!(
                "No built-in memory purge on {}; reclaim will use `{}`",
                platform::platform_name(),
                self.config.reclaim_command.join(" ")
            );
        }
        info!("{}", "-".repeat(80));
    }

    fn stop(&mut self) {
        self.state = MonitorState::Stopping;
        info!("Memory Optimiser stopped by user");
        self.state = MonitorState::Stopped;
        info!(
            "Memory Optimiser ended ({} checks, {} purges, {} failed)",
            self.summary.ticks, self.summary.reclaims, self.summary.reclaim_failures
        );
    }
}
