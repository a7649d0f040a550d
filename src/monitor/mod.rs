//! Memory monitoring loop
//!
//! - `snapshot`: readings and the threshold decision
//! - `runner`: the sample/decide/reclaim/sleep state machine
//! - `confirm`: operator consent for interactive purges
//! - `shutdown`: interrupt handling

pub mod confirm;
pub mod runner;
pub mod shutdown;
pub mod snapshot;

pub use confirm::{Confirmer, StdinConfirmer};
pub use runner::{Monitor, MonitorState, RunSummary, TickOutcome};
pub use shutdown::ShutdownSignal;
pub use snapshot::{should_optimise, MemoryBreakdown, MemorySnapshot};
