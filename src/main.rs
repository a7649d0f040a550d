//! Memory Optimiser CLI
//!
//! Monitors memory usage at a fixed interval and frees inactive memory when
//! usage crosses the threshold, either automatically (`--auto`) or after
//! asking. `--test` runs a single simulated check and exits.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};

use memory_optimiser::core::config::{ConfigOverrides, FileConfig, MonitorConfig};
use memory_optimiser::core::error::OptimiserError;
use memory_optimiser::demo::run_demo;
use memory_optimiser::logging;
use memory_optimiser::monitor::{Monitor, ShutdownSignal, StdinConfirmer};
use memory_optimiser::platform::{self, CommandReclaimer, DesktopNotifier, SystemStatsReader};

#[derive(Parser)]
#[command(name = "memory-optimiser")]
#[command(about = "Monitor memory usage and free inactive memory above a threshold", long_about = None)]
struct Cli {
    /// Check interval in seconds (default: 300)
    #[arg(long, value_name = "SECS")]
    interval: Option<u64>,

    /// Memory usage threshold percentage (default: 75.0)
    #[arg(long, value_name = "PCT")]
    threshold: Option<f64>,

    /// Automatically optimise memory when the threshold is exceeded
    #[arg(long)]
    auto: bool,

    /// Run in test mode to simulate memory optimisation
    #[arg(long)]
    test: bool,

    /// TOML config file
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Directory for memory_optimiser.log
    #[arg(long, value_name = "DIR")]
    log_dir: Option<PathBuf>,

    /// Do not send desktop notifications
    #[arg(long)]
    no_notify: bool,
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            interval_seconds: self.interval,
            threshold_percent: self.threshold,
            auto_optimise: self.auto,
            test_mode: self.test,
            no_notify: self.no_notify,
            log_dir: self.log_dir.clone(),
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let file = match cli.config.as_deref().map(FileConfig::load).transpose() {
        Ok(file) => file,
        Err(e) => return fail_before_logging(e),
    };
    let config = MonitorConfig::merge(file, cli.overrides());

    if config.test_mode {
        return run_test_mode(&config).await;
    }

    if let Err(e) = config.validate() {
        return fail_before_logging(e);
    }

    let _log_guard = match logging::init(Some(&config.log_dir)) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(e.exit_code());
        }
    };
    info!("Logging to {}", config.log_file().display());

    if platform::is_root() {
        info!("Running with root privileges");
    }

    let shutdown = ShutdownSignal::new();
    shutdown.install_os_handlers();

    let reclaimer = CommandReclaimer::new(config.reclaim_command.clone());
    let notifier = DesktopNotifier::new(config.notifications);

    let mut monitor = match Monitor::new(
        config,
        SystemStatsReader::new(),
        reclaimer,
        StdinConfirmer::new(),
        notifier,
    ) {
        Ok(monitor) => monitor,
        Err(e) => {
            error!("{}", e);
            return ExitCode::from(e.exit_code());
        }
    };

    match monitor.run(shutdown).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Memory Optimiser could not start: {}", e);
            ExitCode::from(e.exit_code())
        }
    }
}

/// Single simulated tick; always exits 0
async fn run_test_mode(config: &MonitorConfig) -> ExitCode {
    // Console only: the demonstration never writes to the log file
    let _log_guard = logging::init(None);

    let shutdown = ShutdownSignal::new();
    shutdown.install_os_handlers();

    if let Err(e) = run_demo(config, StdinConfirmer::new(), &shutdown).await {
        error!("Test mode failed: {}", e);
    }
    ExitCode::SUCCESS
}

/// Report an error that happens before the log file is set up
fn fail_before_logging(e: OptimiserError) -> ExitCode {
    if logging::init(None).is_ok() {
        error!("{}", e);
    } else {
        eprintln!("Error: {}", e);
    }
    ExitCode::from(e.exit_code())
}
