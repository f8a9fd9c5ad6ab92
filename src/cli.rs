//! Command-line interface for portprobe.
//!
//! Uses `clap` derive macros for declarative argument parsing. The CLI is a
//! result sink: it starts one scan and prints each event as it arrives.

use crate::config::Settings;
use crate::error::{CliResult, ScanError};
use crate::output::{self, EventPrinter, OutputFormat};
use crate::scanner::{ScanConfig, ScanCoordinator, ScanSummary};
use crate::types::{PortRange, ScanRequest};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

/// A concurrent TCP connect port scanner.
///
/// Probes every port in START..=END on HOST and prints open ports as soon
/// as they are found.
#[derive(Parser, Debug)]
#[command(name = "portprobe")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "A concurrent TCP connect port scanner", long_about = None)]
pub struct Cli {
    /// Target IP address or hostname
    #[arg(value_name = "HOST")]
    pub host: String,

    /// First port of the range (inclusive)
    #[arg(value_name = "START")]
    pub start: u32,

    /// Last port of the range (inclusive)
    #[arg(value_name = "END")]
    pub end: u32,

    /// Connection timeout per port in milliseconds [default: 500]
    #[arg(short = 't', long, value_name = "MS")]
    pub timeout: Option<u64>,

    /// Maximum number of concurrent probes [default: 100]
    #[arg(short = 'c', long, value_name = "N")]
    pub concurrency: Option<usize>,

    /// Also report closed, filtered and failed ports
    #[arg(long)]
    pub show_closed: bool,

    /// Output format for results
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Plain)]
    pub output: OutputFormat,

    /// Show a progress bar on stderr
    #[arg(long)]
    pub progress: bool,

    /// Path to a settings file
    #[arg(long, value_name = "PATH", env = "PORTPROBE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress everything except results and errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

impl Cli {
    /// Merge the settings file with command-line overrides.
    pub fn scan_config(&self) -> CliResult<ScanConfig> {
        let settings = Settings::load(self.config.as_deref())?;
        let mut config = settings.scan_config();

        if let Some(ms) = self.timeout {
            config.timeout = Duration::from_millis(ms);
        }
        if let Some(n) = self.concurrency {
            config.max_concurrency = n;
        }
        if self.show_closed {
            config.report_closed = true;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate the requested range and target.
    pub fn request(&self) -> Result<ScanRequest, ScanError> {
        let range = PortRange::from_raw(self.start, self.end)?;
        Ok(ScanRequest::with_range(&self.host, range))
    }

    /// Run the scan, printing events as they arrive.
    ///
    /// Ctrl-C cancels the scan: no further ports are probed, in-flight
    /// probes finish, and the summary is still printed. A scan-level
    /// failure is printed as an event and flagged in the returned summary.
    pub async fn execute(&self) -> CliResult<ScanSummary> {
        let config = self.scan_config()?;
        let request = self.request()?;
        debug!(?config, %request, "starting scan");

        let coordinator = ScanCoordinator::new(config)?;

        if !self.quiet && self.output == OutputFormat::Plain {
            output::print_scan_header(
                request.host(),
                &request.range().to_string(),
                request.port_count(),
            );
        }

        let mut printer = EventPrinter::new(self.output);
        if self.progress {
            printer = printer.with_progress(request.port_count() as u64);
        }

        let mut handle = coordinator.scan(request);
        let progress = handle.progress();

        let canceller = handle.canceller();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                canceller.cancel();
            }
        });

        let mut ticker = tokio::time::interval(Duration::from_millis(100));

        loop {
            tokio::select! {
                event = handle.next_event() => {
                    let Some(event) = event else { break };
                    printer.event(&event)?;
                }
                _ = ticker.tick() => printer.set_position(progress.completed()),
            }
        }

        if handle.is_cancelled() && !self.quiet {
            output::print_warning("scan cancelled, results are partial");
        }

        let summary = handle.finish().await?;
        printer.set_position(progress.completed());
        printer.finish(&summary, self.quiet)?;
        Ok(summary)
    }
}
