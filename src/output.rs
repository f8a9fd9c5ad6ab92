//! Terminal output for scan events.
//!
//! Plain output prints one styled line per event as it arrives; JSON output
//! prints one JSON object per line so results can be piped into other tools.

use crate::scanner::{PortState, ScanEvent, ScanSummary};
use console::{style, Style};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::io::{self, Write};

/// Output format for results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable lines
    #[default]
    Plain,
    /// One JSON object per line
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Plain => write!(f, "plain"),
            Self::Json => write!(f, "json"),
        }
    }
}

/// Writes events to stdout, optionally under a progress bar on stderr.
pub struct EventPrinter {
    format: OutputFormat,
    progress: Option<ProgressBar>,
}

impl EventPrinter {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            progress: None,
        }
    }

    /// Show a progress bar for `total` probes.
    pub fn with_progress(mut self, total: u64) -> Self {
        let pb = ProgressBar::with_draw_target(Some(total), ProgressDrawTarget::stderr());
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%)")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-");
        pb.set_style(style);
        self.progress = Some(pb);
        self
    }

    /// Update the progress bar position, if one is shown.
    pub fn set_position(&self, completed: u64) {
        if let Some(pb) = &self.progress {
            pb.set_position(completed);
        }
    }

    /// Print one event.
    pub fn event(&self, event: &ScanEvent) -> io::Result<()> {
        let line = match self.format {
            OutputFormat::Plain => styled_line(event),
            OutputFormat::Json => serde_json::to_string(event).map_err(io::Error::other)?,
        };

        let write_line = || {
            let stdout = io::stdout();
            let mut out = stdout.lock();
            writeln!(out, "{}", line)?;
            out.flush()
        };

        match &self.progress {
            Some(pb) => pb.suspend(write_line),
            None => write_line(),
        }
    }

    /// Close the progress bar and print the summary.
    pub fn finish(&self, summary: &ScanSummary, quiet: bool) -> io::Result<()> {
        if let Some(pb) = &self.progress {
            pb.finish_and_clear();
        }

        match self.format {
            OutputFormat::Json => {
                let json = serde_json::to_string(summary).map_err(io::Error::other)?;
                println!("{}", json);
                Ok(())
            }
            OutputFormat::Plain if quiet => Ok(()),
            OutputFormat::Plain => print_summary(summary),
        }
    }
}

/// The event line with terminal styling applied.
fn styled_line(event: &ScanEvent) -> String {
    let style = match event {
        ScanEvent::Open { .. } => Style::new().green().bold(),
        ScanEvent::NotOpen(result) => match result.state {
            PortState::Closed => Style::new().red(),
            PortState::Filtered => Style::new().yellow(),
            PortState::Error | PortState::Open => Style::new().magenta(),
        },
        ScanEvent::Failed { .. } => Style::new().red().bold(),
    };
    style.apply_to(event.to_string()).to_string()
}

/// Print a scan header before scanning begins.
pub fn print_scan_header(host: &str, ports: &str, count: usize) {
    println!();
    println!(
        "{} {} v{}",
        style("Starting").cyan(),
        style("portprobe").cyan().bold(),
        env!("CARGO_PKG_VERSION")
    );
    println!(
        "{} Scanning {} ports {} ({} ports)...",
        style("•").dim(),
        style(host).white().bold(),
        ports,
        style(count).white().bold()
    );
    println!();
}

fn print_summary(summary: &ScanSummary) -> io::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();

    writeln!(out)?;
    let status = if summary.failed {
        style("failed").red().bold()
    } else if summary.cancelled {
        style("cancelled").yellow().bold()
    } else {
        style("complete").green().bold()
    };
    writeln!(
        out,
        "  {} {} of {} ports probed in {:.2}s ({})",
        style("Statistics:").bold(),
        summary.probed,
        summary.requested(),
        summary.elapsed_ms as f64 / 1000.0,
        status
    )?;
    writeln!(
        out,
        "              {} open, {} closed, {} filtered, {} errors",
        style(summary.open).green().bold(),
        style(summary.closed).red(),
        style(summary.filtered).yellow(),
        style(summary.errors).magenta()
    )?;
    writeln!(out)
}

/// Print an error message.
pub fn print_error(msg: &str) {
    eprintln!("{} {}", style("Error:").red().bold(), msg);
}

/// Print a warning message.
pub fn print_warning(msg: &str) {
    eprintln!("{} {}", style("Warning:").yellow().bold(), msg);
}
