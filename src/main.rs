use anyhow::Context;
use clap::Parser;
use portprobe::cli::Cli;
use portprobe::{output, services};
use std::process::ExitCode;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let runtime = match tokio::runtime::Runtime::new().context("failed to start async runtime") {
        Ok(runtime) => runtime,
        Err(e) => {
            output::print_error(&format!("{:#}", e));
            return ExitCode::FAILURE;
        }
    };

    // Build the service table before any probe needs it.
    tracing::debug!(entries = services::table().len(), "service table ready");

    match runtime.block_on(cli.execute()) {
        Ok(summary) if summary.failed => ExitCode::from(1),
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            output::print_error(&e.to_string());
            ExitCode::from(e.exit_code() as u8)
        }
    }
}

/// Install the tracing subscriber. `RUST_LOG` wins over the verbosity flags.
fn init_logging(verbose: u8, quiet: bool) {
    let default_level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "debug",
        (false, _) => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("portprobe={}", default_level)));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .compact()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}
