//! CLI for trace2txt
//!
//! Dumps a `.trace` recording as text:
//! - default: runtime and rundown events, decoded thread samples and stack
//!   walks, and a warning for any other event
//! - `--all`: every event from every stream

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use trace2txt_dump::{Config, Mode, ProcessStats};

#[derive(Parser, Debug)]
#[command(name = "trace2txt")]
#[command(about = "Dump a runtime trace as text", long_about = None)]
#[command(version)]
struct Cli {
    /// Dump every event instead of only sampling-relevant ones
    #[arg(long)]
    all: bool,

    /// Only print events whose name matches this regular expression
    #[arg(long, value_name = "PATTERN")]
    event: Option<String>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Trace file to dump
    trace_file: PathBuf,
}

impl Cli {
    fn config(&self) -> Config {
        Config {
            mode: Mode::from_all_flag(self.all),
            event_pattern: self.event.clone(),
            trace_path: self.trace_file.clone(),
        }
    }
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // --help and --version land here too and are not failures
            let failed = e.use_stderr();
            let _ = e.print();
            return if failed {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    init_tracing(cli.verbose);

    let config = cli.config();
    if let Err(e) = config.validate() {
        eprintln!("error: {:#}\n\n{}", e, Cli::command().render_usage());
        return ExitCode::FAILURE;
    }

    match run(&config) {
        Ok(stats) => {
            debug!("Done: {:?}", stats);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(config: &Config) -> Result<ProcessStats> {
    let stdout = io::stdout().lock();
    let mut stderr = io::stderr().lock();
    let stats = trace2txt_dump::run(config, stdout, &mut stderr)?;
    stderr.flush()?;
    Ok(stats)
}

/// Initialize tracing/logging. Diagnostics go to stderr so they never mix
/// with the dump on stdout.
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(io::stderr),
        )
        .init();
}
