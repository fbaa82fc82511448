#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(coverage_nightly, coverage(off))]

//! Binary entry point for the pow_bench tool.
//!
//! This module is excluded from mutation testing because its behavior is only observable through
//! the exit code and console output of a separate process.

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use argh::FromArgs;
use pow_bench::{BenchmarkConfig, DEFAULT_LEN, DEFAULT_WORKERS, Operands, run_benchmark};
use tracing_subscriber::EnvFilter;

/// Times sequential, multi-process and multi-threaded computation of `a[i]^b[i]` over random
/// operands and checks every parallel result against the sequential one.
#[derive(FromArgs)]
struct Args {
    /// number of operand pairs to generate
    #[argh(option, default = "DEFAULT_LEN")]
    len: usize,

    /// number of workers for each parallel strategy
    #[argh(option, default = "DEFAULT_WORKERS")]
    workers: usize,

    /// directory in which to create the message passing channels (default: system temp dir)
    #[argh(option)]
    channel_dir: Option<PathBuf>,
}

// Binary entry point - mutations would require subprocess testing which is impractical.
#[cfg_attr(test, mutants::skip)]
fn main() -> ExitCode {
    let args: Args = argh::from_env();

    // Log lines go to stderr, keeping stdout for the report.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let mut config = BenchmarkConfig::new(args.len, args.workers);
    if let Some(dir) = args.channel_dir {
        config = config.with_channel_dir(dir);
    }

    let operands = match Operands::generate(config.len()) {
        Ok(operands) => operands,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    match run_benchmark(&config, &operands) {
        Ok(report) => {
            println!("{report}");

            if report.all_succeeded() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
