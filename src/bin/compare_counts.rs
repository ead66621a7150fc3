//! Compares exact and HyperLogLog counts of unique IP addresses in a log.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use seen_sketch::compare::{measure, Comparison, Counter};
use seen_sketch::estimator::DEFAULT_ERROR_RATE;
use seen_sketch::log_source::IpLogSource;

#[derive(Parser, Debug)]
#[command(name = "compare-counts")]
#[command(about = "Count unique IP addresses in a log exactly and with HyperLogLog")]
#[command(version)]
struct Args {
    /// Path to the log file
    #[arg(default_value = "./lms-stage-access.log")]
    log_file: PathBuf,

    /// Target relative error of the HyperLogLog estimate
    #[arg(short, long, default_value_t = DEFAULT_ERROR_RATE)]
    error_rate: f64,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    // Validate before the first pass over the log
    let approximate_counter = Counter::approximate(args.error_rate)?;

    println!("Performing exact counting...");
    let exact = measure(Counter::exact(), open(&args.log_file)?);

    // The source cannot be rewound, read the log again
    println!("Performing approximate counting with HyperLogLog...");
    let approximate = measure(approximate_counter, open(&args.log_file)?);

    let comparison = Comparison::new(exact, approximate);
    println!("Comparison Results:\n");
    println!("{comparison}");

    tracing::info!(
        relative_error = comparison.relative_error(),
        "compared exact and approximate counts"
    );
    Ok(())
}

fn open(path: &Path) -> Result<IpLogSource<std::io::BufReader<std::fs::File>>> {
    IpLogSource::open(path).with_context(|| format!("failed to open log file {}", path.display()))
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}
