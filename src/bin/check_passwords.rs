//! Checks candidate passwords against a Bloom filter seeded with passwords
//! that were already used.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use seen_sketch::bloom::{DEFAULT_NUM_HASHES, DEFAULT_SIZE};
use seen_sketch::{classify, BloomFilter};

const DEMO_EXISTING: [&str; 3] = ["password123", "admin123", "qwerty123"];

#[derive(Parser, Debug)]
#[command(name = "check-passwords")]
#[command(about = "Classify candidate passwords as unique, already used or invalid")]
#[command(version)]
struct Args {
    /// Number of bits in the filter
    #[arg(long, default_value_t = DEFAULT_SIZE)]
    size: u64,

    /// Number of hash functions
    #[arg(short = 'k', long, default_value_t = DEFAULT_NUM_HASHES)]
    num_hashes: u32,

    /// Previously used password to seed the filter with (repeatable)
    #[arg(short, long = "existing", value_name = "PASSWORD")]
    existing: Vec<String>,

    /// Candidates to check; without any, a built-in demo list is used
    candidates: Vec<String>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let mut filter = BloomFilter::new(args.size, args.num_hashes)?;

    let existing: Vec<String> = if args.existing.is_empty() {
        DEMO_EXISTING.iter().map(|pwd| pwd.to_string()).collect()
    } else {
        args.existing
    };
    for pwd in &existing {
        filter.add(pwd);
    }

    let candidates: Vec<Option<String>> = if args.candidates.is_empty() {
        demo_candidates()
    } else {
        args.candidates.into_iter().map(Some).collect()
    };

    let results = classify(&mut filter, candidates);
    for (pwd, status) in results.iter() {
        println!("Password '{}' - {}.", pwd.unwrap_or("None"), status);
    }

    tracing::debug!(
        bits_used = filter.bits_used(),
        estimated_fpp = filter.estimated_fpp(),
        "filter state after check"
    );
    Ok(())
}

/// Demo list, including a blank and a non-string entry
fn demo_candidates() -> Vec<Option<String>> {
    ["password123", "newpassword", "admin123", "guest", ""]
        .into_iter()
        .map(|pwd| Some(pwd.to_string()))
        .chain(std::iter::once(None))
        .collect()
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}
