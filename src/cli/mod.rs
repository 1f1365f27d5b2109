// CLI module
// Command-line interface, argument parsing and log setup

mod args;

pub use args::{CliArgs, OutputKind, StrategyType};

use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Parse command-line arguments using clap
///
/// On invalid arguments or `--help`, clap prints a message and exits.
pub fn parse_args() -> CliArgs {
    CliArgs::parse()
}

/// Install the stderr log subscriber
///
/// `RUST_LOG` takes precedence over `default_level`. Stdout stays reserved
/// for CSV output.
pub fn init_logging(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // A second call (tests, embedding) keeps the first subscriber
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
