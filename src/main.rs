//! Doula Ledger CLI
//!
//! Replays a payment journal and writes the reconciled ledger to stdout.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- journal.csv > transactions.csv
//! cargo run -- --strategy sync --output installments journal.csv > installments.csv
//! cargo run -- --output report journal.csv > relatorio.csv
//! cargo run -- --strategy async --batch-size 2000 --max-concurrent 8 journal.csv
//! ```
//!
//! Logs go to stderr; set `RUST_LOG` or `--log-level` to change verbosity.
//!
//! # Exit Codes
//!
//! - 0: Success
//! - 1: Error (missing arguments, file not found, output not writable, etc.)

use doula_ledger::cli;
use doula_ledger::strategy;
use std::process;

fn main() {
    let args = cli::parse_args();
    cli::init_logging(&args.log_level);

    let strategy = {
        let config = if matches!(args.strategy, cli::StrategyType::Async) {
            Some(args.to_batch_config())
        } else {
            None
        };
        strategy::create_strategy(args.strategy, config, args.output)
    };

    let mut output = std::io::stdout();
    if let Err(e) = strategy.process(&args.input_file, &mut output) {
        tracing::error!(error = %e, "processing failed");
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
