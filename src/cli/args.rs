use crate::strategy::BatchConfig;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Replay a doula practice's payment journal and reconcile installments
#[derive(Parser, Debug)]
#[command(name = "doula-ledger")]
#[command(about = "Replay a payment journal and reconcile installments", long_about = None)]
pub struct CliArgs {
    /// Input CSV journal path
    #[arg(value_name = "INPUT", help = "Path to the journal CSV file")]
    pub input_file: PathBuf,

    /// Processing strategy used to replay the journal
    #[arg(
        long = "strategy",
        value_name = "STRATEGY",
        default_value = "async",
        help = "Processing strategy: 'sync' for sequential or 'async' for batched"
    )]
    pub strategy: StrategyType,

    /// Number of journal entries per batch (async mode only)
    #[arg(
        long = "batch-size",
        value_name = "SIZE",
        help = "Number of journal entries per batch (default: 1000)"
    )]
    pub batch_size: Option<usize>,

    /// Number of worker threads (async mode only)
    #[arg(
        long = "max-concurrent",
        value_name = "COUNT",
        help = "Number of worker threads (default: CPU cores)"
    )]
    pub max_concurrent_batches: Option<usize>,

    /// What to write to stdout
    #[arg(
        long = "output",
        value_name = "KIND",
        default_value = "transactions",
        help = "Output: transactions, installments, report or installment-report"
    )]
    pub output: OutputKind,

    /// Log filter used when RUST_LOG is not set
    #[arg(
        long = "log-level",
        value_name = "LEVEL",
        default_value = "warn",
        help = "Log level for stderr (error, warn, info, debug, trace)"
    )]
    pub log_level: String,
}

/// Available processing strategies
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum StrategyType {
    Sync,
    Async,
}

/// Shape of the final output
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputKind {
    /// One row per transaction with its received aggregate
    Transactions,
    /// One row per installment with its status
    Installments,
    /// Localized transaction report with totals
    Report,
    /// Localized installment report
    InstallmentReport,
}

impl CliArgs {
    /// Create a BatchConfig from CLI arguments, falling back to defaults
    pub fn to_batch_config(&self) -> BatchConfig {
        if self.batch_size.is_some() || self.max_concurrent_batches.is_some() {
            let default = BatchConfig::default();
            BatchConfig::new(
                self.batch_size.unwrap_or(default.batch_size),
                self.max_concurrent_batches
                    .unwrap_or(default.max_concurrent_batches),
            )
        } else {
            BatchConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::default_strategy(&["program", "journal.csv"], StrategyType::Async)]
    #[case::explicit_sync(&["program", "--strategy", "sync", "journal.csv"], StrategyType::Sync)]
    #[case::explicit_async(&["program", "--strategy", "async", "journal.csv"], StrategyType::Async)]
    fn test_strategy_parsing(#[case] args: &[&str], #[case] expected: StrategyType) {
        let parsed = CliArgs::try_parse_from(args).unwrap();
        assert_eq!(parsed.strategy, expected);
    }

    #[rstest]
    #[case::default(&["program", "journal.csv"], OutputKind::Transactions)]
    #[case::installments(&["program", "--output", "installments", "journal.csv"], OutputKind::Installments)]
    #[case::report(&["program", "--output", "report", "journal.csv"], OutputKind::Report)]
    #[case::installment_report(
        &["program", "--output", "installment-report", "journal.csv"],
        OutputKind::InstallmentReport
    )]
    fn test_output_parsing(#[case] args: &[&str], #[case] expected: OutputKind) {
        let parsed = CliArgs::try_parse_from(args).unwrap();
        assert_eq!(parsed.output, expected);
    }

    #[rstest]
    #[case::batch_size(&["program", "--batch-size", "2000", "journal.csv"], Some(2000), None)]
    #[case::max_concurrent(&["program", "--max-concurrent", "8", "journal.csv"], None, Some(8))]
    #[case::no_options(&["program", "journal.csv"], None, None)]
    #[case::all_options(
        &["program", "--strategy", "async", "--batch-size", "2000", "--max-concurrent", "8", "journal.csv"],
        Some(2000),
        Some(8)
    )]
    fn test_config_options(
        #[case] args: &[&str],
        #[case] batch_size: Option<usize>,
        #[case] max_concurrent: Option<usize>,
    ) {
        let parsed = CliArgs::try_parse_from(args).unwrap();
        assert_eq!(parsed.batch_size, batch_size);
        assert_eq!(parsed.max_concurrent_batches, max_concurrent);
    }

    #[rstest]
    #[case::all_defaults(&["program", "journal.csv"], 1000, num_cpus::get())]
    #[case::custom_batch_size(&["program", "--batch-size", "2000", "journal.csv"], 2000, num_cpus::get())]
    #[case::custom_max_concurrent(&["program", "--max-concurrent", "8", "journal.csv"], 1000, 8)]
    #[case::zero_batch_size(&["program", "--batch-size", "0", "journal.csv"], 1000, num_cpus::get())]
    #[case::zero_max_concurrent(&["program", "--max-concurrent", "0", "journal.csv"], 1000, num_cpus::get())]
    fn test_batch_config_conversion(
        #[case] args: &[&str],
        #[case] expected_batch_size: usize,
        #[case] expected_max_concurrent: usize,
    ) {
        let config = CliArgs::try_parse_from(args).unwrap().to_batch_config();

        assert_eq!(config.batch_size, expected_batch_size);
        assert_eq!(config.max_concurrent_batches, expected_max_concurrent);
    }

    #[test]
    fn test_log_level_default() {
        let parsed = CliArgs::try_parse_from(["program", "journal.csv"]).unwrap();
        assert_eq!(parsed.log_level, "warn");
    }

    #[rstest]
    #[case::missing_input(&["program"])]
    #[case::invalid_strategy(&["program", "--strategy", "invalid", "journal.csv"])]
    #[case::invalid_output(&["program", "--output", "pdf", "journal.csv"])]
    fn test_parsing_errors(#[case] args: &[&str]) {
        assert!(CliArgs::try_parse_from(args).is_err());
    }
}
