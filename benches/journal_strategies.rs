//! Benchmark suite comparing journal processing strategies
//!
//! ```bash
//! cargo bench
//! ```
//!
//! Journals are generated once per size: every client opens a
//! multi-installment invoice and a single-installment one, then pays them
//! down with a mix of total and partial payments.

use doula_ledger::cli::{OutputKind, StrategyType};
use doula_ledger::strategy::{create_strategy, BatchConfig};
use std::io::Write;
use tempfile::NamedTempFile;

fn main() {
    divan::main();
}

fn generate_journal(clients: u32) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Failed to create temp file");
    writeln!(file, "op,tx,client,amount,installments,installment,kind,date").unwrap();

    for client in 1..=clients {
        let split = client * 2 - 1;
        let direct = client * 2;
        writeln!(file, "open,{},{},1200.00,6,,,2024-01-10", split, client).unwrap();
        writeln!(file, "open,{},{},350.00,1,,,2024-01-11", direct, client).unwrap();
    }
    for round in 0..6 {
        for client in 1..=clients {
            let split = client * 2 - 1;
            let direct = client * 2;
            if (client + round) % 3 == 0 {
                writeln!(file, "pay,{},,\"80,50\",,,parcial,2024-02-{:02}", split, round + 1).unwrap();
            } else {
                writeln!(file, "pay,{},,,,,total,2024-02-{:02}", split, round + 1).unwrap();
            }
            writeln!(file, "pay,{},,50,,,parcial,2024-02-{:02}", direct, round + 1).unwrap();
        }
    }

    file.flush().unwrap();
    file
}

#[divan::bench(args = [100, 1_000, 10_000])]
fn sync_strategy(bencher: divan::Bencher, clients: u32) {
    let journal = generate_journal(clients);
    let strategy = create_strategy(StrategyType::Sync, None, OutputKind::Transactions);

    bencher.bench_local(|| {
        let mut output = Vec::new();
        strategy
            .process(journal.path(), &mut output)
            .expect("Processing failed");
        output
    });
}

#[divan::bench(args = [100, 1_000, 10_000])]
fn async_strategy(bencher: divan::Bencher, clients: u32) {
    let journal = generate_journal(clients);
    let strategy = create_strategy(
        StrategyType::Async,
        Some(BatchConfig::default()),
        OutputKind::Transactions,
    );

    bencher.bench_local(|| {
        let mut output = Vec::new();
        strategy
            .process(journal.path(), &mut output)
            .expect("Processing failed");
        output
    });
}
