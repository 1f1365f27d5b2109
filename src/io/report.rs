//! Spreadsheet-friendly report export
//!
//! Reports are CSV files prefixed with a UTF-8 byte order mark so spreadsheet
//! software picks the right encoding for accented headers. Money uses two
//! decimal places and dates use `DD/MM/YYYY`.

use crate::types::{ClientId, LedgerError, Payment, PaymentStatus, Transaction, TransactionKind};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::io::Write;

/// UTF-8 byte order mark
pub const BOM: &[u8] = b"\xEF\xBB\xBF";

/// Display date format for reports
pub const REPORT_DATE_FORMAT: &str = "%d/%m/%Y";

const TRANSACTION_HEADERS: [&str; 8] = [
    "Data",
    "Cliente",
    "Tipo",
    "Valor",
    "Recebido",
    "Em aberto",
    "Parcelas",
    "Observações",
];

const INSTALLMENT_HEADERS: [&str; 8] = [
    "Transação",
    "Cliente",
    "Parcela",
    "Valor",
    "Pago",
    "Status",
    "Vencimento",
    "Pago em",
];

/// Client display names used by the report, falling back to `#<id>`
#[derive(Debug, Clone, Default)]
pub struct ClientNames(HashMap<ClientId, String>);

impl ClientNames {
    pub fn new(names: HashMap<ClientId, String>) -> Self {
        Self(names)
    }

    pub fn display(&self, client: Option<ClientId>) -> String {
        match client {
            Some(id) => self
                .0
                .get(&id)
                .cloned()
                .unwrap_or_else(|| format!("#{}", id)),
            None => String::new(),
        }
    }
}

fn money(value: Decimal) -> String {
    format!("{:.2}", value)
}

fn date(value: Option<NaiveDate>) -> String {
    value
        .map(|d| d.format(REPORT_DATE_FORMAT).to_string())
        .unwrap_or_default()
}

fn kind_label(kind: TransactionKind) -> &'static str {
    match kind {
        TransactionKind::Income => "Receita",
        TransactionKind::Expense => "Despesa",
    }
}

fn status_label(status: PaymentStatus) -> &'static str {
    match status {
        PaymentStatus::Pendente => "Pendente",
        PaymentStatus::Parcial => "Parcial",
        PaymentStatus::Pago => "Pago",
    }
}

/// Totals per transaction kind
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ReportTotals {
    pub amount: Decimal,
    pub received: Decimal,
}

impl ReportTotals {
    fn add(&mut self, tx: &Transaction) {
        self.amount += tx.amount;
        self.received += tx.amount_received;
    }

    fn outstanding(&self) -> Decimal {
        (self.amount - self.received).max(Decimal::ZERO)
    }
}

/// Write the transaction report
///
/// Rows are ordered by date then id, followed by one totals row per kind.
/// Returns the income and expense totals.
pub fn write_transaction_report(
    transactions: &[Transaction],
    names: &ClientNames,
    output: &mut dyn Write,
) -> Result<(ReportTotals, ReportTotals), LedgerError> {
    output.write_all(BOM)?;
    let mut writer = csv::Writer::from_writer(output);
    writer.write_record(TRANSACTION_HEADERS)?;

    let mut sorted = transactions.to_vec();
    sorted.sort_by_key(|tx| (tx.date, tx.id));

    let mut income = ReportTotals::default();
    let mut expense = ReportTotals::default();
    for tx in &sorted {
        match tx.kind {
            TransactionKind::Income => income.add(tx),
            TransactionKind::Expense => expense.add(tx),
        }
        writer.write_record(&[
            date(Some(tx.date)),
            names.display(tx.client_id),
            kind_label(tx.kind).to_string(),
            money(tx.amount),
            money(tx.amount_received),
            money(tx.outstanding()),
            tx.installments.to_string(),
            tx.notes.clone().unwrap_or_default(),
        ])?;
    }

    for (label, totals) in [("Total receitas", income), ("Total despesas", expense)] {
        writer.write_record(&[
            label.to_string(),
            String::new(),
            String::new(),
            money(totals.amount),
            money(totals.received),
            money(totals.outstanding()),
            String::new(),
            String::new(),
        ])?;
    }

    writer.flush()?;
    Ok((income, expense))
}

/// Write the installment report, one row per installment with its status
pub fn write_installment_report(
    rows: &[Payment],
    names: &ClientNames,
    output: &mut dyn Write,
) -> Result<(), LedgerError> {
    output.write_all(BOM)?;
    let mut writer = csv::Writer::from_writer(output);
    writer.write_record(INSTALLMENT_HEADERS)?;

    let mut sorted = rows.to_vec();
    sorted.sort_by_key(|row| (row.due_date, row.transaction_id, row.installment_number, row.id));
    for row in sorted {
        writer.write_record(&[
            row.transaction_id.map(|t| t.to_string()).unwrap_or_default(),
            names.display(row.client_id),
            format!("{}/{}", row.installment_number, row.total_installments),
            money(row.amount),
            money(row.amount_paid),
            status_label(row.status()).to_string(),
            date(row.due_date),
            date(row.paid_at),
        ])?;
    }

    writer.flush()?;
    Ok(())
}
