//! CSV format handling for journal records and ledger output
//!
//! This module centralizes the journal's CSV concerns:
//! - `JournalRecord` structure for deserialization
//! - Conversion from CSV records to [`JournalEntry`]
//! - Transaction and installment output serialization
//!
//! All functions are pure (no file I/O) for easy testing.

use crate::types::{
    ClientId, JournalEntry, LedgerError, Payment, PaymentKind, Transaction, TransactionId,
    TransactionKind,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Write;
use std::str::FromStr;

/// Journal dates use ISO 8601
pub const JOURNAL_DATE_FORMAT: &str = "%Y-%m-%d";

/// CSV record structure for deserialization
///
/// Columns: `op,tx,client,amount,installments,installment,kind,date`. Only
/// `op` is always required; which other columns matter depends on the op.
/// `amount` stays a string so a `pay` line can carry the raw value the user
/// typed, including a comma decimal separator.
#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
pub struct JournalRecord {
    pub op: String,
    pub tx: Option<TransactionId>,
    pub client: Option<ClientId>,
    pub amount: Option<String>,
    pub installments: Option<u32>,
    pub installment: Option<u32>,
    pub kind: Option<String>,
    pub date: Option<String>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn require_tx(record: &JournalRecord) -> Result<TransactionId, LedgerError> {
    record
        .tx
        .ok_or_else(|| LedgerError::validation("tx", &format!("'{}' requires a tx", record.op)))
}

fn parse_amount(record: &JournalRecord) -> Result<Decimal, LedgerError> {
    let raw = non_empty(&record.amount).ok_or_else(|| {
        LedgerError::validation("amount", &format!("'{}' requires an amount", record.op))
    })?;
    Decimal::from_str(raw)
        .map_err(|_| LedgerError::validation("amount", &format!("invalid amount '{}'", raw)))
}

fn parse_date(raw: Option<&str>) -> Result<Option<NaiveDate>, LedgerError> {
    raw.map(|raw| {
        NaiveDate::parse_from_str(raw, JOURNAL_DATE_FORMAT)
            .map_err(|_| LedgerError::validation("date", &format!("invalid date '{}'", raw)))
    })
    .transpose()
}

fn require_date(record: &JournalRecord) -> Result<NaiveDate, LedgerError> {
    parse_date(non_empty(&record.date))?.ok_or_else(|| {
        LedgerError::validation("date", &format!("'{}' requires a date", record.op))
    })
}

/// Convert a JournalRecord to a JournalEntry
///
/// # Errors
///
/// Returns a `Validation` error when the op is unknown or a column the op
/// needs is missing or malformed. A `pay` amount is passed through unparsed.
pub fn convert_journal_record(record: JournalRecord) -> Result<JournalEntry, LedgerError> {
    match record.op.trim().to_lowercase().as_str() {
        op @ ("open" | "expense") => Ok(JournalEntry::Open {
            tx: require_tx(&record)?,
            client: record.client,
            kind: if op == "open" {
                TransactionKind::Income
            } else {
                TransactionKind::Expense
            },
            amount: parse_amount(&record)?,
            installments: record.installments.unwrap_or(1),
            date: require_date(&record)?,
        }),
        "legacy" => {
            let client = record.client.ok_or_else(|| {
                LedgerError::validation("client", "'legacy' requires a client")
            })?;
            let installment_number = record.installment.unwrap_or(1);
            Ok(JournalEntry::Legacy {
                client,
                installment_number,
                total_installments: record.installments.unwrap_or(installment_number),
                amount: parse_amount(&record)?,
                due_date: parse_date(non_empty(&record.date))?,
            })
        }
        "provision" => Ok(JournalEntry::Provision {
            tx: require_tx(&record)?,
        }),
        "pay" => {
            let kind = match non_empty(&record.kind).map(str::to_lowercase).as_deref() {
                None | Some("total") => PaymentKind::Total,
                Some("parcial") | Some("partial") => PaymentKind::Parcial,
                Some(other) => {
                    return Err(LedgerError::validation(
                        "kind",
                        &format!("unknown payment kind '{}'", other),
                    ))
                }
            };
            Ok(JournalEntry::Pay {
                tx: require_tx(&record)?,
                installment: record.installment,
                kind,
                amount: non_empty(&record.amount).map(str::to_string),
                date: require_date(&record)?,
            })
        }
        _ => Err(LedgerError::validation(
            "op",
            &format!("unknown op '{}'", record.op),
        )),
    }
}

fn money(value: Decimal) -> String {
    format!("{:.2}", value)
}

fn optional_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format(JOURNAL_DATE_FORMAT).to_string())
        .unwrap_or_default()
}

/// Write transaction states, sorted by id
///
/// Columns: `tx,client,kind,amount,installments,amount_received,outstanding`.
pub fn write_transactions_csv(
    transactions: &[Transaction],
    output: &mut dyn Write,
) -> Result<(), LedgerError> {
    let mut writer = csv::Writer::from_writer(output);
    writer.write_record([
        "tx",
        "client",
        "kind",
        "amount",
        "installments",
        "amount_received",
        "outstanding",
    ])?;

    let mut sorted = transactions.to_vec();
    sorted.sort_by_key(|tx| tx.id);
    for tx in sorted {
        writer.write_record(&[
            tx.id.to_string(),
            tx.client_id.map(|c| c.to_string()).unwrap_or_default(),
            tx.kind.as_str().to_string(),
            money(tx.amount),
            tx.installments.to_string(),
            money(tx.amount_received),
            money(tx.outstanding()),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

/// Write installment rows, sorted by transaction then number
///
/// Legacy rows (no transaction) come last, ordered by client.
pub fn write_installments_csv(
    rows: &[Payment],
    output: &mut dyn Write,
) -> Result<(), LedgerError> {
    let mut writer = csv::Writer::from_writer(output);
    writer.write_record([
        "tx",
        "client",
        "installment",
        "total_installments",
        "amount",
        "amount_paid",
        "status",
        "due_date",
        "paid_at",
    ])?;

    let mut sorted = rows.to_vec();
    sorted.sort_by_key(|row| {
        (
            row.transaction_id.is_none(),
            row.transaction_id,
            row.client_id,
            row.installment_number,
            row.id,
        )
    });
    for row in sorted {
        writer.write_record(&[
            row.transaction_id.map(|t| t.to_string()).unwrap_or_default(),
            row.client_id.map(|c| c.to_string()).unwrap_or_default(),
            row.installment_number.to_string(),
            row.total_installments.to_string(),
            money(row.amount),
            money(row.amount_paid),
            row.status().as_str().to_string(),
            optional_date(row.due_date),
            optional_date(row.paid_at),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn record(op: &str) -> JournalRecord {
        JournalRecord {
            op: op.to_string(),
            tx: Some(1),
            client: Some(2),
            amount: Some("100.00".to_string()),
            installments: Some(2),
            installment: None,
            kind: None,
            date: Some("2024-03-05".to_string()),
        }
    }

    #[rstest]
    #[case::open("open", TransactionKind::Income)]
    #[case::expense("expense", TransactionKind::Expense)]
    #[case::uppercase("OPEN", TransactionKind::Income)]
    fn test_convert_open(#[case] op: &str, #[case] expected: TransactionKind) {
        let entry = convert_journal_record(record(op)).unwrap();

        assert_eq!(
            entry,
            JournalEntry::Open {
                tx: 1,
                client: Some(2),
                kind: expected,
                amount: d("100.00"),
                installments: 2,
                date: NaiveDate::from_ymd_opt(2024, 3, 5).unwrap(),
            }
        );
    }

    #[test]
    fn test_convert_open_defaults_to_one_installment() {
        let mut rec = record("open");
        rec.installments = None;
        rec.client = None;

        match convert_journal_record(rec).unwrap() {
            JournalEntry::Open {
                installments,
                client,
                ..
            } => {
                assert_eq!(installments, 1);
                assert_eq!(client, None);
            }
            other => panic!("unexpected entry {:?}", other),
        }
    }

    #[test]
    fn test_convert_legacy() {
        let mut rec = record("legacy");
        rec.tx = None;
        rec.installment = Some(2);
        rec.installments = Some(3);
        rec.date = None;

        assert_eq!(
            convert_journal_record(rec).unwrap(),
            JournalEntry::Legacy {
                client: 2,
                installment_number: 2,
                total_installments: 3,
                amount: d("100.00"),
                due_date: None,
            }
        );
    }

    #[rstest]
    #[case::default_total(None, PaymentKind::Total)]
    #[case::total(Some("total"), PaymentKind::Total)]
    #[case::parcial(Some("parcial"), PaymentKind::Parcial)]
    #[case::partial_english(Some("Partial"), PaymentKind::Parcial)]
    fn test_convert_pay_kind(#[case] kind: Option<&str>, #[case] expected: PaymentKind) {
        let mut rec = record("pay");
        rec.kind = kind.map(str::to_string);
        rec.amount = Some("50,5".to_string());
        rec.installment = Some(2);

        match convert_journal_record(rec).unwrap() {
            JournalEntry::Pay {
                kind,
                amount,
                installment,
                ..
            } => {
                assert_eq!(kind, expected);
                // Raw amount kept for the reconciler to validate
                assert_eq!(amount.as_deref(), Some("50,5"));
                assert_eq!(installment, Some(2));
            }
            other => panic!("unexpected entry {:?}", other),
        }
    }

    #[rstest]
    #[case::unknown_op(JournalRecord { op: "refund".into(), ..record("open") }, "op")]
    #[case::open_without_tx(JournalRecord { tx: None, ..record("open") }, "tx")]
    #[case::open_without_amount(JournalRecord { amount: None, ..record("open") }, "amount")]
    #[case::open_blank_amount(JournalRecord { amount: Some("  ".into()), ..record("open") }, "amount")]
    #[case::open_bad_amount(JournalRecord { amount: Some("abc".into()), ..record("open") }, "amount")]
    #[case::open_without_date(JournalRecord { date: None, ..record("open") }, "date")]
    #[case::bad_date(JournalRecord { date: Some("05/03/2024".into()), ..record("open") }, "date")]
    #[case::legacy_without_client(JournalRecord { client: None, ..record("legacy") }, "client")]
    #[case::pay_bad_kind(JournalRecord { kind: Some("half".into()), ..record("pay") }, "kind")]
    #[case::provision_without_tx(JournalRecord { tx: None, ..record("provision") }, "tx")]
    fn test_convert_errors(#[case] rec: JournalRecord, #[case] field: &str) {
        match convert_journal_record(rec) {
            Err(LedgerError::Validation { field: f, .. }) => assert_eq!(f, field),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    fn tx(id: TransactionId, amount: &str, received: &str) -> Transaction {
        let mut tx = Transaction::new(
            id,
            TransactionKind::Income,
            d(amount),
            1,
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            Some(id + 10),
        );
        tx.amount_received = d(received);
        tx
    }

    #[rstest]
    #[case::empty(vec![], "tx,client,kind,amount,installments,amount_received,outstanding\n")]
    #[case::sorted_two_places(
        vec![tx(2, "80", "80"), tx(1, "100.5", "20")],
        "tx,client,kind,amount,installments,amount_received,outstanding\n\
         1,11,income,100.50,1,20.00,80.50\n\
         2,12,income,80.00,1,80.00,0.00\n"
    )]
    fn test_write_transactions_csv(#[case] transactions: Vec<Transaction>, #[case] expected: &str) {
        let mut output = Vec::new();
        write_transactions_csv(&transactions, &mut output).unwrap();
        assert_eq!(String::from_utf8(output).unwrap(), expected);
    }

    #[test]
    fn test_write_installments_csv_orders_legacy_last() {
        let row = |id, tx: Option<u32>, number, paid: &str| Payment {
            id,
            client_id: Some(5),
            transaction_id: tx,
            installment_number: number,
            total_installments: 2,
            amount: d("50"),
            amount_paid: d(paid),
            due_date: NaiveDate::from_ymd_opt(2024, 2, 1),
            paid_at: None,
        };
        let rows = vec![row(1, None, 1, "0"), row(2, Some(3), 2, "10"), row(3, Some(3), 1, "0")];

        let mut output = Vec::new();
        write_installments_csv(&rows, &mut output).unwrap();

        let text = String::from_utf8(output).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[1], "3,5,1,2,50.00,0.00,pendente,2024-02-01,");
        assert_eq!(lines[2], "3,5,2,2,50.00,10.00,parcial,2024-02-01,");
        assert_eq!(lines[3], ",5,1,2,50.00,0.00,pendente,2024-02-01,");
    }
}
