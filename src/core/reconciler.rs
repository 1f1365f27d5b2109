//! Installment reconciliation
//!
//! This module provides the `Reconciler`, which applies one incoming payment
//! (full or partial) to the right installment row, or directly to the
//! transaction when it has no rows, and keeps the transaction's aggregate
//! received amount consistent.
//!
//! The reconciler enforces these rules:
//! - All input validation happens before any write
//! - A payment never pushes a row past its own amount; the excess is dropped,
//!   never carried to the next installment
//! - `paid_at` is set exactly when a row becomes settled and cleared otherwise
//! - After every installment write, `amount_received` is recomputed from all
//!   rows instead of being adjusted incrementally
//!
//! The installment write and the aggregate write are two independent round
//! trips through the backend. A failure between them leaves the aggregate
//! stale until the next payment recomputes it; see
//! [`crate::core::SharedLedger::apply_payment`] for the atomic variant.

use crate::core::ledger_store::MemoryLedger;
use crate::core::traits::LedgerBackend;
use crate::types::{
    ClientId, LedgerError, Payment, PaymentKind, PaymentRequest, ReconcileMode, ReconcileOutcome,
    TransactionId,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::str::FromStr;

/// Parse the user-entered partial amount
///
/// Accepts `.` or a single `,` as decimal separator. The value must be a
/// positive decimal.
pub fn parse_partial_amount(raw: Option<&str>) -> Result<Decimal, LedgerError> {
    let raw = raw
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| LedgerError::validation("partial_amount", "amount is required"))?;

    let normalized = if raw.contains(',') && !raw.contains('.') {
        raw.replacen(',', ".", 1)
    } else {
        raw.to_string()
    };

    let amount = Decimal::from_str(&normalized).map_err(|_| {
        LedgerError::validation("partial_amount", &format!("'{}' is not a number", raw))
    })?;

    if amount <= Decimal::ZERO {
        return Err(LedgerError::validation(
            "partial_amount",
            "amount must be greater than zero",
        ));
    }
    Ok(amount)
}

/// Resolve how much a request pays before looking at any row
fn requested_amount(request: &PaymentRequest) -> Result<Option<Decimal>, LedgerError> {
    match request.kind {
        PaymentKind::Total => Ok(None),
        PaymentKind::Parcial => parse_partial_amount(request.partial_amount.as_deref()).map(Some),
    }
}

/// Apply a payment to one row, capped at the row amount
///
/// Returns the updated row and the amount actually applied.
pub fn settle_installment(
    row: &Payment,
    partial: Option<Decimal>,
    payment_date: NaiveDate,
) -> (Payment, Decimal) {
    let pay = partial.unwrap_or(row.amount);
    let amount_paid = capped_add(row.amount_paid, pay, row.amount);

    let mut updated = row.clone();
    updated.paid_at = if amount_paid >= row.amount {
        Some(payment_date)
    } else {
        None
    };
    let applied = (amount_paid - row.amount_paid).max(Decimal::ZERO);
    updated.amount_paid = amount_paid;
    (updated, applied)
}

/// `min(current + pay, cap)`, where a sum past `Decimal::MAX` is also capped
pub fn capped_add(current: Decimal, pay: Decimal, cap: Decimal) -> Decimal {
    current.checked_add(pay).map_or(cap, |sum| sum.min(cap))
}

/// Sum of `amount_paid` across rows
pub fn received_from_rows(rows: &[Payment]) -> Decimal {
    rows.iter().map(|row| row.amount_paid).sum()
}

/// Installment reconciliation over a [`LedgerBackend`]
///
/// Owns its backend the way a request handler owns its database client.
#[derive(Debug)]
pub struct Reconciler<B: LedgerBackend = MemoryLedger> {
    backend: B,
}

impl Reconciler<MemoryLedger> {
    /// Create a reconciler over an empty in-memory ledger
    pub fn in_memory() -> Self {
        Reconciler::new(MemoryLedger::new())
    }
}

impl<B: LedgerBackend> Reconciler<B> {
    pub fn new(backend: B) -> Self {
        Reconciler { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn into_backend(self) -> B {
        self.backend
    }

    /// Load the rows a payment can land on
    ///
    /// Rows are looked up by transaction reference first; when there are none
    /// and a client is known, the client's rows without a transaction
    /// reference are used instead.
    pub fn load_installments(
        &self,
        tx_id: TransactionId,
        client_id: Option<ClientId>,
    ) -> (Vec<Payment>, ReconcileMode) {
        let rows = self.backend.installments_for_transaction(tx_id);
        if !rows.is_empty() {
            return (rows, ReconcileMode::Installment);
        }
        match client_id {
            Some(client) => {
                let legacy = self.backend.legacy_installments_for_client(client);
                if legacy.is_empty() {
                    (legacy, ReconcileMode::Direct)
                } else {
                    (legacy, ReconcileMode::Legacy)
                }
            }
            None => (Vec::new(), ReconcileMode::Direct),
        }
    }

    /// Apply one payment
    ///
    /// # Errors
    ///
    /// - `NotFound` if the request has no transaction id, the transaction does
    ///   not exist, or the selected installment is not among the loaded rows
    /// - `Validation` if a partial payment has a missing, non-numeric or
    ///   non-positive amount
    ///
    /// Both are raised before any write.
    pub fn apply(&mut self, request: &PaymentRequest) -> Result<ReconcileOutcome, LedgerError> {
        let tx_id = request
            .transaction_id
            .ok_or_else(|| LedgerError::transaction_not_found("(none)"))?;
        let partial = requested_amount(request)?;

        if self.backend.transaction(tx_id).is_none() {
            return Err(LedgerError::transaction_not_found(tx_id));
        }

        let (rows, mode) = self.load_installments(tx_id, request.client_id);
        let outcome = if rows.is_empty() {
            self.apply_direct(tx_id, request, partial)?
        } else {
            self.apply_to_installment(tx_id, request, partial, rows, mode)?
        };

        tracing::debug!(
            tx = tx_id,
            mode = ?outcome.mode,
            applied = %outcome.applied,
            amount_received = %outcome.amount_received,
            "payment reconciled"
        );
        Ok(outcome)
    }

    fn apply_to_installment(
        &mut self,
        tx_id: TransactionId,
        request: &PaymentRequest,
        partial: Option<Decimal>,
        rows: Vec<Payment>,
        mode: ReconcileMode,
    ) -> Result<ReconcileOutcome, LedgerError> {
        let selected_id = request
            .installment_id
            .ok_or_else(|| LedgerError::installment_not_found("(none)"))?;
        let row = rows
            .iter()
            .find(|row| row.id == selected_id)
            .ok_or_else(|| LedgerError::installment_not_found(selected_id))?;

        let (updated, applied) = settle_installment(row, partial, request.payment_date);
        self.backend.update_installment(&updated)?;

        // Recompute from every row rather than adding `applied`
        let refreshed = match mode {
            ReconcileMode::Legacy => match request.client_id {
                Some(client) => self.backend.legacy_installments_for_client(client),
                None => Vec::new(),
            },
            _ => self.backend.installments_for_transaction(tx_id),
        };
        let amount_received = received_from_rows(&refreshed);
        self.backend.set_amount_received(tx_id, amount_received)?;

        Ok(ReconcileOutcome {
            mode,
            installment: Some(updated),
            amount_received,
            applied,
        })
    }

    fn apply_direct(
        &mut self,
        tx_id: TransactionId,
        request: &PaymentRequest,
        partial: Option<Decimal>,
    ) -> Result<ReconcileOutcome, LedgerError> {
        let pay = partial.unwrap_or(request.transaction_amount);

        // Re-read instead of trusting the caller's copy
        let current = self
            .backend
            .transaction(tx_id)
            .ok_or_else(|| LedgerError::transaction_not_found(tx_id))?
            .amount_received;
        let amount_received = capped_add(current, pay, request.transaction_amount);
        self.backend.set_amount_received(tx_id, amount_received)?;

        Ok(ReconcileOutcome {
            mode: ReconcileMode::Direct,
            installment: None,
            amount_received,
            applied: (amount_received - current).max(Decimal::ZERO),
        })
    }
}

impl Default for Reconciler<MemoryLedger> {
    fn default() -> Self {
        Self::in_memory()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::provisioning::ensure_installments;
    use crate::types::{PaymentStatus, Transaction, TransactionKind};
    use rstest::rstest;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn day(n: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, n).unwrap()
    }

    fn open(reconciler: &mut Reconciler, id: TransactionId, amount: &str, installments: u32) {
        let tx = Transaction::new(
            id,
            TransactionKind::Income,
            d(amount),
            installments,
            day(1),
            Some(10),
        );
        reconciler.backend_mut().insert_transaction(tx.clone()).unwrap();
        ensure_installments(reconciler.backend_mut(), &tx).unwrap();
    }

    fn request(
        reconciler: &Reconciler,
        tx: TransactionId,
        installment_number: Option<u32>,
        kind: PaymentKind,
        partial: Option<&str>,
    ) -> PaymentRequest {
        let transaction = reconciler.backend().transaction(tx).unwrap();
        let installment_id = installment_number.and_then(|n| {
            reconciler
                .backend()
                .installments_for_transaction(tx)
                .into_iter()
                .chain(reconciler.backend().legacy_installments_for_client(10))
                .find(|row| row.installment_number == n)
                .map(|row| row.id)
        });
        PaymentRequest {
            transaction_id: Some(tx),
            transaction_amount: transaction.amount,
            transaction_installments: transaction.installments,
            client_id: transaction.client_id,
            installment_id,
            kind,
            partial_amount: partial.map(str::to_string),
            payment_date: day(20),
        }
    }

    #[rstest]
    #[case::dot("150.50", "150.50")]
    #[case::comma("150,50", "150.50")]
    #[case::padded("  20 ", "20")]
    fn test_parse_partial_amount_valid(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(parse_partial_amount(Some(raw)).unwrap(), d(expected));
    }

    #[rstest]
    #[case::missing(None)]
    #[case::empty(Some(""))]
    #[case::blank(Some("   "))]
    #[case::not_a_number(Some("abc"))]
    #[case::zero(Some("0"))]
    #[case::negative(Some("-5.00"))]
    fn test_parse_partial_amount_invalid(#[case] raw: Option<&str>) {
        assert!(parse_partial_amount(raw).unwrap_err().is_validation());
    }

    #[test]
    fn test_partial_overpayment_is_capped() {
        let mut reconciler = Reconciler::in_memory();
        open(&mut reconciler, 1, "200.00", 2);

        let req = request(&reconciler, 1, Some(1), PaymentKind::Parcial, Some("150.00"));
        let outcome = reconciler.apply(&req).unwrap();

        let row = outcome.installment.unwrap();
        assert_eq!(row.amount, d("100.00"));
        assert_eq!(row.amount_paid, d("100.00"));
        assert_eq!(outcome.applied, d("100.00"));
        // Excess is not carried to installment 2
        let rows = reconciler.backend().installments_for_transaction(1);
        assert_eq!(rows[1].amount_paid, Decimal::ZERO);
        assert_eq!(outcome.amount_received, d("100.00"));
    }

    #[test]
    fn test_aggregate_follows_installments() {
        let mut reconciler = Reconciler::in_memory();
        open(&mut reconciler, 1, "100.00", 2);

        let first = request(&reconciler, 1, Some(1), PaymentKind::Total, None);
        let outcome = reconciler.apply(&first).unwrap();
        assert_eq!(outcome.amount_received, d("50.00"));
        assert_eq!(outcome.mode, ReconcileMode::Installment);

        let second = request(&reconciler, 1, Some(2), PaymentKind::Parcial, Some("20.00"));
        let outcome = reconciler.apply(&second).unwrap();
        assert_eq!(outcome.amount_received, d("70.00"));

        let tx = reconciler.backend().transaction(1).unwrap();
        let rows = reconciler.backend().installments_for_transaction(1);
        assert_eq!(tx.amount_received, received_from_rows(&rows));
        assert_eq!(rows[0].status(), PaymentStatus::Pago);
        assert_eq!(rows[1].status(), PaymentStatus::Parcial);
    }

    #[test]
    fn test_paid_at_set_only_on_settlement() {
        let mut reconciler = Reconciler::in_memory();
        open(&mut reconciler, 1, "100.00", 2);

        let partial = request(&reconciler, 1, Some(1), PaymentKind::Parcial, Some("10"));
        let outcome = reconciler.apply(&partial).unwrap();
        assert!(outcome.installment.unwrap().paid_at.is_none());

        let rest = request(&reconciler, 1, Some(1), PaymentKind::Parcial, Some("40"));
        let outcome = reconciler.apply(&rest).unwrap();
        assert_eq!(outcome.installment.unwrap().paid_at, Some(day(20)));
    }

    #[test]
    fn test_settle_installment_clears_stale_paid_at() {
        let row = Payment {
            id: 1,
            client_id: None,
            transaction_id: Some(1),
            installment_number: 1,
            total_installments: 1,
            amount: d("50"),
            amount_paid: d("10"),
            due_date: None,
            paid_at: Some(day(2)),
        };

        let (updated, applied) = settle_installment(&row, Some(d("5")), day(3));

        assert_eq!(updated.amount_paid, d("15"));
        assert_eq!(applied, d("5"));
        assert!(updated.paid_at.is_none());
    }

    #[test]
    fn test_amount_paid_never_decreases() {
        let mut reconciler = Reconciler::in_memory();
        open(&mut reconciler, 1, "90.00", 3);

        let mut previous = Decimal::ZERO;
        for raw in ["10", "5", "100", "1", "0.01"] {
            let req = request(&reconciler, 1, Some(2), PaymentKind::Parcial, Some(raw));
            let row = reconciler.apply(&req).unwrap().installment.unwrap();
            assert!(row.amount_paid >= previous);
            assert!(row.amount_paid <= row.amount);
            previous = row.amount_paid;
        }
        assert_eq!(previous, d("30.00"));
    }

    #[test]
    fn test_direct_mode_caps_at_transaction_amount() {
        let mut reconciler = Reconciler::in_memory();
        open(&mut reconciler, 1, "300.00", 1);
        reconciler.backend_mut().set_amount_received(1, d("250.00")).unwrap();

        let req = request(&reconciler, 1, None, PaymentKind::Total, None);
        let outcome = reconciler.apply(&req).unwrap();

        assert_eq!(outcome.mode, ReconcileMode::Direct);
        assert_eq!(outcome.amount_received, d("300.00"));
        assert_eq!(outcome.applied, d("50.00"));
        assert!(outcome.installment.is_none());
    }

    #[test]
    fn test_direct_mode_partial_accumulates() {
        let mut reconciler = Reconciler::in_memory();
        open(&mut reconciler, 1, "300.00", 1);

        for _ in 0..2 {
            let req = request(&reconciler, 1, None, PaymentKind::Parcial, Some("120"));
            reconciler.apply(&req).unwrap();
        }
        let req = request(&reconciler, 1, None, PaymentKind::Parcial, Some("120"));
        let outcome = reconciler.apply(&req).unwrap();

        assert_eq!(outcome.amount_received, d("300.00"));
        assert_eq!(outcome.applied, d("60.00"));
    }

    const DECIMAL_MAX: &str = "79228162514264337593543950335";

    #[test]
    fn test_huge_partial_amount_is_capped_in_direct_mode() {
        let mut reconciler = Reconciler::in_memory();
        open(&mut reconciler, 1, "300.00", 1);
        reconciler.backend_mut().set_amount_received(1, d("10")).unwrap();

        let req = request(&reconciler, 1, None, PaymentKind::Parcial, Some(DECIMAL_MAX));
        let outcome = reconciler.apply(&req).unwrap();

        assert_eq!(outcome.amount_received, d("300.00"));
        assert_eq!(outcome.applied, d("290.00"));
    }

    #[test]
    fn test_huge_partial_amount_is_capped_on_installment() {
        let mut reconciler = Reconciler::in_memory();
        open(&mut reconciler, 1, "100.00", 2);
        let first = request(&reconciler, 1, Some(1), PaymentKind::Parcial, Some("1"));
        reconciler.apply(&first).unwrap();

        let req = request(&reconciler, 1, Some(1), PaymentKind::Parcial, Some(DECIMAL_MAX));
        let row = reconciler.apply(&req).unwrap().installment.unwrap();

        assert_eq!(row.amount_paid, d("50.00"));
        assert_eq!(row.paid_at, Some(day(20)));
    }

    #[rstest]
    #[case::under_cap("10", "5", "100", "15")]
    #[case::over_cap("90", "20", "100", "100")]
    #[case::overflow(DECIMAL_MAX, "1", "100", "100")]
    fn test_capped_add(
        #[case] current: &str,
        #[case] pay: &str,
        #[case] cap: &str,
        #[case] expected: &str,
    ) {
        assert_eq!(capped_add(d(current), d(pay), d(cap)), d(expected));
    }

    #[test]
    fn test_legacy_rows_used_when_transaction_has_none() {
        let mut reconciler = Reconciler::in_memory();
        let tx = Transaction::new(1, TransactionKind::Income, d("100"), 1, day(1), Some(10));
        reconciler.backend_mut().insert_transaction(tx).unwrap();
        for number in 1..=2 {
            reconciler
                .backend_mut()
                .insert_legacy_installment(Payment {
                    id: 0,
                    client_id: Some(10),
                    transaction_id: None,
                    installment_number: number,
                    total_installments: 2,
                    amount: d("50"),
                    amount_paid: Decimal::ZERO,
                    due_date: None,
                    paid_at: None,
                })
                .unwrap();
        }

        let req = request(&reconciler, 1, Some(2), PaymentKind::Parcial, Some("30"));
        let outcome = reconciler.apply(&req).unwrap();

        assert_eq!(outcome.mode, ReconcileMode::Legacy);
        assert_eq!(outcome.amount_received, d("30"));
        assert_eq!(reconciler.backend().transaction(1).unwrap().amount_received, d("30"));
    }

    #[test]
    fn test_missing_transaction_id() {
        let mut reconciler = Reconciler::in_memory();
        open(&mut reconciler, 1, "100.00", 1);
        let mut req = request(&reconciler, 1, None, PaymentKind::Total, None);
        req.transaction_id = None;

        assert!(matches!(
            reconciler.apply(&req),
            Err(LedgerError::NotFound { .. })
        ));
    }

    #[test]
    fn test_unknown_installment_rejected_without_writes() {
        let mut reconciler = Reconciler::in_memory();
        open(&mut reconciler, 1, "100.00", 2);
        let mut req = request(&reconciler, 1, Some(1), PaymentKind::Total, None);
        req.installment_id = Some(999);

        assert_eq!(
            reconciler.apply(&req),
            Err(LedgerError::installment_not_found(999))
        );
        assert_eq!(
            reconciler.backend().transaction(1).unwrap().amount_received,
            Decimal::ZERO
        );
    }

    #[test]
    fn test_validation_happens_before_writes() {
        let mut reconciler = Reconciler::in_memory();
        open(&mut reconciler, 1, "100.00", 2);
        let req = request(&reconciler, 1, Some(1), PaymentKind::Parcial, Some("-3"));

        assert!(reconciler.apply(&req).unwrap_err().is_validation());
        let rows = reconciler.backend().installments_for_transaction(1);
        assert!(rows.iter().all(|row| row.amount_paid == Decimal::ZERO));
    }
}
