//! Payment dialog flow
//!
//! Opening the dialog loads the transaction, provisions its installment rows
//! when needed and pre-selects the first row that is not settled yet.
//! Submitting turns the form into a [`PaymentRequest`] built from the loaded
//! transaction and hands it to the [`Reconciler`].

use crate::core::provisioning::{ensure_installments, Provisioning};
use crate::core::reconciler::Reconciler;
use crate::core::traits::LedgerBackend;
use crate::types::{
    LedgerError, Payment, PaymentId, PaymentKind, PaymentRequest, ReconcileOutcome, Transaction,
    TransactionId,
};
use chrono::NaiveDate;

/// Values the user fills in
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentForm {
    pub kind: PaymentKind,
    pub partial_amount: Option<String>,
    pub payment_date: NaiveDate,
}

/// First row that still has something to pay
pub fn default_selection(rows: &[Payment]) -> Option<PaymentId> {
    rows.iter().find(|row| !row.is_settled()).map(|row| row.id)
}

/// An open payment dialog
#[derive(Debug, Clone)]
pub struct PaymentDialog {
    transaction: Transaction,
    installments: Vec<Payment>,
    selected: Option<PaymentId>,
}

impl PaymentDialog {
    /// Open the dialog for a transaction
    ///
    /// Provisions rows for a multi-installment transaction that has none,
    /// then loads rows by transaction reference, falling back to the client's
    /// legacy rows.
    pub fn open<B: LedgerBackend>(
        reconciler: &mut Reconciler<B>,
        tx_id: TransactionId,
    ) -> Result<Self, LedgerError> {
        let transaction = reconciler
            .backend()
            .transaction(tx_id)
            .ok_or_else(|| LedgerError::transaction_not_found(tx_id))?;

        let provisioning = ensure_installments(reconciler.backend_mut(), &transaction)?;
        let installments = match provisioning {
            Provisioning::NotRequired => {
                reconciler
                    .load_installments(tx_id, transaction.client_id)
                    .0
            }
            other => other.rows().to_vec(),
        };
        let selected = default_selection(&installments);

        Ok(PaymentDialog {
            transaction,
            installments,
            selected,
        })
    }

    pub fn transaction(&self) -> &Transaction {
        &self.transaction
    }

    pub fn installments(&self) -> &[Payment] {
        &self.installments
    }

    pub fn selected(&self) -> Option<PaymentId> {
        self.selected
    }

    /// Select an installment by its number
    pub fn select(&mut self, installment_number: u32) -> Result<PaymentId, LedgerError> {
        let id = self
            .installments
            .iter()
            .find(|row| row.installment_number == installment_number)
            .map(|row| row.id)
            .ok_or_else(|| {
                LedgerError::not_found(
                    "installment number",
                    format!("{} of transaction {}", installment_number, self.transaction.id),
                )
            })?;
        self.selected = Some(id);
        Ok(id)
    }

    /// Build the request this dialog would submit
    pub fn request(&self, form: &PaymentForm) -> PaymentRequest {
        PaymentRequest {
            transaction_id: Some(self.transaction.id),
            transaction_amount: self.transaction.amount,
            transaction_installments: self.transaction.installments,
            client_id: self.transaction.client_id,
            installment_id: self.selected,
            kind: form.kind,
            partial_amount: form.partial_amount.clone(),
            payment_date: form.payment_date,
        }
    }

    /// Submit the form
    pub fn submit<B: LedgerBackend>(
        self,
        reconciler: &mut Reconciler<B>,
        form: &PaymentForm,
    ) -> Result<ReconcileOutcome, LedgerError> {
        reconciler.apply(&self.request(form))
    }
}
