//! Client credential recovery
//!
//! A client who forgot her initial password submits her full name and CPF.
//! When she has not changed the password yet, the initial password is given
//! back: her DPP formatted as `DDMMYY`.

use crate::identity::directory::ClientRecord;
use crate::identity::normalize::{digits_only, normalize_name};
use crate::types::LedgerError;
use serde::{Deserialize, Serialize};

/// Format of the initial client password
pub const RECOVERY_PASSWORD_FORMAT: &str = "%d%m%y";

/// Recovery form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecoveryRequest {
    pub full_name: String,
    pub cpf: String,
}

/// Recovery answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RecoveryResponse {
    /// The client already set her own password
    AlreadyChanged,
    /// The initial password
    Password { password: String },
}

/// Find the client matching the form and answer the request
///
/// # Errors
///
/// - `Validation` when the name or the CPF is empty, or the matched client
///   has no DPP to derive the password from
/// - `NotFound` when no client matches both name and CPF
pub fn recover_credentials<'a, I>(
    request: &RecoveryRequest,
    clients: I,
) -> Result<RecoveryResponse, LedgerError>
where
    I: IntoIterator<Item = &'a ClientRecord>,
{
    let name = normalize_name(&request.full_name);
    if name.is_empty() {
        return Err(LedgerError::validation("fullName", "full name is required"));
    }
    let cpf = digits_only(&request.cpf);
    if cpf.is_empty() {
        return Err(LedgerError::validation("cpf", "CPF is required"));
    }

    let client = clients
        .into_iter()
        .find(|client| {
            normalize_name(&client.full_name) == name
                && client.cpf.as_deref().map(digits_only).as_deref() == Some(cpf.as_str())
        })
        .ok_or_else(|| LedgerError::not_found("client", &name))?;

    if client.password_changed {
        tracing::info!(client = client.id, "recovery requested after password change");
        return Ok(RecoveryResponse::AlreadyChanged);
    }

    let dpp = client.dpp.ok_or_else(|| {
        LedgerError::validation("dpp", "client has no due date to derive the password from")
    })?;
    Ok(RecoveryResponse::Password {
        password: dpp.format(RECOVERY_PASSWORD_FORMAT).to_string(),
    })
}
