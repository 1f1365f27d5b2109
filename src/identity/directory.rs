//! Role, profile and client lookups behind the auth provider
//!
//! The managed database holds one role row per user, a profile row for staff
//! members and a client row for portal users. [`IdentityDirectory`] is the
//! seam over those lookups; [`MemoryDirectory`] backs it with hash maps.

use crate::identity::session::{Role, UserId};
use crate::types::{ClientId, LedgerError, OrganizationId};
use chrono::NaiveDate;
use std::collections::HashMap;

/// Staff profile linked to a user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaffProfile {
    pub user_id: UserId,
    pub organization_id: OrganizationId,
    pub full_name: String,
}

/// Client record as stored by the practice
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientRecord {
    pub id: ClientId,
    pub organization_id: OrganizationId,

    /// Portal login, `None` until the client is invited
    pub user_id: Option<UserId>,

    pub full_name: String,
    pub email: Option<String>,
    pub cpf: Option<String>,

    /// Expected due date of the pregnancy
    pub dpp: Option<NaiveDate>,

    /// Set once the client replaced the initial password
    pub password_changed: bool,
}

/// Lookups performed during role resolution
pub trait IdentityDirectory {
    /// Role row of the user, `None` when the user has none
    fn role_of(&self, user_id: &str) -> Result<Option<Role>, LedgerError>;

    fn staff_profile(&self, user_id: &str) -> Result<Option<StaffProfile>, LedgerError>;

    /// Client record linked to the user
    fn client_for_user(&self, user_id: &str) -> Result<Option<ClientRecord>, LedgerError>;
}

/// In-memory directory
#[derive(Debug, Clone, Default)]
pub struct MemoryDirectory {
    roles: HashMap<UserId, Role>,
    profiles: HashMap<UserId, StaffProfile>,
    clients: Vec<ClientRecord>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_staff(&mut self, role: Role, profile: StaffProfile) {
        self.roles.insert(profile.user_id.clone(), role);
        self.profiles.insert(profile.user_id.clone(), profile);
    }

    /// Register a client; a linked user gets the client role
    pub fn add_client(&mut self, client: ClientRecord) {
        if let Some(user_id) = &client.user_id {
            self.roles.insert(user_id.clone(), Role::Client);
        }
        self.clients.push(client);
    }

    pub fn set_role(&mut self, user_id: &str, role: Role) {
        self.roles.insert(user_id.to_string(), role);
    }

    pub fn clients(&self) -> &[ClientRecord] {
        &self.clients
    }
}

impl IdentityDirectory for MemoryDirectory {
    fn role_of(&self, user_id: &str) -> Result<Option<Role>, LedgerError> {
        Ok(self.roles.get(user_id).copied())
    }

    fn staff_profile(&self, user_id: &str) -> Result<Option<StaffProfile>, LedgerError> {
        Ok(self.profiles.get(user_id).cloned())
    }

    fn client_for_user(&self, user_id: &str) -> Result<Option<ClientRecord>, LedgerError> {
        Ok(self
            .clients
            .iter()
            .find(|client| client.user_id.as_deref() == Some(user_id))
            .cloned())
    }
}
