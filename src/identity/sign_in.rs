//! Password sign-in with username shorthand
//!
//! Clients usually sign in with a username instead of an email. The username
//! expands to a synthetic address (`<username>@<synthetic domain>`). When the
//! provider rejects that guess, the [`ClientNameIndex`] maps the username to
//! the email actually stored on the client record and the sign-in is retried
//! once with it.

use crate::identity::directory::ClientRecord;
use crate::identity::normalize::username_for;
use crate::identity::session::AuthUser;
use crate::types::{ClientId, LedgerError};
use std::collections::HashMap;

/// Default domain for synthetic client emails
pub const DEFAULT_SYNTHETIC_EMAIL_DOMAIN: &str = "cliente.doula.app";

/// Identity configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityConfig {
    pub synthetic_email_domain: String,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            synthetic_email_domain: DEFAULT_SYNTHETIC_EMAIL_DOMAIN.to_string(),
        }
    }
}

impl IdentityConfig {
    pub fn synthetic_email(&self, username: &str) -> String {
        format!("{}@{}", username, self.synthetic_email_domain)
    }
}

/// What the user typed in the login field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginIdentifier {
    Email(String),
    Username(String),
}

impl LoginIdentifier {
    /// Anything with an `@` is an email; everything else a username
    pub fn parse(input: &str) -> Result<Self, LedgerError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(LedgerError::validation("login", "email or username is required"));
        }
        if input.contains('@') {
            return Ok(LoginIdentifier::Email(input.to_lowercase()));
        }
        let username = username_for(input);
        if username.is_empty() {
            return Err(LedgerError::validation(
                "login",
                &format!("'{}' is not a valid username", input),
            ));
        }
        Ok(LoginIdentifier::Username(username))
    }
}

/// The auth provider's password sign-in
pub trait Authenticator {
    fn sign_in_with_password(&self, email: &str, password: &str) -> Result<AuthUser, LedgerError>;
}

/// Login entry for one client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientLogin {
    pub client_id: ClientId,
    pub email: String,
}

/// Client emails keyed by derived username
///
/// Built once from the client records; lookups are hash lookups. Clients
/// without a stored email are not indexed. When two clients derive the same
/// username, the first one indexed wins.
#[derive(Debug, Clone, Default)]
pub struct ClientNameIndex {
    by_username: HashMap<String, ClientLogin>,
}

impl ClientNameIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, client: &ClientRecord) {
        let Some(email) = client.email.as_deref().map(str::trim).filter(|e| !e.is_empty()) else {
            return;
        };
        let username = username_for(&client.full_name);
        if username.is_empty() {
            return;
        }
        self.by_username.entry(username).or_insert_with(|| ClientLogin {
            client_id: client.id,
            email: email.to_lowercase(),
        });
    }

    pub fn lookup(&self, username: &str) -> Option<&ClientLogin> {
        self.by_username.get(username)
    }

    pub fn len(&self) -> usize {
        self.by_username.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_username.is_empty()
    }
}

impl<'a> FromIterator<&'a ClientRecord> for ClientNameIndex {
    fn from_iter<I: IntoIterator<Item = &'a ClientRecord>>(iter: I) -> Self {
        let mut index = ClientNameIndex::new();
        for client in iter {
            index.insert(client);
        }
        index
    }
}

/// Password sign-in flow
pub struct SignIn<'a, A: Authenticator> {
    auth: &'a A,
    config: &'a IdentityConfig,
    index: &'a ClientNameIndex,
}

impl<'a, A: Authenticator> SignIn<'a, A> {
    pub fn new(auth: &'a A, config: &'a IdentityConfig, index: &'a ClientNameIndex) -> Self {
        Self {
            auth,
            config,
            index,
        }
    }

    /// Sign in with an email or a username
    ///
    /// # Errors
    ///
    /// - `Validation` for an empty login or password
    /// - `Auth` when the provider rejects every attempted address
    pub fn sign_in(&self, login: &str, password: &str) -> Result<AuthUser, LedgerError> {
        if password.is_empty() {
            return Err(LedgerError::validation("password", "password is required"));
        }

        match LoginIdentifier::parse(login)? {
            LoginIdentifier::Email(email) => self.auth.sign_in_with_password(&email, password),
            LoginIdentifier::Username(username) => {
                let synthetic = self.config.synthetic_email(&username);
                let first = match self.auth.sign_in_with_password(&synthetic, password) {
                    Ok(user) => return Ok(user),
                    Err(e) => e,
                };

                match self.index.lookup(&username) {
                    Some(login) if login.email != synthetic => {
                        tracing::info!(
                            client = login.client_id,
                            "synthetic email rejected, retrying with stored email"
                        );
                        self.auth.sign_in_with_password(&login.email, password)
                    }
                    _ => Err(first),
                }
            }
        }
    }
}
