//! Unified session state for the staff app and the client portal
//!
//! One [`SessionState`] subscribes to the auth provider's session events and
//! resolves the caller's [`Identity`] in a single step. The [`Audience`] it is
//! created for decides which roles are let in: a staff role signing into the
//! client portal (or the reverse) ends with `access_denied` and no identity.

use crate::identity::directory::IdentityDirectory;
use crate::types::{ClientId, LedgerError, OrganizationId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Auth provider user id
pub type UserId = String;

/// Role row values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Moderator,
    SuperAdmin,
    Client,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Moderator => "moderator",
            Role::SuperAdmin => "super_admin",
            Role::Client => "client",
        }
    }

    pub fn is_staff(&self) -> bool {
        !matches!(self, Role::Client)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "admin" => Ok(Role::Admin),
            "moderator" => Ok(Role::Moderator),
            "super_admin" => Ok(Role::SuperAdmin),
            "client" => Ok(Role::Client),
            other => Err(LedgerError::validation(
                "role",
                &format!("unknown role '{}'", other),
            )),
        }
    }
}

/// Which app the session belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    Staff,
    Client,
}

impl Audience {
    pub fn accepts(&self, role: Role) -> bool {
        match self {
            Audience::Staff => role.is_staff(),
            Audience::Client => role == Role::Client,
        }
    }
}

/// Who the signed-in caller is
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    Staff {
        user_id: UserId,
        role: Role,
        organization_id: OrganizationId,
    },
    Client {
        user_id: UserId,
        client_id: ClientId,
        organization_id: OrganizationId,
    },
}

impl Identity {
    pub fn user_id(&self) -> &str {
        match self {
            Identity::Staff { user_id, .. } | Identity::Client { user_id, .. } => user_id,
        }
    }

    pub fn organization_id(&self) -> OrganizationId {
        match self {
            Identity::Staff {
                organization_id, ..
            }
            | Identity::Client {
                organization_id, ..
            } => *organization_id,
        }
    }

    pub fn role(&self) -> Role {
        match self {
            Identity::Staff { role, .. } => *role,
            Identity::Client { .. } => Role::Client,
        }
    }
}

/// User handed back by the auth provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: UserId,
    pub email: String,
}

/// Session change notifications from the auth provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Session restored at startup, `None` when nobody is signed in
    InitialSession(Option<AuthUser>),
    SignedIn(AuthUser),
    TokenRefreshed(AuthUser),
    SignedOut,
}

/// Observable session state
#[derive(Debug, Clone)]
pub struct SessionState {
    audience: Audience,
    loading: bool,
    role_checked: bool,
    access_denied: bool,
    user: Option<AuthUser>,
    identity: Option<Identity>,
}

impl SessionState {
    /// A fresh session is loading until the first event arrives
    pub fn new(audience: Audience) -> Self {
        Self {
            audience,
            loading: true,
            role_checked: false,
            access_denied: false,
            user: None,
            identity: None,
        }
    }

    pub fn audience(&self) -> Audience {
        self.audience
    }

    pub fn loading(&self) -> bool {
        self.loading
    }

    pub fn role_checked(&self) -> bool {
        self.role_checked
    }

    pub fn access_denied(&self) -> bool {
        self.access_denied
    }

    pub fn user(&self) -> Option<&AuthUser> {
        self.user.as_ref()
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    /// Apply one session event
    ///
    /// A token refresh for the user whose identity is already resolved does
    /// not hit the directory again.
    ///
    /// # Errors
    ///
    /// Directory failures are returned; the session is then left signed out
    /// with `role_checked` unset.
    pub fn handle(
        &mut self,
        event: SessionEvent,
        directory: &dyn IdentityDirectory,
    ) -> Result<(), LedgerError> {
        match event {
            SessionEvent::SignedOut | SessionEvent::InitialSession(None) => {
                self.clear();
                self.role_checked = true;
                Ok(())
            }
            SessionEvent::TokenRefreshed(user)
                if self.identity.is_some()
                    && self.user.as_ref().map(|u| &u.id) == Some(&user.id) =>
            {
                self.user = Some(user);
                Ok(())
            }
            SessionEvent::InitialSession(Some(user))
            | SessionEvent::SignedIn(user)
            | SessionEvent::TokenRefreshed(user) => self.resolve(user, directory),
        }
    }

    /// Sign out locally
    pub fn sign_out(&mut self) {
        self.clear();
        self.role_checked = true;
    }

    fn clear(&mut self) {
        self.loading = false;
        self.access_denied = false;
        self.user = None;
        self.identity = None;
    }

    fn resolve(
        &mut self,
        user: AuthUser,
        directory: &dyn IdentityDirectory,
    ) -> Result<(), LedgerError> {
        self.loading = true;
        self.role_checked = false;

        let resolved = resolve_identity(self.audience, &user.id, directory);
        self.loading = false;
        match resolved {
            Ok(Some(identity)) => {
                tracing::debug!(user = %user.id, role = %identity.role(), "session resolved");
                self.user = Some(user);
                self.identity = Some(identity);
                self.access_denied = false;
                self.role_checked = true;
                Ok(())
            }
            Ok(None) => {
                tracing::info!(user = %user.id, audience = ?self.audience, "role not allowed for this app");
                self.user = Some(user);
                self.identity = None;
                self.access_denied = true;
                self.role_checked = true;
                Ok(())
            }
            Err(e) => {
                self.clear();
                Err(e)
            }
        }
    }
}

/// Single role-resolution step
///
/// Returns `None` when the user has no role, a role the audience does not
/// accept, or no linked profile/client record.
pub fn resolve_identity(
    audience: Audience,
    user_id: &str,
    directory: &dyn IdentityDirectory,
) -> Result<Option<Identity>, LedgerError> {
    let role = match directory.role_of(user_id)? {
        Some(role) if audience.accepts(role) => role,
        _ => return Ok(None),
    };

    if role.is_staff() {
        Ok(directory
            .staff_profile(user_id)?
            .map(|profile| Identity::Staff {
                user_id: user_id.to_string(),
                role,
                organization_id: profile.organization_id,
            }))
    } else {
        Ok(directory
            .client_for_user(user_id)?
            .map(|client| Identity::Client {
                user_id: user_id.to_string(),
                client_id: client.id,
                organization_id: client.organization_id,
            }))
    }
}
