//! Notification request contract and the push payload derived from it

use crate::identity::UserId;
use crate::types::{ClientId, LedgerError};
use serde::{Deserialize, Serialize};

/// Urgency hint forwarded to the push service
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
}

/// Body accepted by the notification endpoint
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_ids: Option<Vec<UserId>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_ids: Option<Vec<ClientId>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub send_to_admins: Option<bool>,
    pub title: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub require_interaction: Option<bool>,
}

impl NotificationRequest {
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            ..Self::default()
        }
    }

    pub fn to_users(mut self, user_ids: Vec<UserId>) -> Self {
        self.user_ids = Some(user_ids);
        self
    }

    pub fn to_clients(mut self, client_ids: Vec<ClientId>) -> Self {
        self.client_ids = Some(client_ids);
        self
    }

    pub fn to_admins(mut self) -> Self {
        self.send_to_admins = Some(true);
        self
    }

    pub fn sends_to_admins(&self) -> bool {
        self.send_to_admins.unwrap_or(false)
    }

    /// Title and message must carry text
    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.title.trim().is_empty() {
            return Err(LedgerError::validation("title", "title is required"));
        }
        if self.message.trim().is_empty() {
            return Err(LedgerError::validation("message", "message is required"));
        }
        Ok(())
    }

    /// Parse and validate a JSON request body
    pub fn from_json(body: &str) -> Result<Self, LedgerError> {
        let request: NotificationRequest = serde_json::from_str(body)?;
        request.validate()?;
        Ok(request)
    }
}

/// JSON delivered to each subscription
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PushPayload {
    pub title: String,
    pub body: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    pub priority: Priority,
    pub require_interaction: bool,
}

impl PushPayload {
    pub fn to_json(&self) -> Result<String, LedgerError> {
        Ok(serde_json::to_string(self)?)
    }
}

impl From<&NotificationRequest> for PushPayload {
    fn from(request: &NotificationRequest) -> Self {
        Self {
            title: request.title.clone(),
            body: request.message.clone(),
            url: request.url.clone().unwrap_or_else(|| "/".to_string()),
            tag: request.tag.clone(),
            kind: request.kind.clone(),
            priority: request.priority.unwrap_or_default(),
            require_interaction: request.require_interaction.unwrap_or(false),
        }
    }
}
