//! Push notification fan-out
//!
//! [`Dispatcher::dispatch`] resolves the target users of a request, loads
//! their stored subscriptions and delivers one payload per subscription
//! concurrently. Subscriptions whose endpoint answers 404 or 410 are expired
//! and removed from the store. Other failures are counted and not retried.

use crate::identity::UserId;
use crate::notify::request::{NotificationRequest, PushPayload};
use crate::types::{ClientId, LedgerError};
use async_trait::async_trait;
use dashmap::DashMap;
use futures::future::join_all;
use std::collections::HashSet;

/// A browser push subscription
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PushSubscription {
    pub user_id: UserId,
    pub endpoint: String,
    pub p256dh: String,
    pub auth: String,
}

/// Subscription and recipient lookups
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// Portal users linked to the given clients
    async fn users_for_clients(
        &self,
        client_ids: &[ClientId],
    ) -> Result<Vec<UserId>, LedgerError>;

    /// Users holding a staff admin role
    async fn admin_users(&self) -> Result<Vec<UserId>, LedgerError>;

    async fn subscriptions_for(
        &self,
        user_ids: &[UserId],
    ) -> Result<Vec<PushSubscription>, LedgerError>;

    async fn remove_subscription(&self, endpoint: &str) -> Result<(), LedgerError>;
}

/// Delivery of one payload to one subscription
///
/// Returns the HTTP status answered by the push endpoint. `Err` means the
/// endpoint could not be reached at all.
#[async_trait]
pub trait PushSender: Send + Sync {
    async fn send(
        &self,
        subscription: &PushSubscription,
        payload: &str,
    ) -> Result<u16, LedgerError>;
}

/// Whether the status marks the subscription as expired
pub fn is_expired(status: u16) -> bool {
    status == 404 || status == 410
}

/// Outcome of one fan-out
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Distinct users targeted
    pub targets: usize,
    pub sent: usize,
    pub failed: usize,
    pub pruned: usize,
}

pub struct Dispatcher<S, P> {
    store: S,
    sender: P,
}

impl<S: SubscriptionStore, P: PushSender> Dispatcher<S, P> {
    pub fn new(store: S, sender: P) -> Self {
        Self { store, sender }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Explicit users, then users of the listed clients, then admins
    ///
    /// Order of first appearance is kept; duplicates are dropped.
    pub async fn resolve_targets(
        &self,
        request: &NotificationRequest,
    ) -> Result<Vec<UserId>, LedgerError> {
        let mut targets = Vec::new();
        let mut seen = HashSet::new();
        let mut push = |user: UserId| {
            if seen.insert(user.clone()) {
                targets.push(user);
            }
        };

        for user in request.user_ids.iter().flatten() {
            push(user.clone());
        }
        if let Some(client_ids) = request.client_ids.as_deref().filter(|ids| !ids.is_empty()) {
            for user in self.store.users_for_clients(client_ids).await? {
                push(user);
            }
        }
        if request.sends_to_admins() {
            for user in self.store.admin_users().await? {
                push(user);
            }
        }

        Ok(targets)
    }

    /// Deliver the request to every subscription of its targets
    ///
    /// # Errors
    ///
    /// - `Validation` for an empty title or message
    /// - store lookup failures; individual delivery failures are only counted
    pub async fn dispatch(
        &self,
        request: &NotificationRequest,
    ) -> Result<DispatchReport, LedgerError> {
        request.validate()?;

        let targets = self.resolve_targets(request).await?;
        let mut report = DispatchReport {
            targets: targets.len(),
            ..DispatchReport::default()
        };
        if targets.is_empty() {
            tracing::info!(title = %request.title, "notification has no targets");
            return Ok(report);
        }

        let subscriptions = self.store.subscriptions_for(&targets).await?;
        let payload = PushPayload::from(request).to_json()?;

        let deliveries = subscriptions.iter().map(|subscription| {
            let payload = payload.as_str();
            async move { (subscription, self.sender.send(subscription, payload).await) }
        });

        for (subscription, result) in join_all(deliveries).await {
            match result {
                Ok(status) if (200..300).contains(&status) => report.sent += 1,
                Ok(status) if is_expired(status) => {
                    tracing::info!(
                        user = %subscription.user_id,
                        status,
                        "pruning expired subscription"
                    );
                    match self.store.remove_subscription(&subscription.endpoint).await {
                        Ok(()) => report.pruned += 1,
                        Err(e) => {
                            tracing::warn!(
                                endpoint = %subscription.endpoint,
                                error = %e,
                                "failed to prune subscription"
                            );
                            report.failed += 1;
                        }
                    }
                }
                Ok(status) => {
                    tracing::warn!(
                        endpoint = %subscription.endpoint,
                        status,
                        "push delivery rejected"
                    );
                    report.failed += 1;
                }
                Err(e) => {
                    tracing::warn!(
                        endpoint = %subscription.endpoint,
                        error = %e,
                        "push delivery failed"
                    );
                    report.failed += 1;
                }
            }
        }

        tracing::debug!(
            targets = report.targets,
            sent = report.sent,
            failed = report.failed,
            pruned = report.pruned,
            "notification dispatched"
        );
        Ok(report)
    }
}

/// In-memory subscription store
#[derive(Debug, Default)]
pub struct MemorySubscriptionStore {
    client_users: DashMap<ClientId, UserId>,
    admins: DashMap<UserId, ()>,
    subscriptions: DashMap<String, PushSubscription>,
}

impl MemorySubscriptionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn link_client(&self, client_id: ClientId, user_id: &str) {
        self.client_users.insert(client_id, user_id.to_string());
    }

    pub fn add_admin(&self, user_id: &str) {
        self.admins.insert(user_id.to_string(), ());
    }

    /// Store a subscription, replacing any other with the same endpoint
    pub fn subscribe(&self, subscription: PushSubscription) {
        self.subscriptions
            .insert(subscription.endpoint.clone(), subscription);
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }
}

#[async_trait]
impl SubscriptionStore for MemorySubscriptionStore {
    async fn users_for_clients(
        &self,
        client_ids: &[ClientId],
    ) -> Result<Vec<UserId>, LedgerError> {
        Ok(client_ids
            .iter()
            .filter_map(|id| self.client_users.get(id).map(|user| user.value().clone()))
            .collect())
    }

    async fn admin_users(&self) -> Result<Vec<UserId>, LedgerError> {
        let mut admins: Vec<UserId> = self.admins.iter().map(|e| e.key().clone()).collect();
        admins.sort();
        Ok(admins)
    }

    async fn subscriptions_for(
        &self,
        user_ids: &[UserId],
    ) -> Result<Vec<PushSubscription>, LedgerError> {
        let wanted: HashSet<&UserId> = user_ids.iter().collect();
        let mut found: Vec<PushSubscription> = self
            .subscriptions
            .iter()
            .filter(|e| wanted.contains(&e.value().user_id))
            .map(|e| e.value().clone())
            .collect();
        found.sort_by(|a, b| a.endpoint.cmp(&b.endpoint));
        Ok(found)
    }

    async fn remove_subscription(&self, endpoint: &str) -> Result<(), LedgerError> {
        self.subscriptions.remove(endpoint);
        Ok(())
    }
}
