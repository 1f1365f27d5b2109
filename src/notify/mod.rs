//! Push notification fan-out

pub mod dispatcher;
pub mod request;
pub mod triggers;

pub use dispatcher::{
    is_expired, DispatchReport, Dispatcher, MemorySubscriptionStore, PushSender, PushSubscription,
    SubscriptionStore,
};
pub use request::{NotificationRequest, Priority, PushPayload};
pub use triggers::Trigger;
