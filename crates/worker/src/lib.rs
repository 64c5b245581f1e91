//! Offline caching worker for BlogSphere.
//!
//! This crate provides:
//! - Install/activate lifecycle with versioned partition cleanup
//! - Cache-first fetch interception with offline fallbacks
//! - Push alerts and their navigation intents
//! - The foreground message protocol and background sync hook
//! - A registration that routes host events to the controlling instance

pub mod deployment;
pub mod host;
pub mod interceptor;
pub mod lifecycle;
pub mod lifetime;
pub mod messenger;
pub mod notification;
pub mod policy;
pub mod registration;
pub mod state;
pub mod sync;
pub mod worker;

#[cfg(test)]
pub(crate) mod testing;

pub use deployment::{Deployment, PartitionNames, PartitionRole};
pub use host::{ClientInfo, ClientKind, Clients, Connectivity, HostEvent, InMemoryHost, Notifier};
pub use interceptor::{FetchInterceptor, FetchOutcome, ResponseSource, Served, offline_response};
pub use lifecycle::ActivationReport;
pub use lifetime::{Lifetime, PendingGuard};
pub use messenger::{Message, MessageOutcome, Messenger, Reply, ReplyPort};
pub use notification::{ClickOutcome, NotificationAction, NotificationData, NotificationDispatcher, NotificationOptions};
pub use policy::select_partition;
pub use registration::Registration;
pub use state::LifecycleState;
pub use sync::{BLOG_SYNC_TAG, BackgroundSync, EmptyOutbox, Outbox, SyncReport};
pub use worker::{ServiceWorker, WorkerContext};
