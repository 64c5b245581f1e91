//! One worker instance: a deployment version plus its event handlers.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use blogsphere_client::Network;
use blogsphere_core::{CacheDb, Error, Request};
use serde_json::Value;
use tokio::sync::watch;

use crate::deployment::Deployment;
use crate::host::{Clients, Connectivity, Notifier};
use crate::interceptor::{FetchInterceptor, FetchOutcome};
use crate::lifetime::Lifetime;
use crate::messenger::{MessageOutcome, Messenger, ReplyPort};
use crate::notification::{ClickOutcome, NotificationDispatcher};
use crate::state::LifecycleState;
use crate::sync::{BackgroundSync, Outbox, SyncReport};

/// Collaborators shared by every worker instance of a registration.
#[derive(Clone)]
pub struct WorkerContext {
    pub db: CacheDb,
    pub network: Arc<dyn Network>,
    pub clients: Arc<dyn Clients>,
    pub notifier: Arc<dyn Notifier>,
    pub connectivity: Connectivity,
    pub outbox: Arc<dyn Outbox>,
}

pub struct ServiceWorker {
    pub(crate) id: String,
    pub(crate) deployment: Arc<Deployment>,
    pub(crate) db: CacheDb,
    pub(crate) network: Arc<dyn Network>,
    pub(crate) clients: Arc<dyn Clients>,
    state: watch::Sender<LifecycleState>,
    pub(crate) skip_waiting: AtomicBool,
    pub(crate) lifetime: Lifetime,
    interceptor: FetchInterceptor,
    notifications: NotificationDispatcher,
    messenger: Messenger,
    sync: BackgroundSync,
}

impl std::fmt::Debug for ServiceWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceWorker")
            .field("id", &self.id)
            .field("version", &self.deployment.version)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl ServiceWorker {
    /// Create an instance in the `installing` phase.
    pub fn new(id: impl Into<String>, deployment: Deployment, ctx: &WorkerContext) -> Self {
        Self::with_state(id, deployment, ctx, LifecycleState::Installing)
    }

    /// Bring back a version that already activated in an earlier run. Its
    /// partitions are in the store, so it skips install and activate.
    pub(crate) fn restored(id: impl Into<String>, deployment: Deployment, ctx: &WorkerContext) -> Self {
        Self::with_state(id, deployment, ctx, LifecycleState::Activated)
    }

    fn with_state(id: impl Into<String>, deployment: Deployment, ctx: &WorkerContext, initial: LifecycleState) -> Self {
        let deployment = Arc::new(deployment);
        let lifetime = Lifetime::new();
        let state = watch::Sender::new(initial);
        let interceptor = FetchInterceptor::new(
            ctx.db.clone(),
            Arc::clone(&ctx.network),
            Arc::clone(&deployment),
            lifetime.clone(),
            state.subscribe(),
        );
        let notifications = NotificationDispatcher::new(
            deployment.notification_title.clone(),
            deployment.origin.clone(),
            Arc::clone(&ctx.notifier),
            Arc::clone(&ctx.clients),
        );

        Self {
            id: id.into(),
            db: ctx.db.clone(),
            network: Arc::clone(&ctx.network),
            clients: Arc::clone(&ctx.clients),
            state,
            skip_waiting: AtomicBool::new(false),
            interceptor,
            notifications,
            messenger: Messenger::new(ctx.db.clone(), ctx.connectivity.clone()),
            sync: BackgroundSync::new(Arc::clone(&ctx.outbox)),
            deployment,
            lifetime,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn deployment(&self) -> &Deployment {
        &self.deployment
    }

    pub fn state(&self) -> LifecycleState {
        *self.state.borrow()
    }

    /// Watch lifecycle changes of this instance.
    pub fn subscribe(&self) -> watch::Receiver<LifecycleState> {
        self.state.subscribe()
    }

    pub fn lifetime(&self) -> &Lifetime {
        &self.lifetime
    }

    /// Whether this instance asked to activate without waiting.
    pub fn skip_waiting_requested(&self) -> bool {
        self.skip_waiting.load(Ordering::Acquire)
    }

    pub(crate) fn request_skip_waiting(&self) {
        self.skip_waiting.store(true, Ordering::Release);
    }

    pub(crate) fn transition(&self, next: LifecycleState) -> Result<(), Error> {
        let mut from = None;
        let moved = self.state.send_if_modified(|state| {
            from = Some(*state);
            if state.can_transition_to(next) {
                *state = next;
                true
            } else {
                false
            }
        });

        let from = from.unwrap_or(next);
        if !moved {
            return Err(Error::InvalidState(format!("{}: cannot move from {from} to {next}", self.id)));
        }
        tracing::info!(worker = %self.id, version = %self.deployment.version, %from, to = %next, "lifecycle transition");
        Ok(())
    }

    /// Retire this instance. Already-redundant instances are left alone.
    pub fn set_redundant(&self) {
        if self.state() != LifecycleState::Redundant {
            let _ = self.transition(LifecycleState::Redundant);
        }
    }

    pub async fn fetch(&self, request: &Request) -> Result<FetchOutcome, Error> {
        let _guard = self.lifetime.guard();
        self.interceptor.handle(request).await
    }

    /// Show the alert for a push message; returns the alert id.
    pub async fn push(&self, payload: Option<&str>) -> Result<String, Error> {
        let _guard = self.lifetime.guard();
        self.notifications.show_push(payload).await
    }

    pub async fn notification_click(&self, id: &str, action: &str) -> Result<ClickOutcome, Error> {
        let _guard = self.lifetime.guard();
        self.notifications.handle_click(id, action).await
    }

    pub async fn sync(&self, tag: &str) -> Result<Option<SyncReport>, Error> {
        let _guard = self.lifetime.guard();
        self.sync.handle(tag).await
    }

    /// Handle a foreground message. `SKIP_WAITING` only records the request;
    /// the registration performs the promotion.
    pub async fn message(&self, data: Value, reply: Option<ReplyPort>) -> Result<MessageOutcome, Error> {
        let _guard = self.lifetime.guard();
        let outcome = self.messenger.handle(data, reply).await?;
        if outcome == MessageOutcome::SkipWaiting {
            tracing::info!(worker = %self.id, "skip waiting requested");
            self.request_skip_waiting();
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::InMemoryHost;
    use crate::sync::EmptyOutbox;
    use crate::testing::{FakeNetwork, deployment};
    use serde_json::json;

    async fn worker() -> ServiceWorker {
        let (host, _events) = InMemoryHost::new();
        let host = Arc::new(host);
        let ctx = WorkerContext {
            db: CacheDb::open_in_memory().await.unwrap(),
            network: Arc::new(FakeNetwork::new()),
            clients: host.clone(),
            notifier: host,
            connectivity: Connectivity::default(),
            outbox: Arc::new(EmptyOutbox),
        };
        ServiceWorker::new("sw-v2-1", deployment(), &ctx)
    }

    #[tokio::test]
    async fn test_starts_installing() {
        let worker = worker().await;
        assert_eq!(worker.state(), LifecycleState::Installing);
        assert!(!worker.skip_waiting_requested());
    }

    #[tokio::test]
    async fn test_restored_instance_is_active() {
        let (host, _events) = InMemoryHost::new();
        let host = Arc::new(host);
        let ctx = WorkerContext {
            db: CacheDb::open_in_memory().await.unwrap(),
            network: Arc::new(FakeNetwork::new()),
            clients: host.clone(),
            notifier: host,
            connectivity: Connectivity::default(),
            outbox: Arc::new(EmptyOutbox),
        };
        let worker = ServiceWorker::restored("sw-v2-1", deployment(), &ctx);
        assert_eq!(worker.state(), LifecycleState::Activated);
        assert!(matches!(worker.activate().await, Err(Error::InvalidState(_))));
    }

    #[tokio::test]
    async fn test_illegal_transition_rejected() {
        let worker = worker().await;
        let result = worker.transition(LifecycleState::Activated);
        assert!(matches!(result, Err(Error::InvalidState(_))));
        assert_eq!(worker.state(), LifecycleState::Installing);
    }

    #[tokio::test]
    async fn test_subscribers_see_transitions() {
        let worker = worker().await;
        let mut rx = worker.subscribe();
        worker.transition(LifecycleState::Installed).unwrap();
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), LifecycleState::Installed);
    }

    #[tokio::test]
    async fn test_set_redundant_is_idempotent() {
        let worker = worker().await;
        worker.set_redundant();
        worker.set_redundant();
        assert_eq!(worker.state(), LifecycleState::Redundant);
    }

    #[tokio::test]
    async fn test_skip_waiting_message_sets_flag() {
        let worker = worker().await;
        let outcome = worker.message(json!({ "type": "SKIP_WAITING" }), None).await.unwrap();
        assert_eq!(outcome, MessageOutcome::SkipWaiting);
        assert!(worker.skip_waiting_requested());
        assert_eq!(worker.lifetime().pending(), 0);
    }
}
