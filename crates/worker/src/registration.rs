//! The per-origin registration: which instance controls, which one waits.
//!
//! A newly registered version installs while the current one keeps
//! serving. It then waits until either nothing is active or it asked to skip
//! waiting. Promotion lets the old instance drain its pending work, activates
//! the new one (dropping stale partitions) and retires the old one.
//!
//! The activated version is recorded in the store. After a restart the
//! recorded version takes control again without re-installing, as long as
//! its static partition is still there.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use blogsphere_core::{Error, Request};
use serde_json::Value;
use tokio::sync::RwLock;

use crate::deployment::Deployment;
use crate::interceptor::{FetchOutcome, ResponseSource, Served};
use crate::lifecycle::ActivationReport;
use crate::messenger::{MessageOutcome, ReplyPort};
use crate::notification::ClickOutcome;
use crate::state::LifecycleState;
use crate::sync::SyncReport;
use crate::worker::{ServiceWorker, WorkerContext};

pub struct Registration {
    ctx: WorkerContext,
    active: RwLock<Option<Arc<ServiceWorker>>>,
    waiting: RwLock<Option<Arc<ServiceWorker>>>,
    next_id: AtomicU64,
}

impl Registration {
    pub fn new(ctx: WorkerContext) -> Self {
        Self { ctx, active: RwLock::new(None), waiting: RwLock::new(None), next_id: AtomicU64::new(1) }
    }

    pub fn context(&self) -> &WorkerContext {
        &self.ctx
    }

    pub async fn active(&self) -> Option<Arc<ServiceWorker>> {
        self.active.read().await.clone()
    }

    pub async fn waiting(&self) -> Option<Arc<ServiceWorker>> {
        self.waiting.read().await.clone()
    }

    /// The active instance, if it is ready to handle events.
    pub async fn controller(&self) -> Option<Arc<ServiceWorker>> {
        self.active()
            .await
            .filter(|w| w.state() == LifecycleState::Activated)
    }

    /// Install a new version and promote it when allowed.
    ///
    /// When nothing is active yet, the version recorded in the store resumes
    /// control first. If that is the requested version no install happens.
    /// On install failure the new instance is discarded and the current
    /// controller, if any, keeps serving.
    pub async fn register(&self, deployment: Deployment) -> Result<Arc<ServiceWorker>, Error> {
        match self.restore(&deployment).await {
            Some(restored) if restored.deployment().version == deployment.version => return Ok(restored),
            _ => {}
        }

        let id = self.next_worker_id(&deployment.version);
        let worker = Arc::new(ServiceWorker::new(id, deployment, &self.ctx));

        worker.install().await?;

        if let Some(replaced) = self.waiting.write().await.replace(Arc::clone(&worker)) {
            tracing::info!(worker = %replaced.id(), "waiting worker replaced by a newer version");
            replaced.set_redundant();
        }

        self.try_activate_waiting().await?;
        Ok(worker)
    }

    /// Promote the waiting instance if nothing is active or it asked to
    /// skip waiting. Returns the activation report when a promotion happened.
    pub async fn try_activate_waiting(&self) -> Result<Option<ActivationReport>, Error> {
        let mut waiting = self.waiting.write().await;
        let Some(candidate) = waiting.clone() else {
            return Ok(None);
        };

        let previous = self.active().await;
        if previous.is_some() && !candidate.skip_waiting_requested() {
            tracing::info!(worker = %candidate.id(), "installed; waiting for the active worker to be released");
            return Ok(None);
        }
        waiting.take();

        if let Some(previous) = &previous {
            previous.lifetime().idle().await;
        }

        let report = match candidate.activate().await {
            Ok(report) => report,
            Err(e) => {
                tracing::error!(worker = %candidate.id(), error = %e, "activation failed");
                candidate.set_redundant();
                return Err(e);
            }
        };

        let replaced = self.active.write().await.replace(Arc::clone(&candidate));
        if let Some(replaced) = replaced {
            replaced.set_redundant();
        }

        let deployment = candidate.deployment();
        if let Err(e) = self.ctx.db.record_activation(deployment.scope(), &deployment.version).await {
            tracing::warn!(worker = %candidate.id(), error = %e, "failed to record activated version");
        }
        tracing::info!(
            worker = %candidate.id(),
            deleted = report.deleted.len(),
            claimed = report.claimed,
            "worker now controls the origin"
        );
        Ok(Some(report))
    }

    /// Put the version recorded as activated back in control.
    ///
    /// Only runs while nothing is active in this process, and only when that
    /// version's static partition survived.
    async fn restore(&self, deployment: &Deployment) -> Option<Arc<ServiceWorker>> {
        let mut active = self.active.write().await;
        if active.is_some() {
            return None;
        }

        let version = match self.ctx.db.activated_version(deployment.scope()).await {
            Ok(Some(version)) => version,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(scope = deployment.scope(), error = %e, "could not read the activated version");
                return None;
            }
        };

        let previous = deployment.for_version(&version);
        match self.ctx.db.has_partition(&previous.partitions.static_name).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::info!(version = %version, "app shell of the recorded version is gone; installing");
                return None;
            }
            Err(e) => {
                tracing::warn!(version = %version, error = %e, "could not check the recorded app shell");
                return None;
            }
        }

        let worker = Arc::new(ServiceWorker::restored(self.next_worker_id(&version), previous, &self.ctx));
        if let Err(e) = self.ctx.clients.claim(worker.id()).await {
            tracing::warn!(worker = %worker.id(), error = %e, "failed to claim clients");
        }
        tracing::info!(worker = %worker.id(), version = %version, "resumed control from the store");
        *active = Some(Arc::clone(&worker));
        Some(worker)
    }

    fn next_worker_id(&self, version: &str) -> String {
        format!("sw-{version}-{}", self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Route a request through the controller, or straight to the network
    /// when nothing controls the origin or the request is not intercepted.
    pub async fn fetch(&self, request: &Request) -> Result<Served, Error> {
        let outcome = match self.controller().await {
            Some(worker) => worker.fetch(request).await?,
            None => FetchOutcome::Bypass,
        };
        if let FetchOutcome::Respond(served) = outcome {
            return Ok(served);
        }

        let response = self.ctx.network.fetch(request).await?;
        Ok(Served { response, source: ResponseSource::Passthrough })
    }

    pub async fn push(&self, payload: Option<&str>) -> Result<String, Error> {
        self.require_controller().await?.push(payload).await
    }

    pub async fn notification_click(&self, id: &str, action: &str) -> Result<ClickOutcome, Error> {
        self.require_controller().await?.notification_click(id, action).await
    }

    pub async fn sync(&self, tag: &str) -> Result<Option<SyncReport>, Error> {
        self.require_controller().await?.sync(tag).await
    }

    /// Deliver a foreground message to the waiting instance if there is one,
    /// otherwise to the controller.
    pub async fn post_message(&self, data: Value, reply: Option<ReplyPort>) -> Result<MessageOutcome, Error> {
        let target = match self.waiting().await {
            Some(worker) => worker,
            None => self.require_controller().await?,
        };

        let outcome = target.message(data, reply).await?;
        if outcome == MessageOutcome::SkipWaiting {
            self.try_activate_waiting().await?;
        }
        Ok(outcome)
    }

    async fn require_controller(&self) -> Result<Arc<ServiceWorker>, Error> {
        self.controller()
            .await
            .ok_or_else(|| Error::InvalidState("no active worker controls the origin".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{Clients, Connectivity, HostEvent, InMemoryHost};
    use crate::messenger::Reply;
    use crate::sync::EmptyOutbox;
    use crate::testing::{FakeNetwork, ORIGIN, deployment_for};
    use std::path::Path;
    use blogsphere_client::{FetchClient, FetchConfig, parse_origin};
    use blogsphere_core::{AppConfig, CacheDb};
    use serde_json::json;
    use tokio::sync::{mpsc, oneshot};
    use url::Url;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct Fixture {
        registration: Registration,
        network: Arc<FakeNetwork>,
        host: Arc<InMemoryHost>,
        _events: mpsc::UnboundedReceiver<HostEvent>,
    }

    async fn fixture() -> Fixture {
        fixture_with(CacheDb::open_in_memory().await.unwrap())
    }

    /// A fresh process over the store at `path`.
    async fn restarted(path: &Path) -> Fixture {
        fixture_with(CacheDb::open(path).await.unwrap())
    }

    fn fixture_with(db: CacheDb) -> Fixture {
        let (host, events) = InMemoryHost::new();
        let host = Arc::new(host);
        let network = Arc::new(FakeNetwork::with_app_shell());
        let ctx = WorkerContext {
            db,
            network: network.clone(),
            clients: host.clone(),
            notifier: host.clone(),
            connectivity: Connectivity::default(),
            outbox: Arc::new(EmptyOutbox),
        };
        Fixture { registration: Registration::new(ctx), network, host, _events: events }
    }

    fn url(path: &str) -> Url {
        Url::parse(&format!("{ORIGIN}{path}")).unwrap()
    }

    async fn sorted_partitions(registration: &Registration) -> Vec<String> {
        let mut names = registration.context().db.partition_names().await.unwrap();
        names.sort();
        names
    }

    #[tokio::test]
    async fn test_first_registration_activates() {
        let f = fixture().await;
        let worker = f.registration.register(deployment_for("v1")).await.unwrap();

        assert_eq!(worker.state(), LifecycleState::Activated);
        assert!(f.registration.waiting().await.is_none());
        assert_eq!(f.registration.controller().await.unwrap().id(), worker.id());
    }

    #[tokio::test]
    async fn test_upgrade_removes_previous_generation() {
        let f = fixture().await;
        let v1 = f.registration.register(deployment_for("v1")).await.unwrap();
        f.network.serve("/api/posts", 200, "[]");
        f.registration.fetch(&Request::get(url("/api/posts"))).await.unwrap();
        v1.lifetime().idle().await;
        assert_eq!(sorted_partitions(&f.registration).await, vec!["blogsphere-dynamic-v1", "blogsphere-static-v1"]);

        let v2 = f.registration.register(deployment_for("v2")).await.unwrap();

        assert_eq!(v1.state(), LifecycleState::Redundant);
        assert_eq!(v2.state(), LifecycleState::Activated);
        assert_eq!(sorted_partitions(&f.registration).await, vec!["blogsphere-static-v2"]);
    }

    #[tokio::test]
    async fn test_failed_install_keeps_previous_controller() {
        let f = fixture().await;
        let v1 = f.registration.register(deployment_for("v1")).await.unwrap();

        f.network.set_offline(true);
        let result = f.registration.register(deployment_for("v2")).await;
        assert!(matches!(result, Err(Error::InstallFailed(_))));

        assert_eq!(f.registration.controller().await.unwrap().id(), v1.id());
        assert_eq!(v1.state(), LifecycleState::Activated);
        assert!(f.registration.waiting().await.is_none());
    }

    #[tokio::test]
    async fn test_waiting_worker_promoted_by_skip_waiting_message() {
        let f = fixture().await;
        let v1 = f.registration.register(deployment_for("v1")).await.unwrap();

        let mut v2_deployment = deployment_for("v2");
        v2_deployment.skip_waiting_on_install = false;
        let v2 = f.registration.register(v2_deployment).await.unwrap();

        assert_eq!(v2.state(), LifecycleState::Installed);
        assert_eq!(f.registration.controller().await.unwrap().id(), v1.id());
        assert_eq!(f.registration.waiting().await.unwrap().id(), v2.id());

        let outcome = f.registration.post_message(json!({ "type": "SKIP_WAITING" }), None).await.unwrap();
        assert_eq!(outcome, MessageOutcome::SkipWaiting);
        assert_eq!(v2.state(), LifecycleState::Activated);
        assert_eq!(v1.state(), LifecycleState::Redundant);
        assert!(f.registration.waiting().await.is_none());
    }

    #[tokio::test]
    async fn test_cache_status_lists_live_partitions() {
        let f = fixture().await;
        f.registration.register(deployment_for("v2")).await.unwrap();

        let (tx, rx) = oneshot::channel();
        f.registration.post_message(json!({ "type": "GET_CACHE_STATUS" }), Some(tx)).await.unwrap();
        let Reply::CacheStatus { partitions, online } = rx.await.unwrap();
        assert_eq!(partitions, vec!["blogsphere-static-v2"]);
        assert!(online);
    }

    #[tokio::test]
    async fn test_fetch_without_controller_passes_through() {
        let f = fixture().await;
        let served = f.registration.fetch(&Request::get(url("/"))).await.unwrap();
        assert_eq!(served.source, ResponseSource::Passthrough);
        assert!(f.registration.context().db.partition_names().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_bypassed_request_passes_through() {
        let f = fixture().await;
        f.registration.register(deployment_for("v2")).await.unwrap();
        let calls = f.network.calls();

        let served = f.registration.fetch(&Request::new("POST", url("/api/posts"))).await.unwrap();
        assert_eq!(served.source, ResponseSource::Passthrough);
        assert_eq!(f.network.calls(), calls + 1);
    }

    #[tokio::test]
    async fn test_offline_navigation_after_install() {
        let f = fixture().await;
        f.registration.register(deployment_for("v2")).await.unwrap();
        f.network.set_offline(true);

        let served = f.registration.fetch(&Request::navigate(url("/posts/7"))).await.unwrap();
        assert_eq!(served.source, ResponseSource::OfflineDocument);
        assert_eq!(served.response.text(), "shell /");
    }

    #[tokio::test]
    async fn test_events_require_controller() {
        let f = fixture().await;
        assert!(matches!(f.registration.push(None).await, Err(Error::InvalidState(_))));
        assert!(matches!(f.registration.sync("blog-sync").await, Err(Error::InvalidState(_))));
        let outcome = f.registration.post_message(json!({ "type": "GET_CACHE_STATUS" }), None).await;
        assert!(matches!(outcome, Err(Error::InvalidState(_))));
    }

    #[tokio::test]
    async fn test_push_and_explore_click() {
        let f = fixture().await;
        f.registration.register(deployment_for("v2")).await.unwrap();

        let id = f.registration.push(Some("New post")).await.unwrap();
        let outcome = f.registration.notification_click(&id, "explore").await.unwrap();
        assert!(matches!(outcome, ClickOutcome::Opened { .. }));
        assert_eq!(f.host.match_all().await.len(), 1);
    }

    #[tokio::test]
    async fn test_register_against_http_origin() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("asset"))
            .mount(&server)
            .await;

        let config = AppConfig { origin: server.uri(), ..Default::default() };
        let origin = parse_origin(&config.origin).unwrap();
        let (host, _events) = InMemoryHost::new();
        let host = Arc::new(host);
        let ctx = WorkerContext {
            db: CacheDb::open_in_memory().await.unwrap(),
            network: Arc::new(FetchClient::new(FetchConfig::new(origin)).unwrap()),
            clients: host.clone(),
            notifier: host,
            connectivity: Connectivity::default(),
            outbox: Arc::new(EmptyOutbox),
        };
        let registration = Registration::new(ctx);

        let worker = registration.register(Deployment::from_config(&config).unwrap()).await.unwrap();
        assert_eq!(worker.state(), LifecycleState::Activated);

        let request = Request::get(Url::parse(&format!("{}/app.js", server.uri())).unwrap());
        let first = registration.fetch(&request).await.unwrap();
        worker.lifetime().idle().await;
        let second = registration.fetch(&request).await.unwrap();

        assert_eq!(first.source, ResponseSource::Network);
        assert_eq!(second.source, ResponseSource::Cache);
        assert_eq!(second.response.text(), "asset");
    }

    #[tokio::test]
    async fn test_retired_worker_cannot_revive_deleted_partition() {
        let f = fixture().await;
        let v1 = f.registration.register(deployment_for("v1")).await.unwrap();
        f.registration.register(deployment_for("v2")).await.unwrap();
        assert_eq!(sorted_partitions(&f.registration).await, vec!["blogsphere-static-v2"]);

        f.network.serve("/api/posts", 200, "[]");
        let outcome = v1.fetch(&Request::get(url("/api/posts"))).await.unwrap();
        v1.lifetime().idle().await;

        assert!(matches!(outcome, FetchOutcome::Respond(Served { source: ResponseSource::Network, .. })));
        assert_eq!(v1.state(), LifecycleState::Redundant);
        assert_eq!(sorted_partitions(&f.registration).await, vec!["blogsphere-static-v2"]);
    }

    #[tokio::test]
    async fn test_restart_offline_resumes_recorded_version() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.sqlite");
        {
            let first = restarted(&path).await;
            first.registration.register(deployment_for("v2")).await.unwrap();
        }

        let f = restarted(&path).await;
        f.network.set_offline(true);
        f.host.add_window("http://localhost:5173/").await;

        let worker = f.registration.register(deployment_for("v2")).await.unwrap();
        assert_eq!(worker.state(), LifecycleState::Activated);
        assert_eq!(f.registration.controller().await.unwrap().id(), worker.id());
        assert_eq!(f.network.calls(), 0);
        assert!(f.host.match_all().await.iter().all(|c| c.controller.as_deref() == Some(worker.id())));

        let served = f.registration.fetch(&Request::navigate(url("/posts/1"))).await.unwrap();
        assert_eq!(served.source, ResponseSource::OfflineDocument);
        assert_eq!(served.response.text(), "shell /");
    }

    #[tokio::test]
    async fn test_restart_with_new_version_keeps_restored_controller_on_failed_install() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.sqlite");
        {
            let first = restarted(&path).await;
            first.registration.register(deployment_for("v1")).await.unwrap();
        }

        let f = restarted(&path).await;
        f.network.set_offline(true);
        let result = f.registration.register(deployment_for("v2")).await;
        assert!(matches!(result, Err(Error::InstallFailed(_))));

        let controller = f.registration.controller().await.unwrap();
        assert_eq!(controller.deployment().version, "v1");
        assert!(f.registration.context().db.has_partition("blogsphere-static-v1").await.unwrap());
    }

    #[tokio::test]
    async fn test_restart_with_new_version_upgrades() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.sqlite");
        {
            let first = restarted(&path).await;
            first.registration.register(deployment_for("v1")).await.unwrap();
        }

        let f = restarted(&path).await;
        let v2 = f.registration.register(deployment_for("v2")).await.unwrap();

        assert_eq!(v2.state(), LifecycleState::Activated);
        assert_eq!(sorted_partitions(&f.registration).await, vec!["blogsphere-static-v2"]);
        let recorded = f.registration.context().db.activated_version("http://localhost:5173/").await.unwrap();
        assert_eq!(recorded.as_deref(), Some("v2"));
    }

    #[tokio::test]
    async fn test_restart_without_app_shell_installs_again() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.sqlite");
        {
            let first = restarted(&path).await;
            first.registration.register(deployment_for("v2")).await.unwrap();
            first.registration.context().db.delete_partition("blogsphere-static-v2").await.unwrap();
        }

        let f = restarted(&path).await;
        let worker = f.registration.register(deployment_for("v2")).await.unwrap();
        assert_eq!(worker.state(), LifecycleState::Activated);
        assert_eq!(f.network.calls(), 6);
    }
}
