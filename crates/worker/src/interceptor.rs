//! Cache-first fetch interception with network fallback.
//!
//! ### Flow
//! 1. Non-GET or non-HTTP(S) requests are not intercepted at all.
//! 2. A cached response for the request identity is returned as-is.
//! 3. On a miss the network is asked; a cacheable answer is copied into the
//!    partition chosen by [`select_partition`] in the background. A retired
//!    instance still answers but no longer writes, so it cannot bring back a
//!    partition its successor deleted.
//! 4. When the network fails, navigations fall back to the cached app shell
//!    and everything else gets a synthesized `503`.

use std::sync::Arc;

use blogsphere_client::Network;
use blogsphere_core::{CacheDb, CacheableResponse, CapturedResponse, Error, Request, RequestIdentity, ResponseType};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::deployment::Deployment;
use crate::lifetime::Lifetime;
use crate::policy::select_partition;
use crate::state::LifecycleState;

/// App-shell documents tried, in order, for an offline navigation.
pub const OFFLINE_DOCUMENTS: [&str; 2] = ["/", "/index.html"];

pub const OFFLINE_BODY: &str = "Offline - Content not available";

/// Where a served response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ResponseSource {
    Cache,
    Network,
    /// Cached app-shell document served for a navigation while offline.
    OfflineDocument,
    /// Synthesized `503` for a subresource while offline.
    OfflineFallback,
    /// Performed by the host without interception.
    Passthrough,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Served {
    pub response: CapturedResponse,
    pub source: ResponseSource,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The request is not ours; the host performs it unmodified.
    Bypass,
    Respond(Served),
}

/// The synthesized response for an uncached subresource while offline.
pub fn offline_response() -> CapturedResponse {
    CapturedResponse::new(503, ResponseType::Default, OFFLINE_BODY)
        .with_status_text("Service Unavailable")
        .with_header("Content-Type", "text/plain")
}

pub struct FetchInterceptor {
    db: CacheDb,
    network: Arc<dyn Network>,
    deployment: Arc<Deployment>,
    lifetime: Lifetime,
    state: watch::Receiver<LifecycleState>,
}

impl FetchInterceptor {
    pub fn new(
        db: CacheDb, network: Arc<dyn Network>, deployment: Arc<Deployment>, lifetime: Lifetime,
        state: watch::Receiver<LifecycleState>,
    ) -> Self {
        Self { db, network, deployment, lifetime, state }
    }

    /// Handle one outbound request.
    ///
    /// Returns an error only for a navigation that failed on the network
    /// with no cached app shell to fall back to.
    pub async fn handle(&self, request: &Request) -> Result<FetchOutcome, Error> {
        if !request.is_get() || !request.is_http() {
            tracing::trace!(method = %request.method, url = %request.url, "bypassing request");
            return Ok(FetchOutcome::Bypass);
        }

        let identity = request.identity();
        match self.db.match_request(&identity).await {
            Ok(Some(response)) => {
                tracing::debug!(url = %request.url, "cache hit");
                return Ok(FetchOutcome::Respond(Served { response, source: ResponseSource::Cache }));
            }
            Ok(None) => tracing::debug!(url = %request.url, "cache miss"),
            Err(e) => tracing::warn!(url = %request.url, error = %e, "cache lookup failed; treating as miss"),
        }

        match self.network.fetch(request).await {
            Ok(response) => {
                self.store_copy(request, identity, &response);
                Ok(FetchOutcome::Respond(Served { response, source: ResponseSource::Network }))
            }
            Err(e) => {
                tracing::warn!(url = %request.url, error = %e, "network fetch failed");
                self.offline_fallback(request, e).await
            }
        }
    }

    /// Persist a copy of a cacheable response as tracked background work.
    fn store_copy(&self, request: &Request, identity: RequestIdentity, response: &CapturedResponse) {
        let Ok(cacheable) = CacheableResponse::try_from(response.clone()) else {
            tracing::debug!(url = %request.url, status = response.status, kind = %response.response_type, "not cacheable");
            return;
        };

        let role = select_partition(&request.url, &self.deployment);
        let name = self.deployment.partitions.name(role).to_string();
        let db = self.db.clone();
        let state = self.state.clone();

        self.lifetime.wait_until(async move {
            let retired = *state.borrow() == LifecycleState::Redundant;
            if retired {
                tracing::debug!(partition = %name, url = identity.url(), "worker is redundant; response not cached");
                return;
            }

            let stored = async {
                let partition = db.open_partition(&name).await?;
                partition.put(&identity, &cacheable).await
            };
            match stored.await {
                Ok(()) => tracing::debug!(partition = %name, url = identity.url(), "response cached"),
                Err(e) => tracing::warn!(partition = %name, url = identity.url(), error = %e, "failed to cache response"),
            }
        });
    }

    async fn offline_fallback(&self, request: &Request, error: Error) -> Result<FetchOutcome, Error> {
        if !request.is_navigation() {
            return Ok(FetchOutcome::Respond(Served {
                response: offline_response(),
                source: ResponseSource::OfflineFallback,
            }));
        }

        for path in OFFLINE_DOCUMENTS {
            let url = self.deployment.url_for(path)?;
            match self.db.match_request(&RequestIdentity::get(&url)).await {
                Ok(Some(response)) => {
                    tracing::info!(url = %request.url, fallback = path, "serving cached app shell offline");
                    return Ok(FetchOutcome::Respond(Served { response, source: ResponseSource::OfflineDocument }));
                }
                Ok(None) => {}
                Err(e) => tracing::warn!(fallback = path, error = %e, "app shell lookup failed"),
            }
        }

        Err(error)
    }
}
