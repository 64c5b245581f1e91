//! Install and activate transitions.
//!
//! Install seeds the static partition with the app shell in a single
//! transaction, so a failed install leaves no partial seed behind. Activate
//! drops every partition that does not belong to the current version and
//! takes control of the open page contexts.

use std::sync::Arc;

use blogsphere_core::{CacheableResponse, Error, Request, RequestIdentity};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;

use crate::state::LifecycleState;
use crate::worker::ServiceWorker;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ActivationReport {
    /// Stale partitions removed.
    pub deleted: Vec<String>,
    /// Stale partitions that could not be removed.
    pub failed: Vec<String>,
    /// Page contexts now controlled by this instance.
    pub claimed: usize,
}

impl ServiceWorker {
    /// Seed the app shell and move to `installed`.
    ///
    /// Any failed fetch or uncacheable response fails the whole install and
    /// makes this instance redundant.
    pub async fn install(&self) -> Result<(), Error> {
        let _guard = self.lifetime.guard();
        tracing::info!(worker = %self.id, version = %self.deployment.version, "installing");

        match self.seed_app_shell().await {
            Ok(count) => {
                self.transition(LifecycleState::Installed)?;
                tracing::info!(worker = %self.id, resources = count, "app shell cached");
                if self.deployment.skip_waiting_on_install {
                    self.request_skip_waiting();
                }
                Ok(())
            }
            Err(e) => {
                tracing::error!(worker = %self.id, error = %e, "install failed");
                self.set_redundant();
                Err(e)
            }
        }
    }

    async fn seed_app_shell(&self) -> Result<usize, Error> {
        let partition = self
            .db
            .open_partition(&self.deployment.partitions.static_name)
            .await?;

        let mut join_set = JoinSet::new();
        for (index, path) in self.deployment.app_shell.iter().enumerate() {
            let request = Request::get(self.deployment.url_for(path)?);
            let network = Arc::clone(&self.network);
            join_set.spawn(async move {
                let result = network.fetch(&request).await;
                (index, request, result)
            });
        }

        let mut seeded: Vec<Option<(RequestIdentity, CacheableResponse)>> = vec![None; self.deployment.app_shell.len()];
        while let Some(joined) = join_set.join_next().await {
            let (index, request, result) = joined.map_err(|e| Error::InstallFailed(format!("fetch task failed: {e}")))?;
            let response = result.map_err(|e| Error::InstallFailed(format!("{}: {e}", request.url)))?;
            let cacheable = CacheableResponse::try_from(response).map_err(|rejected| {
                Error::InstallFailed(format!(
                    "{}: status {} ({}) is not cacheable",
                    request.url, rejected.status, rejected.response_type
                ))
            })?;
            seeded[index] = Some((request.identity(), cacheable));
        }

        let entries: Vec<_> = seeded.into_iter().flatten().collect();
        let count = entries.len();
        partition
            .put_all(entries)
            .await
            .map_err(|e| Error::InstallFailed(format!("writing app shell: {e}")))?;
        Ok(count)
    }

    /// Drop stale partitions, claim page contexts and move to `activated`.
    pub async fn activate(&self) -> Result<ActivationReport, Error> {
        let _guard = self.lifetime.guard();
        self.transition(LifecycleState::Activating)?;

        let mut report = ActivationReport::default();
        for name in self.db.partition_names().await? {
            if self.deployment.partitions.is_current(&name) {
                continue;
            }
            match self.db.delete_partition(&name).await {
                Ok(_) => {
                    tracing::info!(partition = %name, "deleted stale partition");
                    report.deleted.push(name);
                }
                Err(e) => {
                    tracing::warn!(partition = %name, error = %e, "failed to delete stale partition");
                    report.failed.push(name);
                }
            }
        }

        report.claimed = match self.clients.claim(&self.id).await {
            Ok(count) => count,
            Err(e) => {
                tracing::warn!(worker = %self.id, error = %e, "failed to claim clients");
                0
            }
        };

        self.transition(LifecycleState::Activated)?;
        Ok(report)
    }
}
