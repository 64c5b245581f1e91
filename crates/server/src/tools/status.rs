//! sw_status tool implementation.
//!
//! Reports the registration's active and waiting instances, the live
//! partitions and the open windows. Read-only.

use std::sync::Arc;

use blogsphere_worker::{ClientInfo, Clients, LifecycleState, ServiceWorker};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{HostBridge, json_result};

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerStatus {
    pub id: String,
    pub version: String,
    pub state: LifecycleState,
    pub pending: usize,
}

impl From<&Arc<ServiceWorker>> for WorkerStatus {
    fn from(worker: &Arc<ServiceWorker>) -> Self {
        Self {
            id: worker.id().to_string(),
            version: worker.deployment().version.clone(),
            state: worker.state(),
            pending: worker.lifetime().pending(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwStatusOutput {
    pub active: Option<WorkerStatus>,
    pub waiting: Option<WorkerStatus>,
    pub partitions: Vec<String>,
    pub online: bool,
    /// Open windows and the worker controlling each.
    pub clients: Vec<ClientInfo>,
}

pub async fn status_impl(bridge: &HostBridge) -> Result<CallToolResult, McpError> {
    let registration = &bridge.registration;
    let ctx = registration.context();

    let output = SwStatusOutput {
        active: registration.active().await.as_ref().map(WorkerStatus::from),
        waiting: registration.waiting().await.as_ref().map(WorkerStatus::from),
        partitions: ctx.db.partition_names().await?,
        online: ctx.connectivity.is_online(),
        clients: bridge.host.match_all().await,
    };
    json_result(&output)
}
