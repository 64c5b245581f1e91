//! sw_connectivity tool implementation.
//!
//! Updates the online signal reported by `GET_CACHE_STATUS`. The network
//! client itself is not affected; real outages surface as fetch failures.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{HostBridge, json_result};

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwConnectivityParams {
    pub online: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwConnectivityOutput {
    pub online: bool,
    pub changed: bool,
}

pub async fn connectivity_impl(bridge: &HostBridge, params: SwConnectivityParams) -> Result<CallToolResult, McpError> {
    let connectivity = &bridge.registration.context().connectivity;
    let changed = connectivity.is_online() != params.online;
    connectivity.set_online(params.online);
    json_result(&SwConnectivityOutput { online: connectivity.is_online(), changed })
}
