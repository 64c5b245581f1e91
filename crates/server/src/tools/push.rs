//! sw_push and sw_notification_click tool implementations.

use blogsphere_worker::{ClickOutcome, HostEvent};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{HostBridge, json_result};

/// Parameters for the sw_push tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct SwPushParams {
    /// Push payload text; the alert body. Omit for the default body.
    #[serde(default)]
    pub payload: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwPushOutput {
    pub notification_id: String,
    pub events: Vec<HostEvent>,
}

/// Parameters for the sw_notification_click tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwNotificationClickParams {
    /// Id returned by sw_push.
    pub notification_id: String,

    /// Action id: `explore`, `close`, or empty for a click on the alert body.
    #[serde(default)]
    pub action: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwNotificationClickOutput {
    pub outcome: ClickOutcome,
    pub events: Vec<HostEvent>,
}

pub async fn push_impl(bridge: &HostBridge, params: SwPushParams) -> Result<CallToolResult, McpError> {
    let notification_id = bridge.registration.push(params.payload.as_deref()).await?;
    json_result(&SwPushOutput { notification_id, events: bridge.drain_events().await })
}

pub async fn notification_click_impl(
    bridge: &HostBridge, params: SwNotificationClickParams,
) -> Result<CallToolResult, McpError> {
    let outcome = bridge
        .registration
        .notification_click(&params.notification_id, &params.action)
        .await?;
    json_result(&SwNotificationClickOutput { outcome, events: bridge.drain_events().await })
}
