//! sw_message tool implementation.
//!
//! Posts a foreground message and returns the single reply, if any.

use blogsphere_worker::{HostEvent, MessageOutcome, Reply};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::oneshot;

use super::{HostBridge, json_result};

/// Parameters for the sw_message tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwMessageParams {
    /// Message object, e.g. `{"type": "GET_CACHE_STATUS"}` or `{"type": "SKIP_WAITING"}`.
    pub data: Value,

    /// Whether to supply a reply port (default: true).
    #[serde(default = "default_true")]
    pub expect_reply: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwMessageOutput {
    pub outcome: MessageOutcome,
    pub reply: Option<Reply>,
    pub events: Vec<HostEvent>,
}

pub async fn message_impl(bridge: &HostBridge, params: SwMessageParams) -> Result<CallToolResult, McpError> {
    let (port, mut rx) = if params.expect_reply {
        let (tx, rx) = oneshot::channel();
        (Some(tx), Some(rx))
    } else {
        (None, None)
    };

    let outcome = bridge.registration.post_message(params.data, port).await?;
    let reply = rx.as_mut().and_then(|rx| rx.try_recv().ok());

    json_result(&SwMessageOutput { outcome, reply, events: bridge.drain_events().await })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::{bridge_for, origin_server, output};
    use serde_json::json;

    #[tokio::test]
    async fn test_cache_status_reply() {
        let server = origin_server("x").await;
        let bridge = bridge_for(&server).await;

        let params = SwMessageParams { data: json!({ "type": "GET_CACHE_STATUS" }), expect_reply: true };
        let out = output(message_impl(&bridge, params).await.unwrap());
        assert_eq!(out["outcome"], "replied");
        assert_eq!(out["reply"]["type"], "CACHE_STATUS");
        assert_eq!(out["reply"]["partitions"], json!(["blogsphere-static-v2"]));
        assert_eq!(out["reply"]["online"], true);
    }

    #[tokio::test]
    async fn test_unknown_message_ignored() {
        let server = origin_server("x").await;
        let bridge = bridge_for(&server).await;

        let params = SwMessageParams { data: json!({ "type": "CLEAR_ALL" }), expect_reply: true };
        let out = output(message_impl(&bridge, params).await.unwrap());
        assert_eq!(out["outcome"], "ignored");
        assert!(out["reply"].is_null());
    }

    #[tokio::test]
    async fn test_skip_waiting_without_waiting_worker() {
        let server = origin_server("x").await;
        let bridge = bridge_for(&server).await;

        let params = SwMessageParams { data: json!({ "type": "SKIP_WAITING" }), expect_reply: false };
        let out = output(message_impl(&bridge, params).await.unwrap());
        assert_eq!(out["outcome"], "skip_waiting");
        assert!(bridge.registration.controller().await.is_some());
    }
}
