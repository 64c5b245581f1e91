//! sw_sync tool implementation.

use blogsphere_worker::SyncReport;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{HostBridge, json_result};

/// Parameters for the sw_sync tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwSyncParams {
    /// Sync tag; only `blog-sync` has a handler.
    pub tag: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwSyncOutput {
    /// False when no handler is registered for the tag.
    pub handled: bool,
    pub report: Option<SyncReport>,
}

pub async fn sync_impl(bridge: &HostBridge, params: SwSyncParams) -> Result<CallToolResult, McpError> {
    let report = bridge.registration.sync(params.tag.trim()).await?;
    json_result(&SwSyncOutput { handled: report.is_some(), report })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::{bridge_for, origin_server, output};

    #[tokio::test]
    async fn test_blog_sync() {
        let server = origin_server("x").await;
        let bridge = bridge_for(&server).await;

        let out = output(sync_impl(&bridge, SwSyncParams { tag: "blog-sync".into() }).await.unwrap());
        assert_eq!(out["handled"], true);
        assert_eq!(out["report"]["replayed"], 0);
    }

    #[tokio::test]
    async fn test_unknown_tag() {
        let server = origin_server("x").await;
        let bridge = bridge_for(&server).await;

        let out = output(sync_impl(&bridge, SwSyncParams { tag: "images".into() }).await.unwrap());
        assert_eq!(out["handled"], false);
        assert!(out["report"].is_null());
    }
}
