//! MCP server handler implementation.
//!
//! Each tool delivers one host event to the worker registration.
use std::sync::Arc;

use crate::tools::{
    HostBridge, SwConnectivityParams, SwFetchParams, SwMessageParams, SwNotificationClickParams, SwPushParams,
    SwSyncParams, connectivity_impl, fetch_impl, message_impl, notification_click_impl, push_impl, status_impl,
    sync_impl,
};

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};

/// The MCP host for the BlogSphere offline worker.
#[derive(Clone)]
pub struct BlogSphereServer {
    bridge: Arc<HostBridge>,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl BlogSphereServer {
    pub fn new(bridge: Arc<HostBridge>) -> Self {
        Self { bridge, tool_router: Self::tool_router() }
    }

    #[tool(
        description = "Route a page request through the worker. Returns the response, where it came from (cache, network, offline fallback or passthrough) and any host events."
    )]
    async fn sw_fetch(&self, params: Parameters<SwFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.bridge, params.0).await
    }

    #[tool(description = "Deliver a push message. Shows the BlogSphere alert and returns its id.")]
    async fn sw_push(&self, params: Parameters<SwPushParams>) -> Result<CallToolResult, McpError> {
        push_impl(&self.bridge, params.0).await
    }

    #[tool(
        description = "Click an alert. `explore` focuses the window at the origin root or opens one; other actions only dismiss."
    )]
    async fn sw_notification_click(
        &self, params: Parameters<SwNotificationClickParams>,
    ) -> Result<CallToolResult, McpError> {
        notification_click_impl(&self.bridge, params.0).await
    }

    #[tool(description = "Fire a background sync event. Only the `blog-sync` tag is handled.")]
    async fn sw_sync(&self, params: Parameters<SwSyncParams>) -> Result<CallToolResult, McpError> {
        sync_impl(&self.bridge, params.0).await
    }

    #[tool(description = "Post a foreground message (SKIP_WAITING or GET_CACHE_STATUS) and return the reply.")]
    async fn sw_message(&self, params: Parameters<SwMessageParams>) -> Result<CallToolResult, McpError> {
        message_impl(&self.bridge, params.0).await
    }

    #[tool(description = "Set the online/offline signal reported in CACHE_STATUS.")]
    async fn sw_connectivity(&self, params: Parameters<SwConnectivityParams>) -> Result<CallToolResult, McpError> {
        connectivity_impl(&self.bridge, params.0).await
    }

    #[tool(description = "Show the active and waiting worker versions and the live cache partitions.")]
    async fn sw_status(&self) -> Result<CallToolResult, McpError> {
        status_impl(&self.bridge).await
    }
}

impl ServerHandler for BlogSphereServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "blogsphere-sw".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}
