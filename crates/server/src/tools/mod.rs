//! MCP tool implementations.
//!
//! Each tool delivers one host event to the registration and reports the
//! host events (alerts, window focus/open, claims) it caused.

pub mod connectivity;
pub mod fetch;
pub mod message;
pub mod push;
pub mod status;
pub mod sync;

use std::sync::Arc;

use blogsphere_core::Error;
use blogsphere_worker::{HostEvent, InMemoryHost, Registration};
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use serde::Serialize;
use tokio::sync::{Mutex, mpsc};
use url::Url;

pub use connectivity::{SwConnectivityParams, connectivity_impl};
pub use fetch::{SwFetchParams, fetch_impl};
pub use message::{SwMessageParams, message_impl};
pub use push::{SwNotificationClickParams, SwPushParams, notification_click_impl, push_impl};
pub use status::status_impl;
pub use sync::{SwSyncParams, sync_impl};

/// Everything a tool needs: the registration and the host it drives.
pub struct HostBridge {
    pub registration: Arc<Registration>,
    pub host: Arc<InMemoryHost>,
    pub origin: Url,
    events: Mutex<mpsc::UnboundedReceiver<HostEvent>>,
}

impl HostBridge {
    pub fn new(
        registration: Arc<Registration>, host: Arc<InMemoryHost>, origin: Url,
        events: mpsc::UnboundedReceiver<HostEvent>,
    ) -> Self {
        Self { registration, host, origin, events: Mutex::new(events) }
    }

    /// Host events emitted since the last call.
    pub async fn drain_events(&self) -> Vec<HostEvent> {
        let mut events = self.events.lock().await;
        let mut drained = Vec::new();
        while let Ok(event) = events.try_recv() {
            drained.push(event);
        }
        drained
    }
}

/// Serialize a tool output as pretty JSON text content.
pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}
