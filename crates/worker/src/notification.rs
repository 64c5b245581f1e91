//! Push alerts and the navigation intent behind their actions.

use std::sync::Arc;

use blogsphere_client::origin_root;
use blogsphere_core::Error;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::host::{ClientInfo, Clients, Notifier};

pub const DEFAULT_BODY: &str = "New blog post available!";
pub const NOTIFICATION_ICON: &str = "/icon-192.png";
pub const NOTIFICATION_TAG: &str = "blog-notification";
pub const VIBRATE_PATTERN: [u32; 3] = [100, 50, 100];

/// Action id that routes the user back into the app.
pub const ACTION_EXPLORE: &str = "explore";
pub const ACTION_CLOSE: &str = "close";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct NotificationAction {
    pub action: String,
    pub title: String,
    pub icon: String,
}

/// Opaque payload attached to an alert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct NotificationData {
    /// Milliseconds since the Unix epoch.
    pub date_of_arrival: i64,
    pub primary_key: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct NotificationOptions {
    pub body: String,
    pub icon: String,
    pub badge: String,
    pub vibrate: Vec<u32>,
    pub require_interaction: bool,
    pub tag: String,
    pub data: NotificationData,
    pub actions: Vec<NotificationAction>,
}

impl NotificationOptions {
    /// Options for a push alert. An absent or blank payload gets the default body.
    pub fn for_push(payload: Option<&str>) -> Self {
        let body = payload
            .filter(|p| !p.trim().is_empty())
            .unwrap_or(DEFAULT_BODY)
            .to_string();

        Self {
            body,
            icon: NOTIFICATION_ICON.into(),
            badge: NOTIFICATION_ICON.into(),
            vibrate: VIBRATE_PATTERN.to_vec(),
            require_interaction: true,
            tag: NOTIFICATION_TAG.into(),
            data: NotificationData { date_of_arrival: chrono::Utc::now().timestamp_millis(), primary_key: 1 },
            actions: vec![
                NotificationAction { action: ACTION_EXPLORE.into(), title: "Read Now".into(), icon: NOTIFICATION_ICON.into() },
                NotificationAction { action: ACTION_CLOSE.into(), title: "Close".into(), icon: NOTIFICATION_ICON.into() },
            ],
        }
    }
}

/// What a notification click led to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ClickOutcome {
    /// An existing window at the origin root was brought forward.
    Focused { client: ClientInfo },
    /// No such window existed, so one was opened at `/`.
    Opened { client: ClientInfo },
    /// The alert was closed and nothing else happened.
    Dismissed,
}

/// Shows alerts and routes their actions back to a page context.
pub struct NotificationDispatcher {
    title: String,
    origin: Url,
    notifier: Arc<dyn Notifier>,
    clients: Arc<dyn Clients>,
}

impl NotificationDispatcher {
    pub fn new(title: String, origin: Url, notifier: Arc<dyn Notifier>, clients: Arc<dyn Clients>) -> Self {
        Self { title, origin, notifier, clients }
    }

    /// Display the alert for a push message; returns the alert id.
    pub async fn show_push(&self, payload: Option<&str>) -> Result<String, Error> {
        let options = NotificationOptions::for_push(payload);
        let id = self.notifier.show(&self.title, &options).await?;
        tracing::info!(notification = %id, body = %options.body, "push notification shown");
        Ok(id)
    }

    /// Handle a click on alert `id`. `action` is empty when the body itself was clicked.
    pub async fn handle_click(&self, id: &str, action: &str) -> Result<ClickOutcome, Error> {
        self.notifier.close(id).await?;

        if action != ACTION_EXPLORE {
            tracing::debug!(notification = %id, action, "notification dismissed");
            return Ok(ClickOutcome::Dismissed);
        }

        let root = origin_root(&self.origin);
        let existing = self
            .clients
            .match_all()
            .await
            .into_iter()
            .find(|c| c.url == root);

        if let Some(client) = existing {
            let client = self.clients.focus(&client.id).await?;
            tracing::info!(client = %client.id, "focused existing window");
            return Ok(ClickOutcome::Focused { client });
        }

        let url = self
            .origin
            .join("/")
            .map_err(|e| Error::InvalidUrl(e.to_string()))?;
        let client = self.clients.open_window(&url).await?;
        tracing::info!(client = %client.id, url = %client.url, "opened window");
        Ok(ClickOutcome::Opened { client })
    }
}
