//! The host surface a worker talks to: page contexts, alerts, connectivity.
//!
//! [`Clients`] and [`Notifier`] are the seams to the environment that owns
//! the page contexts. [`InMemoryHost`] implements both in-process and reports
//! every navigation intent and alert as a [`HostEvent`] on a channel, which
//! is how the foreground context observes them.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use blogsphere_core::Error;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio::sync::{RwLock, mpsc};
use url::Url;

use crate::notification::NotificationOptions;

/// Kind of page context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ClientKind {
    Window,
    Worker,
}

/// One open page context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ClientInfo {
    pub id: String,
    pub url: String,
    pub kind: ClientKind,
    pub focused: bool,
    /// Id of the worker controlling this context, if any.
    pub controller: Option<String>,
}

/// Something the host did on a worker's behalf.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum HostEvent {
    NotificationShown { id: String, title: String, options: NotificationOptions },
    NotificationClosed { id: String },
    WindowFocused { client_id: String, url: String },
    WindowOpened { client_id: String, url: String },
    ClientsClaimed { worker_id: String, count: usize },
}

/// Access to the page contexts of the origin.
#[async_trait]
pub trait Clients: Send + Sync {
    /// All window contexts.
    async fn match_all(&self) -> Vec<ClientInfo>;

    /// Bring a window to the foreground.
    async fn focus(&self, id: &str) -> Result<ClientInfo, Error>;

    /// Open a new window at `url`.
    async fn open_window(&self, url: &Url) -> Result<ClientInfo, Error>;

    /// Make `worker_id` the controller of every open context.
    /// Returns the number of contexts claimed.
    async fn claim(&self, worker_id: &str) -> Result<usize, Error>;
}

/// User-visible alert surface.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Display an alert; returns its id.
    async fn show(&self, title: &str, options: &NotificationOptions) -> Result<String, Error>;

    async fn close(&self, id: &str) -> Result<(), Error>;
}

/// Online/offline signal shared between the host and its workers.
#[derive(Debug, Clone)]
pub struct Connectivity {
    online: Arc<AtomicBool>,
}

impl Default for Connectivity {
    fn default() -> Self {
        Self { online: Arc::new(AtomicBool::new(true)) }
    }
}

impl Connectivity {
    pub fn new(online: bool) -> Self {
        Self { online: Arc::new(AtomicBool::new(online)) }
    }

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::Acquire)
    }

    pub fn set_online(&self, online: bool) {
        let was = self.online.swap(online, Ordering::AcqRel);
        if was != online {
            tracing::info!(online, "connectivity changed");
        }
    }
}

/// In-process host keeping page contexts and alerts in memory.
#[derive(Debug)]
pub struct InMemoryHost {
    clients: RwLock<Vec<ClientInfo>>,
    notifications: RwLock<HashMap<String, String>>,
    events: mpsc::UnboundedSender<HostEvent>,
    next_id: AtomicU64,
}

impl InMemoryHost {
    /// Create a host and the receiving end of its event stream.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<HostEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let host = Self {
            clients: RwLock::new(Vec::new()),
            notifications: RwLock::new(HashMap::new()),
            events,
            next_id: AtomicU64::new(1),
        };
        (host, rx)
    }

    fn next_id(&self, prefix: &str) -> String {
        format!("{prefix}-{}", self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    fn emit(&self, event: HostEvent) {
        if self.events.send(event).is_err() {
            tracing::debug!("host event dropped; no foreground listener");
        }
    }

    /// Register an already-open window, e.g. a tab the user navigated to.
    pub async fn add_window(&self, url: &str) -> ClientInfo {
        let client = ClientInfo {
            id: self.next_id("client"),
            url: url.to_string(),
            kind: ClientKind::Window,
            focused: false,
            controller: None,
        };
        self.clients.write().await.push(client.clone());
        client
    }

    /// Ids of alerts currently displayed.
    pub async fn open_notifications(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.notifications.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }
}

#[async_trait]
impl Clients for InMemoryHost {
    async fn match_all(&self) -> Vec<ClientInfo> {
        self.clients
            .read()
            .await
            .iter()
            .filter(|c| c.kind == ClientKind::Window)
            .cloned()
            .collect()
    }

    async fn focus(&self, id: &str) -> Result<ClientInfo, Error> {
        let mut clients = self.clients.write().await;
        if !clients.iter().any(|c| c.id == id) {
            return Err(Error::Host(format!("no such client: {id}")));
        }

        for client in clients.iter_mut() {
            client.focused = client.id == id;
        }
        let focused = clients
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .ok_or_else(|| Error::Host(format!("no such client: {id}")))?;
        drop(clients);

        self.emit(HostEvent::WindowFocused { client_id: focused.id.clone(), url: focused.url.clone() });
        Ok(focused)
    }

    async fn open_window(&self, url: &Url) -> Result<ClientInfo, Error> {
        let client = ClientInfo {
            id: self.next_id("client"),
            url: url.to_string(),
            kind: ClientKind::Window,
            focused: true,
            controller: None,
        };

        {
            let mut clients = self.clients.write().await;
            for other in clients.iter_mut() {
                other.focused = false;
            }
            clients.push(client.clone());
        }

        self.emit(HostEvent::WindowOpened { client_id: client.id.clone(), url: client.url.clone() });
        Ok(client)
    }

    async fn claim(&self, worker_id: &str) -> Result<usize, Error> {
        let count = {
            let mut clients = self.clients.write().await;
            for client in clients.iter_mut() {
                client.controller = Some(worker_id.to_string());
            }
            clients.len()
        };

        self.emit(HostEvent::ClientsClaimed { worker_id: worker_id.to_string(), count });
        Ok(count)
    }
}

#[async_trait]
impl Notifier for InMemoryHost {
    async fn show(&self, title: &str, options: &NotificationOptions) -> Result<String, Error> {
        let id = self.next_id("notification");
        self.notifications
            .write()
            .await
            .insert(id.clone(), title.to_string());

        self.emit(HostEvent::NotificationShown { id: id.clone(), title: title.to_string(), options: options.clone() });
        Ok(id)
    }

    async fn close(&self, id: &str) -> Result<(), Error> {
        if self.notifications.write().await.remove(id).is_some() {
            self.emit(HostEvent::NotificationClosed { id: id.to_string() });
        }
        Ok(())
    }
}
