//! Test doubles shared by the worker's unit tests.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use blogsphere_client::Network;
use blogsphere_core::{AppConfig, CapturedResponse, Error, Request, ResponseType};

use crate::deployment::Deployment;

pub(crate) const ORIGIN: &str = "http://localhost:5173";

/// Scripted network that counts every call.
#[derive(Debug, Default)]
pub(crate) struct FakeNetwork {
    routes: Mutex<HashMap<String, CapturedResponse>>,
    calls: AtomicUsize,
    offline: AtomicBool,
}

impl FakeNetwork {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Network that serves every default app-shell path with a 200 basic body.
    pub(crate) fn with_app_shell() -> Self {
        let network = Self::new();
        for path in blogsphere_core::config::DEFAULT_APP_SHELL {
            network.serve(path, 200, &format!("shell {path}"));
        }
        network
    }

    pub(crate) fn serve(&self, path: &str, status: u16, body: &str) {
        let response = CapturedResponse::new(status, ResponseType::Basic, body.to_string())
            .with_header("content-type", "text/plain");
        self.respond(path, response);
    }

    pub(crate) fn respond(&self, path: &str, response: CapturedResponse) {
        let url = if path.starts_with('/') { format!("{ORIGIN}{path}") } else { path.to_string() };
        self.routes.lock().unwrap().insert(url, response);
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }
}

#[async_trait]
impl Network for FakeNetwork {
    async fn fetch(&self, request: &Request) -> Result<CapturedResponse, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.offline.load(Ordering::SeqCst) {
            return Err(Error::Network(format!("{}: connection refused", request.url)));
        }

        let found = self.routes.lock().unwrap().get(request.url.as_str()).cloned();
        Ok(found.unwrap_or_else(|| CapturedResponse::new(404, ResponseType::Basic, "Not Found").with_status_text("Not Found")))
    }
}

pub(crate) fn deployment() -> Deployment {
    Deployment::from_config(&AppConfig::default()).unwrap()
}

pub(crate) fn deployment_for(version: &str) -> Deployment {
    let config = AppConfig { cache_version: version.to_string(), ..Default::default() };
    Deployment::from_config(&config).unwrap()
}

/// Run raw SQL against a file-backed store through a second connection.
pub(crate) fn execute_sql(path: &Path, sql: &str) {
    let conn = tokio_rusqlite::rusqlite::Connection::open(path).unwrap();
    conn.execute_batch(sql).unwrap();
}
