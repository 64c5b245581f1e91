//! Background sync: replay of actions recorded while offline.

use std::sync::Arc;

use async_trait::async_trait;
use blogsphere_core::Error;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub const BLOG_SYNC_TAG: &str = "blog-sync";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SyncReport {
    pub tag: String,
    pub replayed: usize,
}

/// Source of post actions queued while offline.
#[async_trait]
pub trait Outbox: Send + Sync {
    /// Replay queued actions; returns how many were sent.
    async fn replay(&self) -> Result<usize, Error>;
}

/// Outbox with nothing in it.
///
/// The foreground app does not queue offline posts yet, so there is no
/// record format to read.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyOutbox;

#[async_trait]
impl Outbox for EmptyOutbox {
    async fn replay(&self) -> Result<usize, Error> {
        Ok(0)
    }
}

pub struct BackgroundSync {
    outbox: Arc<dyn Outbox>,
}

impl BackgroundSync {
    pub fn new(outbox: Arc<dyn Outbox>) -> Self {
        Self { outbox }
    }

    /// Run the hook registered for `tag`. Unknown tags yield `None`.
    pub async fn handle(&self, tag: &str) -> Result<Option<SyncReport>, Error> {
        if tag != BLOG_SYNC_TAG {
            tracing::debug!(tag, "ignoring sync for unknown tag");
            return Ok(None);
        }

        let replayed = self.outbox.replay().await?;
        tracing::info!(tag, replayed, "background sync finished");
        Ok(Some(SyncReport { tag: tag.to_string(), replayed }))
    }
}
