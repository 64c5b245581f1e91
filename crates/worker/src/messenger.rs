//! One-shot message protocol with the foreground context.
//!
//! Incoming messages are JSON objects tagged by `type`. Anything that does
//! not parse as a known message is ignored without a reply.

use blogsphere_core::{CacheDb, Error};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::oneshot;

use crate::host::Connectivity;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Message {
    /// Activate a waiting instance now. No reply.
    SkipWaiting,
    /// Ask for the live partition names and the connectivity signal.
    GetCacheStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Reply {
    CacheStatus { partitions: Vec<String>, online: bool },
}

/// Caller-supplied channel for the single reply.
pub type ReplyPort = oneshot::Sender<Reply>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum MessageOutcome {
    /// The caller asked for activation; the registration acts on it.
    SkipWaiting,
    Replied,
    Ignored,
}

pub struct Messenger {
    db: CacheDb,
    connectivity: Connectivity,
}

impl Messenger {
    pub fn new(db: CacheDb, connectivity: Connectivity) -> Self {
        Self { db, connectivity }
    }

    pub async fn handle(&self, data: Value, reply: Option<ReplyPort>) -> Result<MessageOutcome, Error> {
        let message = match serde_json::from_value::<Message>(data) {
            Ok(message) => message,
            Err(e) => {
                tracing::debug!(error = %e, "ignoring unrecognized message");
                return Ok(MessageOutcome::Ignored);
            }
        };

        match message {
            Message::SkipWaiting => Ok(MessageOutcome::SkipWaiting),
            Message::GetCacheStatus => {
                let Some(port) = reply else {
                    tracing::debug!("GET_CACHE_STATUS without a reply port");
                    return Ok(MessageOutcome::Ignored);
                };

                let status = self.cache_status().await?;
                if port.send(status).is_err() {
                    tracing::debug!("reply port closed before CACHE_STATUS was sent");
                }
                Ok(MessageOutcome::Replied)
            }
        }
    }

    pub async fn cache_status(&self) -> Result<Reply, Error> {
        let partitions = self.db.partition_names().await?;
        Ok(Reply::CacheStatus { partitions, online: self.connectivity.is_online() })
    }
}
