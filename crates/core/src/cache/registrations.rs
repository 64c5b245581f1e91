//! Which deployment version controls an origin, kept across restarts.
//!
//! A row is written when a version finishes activating. On the next start
//! the host can hand control straight back to that version instead of
//! fetching its app shell again.

use super::connection::CacheDb;
use crate::Error;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite::OptionalExtension;

impl CacheDb {
    /// Record `version` as the activated version for `scope`.
    pub async fn record_activation(&self, scope: &str, version: &str) -> Result<(), Error> {
        let scope = scope.to_string();
        let version = version.to_string();
        let activated_at = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO registrations (scope, version, activated_at) VALUES (?1, ?2, ?3)
                     ON CONFLICT(scope) DO UPDATE SET
                        version = excluded.version,
                        activated_at = excluded.activated_at",
                    params![scope, version, activated_at],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// The version last recorded as activated for `scope`.
    pub async fn activated_version(&self, scope: &str) -> Result<Option<String>, Error> {
        let scope = scope.to_string();
        self.conn
            .call(move |conn| -> Result<Option<String>, Error> {
                let version = conn
                    .query_row("SELECT version FROM registrations WHERE scope = ?1", params![scope], |row| row.get(0))
                    .optional()?;
                Ok(version)
            })
            .await
            .map_err(Error::from)
    }
}
