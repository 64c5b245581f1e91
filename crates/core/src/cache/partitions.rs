//! Partition lifecycle and entry operations.
//!
//! Partitions are created lazily by [`CacheDb::open_partition`] and only ever
//! removed wholesale by [`CacheDb::delete_partition`]; entries have no
//! expiry of their own. Deleting a partition cascades to its entries, and a
//! write into a partition that no longer exists fails instead of silently
//! resurrecting it.

use super::connection::CacheDb;
use super::request::RequestIdentity;
use super::response::{CacheableResponse, CapturedResponse, ResponseType};
use crate::Error;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

const SELECT_ENTRY: &str = "SELECT e.status, e.status_text, e.response_type, e.headers_json, e.body FROM entries e";

/// Handle to one named partition of the store.
#[derive(Clone, Debug)]
pub struct Partition {
    db: CacheDb,
    name: String,
}

impl CacheDb {
    /// Open a partition, creating it if absent.
    pub async fn open_partition(&self, name: &str) -> Result<Partition, Error> {
        let owned = name.to_string();
        let created_at = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT OR IGNORE INTO partitions (name, created_at) VALUES (?1, ?2)",
                    params![owned, created_at],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)?;

        Ok(Partition { db: self.clone(), name: name.to_string() })
    }

    /// Check whether a partition exists without creating it.
    pub async fn has_partition(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let exists = conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM partitions WHERE name = ?1)",
                    params![name],
                    |row| row.get(0),
                )?;
                Ok(exists)
            })
            .await
            .map_err(Error::from)
    }

    /// Names of all partitions, in creation order.
    pub async fn partition_names(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM partitions ORDER BY rowid")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a partition and every entry in it.
    ///
    /// Returns false if no such partition existed.
    pub async fn delete_partition(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted = conn.execute("DELETE FROM partitions WHERE name = ?1", params![name])?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Look a request up across all partitions.
    ///
    /// The first match in partition creation order wins. Callers should treat
    /// the order as a warmth hint only.
    pub async fn match_request(&self, identity: &RequestIdentity) -> Result<Option<CapturedResponse>, Error> {
        let key = identity.key();
        self.conn
            .call(move |conn| -> Result<Option<CapturedResponse>, Error> {
                let sql = format!(
                    "{SELECT_ENTRY} JOIN partitions p ON p.name = e.partition
                     WHERE e.key = ?1 ORDER BY p.rowid LIMIT 1"
                );
                query_entry(conn, &sql, params![key])
            })
            .await
            .map_err(Error::from)
    }
}

impl Partition {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Store a response, replacing any existing entry for the same identity.
    pub async fn put(&self, identity: &RequestIdentity, response: &CacheableResponse) -> Result<(), Error> {
        self.put_all(vec![(identity.clone(), response.clone())]).await
    }

    /// Store several responses in one transaction: all of them or none.
    pub async fn put_all(&self, entries: Vec<(RequestIdentity, CacheableResponse)>) -> Result<(), Error> {
        let partition = self.name.clone();
        self.db
            .conn
            .call(move |conn| -> Result<(), Error> {
                let stored_at = chrono::Utc::now().to_rfc3339();
                let tx = conn.transaction()?;
                for (identity, response) in &entries {
                    insert_entry(&tx, &partition, identity, response.response(), &stored_at)?;
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Look a request up in this partition only.
    pub async fn match_request(&self, identity: &RequestIdentity) -> Result<Option<CapturedResponse>, Error> {
        let partition = self.name.clone();
        let key = identity.key();
        self.db
            .conn
            .call(move |conn| -> Result<Option<CapturedResponse>, Error> {
                let sql = format!("{SELECT_ENTRY} WHERE e.partition = ?1 AND e.key = ?2");
                query_entry(conn, &sql, params![partition, key])
            })
            .await
            .map_err(Error::from)
    }

    /// Identities stored in this partition, oldest write first.
    pub async fn keys(&self) -> Result<Vec<RequestIdentity>, Error> {
        let partition = self.name.clone();
        self.db
            .conn
            .call(move |conn| -> Result<Vec<RequestIdentity>, Error> {
                let mut stmt =
                    conn.prepare("SELECT method, url FROM entries WHERE partition = ?1 ORDER BY stored_at, rowid")?;
                let rows = stmt
                    .query_map(params![partition], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
                    .collect::<Result<Vec<_>, _>>()?;
                rows.into_iter()
                    .map(|(method, url)| {
                        let url = url::Url::parse(&url).map_err(|e| Error::CorruptEntry(e.to_string()))?;
                        Ok(super::Request::new(&method, url).identity())
                    })
                    .collect()
            })
            .await
            .map_err(Error::from)
    }
}

fn insert_entry(
    conn: &rusqlite::Connection, partition: &str, identity: &RequestIdentity, response: &CapturedResponse,
    stored_at: &str,
) -> Result<(), Error> {
    let headers_json = serde_json::to_string(&response.headers).map_err(|e| Error::InvalidInput(e.to_string()))?;
    conn.execute(
        "INSERT INTO entries (
            partition, key, method, url, status, status_text, response_type, headers_json, body, stored_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        ON CONFLICT(partition, key) DO UPDATE SET
            status = excluded.status,
            status_text = excluded.status_text,
            response_type = excluded.response_type,
            headers_json = excluded.headers_json,
            body = excluded.body,
            stored_at = excluded.stored_at",
        params![
            partition,
            identity.key(),
            identity.method(),
            identity.url(),
            response.status,
            &response.status_text,
            response.response_type.as_str(),
            headers_json,
            response.body.as_ref(),
            stored_at,
        ],
    )?;
    Ok(())
}

fn query_entry(
    conn: &rusqlite::Connection, sql: &str, args: impl rusqlite::Params,
) -> Result<Option<CapturedResponse>, Error> {
    let row = conn.query_row(sql, args, |row| {
        Ok((
            row.get::<_, u16>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, Vec<u8>>(4)?,
        ))
    });

    let (status, status_text, response_type, headers_json, body) = match row {
        Ok(r) => r,
        Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let headers: Vec<(String, String)> =
        serde_json::from_str(&headers_json).map_err(|e| Error::CorruptEntry(e.to_string()))?;

    Ok(Some(CapturedResponse {
        status,
        status_text,
        response_type: response_type.parse::<ResponseType>()?,
        headers,
        body: body.into(),
    }))
}
