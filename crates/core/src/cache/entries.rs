//! Captured responses inside a store.
//!
//! Writes are last-write-wins upserts keyed by request identity, so
//! overlapping handlers writing the same request never create duplicates.

use super::connection::CacheDb;
use super::hash::compute_request_key;
use crate::Error;
use chrono::SecondsFormat;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// A response captured in a store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct StoredResponse {
    pub method: String,
    pub url: String,
    pub status: u16,
    /// Header name/value pairs in arrival order.
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    pub cached_at: String,
}

impl StoredResponse {
    /// Capture a response now.
    pub fn new(
        method: impl Into<String>, url: impl Into<String>, status: u16, headers: Vec<(String, String)>, body: Vec<u8>,
    ) -> Self {
        Self {
            method: method.into().to_ascii_uppercase(),
            url: url.into(),
            status,
            headers,
            body,
            cached_at: chrono::Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
        }
    }

    /// Store key for this response's request.
    pub fn key(&self) -> String {
        compute_request_key(&self.method, &self.url)
    }

    /// First header value matching `name`, case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Handle to one named store.
///
/// Strategies receive this handle explicitly; it is cheap to clone and can
/// be moved into background tasks.
#[derive(Clone, Debug)]
pub struct Store {
    db: CacheDb,
    name: String,
}

impl Store {
    pub(crate) fn new(db: CacheDb, name: String) -> Self {
        Self { db, name }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Insert or replace the entry for the response's request.
    ///
    /// Fails if the store has been deleted since this handle was opened.
    pub async fn put(&self, response: &StoredResponse) -> Result<(), Error> {
        let store = self.name.clone();
        let key = response.key();
        let response = response.clone();
        let headers_json =
            serde_json::to_string(&response.headers).map_err(|e| Error::CorruptEntry(e.to_string()))?;

        self.db
            .conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO entries (store, key_hash, method, url, status, headers_json, body, cached_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                     ON CONFLICT(store, key_hash) DO UPDATE SET
                        method = excluded.method,
                        url = excluded.url,
                        status = excluded.status,
                        headers_json = excluded.headers_json,
                        body = excluded.body,
                        cached_at = excluded.cached_at",
                    params![
                        &store,
                        &key,
                        &response.method,
                        &response.url,
                        response.status as i64,
                        &headers_json,
                        &response.body,
                        &response.cached_at,
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Look up the entry for `method` + `url`.
    pub async fn match_request(&self, method: &str, url: &str) -> Result<Option<StoredResponse>, Error> {
        let store = self.name.clone();
        let key = compute_request_key(method, url);
        self.db
            .conn
            .call(move |conn| -> Result<Option<StoredResponse>, Error> {
                let row = conn.query_row(
                    "SELECT method, url, status, headers_json, body, cached_at
                     FROM entries WHERE store = ?1 AND key_hash = ?2",
                    params![store, key],
                    |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, i64>(2)?,
                            row.get::<_, String>(3)?,
                            row.get::<_, Vec<u8>>(4)?,
                            row.get::<_, String>(5)?,
                        ))
                    },
                );

                match row {
                    Ok((method, url, status, headers_json, body, cached_at)) => {
                        let headers = serde_json::from_str(&headers_json)
                            .map_err(|e| Error::CorruptEntry(format!("{url}: {e}")))?;
                        Ok(Some(StoredResponse { method, url, status: status as u16, headers, body, cached_at }))
                    }
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Remove the entry for `method` + `url`.
    pub async fn delete(&self, method: &str, url: &str) -> Result<bool, Error> {
        let store = self.name.clone();
        let key = compute_request_key(method, url);
        self.db
            .conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted =
                    conn.execute("DELETE FROM entries WHERE store = ?1 AND key_hash = ?2", params![store, key])?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Number of entries in this store.
    pub async fn entry_count(&self) -> Result<u64, Error> {
        let store = self.name.clone();
        self.db
            .conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM entries WHERE store = ?1", params![store], |row| row.get(0))?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete entries whose URL contains `pattern`.
    ///
    /// Returns the number of deleted entries.
    pub async fn purge_by_url(&self, pattern: &str) -> Result<u64, Error> {
        let store = self.name.clone();
        let pattern = format!("%{pattern}%");
        self.db
            .conn
            .call(move |conn| -> Result<u64, Error> {
                let count =
                    conn.execute("DELETE FROM entries WHERE store = ?1 AND url LIKE ?2", params![store, pattern])?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Purge the oldest entries until count <= max_entries.
    ///
    /// Returns the number of deleted entries.
    pub async fn purge_oldest(&self, max_entries: usize) -> Result<u64, Error> {
        let store = self.name.clone();
        let max = i64::try_from(max_entries).unwrap_or(i64::MAX);
        self.db
            .conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM entries WHERE store = ?1", params![store], |row| row.get(0))?;
                if count <= max {
                    return Ok(0);
                }

                let deleted = conn.execute(
                    "DELETE FROM entries WHERE store = ?1 AND key_hash IN (
                        SELECT key_hash FROM entries WHERE store = ?1 ORDER BY cached_at ASC LIMIT ?2
                    )",
                    params![store, count - max],
                )?;
                Ok(deleted as u64)
            })
            .await
            .map_err(Error::from)
    }
}
