//! SQLite-backed authorization tables.
//!
//! Single-origin records may repeat per account (the lookup then fails as
//! ambiguous); per-site records are unique per account and keep the site
//! list as a JSON array.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use super::LookupStore;
use crate::config::validate_table_name;
use crate::error::{StoreError, StoreResult};

pub const IDENTITY_COLUMN: &str = "AccountId";
pub const ORIGIN_COLUMN: &str = "ReportingOriginUrl";
pub const SITES_COLUMN: &str = "AdtechSites";

/// Queries run on the blocking pool, one at a time per store.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
    origin_table: String,
    sites_table: String,
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore")
            .field("origin_table", &self.origin_table)
            .field("sites_table", &self.sites_table)
            .finish_non_exhaustive()
    }
}

impl SqliteStore {
    /// Open an existing database; tables are not created here.
    pub fn open(path: &Path, origin_table: &str, sites_table: &str) -> StoreResult<Self> {
        let conn = Connection::open(path).map_err(|e| StoreError::Config {
            message: format!("failed to open {}: {}", path.display(), e),
        })?;
        Self::from_connection(conn, origin_table, sites_table)
    }

    pub fn from_connection(
        conn: Connection,
        origin_table: &str,
        sites_table: &str,
    ) -> StoreResult<Self> {
        validate_table_name(origin_table)?;
        validate_table_name(sites_table)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            origin_table: origin_table.to_string(),
            sites_table: sites_table.to_string(),
        })
    }

    async fn with_conn<T, F>(&self, f: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> StoreResult<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().map_err(|_| StoreError::Backend {
                message: "sqlite connection mutex poisoned".to_string(),
                status: None,
            })?;
            f(&conn)
        })
        .await
        .map_err(|e| StoreError::Backend {
            message: format!("sqlite lookup task failed: {}", e),
            status: None,
        })?
    }
}

#[async_trait]
impl LookupStore for SqliteStore {
    async fn get_registered_origin(&self, identity: &str) -> StoreResult<String> {
        let sql = format!(
            "SELECT ro.{} FROM {} ro WHERE {} = ?1",
            ORIGIN_COLUMN, self.origin_table, IDENTITY_COLUMN
        );
        debug!(table = %self.origin_table, "querying registered origin");

        let key = identity.to_string();
        let mut origins = self
            .with_conn(move |conn| {
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt
                    .query_map(params![key], |row| row.get::<_, String>(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await?;

        match origins.len() {
            0 => Err(StoreError::NotFound {
                identity: identity.to_string(),
            }),
            1 => Ok(origins.remove(0)),
            count => Err(StoreError::Ambiguous {
                identity: identity.to_string(),
                count,
            }),
        }
    }

    async fn get_registered_sites(&self, identity: &str) -> StoreResult<BTreeSet<String>> {
        let sql = format!(
            "SELECT {} FROM {} WHERE {} = ?1",
            SITES_COLUMN, self.sites_table, IDENTITY_COLUMN
        );
        debug!(table = %self.sites_table, "querying registered sites");

        let key = identity.to_string();
        let encoded = self
            .with_conn(move |conn| {
                Ok(conn
                    .query_row(&sql, params![key], |row| row.get::<_, String>(0))
                    .optional()?)
            })
            .await?;

        match encoded {
            Some(encoded) => decode_sites(&encoded),
            None => Err(StoreError::NotFound {
                identity: identity.to_string(),
            }),
        }
    }
}

/// Create both lookup tables if they are missing.
pub fn ensure_schema(conn: &Connection, origin_table: &str, sites_table: &str) -> StoreResult<()> {
    validate_table_name(origin_table)?;
    validate_table_name(sites_table)?;

    conn.execute_batch(&format!(
        "CREATE TABLE IF NOT EXISTS {origin} ({id} TEXT NOT NULL, {url} TEXT NOT NULL);
         CREATE INDEX IF NOT EXISTS {origin}_{id} ON {origin} ({id});
         CREATE TABLE IF NOT EXISTS {sites} ({id} TEXT PRIMARY KEY, {col} TEXT NOT NULL);",
        origin = origin_table,
        sites = sites_table,
        id = IDENTITY_COLUMN,
        url = ORIGIN_COLUMN,
        col = SITES_COLUMN,
    ))?;
    Ok(())
}

/// Open (creating if needed) the database at `path` and ensure the schema.
pub fn init_database(path: &Path, origin_table: &str, sites_table: &str) -> StoreResult<()> {
    let conn = Connection::open(path).map_err(|e| StoreError::Config {
        message: format!("failed to open {}: {}", path.display(), e),
    })?;
    ensure_schema(&conn, origin_table, sites_table)
}

pub fn table_exists(conn: &Connection, table: &str) -> StoreResult<bool> {
    let found = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
            params![table],
            |_| Ok(()),
        )
        .optional()?;
    Ok(found.is_some())
}

pub fn encode_sites<S: AsRef<str>>(sites: &[S]) -> String {
    let sites: Vec<&str> = sites.iter().map(AsRef::as_ref).collect();
    serde_json::Value::from(sites).to_string()
}

pub fn decode_sites(encoded: &str) -> StoreResult<BTreeSet<String>> {
    serde_json::from_str(encoded).map_err(|e| StoreError::Backend {
        message: format!("malformed {} value: {}", SITES_COLUMN, e),
        status: None,
    })
}
