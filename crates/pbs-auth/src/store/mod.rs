//! Authorization record lookup.
//!
//! The engine only ever reads: one lookup per request, no retries. Backends
//! classify their own failures into [`StoreError`] so the engine never has to
//! interpret transport details.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{StoreBackend, StoreConfig};
use crate::error::{StoreError, StoreResult};

pub mod http;
pub mod memory;
pub mod sqlite;

pub use http::HttpStore;
pub use memory::{Lookup, MemoryStore};
pub use sqlite::SqliteStore;

#[async_trait]
pub trait LookupStore: Send + Sync {
    /// Single registered origin (v1 records).
    async fn get_registered_origin(&self, identity: &str) -> StoreResult<String>;

    /// Registered canonical sites (v2 records).
    async fn get_registered_sites(&self, identity: &str) -> StoreResult<BTreeSet<String>>;
}

#[async_trait]
impl<T: LookupStore + ?Sized> LookupStore for Arc<T> {
    async fn get_registered_origin(&self, identity: &str) -> StoreResult<String> {
        (**self).get_registered_origin(identity).await
    }

    async fn get_registered_sites(&self, identity: &str) -> StoreResult<BTreeSet<String>> {
        (**self).get_registered_sites(identity).await
    }
}

/// Build the store selected by `config`.
pub fn connect(config: &StoreConfig) -> StoreResult<Arc<dyn LookupStore>> {
    config.validate()?;

    match &config.backend {
        StoreBackend::Sqlite { path } => Ok(Arc::new(SqliteStore::open(
            path,
            &config.origin_table,
            &config.sites_table,
        )?)),
        StoreBackend::Http { url } => Ok(Arc::new(HttpStore::new(
            url.clone(),
            std::time::Duration::from_secs(config.timeout_secs),
        )?)),
        StoreBackend::None => Err(StoreError::Config {
            message: "no lookup store configured (set PBS_AUTH_SQLITE_PATH or PBS_AUTH_STORE_URL)"
                .to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connect_requires_a_backend() {
        let err = connect(&StoreConfig::default()).err().unwrap();
        assert!(matches!(err, StoreError::Config { .. }));
    }

    #[test]
    fn connect_rejects_bad_table_names() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = StoreConfig::default()
            .with_backend(StoreBackend::Sqlite {
                path: dir.path().join("auth.db"),
            })
            .with_tables("Origins; --", "Sites");
        assert!(matches!(
            connect(&cfg).err().unwrap(),
            StoreError::Config { .. }
        ));
    }

    #[tokio::test]
    async fn connect_opens_sqlite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("auth.db");
        sqlite::init_database(&path, "Origins", "Sites").unwrap();

        let cfg = StoreConfig::default()
            .with_backend(StoreBackend::Sqlite { path })
            .with_tables("Origins", "Sites");
        let store = connect(&cfg).unwrap();
        assert!(store
            .get_registered_origin("nobody")
            .await
            .unwrap_err()
            .is_miss());
    }
}
