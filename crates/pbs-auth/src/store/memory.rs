use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

use async_trait::async_trait;

use super::LookupStore;
use crate::error::{StoreError, StoreResult};

/// One recorded store access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    Origin(String),
    Sites(String),
}

/// In-process store. Records every lookup so callers can assert on which
/// keys were used, and how often.
#[derive(Debug, Default)]
pub struct MemoryStore {
    origins: BTreeMap<String, Vec<String>>,
    sites: BTreeMap<String, BTreeSet<String>>,
    failure: Option<StoreError>,
    lookups: Mutex<Vec<Lookup>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every lookup fails with `error`.
    pub fn failing(error: StoreError) -> Self {
        Self {
            failure: Some(error),
            ..Self::default()
        }
    }

    pub fn with_origin(mut self, identity: impl Into<String>, origin: impl Into<String>) -> Self {
        self.origins
            .entry(identity.into())
            .or_default()
            .push(origin.into());
        self
    }

    pub fn with_sites<I, S>(mut self, identity: impl Into<String>, sites: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sites
            .entry(identity.into())
            .or_default()
            .extend(sites.into_iter().map(Into::into));
        self
    }

    pub fn lookups(&self) -> Vec<Lookup> {
        self.lookups
            .lock()
            .map(|l| l.clone())
            .unwrap_or_default()
    }

    pub fn lookup_count(&self) -> usize {
        self.lookups.lock().map(|l| l.len()).unwrap_or_default()
    }

    fn record(&self, lookup: Lookup) {
        if let Ok(mut lookups) = self.lookups.lock() {
            lookups.push(lookup);
        }
    }
}

#[async_trait]
impl LookupStore for MemoryStore {
    async fn get_registered_origin(&self, identity: &str) -> StoreResult<String> {
        self.record(Lookup::Origin(identity.to_string()));
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }

        match self.origins.get(identity).map(Vec::as_slice) {
            Some([origin]) => Ok(origin.clone()),
            Some(records) if records.len() > 1 => Err(StoreError::Ambiguous {
                identity: identity.to_string(),
                count: records.len(),
            }),
            _ => Err(StoreError::NotFound {
                identity: identity.to_string(),
            }),
        }
    }

    async fn get_registered_sites(&self, identity: &str) -> StoreResult<BTreeSet<String>> {
        self.record(Lookup::Sites(identity.to_string()));
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }

        self.sites
            .get(identity)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                identity: identity.to_string(),
            })
    }
}
