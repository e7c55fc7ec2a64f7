use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::store::{select_key, CacheStore, MatchOptions};
use crate::error::CacheError;
use crate::models::Response;

/// In-process cache store. Durable only for the lifetime of the value; used
/// for embedding and in tests.
#[derive(Default)]
pub struct MemoryCacheStore {
    compartments: RwLock<HashMap<String, BTreeMap<String, Response>>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn open(&self, name: &str) -> Result<(), CacheError> {
        self.compartments
            .write()
            .await
            .entry(name.to_string())
            .or_default();
        Ok(())
    }

    async fn names(&self) -> Result<Vec<String>, CacheError> {
        let mut names: Vec<String> = self.compartments.read().await.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    async fn match_entry(
        &self,
        name: &str,
        key: &str,
        options: MatchOptions,
    ) -> Result<Option<Response>, CacheError> {
        let compartments = self.compartments.read().await;
        let Some(entries) = compartments.get(name) else {
            return Ok(None);
        };
        Ok(select_key(entries.keys(), key, options).and_then(|k| entries.get(k).cloned()))
    }

    async fn put(&self, name: &str, key: &str, response: &Response) -> Result<(), CacheError> {
        self.compartments
            .write()
            .await
            .entry(name.to_string())
            .or_default()
            .insert(key.to_string(), response.clone());
        Ok(())
    }

    async fn delete(&self, name: &str) -> Result<bool, CacheError> {
        Ok(self.compartments.write().await.remove(name).is_some())
    }

    async fn keys(&self, name: &str) -> Result<Vec<String>, CacheError> {
        Ok(self
            .compartments
            .read()
            .await
            .get(name)
            .map(|entries| entries.keys().cloned().collect())
            .unwrap_or_default())
    }
}
