//! In-process cache store.
//!
//! Buckets are `HashMap`s behind `tokio::sync::RwLock`. Nothing survives
//! the process; hosts that need persistence use [`FsCacheStore`] or bring
//! their own [`CacheStore`].
//!
//! [`FsCacheStore`]: super::FsCacheStore

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::http::{RequestKey, StoredResponse};

use super::{Bucket, CacheStore, StoreError};

#[derive(Default)]
pub struct MemoryCacheStore {
    buckets: RwLock<HashMap<String, Arc<MemoryBucket>>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn open(&self, name: &str) -> Result<Arc<dyn Bucket>, StoreError> {
        let mut buckets = self.buckets.write().await;
        let bucket = buckets
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(MemoryBucket::default()));
        Ok(Arc::clone(bucket) as Arc<dyn Bucket>)
    }

    async fn bucket_names(&self) -> Result<Vec<String>, StoreError> {
        let buckets = self.buckets.read().await;
        Ok(buckets.keys().cloned().collect())
    }

    async fn delete_bucket(&self, name: &str) -> Result<bool, StoreError> {
        let mut buckets = self.buckets.write().await;
        Ok(buckets.remove(name).is_some())
    }
}

#[derive(Default)]
pub struct MemoryBucket {
    entries: RwLock<HashMap<RequestKey, StoredResponse>>,
}

#[async_trait]
impl Bucket for MemoryBucket {
    async fn get(&self, key: &RequestKey) -> Result<Option<StoredResponse>, StoreError> {
        let entries = self.entries.read().await;
        Ok(entries.get(key).cloned())
    }

    async fn put(&self, key: RequestKey, response: StoredResponse) -> Result<(), StoreError> {
        let mut entries = self.entries.write().await;
        entries.insert(key, response);
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<RequestKey>, StoreError> {
        let entries = self.entries.read().await;
        Ok(entries.keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::Response;

    fn snapshot(body: &str) -> StoredResponse {
        StoredResponse::from_response(Response::new(200, body.to_string()))
    }

    #[tokio::test]
    async fn test_open_is_open_or_create() {
        let store = MemoryCacheStore::new();
        let first = store.open("fuyi-ac-v3").await.unwrap();
        first
            .put(RequestKey::get("/home"), snapshot("hub"))
            .await
            .unwrap();

        // A second open of the same name sees the same entries.
        let second = store.open("fuyi-ac-v3").await.unwrap();
        let found = second.get(&RequestKey::get("/home")).await.unwrap();
        assert!(found.is_some());
    }

    #[tokio::test]
    async fn test_put_overwrites_last_writer_wins() {
        let store = MemoryCacheStore::new();
        let bucket = store.open("fuyi-ac-v3").await.unwrap();
        let key = RequestKey::get("/");

        bucket.put(key.clone(), snapshot("first")).await.unwrap();
        bucket.put(key.clone(), snapshot("second")).await.unwrap();

        let found = bucket.get(&key).await.unwrap().unwrap();
        assert_eq!(found.body.as_ref(), b"second");
    }

    #[tokio::test]
    async fn test_delete_bucket_reports_existence() {
        let store = MemoryCacheStore::new();
        store.open("fuyi-ac-v2").await.unwrap();

        assert!(store.delete_bucket("fuyi-ac-v2").await.unwrap());
        assert!(!store.delete_bucket("fuyi-ac-v2").await.unwrap());
        assert!(store.bucket_names().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_keys_enumerates_entries() {
        let store = MemoryCacheStore::new();
        let bucket = store.open("fuyi-ac-v3").await.unwrap();
        bucket
            .put(RequestKey::get("/"), snapshot("index"))
            .await
            .unwrap();
        bucket
            .put(RequestKey::get("/ad"), snapshot("ad"))
            .await
            .unwrap();

        let mut keys = bucket.keys().await.unwrap();
        keys.sort_by(|a, b| a.url.cmp(&b.url));
        assert_eq!(keys.len(), 2);
        assert_eq!(keys[0].url, "/");
        assert_eq!(keys[1].url, "/ad");
    }
}
