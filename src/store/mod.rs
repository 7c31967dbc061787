//! Versioned cache bucket storage.
//!
//! A [`CacheStore`] maps versioned bucket names (`fuyi-ac-v3`) to
//! [`Bucket`]s; a bucket maps request identities to stored responses.
//! Handlers acquire the bucket via [`CacheStore::open`] per operation
//! rather than holding a long-lived handle, so a version transition never
//! leaves anyone writing to a stale bucket.
//!
//! Two implementations ship with the crate:
//! - [`MemoryCacheStore`] - in-process map, for hosts that persist
//!   elsewhere and for tests;
//! - [`FsCacheStore`] - JSON files under a cache directory.
//!
//! Individual `put`/`delete` operations are atomic; concurrent writes to
//! the same key resolve last-writer-wins. No further locking is offered.

pub mod error;
pub mod fs;
pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;

use crate::http::{RequestKey, StoredResponse};

pub use error::StoreError;
pub use fs::FsCacheStore;
pub use memory::MemoryCacheStore;

/// A named collection of cache buckets.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Open the named bucket, creating it if absent.
    async fn open(&self, name: &str) -> Result<Arc<dyn Bucket>, StoreError>;

    /// Names of all buckets currently present.
    async fn bucket_names(&self) -> Result<Vec<String>, StoreError>;

    /// Delete the named bucket and everything in it. Returns whether the
    /// bucket existed.
    async fn delete_bucket(&self, name: &str) -> Result<bool, StoreError>;
}

/// One bucket: request identity -> stored response.
#[async_trait]
pub trait Bucket: Send + Sync {
    async fn get(&self, key: &RequestKey) -> Result<Option<StoredResponse>, StoreError>;

    /// Store a snapshot, overwriting any prior entry for the key.
    async fn put(&self, key: RequestKey, response: StoredResponse) -> Result<(), StoreError>;

    async fn keys(&self) -> Result<Vec<RequestKey>, StoreError>;
}
