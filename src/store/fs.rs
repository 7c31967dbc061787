//! Filesystem-backed cache store.
//!
//! Buckets are directories under a root (by default the user cache dir),
//! entries are JSON files named by a stable hash of the request key:
//!
//! ```text
//! <root>/fuyi-ac-v3/9c41f2a07b3d5e18.json
//! ```
//!
//! Each file holds the key alongside the response so `keys()` can
//! enumerate without a separate index and `get()` can reject a hash
//! collision. Whole-file writes give per-key atomicity; last writer wins.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::http::{RequestKey, StoredResponse};

use super::{Bucket, CacheStore, StoreError};

/// Application name used for the default cache directory path.
const APP_NAME: &str = "fuyi-ac";

/// FNV-1a, used for entry file names. Stable across runs and platforms,
/// unlike the std hasher.
fn entry_hash(key: &RequestKey) -> u64 {
    const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;

    let mut hash = OFFSET_BASIS;
    for byte in key.to_string().as_bytes() {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(PRIME);
    }
    hash
}

#[derive(Serialize, Deserialize)]
struct StoredEntry {
    key: RequestKey,
    response: StoredResponse,
}

pub struct FsCacheStore {
    root: PathBuf,
}

impl FsCacheStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Store rooted at `<user cache dir>/fuyi-ac`.
    pub fn in_user_cache_dir() -> Result<Self> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(Self::new(cache_dir.join(APP_NAME)))
    }

    fn bucket_dir(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}

#[async_trait]
impl CacheStore for FsCacheStore {
    async fn open(&self, name: &str) -> Result<Arc<dyn Bucket>, StoreError> {
        let dir = self.bucket_dir(name);
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Arc::new(FsBucket { dir }) as Arc<dyn Bucket>)
    }

    async fn bucket_names(&self) -> Result<Vec<String>, StoreError> {
        let mut names = Vec::new();
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            // No root yet means no buckets yet.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(names),
            Err(e) => return Err(e.into()),
        };
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_dir() {
                if let Some(name) = entry.file_name().to_str() {
                    names.push(name.to_string());
                }
            }
        }
        Ok(names)
    }

    async fn delete_bucket(&self, name: &str) -> Result<bool, StoreError> {
        let dir = self.bucket_dir(name);
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

pub struct FsBucket {
    dir: PathBuf,
}

impl FsBucket {
    fn entry_path(&self, key: &RequestKey) -> PathBuf {
        self.dir.join(format!("{:016x}.json", entry_hash(key)))
    }
}

async fn read_entry(path: &Path) -> Result<Option<StoredEntry>, StoreError> {
    let contents = match tokio::fs::read(path).await {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    Ok(Some(serde_json::from_slice(&contents)?))
}

#[async_trait]
impl Bucket for FsBucket {
    async fn get(&self, key: &RequestKey) -> Result<Option<StoredResponse>, StoreError> {
        match read_entry(&self.entry_path(key)).await? {
            Some(entry) if entry.key == *key => Ok(Some(entry.response)),
            Some(entry) => {
                // Different key hashed to the same file name.
                debug!(wanted = %key, found = %entry.key, "cache entry hash collision");
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn put(&self, key: RequestKey, response: StoredResponse) -> Result<(), StoreError> {
        let path = self.entry_path(&key);
        let contents = serde_json::to_vec(&StoredEntry { key, response })?;
        tokio::fs::write(&path, contents).await?;
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<RequestKey>, StoreError> {
        let mut keys = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        while let Some(dir_entry) = entries.next_entry().await? {
            let path = dir_entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(entry) = read_entry(&path).await? {
                keys.push(entry.key);
            }
        }
        Ok(keys)
    }
}
