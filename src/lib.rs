//! Offline cache controller for the fuyi-ac web app.
//!
//! This crate keeps a versioned local cache of the app's pages and assets
//! and serves cached content when the network is unavailable. The hosting
//! environment drives three lifecycle operations on
//! [`OfflineCacheController`]:
//!
//! - [`install`](worker::OfflineCacheController::install) precaches the
//!   fixed asset list into the current cache bucket;
//! - [`activate`](worker::OfflineCacheController::activate) deletes buckets
//!   left behind by prior versions and claims all open pages;
//! - [`handle_fetch`](worker::OfflineCacheController::handle_fetch) applies
//!   a network-first strategy to each intercepted GET request, falling back
//!   to the cache (and, for item-detail pages, to the cached query hub)
//!   when the network fails.
//!
//! Network access and cache persistence sit behind the [`NetworkTransport`]
//! and [`CacheStore`] traits so hosts can inject their own; bundled
//! implementations cover reqwest, an in-process map, and a JSON-file store.

pub mod config;
pub mod http;
pub mod net;
pub mod store;
pub mod worker;

pub use config::OfflineConfig;
pub use http::{Method, Request, RequestKey, Response, StoredResponse};
pub use net::{HttpTransport, NetworkError, NetworkTransport};
pub use store::{Bucket, CacheStore, FsCacheStore, MemoryCacheStore, StoreError};
pub use worker::{ClientControl, DetachedClients, LifecycleError, OfflineCacheController};
