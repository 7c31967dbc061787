//! Install/activate lifecycle and the network-first fetch strategies.

use std::sync::Arc;

use futures::future::try_join_all;
use tracing::{debug, info};

use crate::config::OfflineConfig;
use crate::http::{Request, RequestKey, Response, StoredResponse};
use crate::net::{NetworkError, NetworkTransport};
use crate::store::CacheStore;

use super::{ClientControl, LifecycleError};

/// Owns the versioned cache bucket and reacts to the three lifecycle
/// signals: setup, activation, and request interception.
///
/// The bucket is re-acquired from the store per operation rather than held
/// across calls, so a version transition never strands a handler on a
/// stale handle.
pub struct OfflineCacheController {
    config: OfflineConfig,
    store: Arc<dyn CacheStore>,
    net: Arc<dyn NetworkTransport>,
    clients: Arc<dyn ClientControl>,
}

impl OfflineCacheController {
    pub fn new(
        config: OfflineConfig,
        store: Arc<dyn CacheStore>,
        net: Arc<dyn NetworkTransport>,
        clients: Arc<dyn ClientControl>,
    ) -> Self {
        Self {
            config,
            store,
            net,
            clients,
        }
    }

    pub fn config(&self) -> &OfflineConfig {
        &self.config
    }

    /// Setup: precache the fixed asset list into the current bucket.
    ///
    /// All assets are fetched concurrently and the operation is
    /// all-or-nothing: the first fetch failure aborts it and no entry is
    /// committed, so a half-cached version is never marked ready. Signals
    /// [`ClientControl::skip_waiting`] up front so the new version takes
    /// over as soon as setup succeeds.
    pub async fn install(&self) -> Result<(), LifecycleError> {
        self.clients.skip_waiting();

        let bucket = self.store.open(&self.config.cache_name).await?;

        let fetches = self.config.precache_assets.iter().map(|url| {
            let request = Request::get(url.clone());
            async move {
                match self.net.fetch(&request).await {
                    Ok(response) => Ok((request.key(), StoredResponse::from_response(response))),
                    Err(source) => Err(LifecycleError::Precache {
                        url: url.clone(),
                        source,
                    }),
                }
            }
        });

        // Commit only after every asset has fetched successfully.
        let entries = try_join_all(fetches).await?;
        for (key, stored) in entries {
            bucket.put(key, stored).await?;
        }

        info!(
            bucket = %self.config.cache_name,
            assets = self.config.precache_assets.len(),
            "install complete, core assets precached"
        );
        Ok(())
    }

    /// Activation: delete every bucket from a prior version, then claim
    /// all open pages.
    ///
    /// Deletions run concurrently; any failure fails activation. Not
    /// complete until all deletions finish and control is claimed.
    pub async fn activate(&self) -> Result<(), LifecycleError> {
        let names = self.store.bucket_names().await?;

        let deletions = names
            .into_iter()
            .filter(|name| !self.config.is_current(name))
            .map(|name| async move {
                info!(bucket = %name, "removing stale cache bucket");
                self.store.delete_bucket(&name).await.map(|_| ())
            });
        try_join_all(deletions).await?;

        self.clients.claim().await;
        info!(bucket = %self.config.cache_name, "activated and claimed open pages");
        Ok(())
    }

    /// Request interception.
    ///
    /// Returns `None` for non-GET requests: they are not intercepted and
    /// the host sends them to the network unmodified, with no cache read
    /// or write. GET requests get a network-first strategy; detail pages
    /// additionally fall back to the cached hub page. `Some(Err(_))`
    /// means the fallback chain is exhausted and the host should surface
    /// the failure exactly as if no interception were present.
    pub async fn handle_fetch(&self, request: Request) -> Option<Result<Response, NetworkError>> {
        if !request.method().is_get() {
            return None;
        }

        let outcome = if request.path().starts_with(&self.config.detail_prefix) {
            self.network_first_with_hub_fallback(&request).await
        } else {
            self.network_first(&request).await
        };
        Some(outcome)
    }

    /// Strategy A: network first, cache on success, serve the cached copy
    /// on failure.
    async fn network_first(&self, request: &Request) -> Result<Response, NetworkError> {
        match self.fetch_and_cache(request).await {
            Ok(response) => Ok(response),
            Err(err) => {
                debug!(url = %request.url(), error = %err, "network failed, falling back to cache");
                match self.lookup(&request.key()).await {
                    Some(stored) => Ok(stored.into_response()),
                    None => Err(err),
                }
            }
        }
    }

    /// Strategy B (detail pages): like Strategy A, but an uncached detail
    /// page falls back to the hub page, which is precached and lets the
    /// user reach recently viewed items through the app's local datastore.
    async fn network_first_with_hub_fallback(
        &self,
        request: &Request,
    ) -> Result<Response, NetworkError> {
        match self.fetch_and_cache(request).await {
            Ok(response) => Ok(response),
            Err(err) => {
                debug!(url = %request.url(), error = %err, "network failed, falling back to cache");
                if let Some(stored) = self.lookup(&request.key()).await {
                    return Ok(stored.into_response());
                }

                let hub = RequestKey::get(self.config.fallback_path.clone());
                match self.lookup(&hub).await {
                    Some(stored) => {
                        info!(url = %request.url(), hub = %self.config.fallback_path,
                            "detail page offline and uncached, serving hub page");
                        Ok(stored.into_response())
                    }
                    None => Err(err),
                }
            }
        }
    }

    /// Fetch from the network; on success, hand one copy back and persist
    /// the other from a detached task. The caller never waits on the
    /// write, and a failed write never turns a served response into an
    /// error.
    async fn fetch_and_cache(&self, request: &Request) -> Result<Response, NetworkError> {
        let response = self.net.fetch(request).await?;
        let (response, copy) = response.split();

        let store = Arc::clone(&self.store);
        let bucket_name = self.config.cache_name.clone();
        let key = request.key();
        tokio::spawn(async move {
            match store.open(&bucket_name).await {
                Ok(bucket) => {
                    if let Err(err) = bucket.put(key, StoredResponse::from_response(copy)).await {
                        debug!(error = %err, "opportunistic cache write failed");
                    }
                }
                Err(err) => debug!(error = %err, "cache open failed during write-back"),
            }
        });

        Ok(response)
    }

    /// Cache lookup that treats store errors as a miss. The fetch path
    /// recovers through its fallback chain; a broken cache read must not
    /// replace the real network error.
    async fn lookup(&self, key: &RequestKey) -> Option<StoredResponse> {
        let bucket = match self.store.open(&self.config.cache_name).await {
            Ok(bucket) => bucket,
            Err(err) => {
                debug!(key = %key, error = %err, "cache open failed during lookup");
                return None;
            }
        };
        match bucket.get(key).await {
            Ok(found) => found,
            Err(err) => {
                debug!(key = %key, error = %err, "cache read failed, treating as miss");
                None
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use std::collections::{HashMap, VecDeque};
    use std::sync::atomic::{AtomicBool, Ordering};

    use async_trait::async_trait;
    use tokio::sync::Mutex;

    use crate::http::Method;
    use crate::store::{Bucket, MemoryCacheStore};

    use super::*;

    /// Transport that replays scripted bodies per URL, in order. A URL
    /// with no remaining script behaves as offline.
    #[derive(Default)]
    struct ScriptedTransport {
        replies: Mutex<HashMap<String, VecDeque<Result<String, ()>>>>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedTransport {
        async fn respond(&self, url: &str, body: &str) {
            self.replies
                .lock()
                .await
                .entry(url.to_string())
                .or_default()
                .push_back(Ok(body.to_string()));
        }

        async fn fail(&self, url: &str) {
            self.replies
                .lock()
                .await
                .entry(url.to_string())
                .or_default()
                .push_back(Err(()));
        }

        async fn calls(&self) -> Vec<String> {
            self.calls.lock().await.clone()
        }
    }

    #[async_trait]
    impl NetworkTransport for ScriptedTransport {
        async fn fetch(&self, request: &Request) -> Result<Response, NetworkError> {
            self.calls
                .lock()
                .await
                .push(format!("{} {}", request.method(), request.url()));
            let mut replies = self.replies.lock().await;
            match replies.get_mut(request.url()).and_then(|q| q.pop_front()) {
                Some(Ok(body)) => Ok(Response::new(200, body)),
                Some(Err(())) | None => {
                    Err(NetworkError::Unreachable("scripted offline".to_string()))
                }
            }
        }
    }

    #[derive(Default)]
    struct RecordingClients {
        skip_waiting_called: AtomicBool,
        claimed: AtomicBool,
    }

    #[async_trait]
    impl ClientControl for RecordingClients {
        fn skip_waiting(&self) {
            self.skip_waiting_called.store(true, Ordering::SeqCst);
        }

        async fn claim(&self) {
            self.claimed.store(true, Ordering::SeqCst);
        }
    }

    struct Harness {
        store: Arc<MemoryCacheStore>,
        net: Arc<ScriptedTransport>,
        clients: Arc<RecordingClients>,
        controller: OfflineCacheController,
    }

    fn harness(config: OfflineConfig) -> Harness {
        let store = Arc::new(MemoryCacheStore::new());
        let net = Arc::new(ScriptedTransport::default());
        let clients = Arc::new(RecordingClients::default());
        let controller = OfflineCacheController::new(
            config,
            Arc::clone(&store) as Arc<dyn CacheStore>,
            Arc::clone(&net) as Arc<dyn NetworkTransport>,
            Arc::clone(&clients) as Arc<dyn ClientControl>,
        );
        Harness {
            store,
            net,
            clients,
            controller,
        }
    }

    fn small_config() -> OfflineConfig {
        OfflineConfig {
            cache_name: "fuyi-ac-v3".to_string(),
            precache_assets: vec!["/".to_string(), "/home".to_string()],
            detail_prefix: "/detail/".to_string(),
            fallback_path: "/home".to_string(),
        }
    }

    /// Let detached write-back tasks run to completion.
    async fn settle() {
        for _ in 0..16 {
            tokio::task::yield_now().await;
        }
    }

    async fn current_bucket(h: &Harness) -> Arc<dyn Bucket> {
        h.store.open(&h.controller.config().cache_name).await.unwrap()
    }

    async fn seed(h: &Harness, url: &str, body: &str) {
        current_bucket(h)
            .await
            .put(
                RequestKey::get(url),
                StoredResponse::from_response(Response::new(200, body.to_string())),
            )
            .await
            .unwrap();
    }

    async fn cached_body(h: &Harness, url: &str) -> Option<String> {
        current_bucket(h)
            .await
            .get(&RequestKey::get(url))
            .await
            .unwrap()
            .map(|stored| String::from_utf8(stored.body.to_vec()).unwrap())
    }

    // ===== Strategy A =====

    #[tokio::test]
    async fn test_network_success_returns_body_and_warms_cache() {
        let h = harness(small_config());
        h.net.respond("/", "fresh index").await;

        let response = h.controller.handle_fetch(Request::get("/")).await.unwrap().unwrap();
        assert_eq!(response.into_body().as_ref(), b"fresh index");

        settle().await;
        assert_eq!(cached_body(&h, "/").await.as_deref(), Some("fresh index"));
    }

    #[tokio::test]
    async fn test_offline_serves_cached_copy() {
        let h = harness(small_config());
        seed(&h, "/", "last known good").await;

        let response = h.controller.handle_fetch(Request::get("/")).await.unwrap().unwrap();
        assert_eq!(response.into_body().as_ref(), b"last known good");
    }

    #[tokio::test]
    async fn test_offline_and_uncached_propagates_failure() {
        let h = harness(small_config());

        let outcome = h.controller.handle_fetch(Request::get("/never-seen")).await.unwrap();
        assert!(matches!(outcome, Err(NetworkError::Unreachable(_))));
    }

    #[tokio::test]
    async fn test_repeated_request_overwrites_cache_with_latest() {
        let h = harness(small_config());
        h.net.respond("/", "first").await;
        h.net.respond("/", "second").await;

        h.controller.handle_fetch(Request::get("/")).await.unwrap().unwrap();
        settle().await;
        h.controller.handle_fetch(Request::get("/")).await.unwrap().unwrap();
        settle().await;

        assert_eq!(cached_body(&h, "/").await.as_deref(), Some("second"));
    }

    // ===== Strategy B =====

    #[tokio::test]
    async fn test_detail_page_success_is_cached_like_any_other() {
        let h = harness(small_config());
        h.net.respond("/detail/7", "item seven").await;

        let response = h
            .controller
            .handle_fetch(Request::get("/detail/7"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(response.into_body().as_ref(), b"item seven");

        settle().await;
        assert_eq!(cached_body(&h, "/detail/7").await.as_deref(), Some("item seven"));
    }

    #[tokio::test]
    async fn test_detail_page_prefers_its_own_cached_copy() {
        let h = harness(small_config());
        seed(&h, "/detail/42", "cached detail").await;
        seed(&h, "/home", "hub").await;

        let response = h
            .controller
            .handle_fetch(Request::get("/detail/42"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(response.into_body().as_ref(), b"cached detail");
    }

    #[tokio::test]
    async fn test_detail_page_offline_uncached_serves_hub() {
        let h = harness(small_config());
        seed(&h, "/home", "hub page").await;

        let response = h
            .controller
            .handle_fetch(Request::get("/detail/42"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(response.into_body().as_ref(), b"hub page");
    }

    #[tokio::test]
    async fn test_detail_page_double_miss_propagates_failure() {
        let h = harness(small_config());

        let outcome = h.controller.handle_fetch(Request::get("/detail/42")).await.unwrap();
        assert!(matches!(outcome, Err(NetworkError::Unreachable(_))));
    }

    #[tokio::test]
    async fn test_detail_routing_applies_to_absolute_urls() {
        let h = harness(small_config());
        seed(&h, "/home", "hub page").await;

        // Path extraction, not raw prefix matching, drives routing.
        let response = h
            .controller
            .handle_fetch(Request::get("https://fuyi.example.com/detail/9"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(response.into_body().as_ref(), b"hub page");
    }

    // ===== Routing =====

    #[tokio::test]
    async fn test_non_get_is_not_intercepted() {
        let h = harness(small_config());

        let outcome = h
            .controller
            .handle_fetch(Request::new(Method::Post, "/api/items"))
            .await;
        assert!(outcome.is_none());

        settle().await;
        // No network attempt, no bucket touched.
        assert!(h.net.calls().await.is_empty());
        assert!(h.store.bucket_names().await.unwrap().is_empty());
    }

    // ===== Install =====

    #[tokio::test]
    async fn test_install_precaches_every_asset() {
        let h = harness(small_config());
        h.net.respond("/", "index").await;
        h.net.respond("/home", "hub").await;

        h.controller.install().await.unwrap();

        assert!(h.clients.skip_waiting_called.load(Ordering::SeqCst));
        assert_eq!(cached_body(&h, "/").await.as_deref(), Some("index"));
        assert_eq!(cached_body(&h, "/home").await.as_deref(), Some("hub"));
    }

    #[tokio::test]
    async fn test_install_fails_whole_when_one_asset_fails() {
        let mut config = small_config();
        config.precache_assets = (1..=9).map(|i| format!("/asset/{}", i)).collect();
        let h = harness(config);
        for i in 1..=9 {
            if i == 3 {
                h.net.fail("/asset/3").await;
            } else {
                h.net.respond(&format!("/asset/{}", i), "ok").await;
            }
        }

        let err = h.controller.install().await.unwrap_err();
        match err {
            LifecycleError::Precache { url, .. } => assert_eq!(url, "/asset/3"),
            other => panic!("unexpected error: {other}"),
        }

        // Nothing was committed for the failed install.
        let bucket = current_bucket(&h).await;
        assert!(bucket.keys().await.unwrap().is_empty());
    }

    // ===== Activate =====

    #[tokio::test]
    async fn test_activate_deletes_stale_buckets_and_claims() {
        let h = harness(small_config());

        // Leftover bucket from the previous deployment.
        h.store
            .open("fuyi-ac-v2")
            .await
            .unwrap()
            .put(
                RequestKey::get("/old"),
                StoredResponse::from_response(Response::new(200, "stale")),
            )
            .await
            .unwrap();

        h.net.respond("/", "index").await;
        h.net.respond("/home", "hub").await;
        h.controller.install().await.unwrap();
        h.controller.activate().await.unwrap();

        let names = h.store.bucket_names().await.unwrap();
        assert_eq!(names, vec!["fuyi-ac-v3"]);
        assert!(h.clients.claimed.load(Ordering::SeqCst));

        // The current bucket's precached entries survive activation.
        assert_eq!(cached_body(&h, "/").await.as_deref(), Some("index"));
        assert_eq!(cached_body(&h, "/home").await.as_deref(), Some("hub"));
    }
}
