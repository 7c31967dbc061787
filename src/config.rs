//! Fixed configuration surface for the offline cache controller.
//!
//! A configuration names the current cache bucket, lists the assets to
//! precache at install time, and fixes the two routing paths: the prefix
//! that selects the detail-page strategy and the hub page used as the
//! last-resort offline response.
//!
//! The crate reads no files and no environment variables; hosts construct
//! an [`OfflineConfig`] directly (or embed one in their own config file via
//! serde) and hand it to the controller.

use serde::{Deserialize, Serialize};

/// Current cache bucket name. Bump the version suffix on each deployment;
/// activation deletes every bucket whose name differs from this one.
const CACHE_NAME: &str = "fuyi-ac-v3";

/// Path prefix for item-detail pages (Strategy B routing).
const DETAIL_PREFIX: &str = "/detail/";

/// Hub page returned when a detail page is offline and uncached.
/// Must appear in the precache asset list.
const FALLBACK_PATH: &str = "/home";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OfflineConfig {
    /// Versioned bucket name identifying the current cache generation.
    pub cache_name: String,
    /// URLs fetched and stored at install time. Same-origin pages and
    /// static files plus the cross-origin CDN/font resources the app
    /// cannot render without.
    pub precache_assets: Vec<String>,
    /// Requests whose path starts with this prefix get the two-level
    /// fallback strategy.
    pub detail_prefix: String,
    /// Request path served from cache when a detail page misses both the
    /// network and the cache.
    pub fallback_path: String,
}

impl Default for OfflineConfig {
    fn default() -> Self {
        Self {
            cache_name: CACHE_NAME.to_string(),
            precache_assets: default_precache_assets(),
            detail_prefix: DETAIL_PREFIX.to_string(),
            fallback_path: FALLBACK_PATH.to_string(),
        }
    }
}

impl OfflineConfig {
    /// True when `bucket` is the current cache generation.
    pub fn is_current(&self, bucket: &str) -> bool {
        bucket == self.cache_name
    }
}

/// The fuyi-ac asset list: core pages, PWA manifest and icons, and the
/// external stylesheet/font resources.
fn default_precache_assets() -> Vec<String> {
    [
        "/",
        "/ad",
        "/home",
        "/static/manifest.json",
        "/static/icon-192.png",
        "/static/icon-512.png",
        "https://cdn.tailwindcss.com?plugins=forms,typography",
        "https://fonts.googleapis.com/css2?family=Manrope:wght@400;500;600;700;800&display=swap",
        "https://fonts.googleapis.com/icon?family=Material+Icons+Outlined|Material+Icons+Round",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}
