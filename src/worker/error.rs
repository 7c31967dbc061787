use thiserror::Error;

use crate::net::NetworkError;
use crate::store::StoreError;

/// Failure during install or activation. Fatal to that lifecycle phase;
/// the hosting environment retries setup on its next opportunity rather
/// than activating a half-cached version.
#[derive(Error, Debug)]
pub enum LifecycleError {
    #[error("failed to precache {url}")]
    Precache {
        url: String,
        #[source]
        source: NetworkError,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}
