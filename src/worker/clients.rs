//! Host-side page control.
//!
//! The hosting environment tracks which pages the controller governs;
//! this trait is how the controller signals it. [`skip_waiting`] is fired
//! during install so the new version takes over without waiting for old
//! pages to close; [`claim`] is awaited at the end of activation so all
//! open pages route through the controller without a reload.
//!
//! [`skip_waiting`]: ClientControl::skip_waiting
//! [`claim`]: ClientControl::claim

use async_trait::async_trait;

#[async_trait]
pub trait ClientControl: Send + Sync {
    /// Promote this controller immediately instead of waiting for every
    /// page using the previous version to close.
    fn skip_waiting(&self);

    /// Take control of all currently open pages. Activation is not
    /// complete until this resolves.
    async fn claim(&self);
}

/// No-op control for hosts without page tracking (tools, tests, batch
/// cache warmers).
pub struct DetachedClients;

#[async_trait]
impl ClientControl for DetachedClients {
    fn skip_waiting(&self) {}

    async fn claim(&self) {}
}
