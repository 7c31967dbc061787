//! The offline cache controller.
//!
//! This module is the core of the crate: the install/activate lifecycle
//! and the per-request fetch strategies. The hosting environment awaits
//! [`OfflineCacheController::install`] before marking setup complete,
//! awaits [`OfflineCacheController::activate`] before considering the
//! controller active, and calls
//! [`OfflineCacheController::handle_fetch`] for every outgoing request.

pub mod clients;
pub mod controller;
pub mod error;

pub use clients::{ClientControl, DetachedClients};
pub use controller::OfflineCacheController;
pub use error::LifecycleError;
