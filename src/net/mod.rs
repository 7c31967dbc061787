//! Network transport seam.
//!
//! The controller never talks to reqwest directly; it goes through the
//! [`NetworkTransport`] trait so hosts (and tests) can inject their own
//! transport. [`HttpTransport`] is the bundled reqwest-backed
//! implementation.
//!
//! An HTTP error status is a successful fetch here - a 404 page is a
//! response worth caching. Only transport-level failures (offline, DNS,
//! timeout) are [`NetworkError`]s.

pub mod error;
pub mod transport;

pub use error::NetworkError;
pub use transport::{HttpTransport, NetworkTransport};
