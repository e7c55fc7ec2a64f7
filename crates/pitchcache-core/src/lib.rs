//! pitchcache core library.
//!
//! The offline-resilient request-interception layer of the pitchcache web
//! app. Every outgoing GET from a UI context is classified, served by one of
//! three caching strategies against versioned cache compartments, and the
//! outcome is broadcast to all open UI contexts as a connectivity status.
//!
//! ```text
//! request -> classify -> Strategy::execute -> CacheStore / Network
//!                                          -> StatusBroadcaster
//! ```

pub mod broadcast;
pub mod cache;
pub mod classify;
pub mod config;
pub mod context;
pub mod error;
pub mod interceptor;
pub mod lifecycle;
pub mod models;
pub mod network;
pub mod strategy;

#[cfg(test)]
mod testing;

pub use broadcast::{ClientId, ClientMessage, Status, StatusBroadcaster};
pub use cache::{CacheStore, DiskCacheStore, MemoryCacheStore};
pub use classify::classify;
pub use config::Config;
pub use context::InterceptContext;
pub use error::{CacheError, NetworkError};
pub use interceptor::Interceptor;
pub use lifecycle::{ActivationReport, InstallReport, LifecycleManager, SHELL_MANIFEST};
pub use models::{InterceptedRequest, OfflineBody, Response, Url};
pub use network::{HttpNetwork, Network};
pub use strategy::{HostTracker, Interception, ResponseSource, Strategy};
