use std::sync::Arc;

use crate::broadcast::StatusBroadcaster;
use crate::cache::{self, CacheStore};
use crate::models::Url;
use crate::network::Network;
use crate::strategy::HostTracker;

/// Everything a strategy or lifecycle step needs. Cloning shares the
/// collaborators, so a clone can move into a background task.
#[derive(Clone)]
pub struct InterceptContext {
    pub store: Arc<dyn CacheStore>,
    pub network: Arc<dyn Network>,
    pub broadcaster: Arc<StatusBroadcaster>,
    pub hosts: Arc<HostTracker>,
    pub release: Arc<str>,
    /// Origin of the application itself; decides what counts as static.
    pub origin: Url,
}

impl InterceptContext {
    pub fn new(
        origin: Url,
        release: impl Into<Arc<str>>,
        store: Arc<dyn CacheStore>,
        network: Arc<dyn Network>,
    ) -> Self {
        Self {
            store,
            network,
            broadcaster: Arc::new(StatusBroadcaster::new()),
            hosts: Arc::new(HostTracker::new()),
            release: release.into(),
            origin,
        }
    }

    /// Name of the current shell compartment.
    pub fn shell_name(&self) -> String {
        cache::shell_name(&self.release)
    }

    /// Name of the current data compartment for `host`.
    pub fn data_name(&self, host: &str) -> String {
        cache::data_name(&self.release, host)
    }
}
