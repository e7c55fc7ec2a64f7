//! The interception facade.
//!
//! `Interceptor` is the single entry point a host uses: it classifies each
//! request, runs the matching strategy and exposes the install/activate
//! lifecycle hooks.

use std::sync::Arc;

use tracing::{debug, instrument};

use crate::broadcast::StatusBroadcaster;
use crate::cache::CacheStore;
use crate::classify::classify;
use crate::config::Config;
use crate::context::InterceptContext;
use crate::error::CacheError;
use crate::lifecycle::{ActivationReport, InstallReport, LifecycleManager};
use crate::models::{InterceptedRequest, Url};
use crate::network::Network;
use crate::strategy::{Interception, Strategy};

pub struct Interceptor {
    ctx: InterceptContext,
    lifecycle: LifecycleManager,
}

impl Interceptor {
    pub fn new(
        origin: Url,
        release: impl Into<Arc<str>>,
        store: Arc<dyn CacheStore>,
        network: Arc<dyn Network>,
    ) -> Self {
        Self::with_context(InterceptContext::new(origin, release, store, network))
    }

    pub fn from_config(
        config: &Config,
        store: Arc<dyn CacheStore>,
        network: Arc<dyn Network>,
    ) -> anyhow::Result<Self> {
        Ok(Self::new(
            config.origin_url()?,
            config.release_version.as_str(),
            store,
            network,
        ))
    }

    pub fn with_context(ctx: InterceptContext) -> Self {
        Self {
            lifecycle: LifecycleManager::new(ctx.clone()),
            ctx,
        }
    }

    pub fn context(&self) -> &InterceptContext {
        &self.ctx
    }

    pub fn broadcaster(&self) -> &Arc<StatusBroadcaster> {
        &self.ctx.broadcaster
    }

    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.ctx.store
    }

    pub fn classify(&self, request: &InterceptedRequest) -> Option<Strategy> {
        classify(request, &self.ctx.origin)
    }

    /// Handle one intercepted request.
    ///
    /// `Ok(None)` means the request is not intercepted and the host should
    /// let it through untouched. Network failures never surface here; a
    /// cache store failure does.
    #[instrument(skip_all, fields(method = %request.method, url = %request.url))]
    pub async fn handle(
        &self,
        request: &InterceptedRequest,
    ) -> Result<Option<Interception>, CacheError> {
        let Some(strategy) = self.classify(request) else {
            debug!("Passing request through");
            return Ok(None);
        };
        debug!(strategy = strategy.name(), "Intercepted");
        strategy.execute(request, &self.ctx).await.map(Some)
    }

    pub async fn on_install(&self) -> Result<InstallReport, CacheError> {
        self.lifecycle.on_install().await
    }

    pub async fn on_activate(&self, api_host: Option<&str>) -> Result<ActivationReport, CacheError> {
        self.lifecycle.on_activate(api_host).await
    }

    /// The API host seen most recently, if any.
    pub async fn current_api_host(&self) -> Option<String> {
        self.ctx.hosts.current().await
    }
}
