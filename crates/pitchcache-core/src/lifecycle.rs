//! Install and activation handling.
//!
//! Install pre-populates the shell compartment for the current release.
//! Activation deletes compartments left behind by older releases or other
//! API hosts and takes control of every open UI context.

use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use crate::broadcast::Status;
use crate::cache::{self, CacheStore, Compartment, CompartmentKind};
use crate::context::InterceptContext;
use crate::error::{CacheError, NetworkError};
use crate::models::{InterceptedRequest, Response};

/// Assets that make up the application shell, relative to the app origin.
pub const SHELL_MANIFEST: &[&str] = &[
    "/",
    "/index.html",
    "/styles.css",
    "/app.js",
    "/js/api.js",
    "/js/router.js",
    "/js/pages/home.js",
    "/js/pages/team.js",
    "/js/pages/fixtures.js",
    "/js/pages/league.js",
    "/icons/icon-192.png",
];

/// Maximum concurrent fetches while pre-caching the shell.
const MAX_CONCURRENT_FETCHES: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallReport {
    /// Number of shell assets written.
    pub cached: usize,
    /// Whether every manifest asset was fetched.
    pub complete: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivationReport {
    pub deleted: Vec<String>,
    pub claimed: usize,
}

/// Delete every data compartment except `data-{release}-{host}`, whatever
/// release it belongs to. Returns the deleted names.
pub async fn purge_data_except(
    store: &dyn CacheStore,
    release: &str,
    host: &str,
) -> Result<Vec<String>, CacheError> {
    let keep = cache::data_name(release, host);
    let mut deleted = Vec::new();
    for name in store.names().await? {
        if CompartmentKind::of(&name) == CompartmentKind::Data && name != keep {
            store.delete(&name).await?;
            deleted.push(name);
        }
    }
    Ok(deleted)
}

pub struct LifecycleManager {
    ctx: InterceptContext,
}

impl LifecycleManager {
    pub fn new(ctx: InterceptContext) -> Self {
        Self { ctx }
    }

    /// Pre-populate the shell compartment.
    ///
    /// Installation never waits for older instances: callers follow it with
    /// [`LifecycleManager::on_activate`] straight away.
    ///
    /// Population is all-or-nothing: nothing is written unless every asset
    /// was fetched. A failure is logged and broadcast but never fails the
    /// install; only cache store errors do.
    pub async fn on_install(&self) -> Result<InstallReport, CacheError> {
        let release = &self.ctx.release;
        info!(release = %release, "Installing");
        self.ctx
            .broadcaster
            .notify(Status::Updating, &format!("Installing {}", release));

        let shell = Compartment::open(self.ctx.store.as_ref(), self.ctx.shell_name()).await?;

        let (cached, complete) = match self.fetch_manifest().await {
            Ok(assets) => {
                for (key, response) in &assets {
                    shell.put(key, response).await?;
                }
                info!(assets = assets.len(), "Shell cached");
                (assets.len(), true)
            }
            Err(e) => {
                warn!(error = %e, "Shell pre-cache incomplete");
                self.ctx
                    .broadcaster
                    .notify(Status::Offline, "Cache incomplete");
                (0, false)
            }
        };

        Ok(InstallReport { cached, complete })
    }

    async fn fetch_manifest(&self) -> Result<Vec<(String, Response)>, NetworkError> {
        let requests = SHELL_MANIFEST
            .iter()
            .map(|path| {
                self.ctx
                    .origin
                    .join(path)
                    .map(|url| InterceptedRequest::new(reqwest::Method::GET, url))
                    .map_err(|e| NetworkError::InvalidRequest(format!("{}: {}", path, e)))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let network = &self.ctx.network;
        let results: Vec<Result<(String, Response), NetworkError>> = stream::iter(requests)
            .map(|request| async move {
                let response = network.fetch(&request).await?;
                Ok::<_, NetworkError>((request.cache_key(), response))
            })
            .buffer_unordered(MAX_CONCURRENT_FETCHES)
            .collect()
            .await;

        results.into_iter().collect()
    }

    /// Purge stale compartments, announce readiness and claim UI contexts.
    ///
    /// With a known `api_host`, only that host's data compartment for the
    /// current release survives; without one, data compartments of the
    /// current release all survive. Compartments of unknown families are
    /// left alone.
    pub async fn on_activate(&self, api_host: Option<&str>) -> Result<ActivationReport, CacheError> {
        let store = self.ctx.store.as_ref();
        let current_shell = self.ctx.shell_name();
        let current_data = api_host.map(|host| self.ctx.data_name(host));
        let release_prefix = cache::data_release_prefix(&self.ctx.release);

        let mut deleted = Vec::new();
        for name in store.names().await? {
            let stale = match CompartmentKind::of(&name) {
                CompartmentKind::Shell => name != current_shell,
                CompartmentKind::Data => match current_data {
                    Some(ref keep) => &name != keep,
                    None => !name.starts_with(&release_prefix),
                },
                CompartmentKind::Other => false,
            };
            if stale {
                debug!(compartment = %name, "Deleting stale compartment");
                store.delete(&name).await?;
                deleted.push(name);
            }
        }

        if let Some(host) = api_host {
            self.ctx.hosts.record(host).await;
        }

        self.ctx.broadcaster.notify(Status::Live, "Cache ready");
        let claimed = self.ctx.broadcaster.claim();
        info!(deleted = deleted.len(), claimed, "Activated");

        Ok(ActivationReport { deleted, claimed })
    }
}
