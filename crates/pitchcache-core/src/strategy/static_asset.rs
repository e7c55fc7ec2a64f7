use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::Interception;
use crate::broadcast::Status;
use crate::cache::Compartment;
use crate::context::InterceptContext;
use crate::error::CacheError;
use crate::models::{InterceptedRequest, Response};

/// Serve from the shell compartment when possible and refresh it in the
/// background; otherwise block on the network.
pub(super) async fn stale_while_revalidate(
    request: &InterceptedRequest,
    ctx: &InterceptContext,
) -> Result<Interception, CacheError> {
    let shell = Compartment::open(ctx.store.as_ref(), ctx.shell_name()).await?;
    let key = request.cache_key();

    if let Some(cached) = shell.get(&key).await? {
        debug!(url = %request.url, "Static asset served from cache, revalidating");
        let mut interception = Interception::cache(cached);
        interception.revalidation = Some(spawn_revalidation(request.clone(), key, ctx.clone()));
        return Ok(interception);
    }

    match ctx.network.fetch(request).await {
        Ok(response) => {
            shell.put(&key, &response).await?;
            ctx.broadcaster.notify(Status::Live, "");
            Ok(Interception::network(response))
        }
        Err(e) => {
            debug!(url = %request.url, error = %e, "Static asset unavailable");
            ctx.broadcaster.notify(Status::Offline, "");
            Ok(Interception::synthesized(Response::offline_text()))
        }
    }
}

/// Refresh `key` in a detached task. Nothing here can reach the caller that
/// already got the cached value: a failed fetch leaves the compartment
/// untouched and a failed write is only logged.
fn spawn_revalidation(
    request: InterceptedRequest,
    key: String,
    ctx: InterceptContext,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let response = match ctx.network.fetch(&request).await {
            Ok(response) => response,
            Err(e) => {
                debug!(url = %request.url, error = %e, "Background revalidation failed");
                return;
            }
        };

        if let Err(e) = ctx.store.put(&ctx.shell_name(), &key, &response).await {
            warn!(url = %request.url, error = %e, "Failed to store revalidated asset");
            return;
        }
        ctx.broadcaster.notify(Status::Live, "");
    })
}
