use tracing::debug;

use super::Interception;
use crate::broadcast::Status;
use crate::cache::Compartment;
use crate::context::InterceptContext;
use crate::error::CacheError;
use crate::models::{InterceptedRequest, Response};

/// Network first; on failure serve the cached shell for the same path,
/// ignoring the query string.
pub(super) async fn network_first(
    request: &InterceptedRequest,
    ctx: &InterceptContext,
) -> Result<Interception, CacheError> {
    let shell = Compartment::open(ctx.store.as_ref(), ctx.shell_name()).await?;
    let key = request.cache_key();

    match ctx.network.fetch(request).await {
        Ok(response) => {
            shell.put(&key, &response).await?;
            ctx.broadcaster.notify(Status::Live, "");
            Ok(Interception::network(response))
        }
        Err(e) => {
            debug!(url = %request.url, error = %e, "Document fetch failed, trying cached shell");
            match shell.get_ignoring_search(&key).await? {
                Some(cached) => {
                    ctx.broadcaster.notify(Status::Offline, "Serving cached shell");
                    Ok(Interception::cache(cached))
                }
                None => {
                    ctx.broadcaster.notify(Status::Offline, "");
                    Ok(Interception::synthesized(Response::offline_text()))
                }
            }
        }
    }
}
