//! Strategy executors, one per request class.
//!
//! - `Navigation`: network first, falling back to the cached shell document
//! - `Static`: stale-while-revalidate against the shell compartment
//! - `Api`: network first, falling back to the per-host data compartment
//!
//! Network failures are always recovered here. Only cache store failures
//! escape as errors.

mod api;
mod document;
mod static_asset;

pub use api::HostTracker;

use tokio::task::JoinHandle;

use crate::context::InterceptContext;
use crate::error::CacheError;
use crate::models::{InterceptedRequest, Response};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Navigation,
    Static,
    Api,
}

impl Strategy {
    pub fn name(&self) -> &'static str {
        match self {
            Strategy::Navigation => "network-first-document",
            Strategy::Static => "stale-while-revalidate-static",
            Strategy::Api => "network-first-host-keyed-api",
        }
    }

    pub async fn execute(
        self,
        request: &InterceptedRequest,
        ctx: &InterceptContext,
    ) -> Result<Interception, CacheError> {
        match self {
            Strategy::Navigation => document::network_first(request, ctx).await,
            Strategy::Static => static_asset::stale_while_revalidate(request, ctx).await,
            Strategy::Api => api::network_first_host_keyed(request, ctx).await,
        }
    }
}

/// Where the returned response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSource {
    Network,
    Cache,
    Synthesized,
}

/// Outcome of one intercepted request.
#[derive(Debug)]
pub struct Interception {
    pub response: Response,
    pub source: ResponseSource,
    /// Detached background revalidation, if one was started. Dropping the
    /// handle does not cancel the task.
    pub revalidation: Option<JoinHandle<()>>,
}

impl Interception {
    fn new(response: Response, source: ResponseSource) -> Self {
        Self {
            response,
            source,
            revalidation: None,
        }
    }

    pub(crate) fn network(response: Response) -> Self {
        Self::new(response, ResponseSource::Network)
    }

    pub(crate) fn cache(response: Response) -> Self {
        Self::new(response, ResponseSource::Cache)
    }

    pub(crate) fn synthesized(response: Response) -> Self {
        Self::new(response, ResponseSource::Synthesized)
    }
}
