use tokio::sync::Mutex;
use tracing::{debug, info};

use super::Interception;
use crate::broadcast::Status;
use crate::cache::{CacheStore, Compartment};
use crate::context::InterceptContext;
use crate::error::CacheError;
use crate::lifecycle::purge_data_except;
use crate::models::{InterceptedRequest, Response};

/// Host key used when an API request URL carries no host at all.
const HOSTLESS_KEY: &str = "local";

/// Remembers the API host seen last, so a change of host can invalidate the
/// previous host's data compartments.
#[derive(Debug, Default)]
pub struct HostTracker {
    current: Mutex<Option<String>>,
}

impl HostTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn current(&self) -> Option<String> {
        self.current.lock().await.clone()
    }

    /// Record `host` without purging, e.g. when activation already did.
    pub async fn record(&self, host: &str) {
        *self.current.lock().await = Some(host.to_string());
    }

    /// Make `host` the current API host. When it differs from the last one
    /// seen (or none was seen yet) every data compartment not belonging to
    /// `host` is deleted first. Returns the deleted names.
    pub async fn observe(
        &self,
        host: &str,
        store: &dyn CacheStore,
        release: &str,
    ) -> Result<Vec<String>, CacheError> {
        let mut current = self.current.lock().await;
        if current.as_deref() == Some(host) {
            return Ok(Vec::new());
        }

        let purged = purge_data_except(store, release, host).await?;
        info!(
            from = current.as_deref().unwrap_or("-"),
            to = host,
            purged = purged.len(),
            "API host changed"
        );
        *current = Some(host.to_string());
        Ok(purged)
    }
}

/// Network first against the per-host data compartment.
pub(super) async fn network_first_host_keyed(
    request: &InterceptedRequest,
    ctx: &InterceptContext,
) -> Result<Interception, CacheError> {
    let host = request
        .host_key()
        .unwrap_or_else(|| HOSTLESS_KEY.to_string());
    ctx.hosts
        .observe(&host, ctx.store.as_ref(), &ctx.release)
        .await?;

    let data = Compartment::open(ctx.store.as_ref(), ctx.data_name(&host)).await?;
    let key = request.cache_key();

    match ctx.network.fetch(request).await {
        Ok(response) => {
            data.put(&key, &response).await?;
            ctx.broadcaster.notify(Status::Live, "");
            Ok(Interception::network(response))
        }
        Err(e) => {
            debug!(url = %request.url, error = %e, "API fetch failed, trying data cache");
            match data.get(&key).await? {
                Some(cached) => {
                    ctx.broadcaster
                        .notify(Status::Offline, "Serving cached API response");
                    Ok(Interception::cache(cached))
                }
                None => {
                    ctx.broadcaster.notify(Status::Offline, "");
                    Ok(Interception::synthesized(Response::offline_json()))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::broadcast::{ClientMessage, Status};
    use crate::cache::{CacheStore, MatchOptions};
    use crate::models::{InterceptedRequest, OfflineBody};
    use crate::strategy::{ResponseSource, Strategy};
    use crate::testing::{harness, json};

    const BOOTSTRAP_A: &str = "https://a.example.com/api/bootstrap-static/";
    const BOOTSTRAP_B: &str = "https://b.example.com/api/bootstrap-static/";

    #[tokio::test]
    async fn test_success_stored_under_host_compartment() {
        let h = harness();
        h.network.respond(BOOTSTRAP_A, json(r#"{"events":[]}"#));

        let req = InterceptedRequest::get(BOOTSTRAP_A).unwrap();
        let out = Strategy::Api.execute(&req, &h.ctx).await.unwrap();

        assert_eq!(out.source, ResponseSource::Network);
        assert_eq!(
            h.store.keys("data-v7-a.example.com").await.unwrap(),
            vec![BOOTSTRAP_A.to_string()]
        );
        assert_eq!(h.ctx.hosts.current().await.as_deref(), Some("a.example.com"));
    }

    #[tokio::test]
    async fn test_failure_serves_latest_stored_entry() {
        let h = harness();
        let req = InterceptedRequest::get(BOOTSTRAP_A).unwrap();
        h.network.respond(BOOTSTRAP_A, json(r#"{"events":[1]}"#));
        Strategy::Api.execute(&req, &h.ctx).await.unwrap();
        h.network.respond(BOOTSTRAP_A, json(r#"{"events":[1,2]}"#));
        Strategy::Api.execute(&req, &h.ctx).await.unwrap();

        h.network.fail(BOOTSTRAP_A);
        let (_id, mut rx) = h.ctx.broadcaster.register();
        let out = Strategy::Api.execute(&req, &h.ctx).await.unwrap();

        assert_eq!(out.source, ResponseSource::Cache);
        assert_eq!(out.response.text(), r#"{"events":[1,2]}"#);
        assert_eq!(
            rx.try_recv().unwrap(),
            ClientMessage::Connectivity {
                status: Status::Offline,
                detail: "Serving cached API response".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_failure_without_cache_returns_ok_false() {
        let h = harness();
        h.network.set_offline(true);

        let req = InterceptedRequest::get("https://a.example.com/api/event/5/live/").unwrap();
        let out = Strategy::Api.execute(&req, &h.ctx).await.unwrap();

        assert_eq!(out.source, ResponseSource::Synthesized);
        assert_eq!(out.response.status, 503);
        let body: OfflineBody = out.response.json().unwrap();
        assert!(!body.ok);
        assert_eq!(body.message, "Offline");
    }

    #[tokio::test]
    async fn test_host_migration_purges_previous_host() {
        let h = harness();
        h.network.respond(BOOTSTRAP_A, json(r#"{"events":[]}"#));
        Strategy::Api
            .execute(&InterceptedRequest::get(BOOTSTRAP_A).unwrap(), &h.ctx)
            .await
            .unwrap();
        assert!(h
            .store
            .names()
            .await
            .unwrap()
            .contains(&"data-v7-a.example.com".to_string()));

        h.network.fail(BOOTSTRAP_B);
        let out = Strategy::Api
            .execute(&InterceptedRequest::get(BOOTSTRAP_B).unwrap(), &h.ctx)
            .await
            .unwrap();

        // Host A's body must not leak into host B's fallback
        assert_eq!(out.source, ResponseSource::Synthesized);
        let body: serde_json::Value = out.response.json().unwrap();
        assert_eq!(body, serde_json::json!({"ok": false, "message": "Offline"}));

        let names = h.store.names().await.unwrap();
        assert!(!names.contains(&"data-v7-a.example.com".to_string()));
        assert!(names.contains(&"data-v7-b.example.com".to_string()));
    }

    #[tokio::test]
    async fn test_first_api_request_purges_leftover_hosts() {
        let h = harness();
        let stale = json(r#"{"old":true}"#);
        h.store.put("data-v6-a.example.com", BOOTSTRAP_A, &stale).await.unwrap();
        h.store.put("data-v7-old.example.com", "https://old.example.com/x", &stale).await.unwrap();
        h.store.put("static-v7", "https://app.example.com/", &stale).await.unwrap();

        h.network.respond(BOOTSTRAP_A, json(r#"{"events":[]}"#));
        Strategy::Api
            .execute(&InterceptedRequest::get(BOOTSTRAP_A).unwrap(), &h.ctx)
            .await
            .unwrap();

        assert_eq!(
            h.store.names().await.unwrap(),
            vec!["data-v7-a.example.com".to_string(), "static-v7".to_string()]
        );
    }

    #[tokio::test]
    async fn test_same_host_does_not_purge() {
        let h = harness();
        h.network.respond(BOOTSTRAP_A, json("{}"));
        let fixtures = "https://a.example.com/api/fixtures/";
        h.network.respond(fixtures, json("[]"));

        Strategy::Api
            .execute(&InterceptedRequest::get(BOOTSTRAP_A).unwrap(), &h.ctx)
            .await
            .unwrap();
        Strategy::Api
            .execute(&InterceptedRequest::get(fixtures).unwrap(), &h.ctx)
            .await
            .unwrap();

        let hit = h
            .store
            .match_entry("data-v7-a.example.com", BOOTSTRAP_A, MatchOptions::default())
            .await
            .unwrap();
        assert!(hit.is_some());
    }
}
