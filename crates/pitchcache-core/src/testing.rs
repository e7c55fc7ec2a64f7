//! Test doubles shared by the unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::cache::MemoryCacheStore;
use crate::context::InterceptContext;
use crate::error::NetworkError;
use crate::models::{InterceptedRequest, Response, Url};
use crate::network::Network;

pub const ORIGIN: &str = "https://app.example.com";
pub const RELEASE: &str = "v7";

/// A `Network` whose answers are scripted per URL. Unknown URLs get a 404,
/// an unreachable network gets a 503, and every attempt is recorded.
#[derive(Default)]
pub struct ScriptedNetwork {
    routes: Mutex<HashMap<String, Response>>,
    failing: Mutex<HashSet<String>>,
    offline: AtomicBool,
    log: Mutex<Vec<String>>,
    gate: Mutex<Option<Arc<Notify>>>,
}

impl ScriptedNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, url: &str, response: Response) {
        self.failing.lock().unwrap().remove(url);
        self.routes.lock().unwrap().insert(url.to_string(), response);
    }

    pub fn fail(&self, url: &str) {
        self.failing.lock().unwrap().insert(url.to_string());
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Hold every later fetch until the returned gate is notified once per fetch.
    pub fn stall(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub fn fetched(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }
}

#[async_trait]
impl Network for ScriptedNetwork {
    async fn fetch(&self, request: &InterceptedRequest) -> Result<Response, NetworkError> {
        let key = request.cache_key();
        self.log.lock().unwrap().push(key.clone());

        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        if self.offline.load(Ordering::SeqCst) {
            return Err(NetworkError::from_status(503, "network is down"));
        }
        if self.failing.lock().unwrap().contains(&key) {
            return Err(NetworkError::from_status(503, &format!("{} unreachable", key)));
        }
        self.routes
            .lock()
            .unwrap()
            .get(&key)
            .cloned()
            .ok_or_else(|| NetworkError::from_status(404, "not found"))
    }
}

pub struct Harness {
    pub ctx: InterceptContext,
    pub store: Arc<MemoryCacheStore>,
    pub network: Arc<ScriptedNetwork>,
}

pub fn harness() -> Harness {
    let store = Arc::new(MemoryCacheStore::new());
    let network = Arc::new(ScriptedNetwork::new());
    let ctx = InterceptContext::new(
        Url::parse(ORIGIN).unwrap(),
        RELEASE,
        store.clone(),
        network.clone(),
    );
    Harness {
        ctx,
        store,
        network,
    }
}

pub fn html(body: &str) -> Response {
    Response::ok("text/html; charset=utf-8", body)
}

pub fn json(body: &str) -> Response {
    Response::ok("application/json", body)
}
