//! Connectivity status broadcasting.
//!
//! `StatusBroadcaster` owns the registry of UI contexts and the last status
//! it sent. Repeated statuses without new detail are coalesced so contexts
//! are not flooded with duplicates.

use std::fmt;
use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Buffer size of each UI context's message channel.
/// Status changes are rare; 32 gives a slow reader plenty of headroom.
const CHANNEL_BUFFER_SIZE: usize = 32;

/// Connectivity state as seen by UI contexts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Updating,
    Live,
    Offline,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Status::Updating => "updating",
            Status::Live => "live",
            Status::Offline => "offline",
        };
        f.write_str(s)
    }
}

/// Message posted to UI contexts. Serializes as
/// `{"kind":"connectivity","status":"live","detail":"..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ClientMessage {
    Connectivity { status: Status, detail: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId(u64);

struct Client {
    id: ClientId,
    sender: mpsc::Sender<ClientMessage>,
    controlled: bool,
}

#[derive(Default)]
struct Inner {
    last: Option<Status>,
    clients: Vec<Client>,
    next_id: u64,
}

#[derive(Default)]
pub struct StatusBroadcaster {
    inner: Mutex<Inner>,
}

impl StatusBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // No code path panics while holding the lock, but a poisoned registry
        // is still usable.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Register a UI context. It receives every broadcast from now on, even
    /// before it is claimed.
    pub fn register(&self) -> (ClientId, mpsc::Receiver<ClientMessage>) {
        let (sender, receiver) = mpsc::channel(CHANNEL_BUFFER_SIZE);
        let mut inner = self.lock();
        let id = ClientId(inner.next_id);
        inner.next_id += 1;
        inner.clients.push(Client {
            id,
            sender,
            controlled: false,
        });
        debug!(client = id.0, "UI context registered");
        (id, receiver)
    }

    pub fn unregister(&self, id: ClientId) -> bool {
        let mut inner = self.lock();
        let before = inner.clients.len();
        inner.clients.retain(|c| c.id != id);
        inner.clients.len() != before
    }

    /// Take control of every registered context. Returns how many were newly
    /// claimed.
    pub fn claim(&self) -> usize {
        let mut inner = self.lock();
        let mut claimed = 0;
        for client in inner.clients.iter_mut().filter(|c| !c.controlled) {
            client.controlled = true;
            claimed += 1;
        }
        claimed
    }

    pub fn is_controlled(&self, id: ClientId) -> bool {
        self.lock()
            .clients
            .iter()
            .any(|c| c.id == id && c.controlled)
    }

    pub fn client_count(&self) -> usize {
        self.lock().clients.len()
    }

    pub fn last_status(&self) -> Option<Status> {
        self.lock().last
    }

    /// Broadcast `status` to every registered context.
    ///
    /// A no-op when `status` equals the last broadcast status and `detail` is
    /// empty. Returns whether a message was posted.
    pub fn notify(&self, status: Status, detail: &str) -> bool {
        let mut inner = self.lock();
        if inner.last == Some(status) && detail.is_empty() {
            return false;
        }
        inner.last = Some(status);

        let message = ClientMessage::Connectivity {
            status,
            detail: detail.to_string(),
        };
        debug!(%status, detail, clients = inner.clients.len(), "Broadcasting connectivity status");

        inner.clients.retain(|client| match client.sender.try_send(message.clone()) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(client = client.id.0, "UI context is not draining messages, dropping status");
                true
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!(client = client.id.0, "UI context went away");
                false
            }
        });
        true
    }
}
