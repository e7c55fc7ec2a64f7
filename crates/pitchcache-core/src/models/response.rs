//! Response snapshots.

use std::borrow::Cow;

use serde::{de::DeserializeOwned, Deserialize, Serialize};

/// Status code of every synthesized offline response.
pub const OFFLINE_STATUS: u16 = 503;

/// Body text of synthesized document/static failures.
const OFFLINE_TEXT: &str = "Offline";

/// A response body plus headers. Stored verbatim in compartments; no
/// freshness metadata lives here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub status: u16,
    #[serde(default)]
    pub headers: Vec<(String, String)>,
    #[serde(default)]
    pub body: Vec<u8>,
}

/// JSON body of a synthesized API failure. `ok` lets callers branch without
/// looking at the status code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfflineBody {
    pub ok: bool,
    pub message: String,
}

impl Response {
    pub fn new(status: u16, headers: Vec<(String, String)>, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
        }
    }

    /// A 200 response with the given content type.
    pub fn ok(content_type: &str, body: impl Into<Vec<u8>>) -> Self {
        Self::new(
            200,
            vec![("content-type".to_string(), content_type.to_string())],
            body,
        )
    }

    /// Plain-text failure for documents and static assets.
    pub fn offline_text() -> Self {
        Self::new(
            OFFLINE_STATUS,
            vec![(
                "content-type".to_string(),
                "text/plain; charset=utf-8".to_string(),
            )],
            OFFLINE_TEXT,
        )
    }

    /// JSON failure for API requests: `{"ok":false,"message":"Offline"}`.
    pub fn offline_json() -> Self {
        let body = OfflineBody {
            ok: false,
            message: OFFLINE_TEXT.to_string(),
        };
        // Serializing two plain fields cannot fail.
        let body = serde_json::to_vec(&body).unwrap_or_default();
        Self::new(
            OFFLINE_STATUS,
            vec![("content-type".to_string(), "application/json".to_string())],
            body,
        )
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    pub fn json<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_slice(&self.body)
    }
}
