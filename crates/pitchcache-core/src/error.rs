use thiserror::Error;

/// Failure of a single network attempt.
///
/// Strategies recover from every variant locally (cache fallback or a
/// synthesized offline response), so this never leaves the interceptor.
#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Upstream returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// Failure of the persistent cache store. Fatal for the request being handled.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Corrupt cache compartment {name}: {reason}")]
    Corrupt { name: String, reason: String },
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl NetworkError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    pub fn from_status(status: u16, body: &str) -> Self {
        NetworkError::Status {
            status,
            body: Self::truncate_body(body),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status_keeps_short_body() {
        let err = NetworkError::from_status(502, "bad gateway");
        assert_eq!(err.to_string(), "Upstream returned 502: bad gateway");
    }

    #[test]
    fn test_from_status_truncates_long_body() {
        let body = "x".repeat(MAX_ERROR_BODY_LENGTH + 20);
        match NetworkError::from_status(500, &body) {
            NetworkError::Status { status, body } => {
                assert_eq!(status, 500);
                assert!(body.contains("truncated, 520 total bytes"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_truncate_respects_char_boundary() {
        let body = format!("{}é{}", "a".repeat(MAX_ERROR_BODY_LENGTH - 1), "b".repeat(10));
        let truncated = NetworkError::truncate_body(&body);
        assert!(truncated.starts_with(&"a".repeat(MAX_ERROR_BODY_LENGTH - 1)));
    }
}
