//! The network seam.
//!
//! Strategies only ever reach the network through `Network`, so tests can
//! script outcomes and hosts can route requests however they like.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client};
use tracing::debug;

use crate::error::NetworkError;
use crate::models::{InterceptedRequest, Response};

/// One network attempt per call; no retries.
///
/// A non-success status is reported as `NetworkError::Status`, so callers
/// only ever see successful responses on the `Ok` path.
#[async_trait]
pub trait Network: Send + Sync {
    async fn fetch(&self, request: &InterceptedRequest) -> Result<Response, NetworkError>;
}

/// `Network` backed by reqwest.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct HttpNetwork {
    client: Client,
}

impl HttpNetwork {
    /// Create a client. `timeout` is the platform-level request timeout; the
    /// interception layer itself never times out.
    pub fn new(timeout: Option<Duration>) -> Result<Self, NetworkError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
        })
    }

    fn snapshot_headers(headers: &header::HeaderMap) -> Vec<(String, String)> {
        headers
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect()
    }
}

#[async_trait]
impl Network for HttpNetwork {
    async fn fetch(&self, request: &InterceptedRequest) -> Result<Response, NetworkError> {
        let mut builder = self
            .client
            .request(request.method.clone(), request.url.clone());
        if let Some(ref accept) = request.accept {
            builder = builder.header(header::ACCEPT, accept.as_str());
        }

        let response = builder.send().await?;
        let status = response.status();
        let headers = Self::snapshot_headers(response.headers());
        let body = response.bytes().await?;

        if !status.is_success() {
            debug!(url = %request.url, status = status.as_u16(), "Upstream returned failure status");
            return Err(NetworkError::from_status(
                status.as_u16(),
                &String::from_utf8_lossy(&body),
            ));
        }

        Ok(Response::new(status.as_u16(), headers, body.to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Answer the first connection with `reply` and hand back the raw request head.
    async fn serve_once(reply: String) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut head = Vec::new();
            let mut chunk = [0u8; 1024];
            while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                head.extend_from_slice(&chunk[..n]);
            }
            socket.write_all(reply.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
            String::from_utf8_lossy(&head).into_owned()
        });
        (format!("http://{}", addr), handle)
    }

    fn reply(status_line: &str, content_type: &str, body: &str) -> String {
        format!(
            "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status_line,
            content_type,
            body.len(),
            body
        )
    }

    #[tokio::test]
    async fn test_success_snapshots_status_headers_and_body() {
        let (base, server) =
            serve_once(reply("200 OK", "application/json", r#"{"ok":true}"#)).await;
        let network = HttpNetwork::new(None).unwrap();

        let request = InterceptedRequest::get(&format!("{}/api/bootstrap-static/", base))
            .unwrap()
            .with_accept("application/json");
        let response = network.fetch(&request).await.unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(response.content_type(), Some("application/json"));
        assert_eq!(response.text(), r#"{"ok":true}"#);

        let head = server.await.unwrap().to_ascii_lowercase();
        assert!(head.starts_with("get /api/bootstrap-static/ http/1.1"));
        assert!(head.contains("accept: application/json"));
    }

    #[tokio::test]
    async fn test_failure_status_is_an_error_with_truncated_body() {
        let body = "e".repeat(800);
        let (base, _server) =
            serve_once(reply("500 Internal Server Error", "text/plain", &body)).await;
        let network = HttpNetwork::new(None).unwrap();

        let request = InterceptedRequest::get(&format!("{}/api/fixtures/", base)).unwrap();
        match network.fetch(&request).await {
            Err(NetworkError::Status { status, body }) => {
                assert_eq!(status, 500);
                assert!(body.contains("truncated, 800 total bytes"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_refused_connection_is_a_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let network = HttpNetwork::new(None).unwrap();
        let request = InterceptedRequest::get(&format!("http://{}/", addr)).unwrap();
        assert!(matches!(
            network.fetch(&request).await,
            Err(NetworkError::Transport(_))
        ));
    }
}
