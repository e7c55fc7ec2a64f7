//! The intercepted request surface.

use reqwest::Method;
pub use reqwest::Url;

use crate::error::NetworkError;

/// An outgoing request captured from a UI context.
#[derive(Debug, Clone)]
pub struct InterceptedRequest {
    pub method: Method,
    pub url: Url,
    /// Explicit navigation/document flag. `None` means the host did not say,
    /// in which case the `Accept` header decides.
    pub navigate: Option<bool>,
    pub accept: Option<String>,
}

impl InterceptedRequest {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            navigate: None,
            accept: None,
        }
    }

    /// Parse `url` into a GET request.
    pub fn get(url: &str) -> Result<Self, NetworkError> {
        let url = Url::parse(url)
            .map_err(|e| NetworkError::InvalidRequest(format!("{}: {}", url, e)))?;
        Ok(Self::new(Method::GET, url))
    }

    /// Parse `url` into a GET request flagged as a full-page navigation.
    pub fn navigation(url: &str) -> Result<Self, NetworkError> {
        Ok(Self::get(url)?.with_navigate(true))
    }

    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn with_navigate(mut self, navigate: bool) -> Self {
        self.navigate = Some(navigate);
        self
    }

    pub fn with_accept(mut self, accept: impl Into<String>) -> Self {
        self.accept = Some(accept.into());
        self
    }

    pub fn is_get(&self) -> bool {
        self.method == Method::GET
    }

    /// Whether this is a full-page document load.
    pub fn is_navigation(&self) -> bool {
        match self.navigate {
            Some(flag) => flag,
            None => self
                .accept
                .as_deref()
                .map(accept_prefers_html)
                .unwrap_or(false),
        }
    }

    pub fn path(&self) -> &str {
        self.url.path()
    }

    /// Key under which this request's response is stored. Fragments never
    /// reach the network, so they are not part of the key.
    pub fn cache_key(&self) -> String {
        let mut url = self.url.clone();
        url.set_fragment(None);
        url.to_string()
    }

    /// `host[:port]` of the request target, used to partition API data.
    pub fn host_key(&self) -> Option<String> {
        let host = self.url.host_str()?;
        Some(match self.url.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        })
    }

    pub fn is_same_origin(&self, origin: &Url) -> bool {
        self.url.origin() == origin.origin()
    }
}

/// True when `text/html` is the first media range the client lists.
fn accept_prefers_html(accept: &str) -> bool {
    accept
        .split(',')
        .next()
        .map(|range| {
            range
                .split(';')
                .next()
                .unwrap_or_default()
                .trim()
                .eq_ignore_ascii_case("text/html")
        })
        .unwrap_or(false)
}
