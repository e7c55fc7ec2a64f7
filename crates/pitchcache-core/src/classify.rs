//! Request classification.
//!
//! Every intercepted request maps to at most one strategy. Rules are
//! evaluated in order and the first match wins:
//!
//! 1. non-GET: not intercepted
//! 2. navigation/document load: [`Strategy::Navigation`]
//! 3. remote-API path (any origin): [`Strategy::Api`]
//! 4. same-origin: [`Strategy::Static`]
//! 5. anything else: not intercepted

use once_cell::sync::Lazy;
use regex::RegexSet;

use crate::models::{InterceptedRequest, Url};
use crate::strategy::Strategy;

/// Remote-API path patterns. The API may be mounted under a prefix, so each
/// pattern matches the tail of the path.
const API_PATH_PATTERNS: &[&str] = &[
    r"/api/bootstrap-static/?$",
    r"/api/fixtures(/.*)?$",
    r"/api/entry/\d+/?$",
    r"/api/entry/\d+/history/?$",
    r"/api/entry/\d+/event/\d+/picks/?$",
    r"/api/element-summary/\d+/?$",
    r"/api/leagues-classic/\d+/standings/?$",
    r"/api/event/\d+/live/?$",
    r"(^|/)health/?$",
    r"(^|/)healthz/?$",
    r"/api/health/?$",
];

static API_PATHS: Lazy<RegexSet> =
    Lazy::new(|| RegexSet::new(API_PATH_PATTERNS).expect("Invalid API path pattern"));

/// Whether `path` addresses the remote API.
pub fn is_api_path(path: &str) -> bool {
    API_PATHS.is_match(path)
}

/// Pick the strategy for `request`, or `None` to let it pass through.
pub fn classify(request: &InterceptedRequest, app_origin: &Url) -> Option<Strategy> {
    if !request.is_get() {
        return None;
    }
    if request.is_navigation() {
        return Some(Strategy::Navigation);
    }
    if is_api_path(request.path()) {
        return Some(Strategy::Api);
    }
    if request.is_same_origin(app_origin) {
        return Some(Strategy::Static);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::Method;

    fn origin() -> Url {
        Url::parse("https://app.example.com").unwrap()
    }

    fn get(url: &str) -> InterceptedRequest {
        InterceptedRequest::get(url).unwrap()
    }

    #[test]
    fn test_api_paths() {
        for path in [
            "/api/bootstrap-static/",
            "/api/bootstrap-static",
            "/api/fixtures/",
            "/api/fixtures/?event=7",
            "/api/entry/123456/",
            "/api/entry/123456/history/",
            "/api/entry/42/event/7/picks/",
            "/api/element-summary/318/",
            "/api/leagues-classic/314/standings/",
            "/api/event/12/live/",
            "/health",
            "/healthz",
            "/api/health",
            "/fpl/api/bootstrap-static/",
        ] {
            assert!(is_api_path(path), "{} should be an API path", path);
        }
    }

    #[test]
    fn test_non_api_paths() {
        for path in [
            "/",
            "/app.js",
            "/api/entry/abc/",
            "/api/entry/12/event/x/picks/",
            "/api/bootstrap-static/extra",
            "/healthcheck",
            "/js/pages/health.js",
        ] {
            assert!(!is_api_path(path), "{} should not be an API path", path);
        }
    }

    #[test]
    fn test_non_get_is_never_intercepted() {
        let req = get("https://app.example.com/api/bootstrap-static/").with_method(Method::POST);
        assert_eq!(classify(&req, &origin()), None);

        let req = InterceptedRequest::navigation("https://app.example.com/")
            .unwrap()
            .with_method(Method::POST);
        assert_eq!(classify(&req, &origin()), None);
    }

    #[test]
    fn test_navigation_wins_over_api_and_static() {
        let req = InterceptedRequest::navigation("https://app.example.com/api/health").unwrap();
        assert_eq!(classify(&req, &origin()), Some(Strategy::Navigation));
    }

    #[test]
    fn test_api_any_origin() {
        let req = get("https://fantasy.premierleague.com/api/event/3/live/");
        assert_eq!(classify(&req, &origin()), Some(Strategy::Api));

        let req = get("https://app.example.com/api/fixtures/");
        assert_eq!(classify(&req, &origin()), Some(Strategy::Api));
    }

    #[test]
    fn test_same_origin_is_static() {
        let req = get("https://app.example.com/styles.css");
        assert_eq!(classify(&req, &origin()), Some(Strategy::Static));
    }

    #[test]
    fn test_cross_origin_non_api_passes_through() {
        let req = get("https://cdn.example.net/font.woff2");
        assert_eq!(classify(&req, &origin()), None);

        // Same host, different scheme is a different origin
        let req = get("http://app.example.com/styles.css");
        assert_eq!(classify(&req, &origin()), None);
    }
}
