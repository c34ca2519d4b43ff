//! Request classification.
//!
//! An ordered table of typed `(Matcher, Strategy)` pairs. The first rule
//! that matches decides the strategy, so precedence is explicit in the
//! table order rather than implied by which substring list is checked
//! first.

use swcache_core::AppConfig;

use crate::request::Request;
use crate::strategy::Strategy;

/// Predicate over an intercepted request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Matcher {
    /// Full URL starts with the given text (e.g. a provider endpoint).
    UrlPrefix(String),
    /// URL path starts with the given text (e.g. `/api/`).
    PathPrefix(String),
    /// URL path ends with the given suffix, ignoring ASCII case (e.g. `.js`).
    PathSuffix(String),
    /// Page navigations.
    Navigation,
    /// Every request.
    Any,
}

impl Matcher {
    /// Network-first markers starting with `/` are path prefixes; anything
    /// else is matched against the start of the full URL.
    pub fn prefix(marker: &str) -> Self {
        if marker.starts_with('/') {
            Matcher::PathPrefix(marker.to_string())
        } else {
            Matcher::UrlPrefix(marker.to_string())
        }
    }

    pub fn matches(&self, request: &Request) -> bool {
        match self {
            Matcher::UrlPrefix(prefix) => request.url.as_str().starts_with(prefix.as_str()),
            Matcher::PathPrefix(prefix) => request.url.path().starts_with(prefix.as_str()),
            Matcher::PathSuffix(suffix) => {
                let path = request.url.path();
                path.len() >= suffix.len()
                    && path.is_char_boundary(path.len() - suffix.len())
                    && path[path.len() - suffix.len()..].eq_ignore_ascii_case(suffix)
            }
            Matcher::Navigation => request.is_navigation(),
            Matcher::Any => true,
        }
    }
}

/// One row of the route table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub matcher: Matcher,
    pub strategy: Strategy,
}

impl Route {
    pub fn new(matcher: Matcher, strategy: Strategy) -> Self {
        Self { matcher, strategy }
    }
}

/// Ordered route table.
#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    pub fn new(routes: Vec<Route>) -> Self {
        Self { routes }
    }

    /// Build the table from configuration:
    ///
    /// 1. network-first markers
    /// 2. cache-first extensions
    /// 3. navigations
    /// 4. everything else, network-first
    pub fn from_config(config: &AppConfig) -> Self {
        let network_first = config
            .network_first
            .iter()
            .map(|marker| Route::new(Matcher::prefix(marker), Strategy::NetworkFirst));

        let cache_first = config
            .cache_first
            .iter()
            .map(|ext| Route::new(Matcher::PathSuffix(ext.clone()), Strategy::CacheFirst));

        let routes = network_first
            .chain(cache_first)
            .chain([
                Route::new(Matcher::Navigation, Strategy::Navigation),
                Route::new(Matcher::Any, Strategy::NetworkFirst),
            ])
            .collect();

        Self { routes }
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Pick the strategy for a request.
    ///
    /// Returns `None` when the request must not be intercepted: non-web
    /// schemes, or no rule matched.
    pub fn classify(&self, request: &Request) -> Option<Strategy> {
        if !request.is_web() {
            return None;
        }

        self.routes
            .iter()
            .find(|route| route.matcher.matches(request))
            .map(|route| route.strategy)
    }
}
