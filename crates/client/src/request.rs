//! Intercepted request model.

use bytes::Bytes;
use reqwest::{Method, header::HeaderMap};
use url::Url;

use crate::fetch::url::{UrlError, is_web_scheme, resolve};

/// How the request was initiated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestMode {
    /// Full page document load.
    Navigate,
    /// Subresource or API call.
    #[default]
    Subresource,
}

/// A request intercepted from the application shell.
///
/// Headers and body are forwarded to the network unchanged.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub url: Url,
    pub mode: RequestMode,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
}

impl Request {
    pub fn new(method: Method, url: Url, mode: RequestMode) -> Self {
        Self { method, url, mode, headers: HeaderMap::new(), body: None }
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// A subresource GET.
    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url, RequestMode::Subresource)
    }

    /// A page navigation.
    pub fn navigate(url: Url) -> Self {
        Self::new(Method::GET, url, RequestMode::Navigate)
    }

    /// Resolve `target` against `origin` and build a request.
    pub fn parse(method: Method, target: &str, origin: &Url, mode: RequestMode) -> Result<Self, UrlError> {
        Ok(Self::new(method, resolve(target, origin)?, mode))
    }

    pub fn is_navigation(&self) -> bool {
        self.mode == RequestMode::Navigate
    }

    /// Whether the controller may intercept this request at all.
    pub fn is_web(&self) -> bool {
        is_web_scheme(&self.url)
    }

    pub fn method_str(&self) -> &str {
        self.method.as_str()
    }

    /// Only GET requests are written to or served from the store. Other
    /// methods always go to the network, so a stored response is never
    /// replayed for a different payload.
    pub fn is_cacheable(&self) -> bool {
        self.method == Method::GET
    }
}
