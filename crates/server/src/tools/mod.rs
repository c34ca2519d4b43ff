//! MCP tool implementations.
//!
//! This module contains all tools exposed by the swcache server.

pub mod cache;
pub mod events;
pub mod fetch;
pub mod lifecycle;

pub use cache::{CacheGetParams, CachePurgeParams, get_impl, purge_impl};
pub use events::{BackgroundSyncParams, NotificationClickParams, PushNotifyParams, click_impl, push_impl, sync_impl};
pub use fetch::{SwFetchParams, fetch_impl};
pub use lifecycle::{activate_impl, install_impl, status_impl};

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_client::Method;
use swcache_core::{Error, StoredResponse};

/// A stored or fetched response as returned to MCP clients.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ResponseView {
    pub method: String,
    pub url: String,
    pub status: u16,
    pub headers: Vec<(String, String)>,
    /// Body decoded as UTF-8, lossily.
    pub body: String,
    pub body_bytes: usize,
    pub cached_at: String,
}

impl From<&StoredResponse> for ResponseView {
    fn from(response: &StoredResponse) -> Self {
        Self {
            method: response.method.clone(),
            url: response.url.clone(),
            status: response.status,
            headers: response.headers.clone(),
            body: String::from_utf8_lossy(&response.body).into_owned(),
            body_bytes: response.body.len(),
            cached_at: response.cached_at.clone(),
        }
    }
}

/// Parse an HTTP method name, ignoring case.
pub(crate) fn parse_method(method: &str) -> Result<Method, Error> {
    Method::from_bytes(method.to_ascii_uppercase().as_bytes())
        .map_err(|_| Error::InvalidInput(format!("invalid method: {method}")))
}

/// Serialize a tool output as pretty JSON text content.
pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use bytes::Bytes;
    use rmcp::model::CallToolResult;
    use serde::de::DeserializeOwned;
    use swcache_client::{CacheController, FetchResponse, Fetcher, Request, StatusCode, header};
    use swcache_core::{AppConfig, CacheDb, Error};

    pub(crate) const ORIGIN: &str = "http://localhost:5173";

    /// Serves the application shell; everything else is unreachable.
    #[derive(Default)]
    pub(crate) struct ShellFetcher {
        pages: Mutex<HashMap<String, &'static str>>,
        last_body: Mutex<Option<Bytes>>,
    }

    impl ShellFetcher {
        pub(crate) fn online() -> Arc<Self> {
            let fetcher = Self::default();
            for (path, body) in [("/", "<h1>home</h1>"), ("/login", "<h1>login</h1>"), ("/offline.html", "<h1>offline</h1>")] {
                fetcher.serve(path, body);
            }
            Arc::new(fetcher)
        }

        pub(crate) fn serve(&self, path: &str, body: &'static str) {
            self.pages.lock().unwrap().insert(format!("{ORIGIN}{path}"), body);
        }

        pub(crate) fn go_offline(&self) {
            self.pages.lock().unwrap().clear();
        }

        pub(crate) fn last_body(&self) -> Option<Bytes> {
            self.last_body.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Fetcher for ShellFetcher {
        async fn fetch(&self, request: &Request) -> Result<FetchResponse, Error> {
            *self.last_body.lock().unwrap() = request.body.clone();
            let page = self.pages.lock().unwrap().get(request.url.as_str()).copied();
            match page {
                Some(body) => {
                    let mut headers = header::HeaderMap::new();
                    headers.insert(header::CONTENT_TYPE, header::HeaderValue::from_static("text/html"));
                    Ok(FetchResponse {
                        url: request.url.clone(),
                        status: StatusCode::OK,
                        headers,
                        bytes: Bytes::from_static(body.as_bytes()),
                        fetch_ms: 1,
                    })
                }
                None => Err(Error::Network(format!("{}: connection refused", request.url))),
            }
        }
    }

    pub(crate) async fn controller(fetcher: Arc<ShellFetcher>) -> CacheController {
        let db = CacheDb::open_in_memory().await.unwrap();
        CacheController::new(&AppConfig::default(), db, fetcher).unwrap()
    }

    pub(crate) async fn registered(fetcher: Arc<ShellFetcher>) -> CacheController {
        let controller = controller(fetcher).await;
        controller.register().await.unwrap();
        controller
    }

    pub(crate) fn output<T: DeserializeOwned>(result: &CallToolResult) -> T {
        let content_val = serde_json::to_value(&result.content[0]).unwrap();
        let text = content_val
            .get("text")
            .and_then(|v| v.as_str())
            .expect("Expected text field in content");
        serde_json::from_str(text).unwrap()
    }
}
