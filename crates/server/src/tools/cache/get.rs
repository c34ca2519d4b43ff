//! cache_get tool implementation.
//!
//! Looks up the stored response for a request in the active store.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_client::{CacheController, RequestMode};
use swcache_core::Error;

use super::active_store;
use crate::tools::{ResponseView, json_result, parse_method};

/// Parameters for the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetParams {
    /// Absolute URL, or a path resolved against the configured origin.
    pub url: String,

    /// HTTP method the response was stored under (default: GET).
    #[serde(default = "default_method")]
    pub method: String,
}

fn default_method() -> String {
    "GET".into()
}

/// Output from the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetOutput {
    pub store: String,
    pub entry: ResponseView,
}

/// Implementation of the cache_get tool.
pub async fn get_impl(controller: &CacheController, params: CacheGetParams) -> Result<CallToolResult, McpError> {
    let store = active_store(controller).await?;
    let request = controller.request(parse_method(&params.method)?, &params.url, RequestMode::Subresource)?;

    let entry = store
        .match_request(request.method_str(), request.url.as_str())
        .await?
        .ok_or_else(|| Error::CacheMiss(request.url.to_string()))?;

    let output = CacheGetOutput { store: store.name().to_string(), entry: ResponseView::from(&entry) };
    json_result(&output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::{ShellFetcher, controller, output, registered};

    #[tokio::test]
    async fn test_get_impl_missing() {
        let sw = registered(ShellFetcher::online()).await;
        let params = CacheGetParams { url: "/nonexistent".into(), method: default_method() };

        let result = get_impl(&sw, params).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_get_impl_found() {
        let sw = registered(ShellFetcher::online()).await;
        let params = CacheGetParams { url: "/login".into(), method: "get".into() };

        let out: CacheGetOutput = output(&get_impl(&sw, params).await.unwrap());
        assert_eq!(out.store, "authflow-v1");
        assert_eq!(out.entry.url, "http://localhost:5173/login");
        assert_eq!(out.entry.body, "<h1>login</h1>");
    }

    #[tokio::test]
    async fn test_get_impl_before_activation() {
        let sw = controller(ShellFetcher::online()).await;
        let params = CacheGetParams { url: "/login".into(), method: default_method() };

        assert!(get_impl(&sw, params).await.is_err());
    }
}
