//! cache_purge tool implementation.
//!
//! Purges entries of the active store by exact URL, URL pattern or count.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_client::{CacheController, Method, RequestMode};
use swcache_core::Error;

use super::active_store;
use crate::tools::json_result;

/// Parameters for the cache_purge tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CachePurgeParams {
    /// Remove the GET entry for exactly this URL, or a path resolved
    /// against the configured origin.
    #[serde(default)]
    pub url: Option<String>,

    /// Purge entries whose URL contains this text.
    #[serde(default)]
    pub url_pattern: Option<String>,

    /// Keep only the newest N entries.
    #[serde(default)]
    pub max_entries: Option<usize>,
}

/// Output from the cache_purge tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CachePurgeOutput {
    /// Number of entries deleted.
    pub deleted: u64,
}

/// Implementation of the cache_purge tool.
pub async fn purge_impl(controller: &CacheController, params: CachePurgeParams) -> Result<CallToolResult, McpError> {
    if params.url.is_none() && params.url_pattern.is_none() && params.max_entries.is_none() {
        return Err(Error::InvalidInput(
            "At least one of url, url_pattern or max_entries must be specified".to_string(),
        )
        .into());
    }

    let store = active_store(controller).await?;
    let mut deleted_total = 0u64;

    if let Some(target) = params.url {
        let request = controller.request(Method::GET, &target, RequestMode::Subresource)?;
        if store.delete(request.method_str(), request.url.as_str()).await? {
            deleted_total += 1;
        }
    }

    if let Some(pattern) = params.url_pattern {
        if pattern.is_empty() {
            return Err(Error::InvalidInput("url_pattern cannot be empty".into()).into());
        }
        deleted_total += store.purge_by_url(&pattern).await?;
    }

    if let Some(max_entries) = params.max_entries {
        deleted_total += store.purge_oldest(max_entries).await?;
    }

    tracing::info!(store = store.name(), deleted = deleted_total, "purged entries");

    json_result(&CachePurgeOutput { deleted: deleted_total })
}
