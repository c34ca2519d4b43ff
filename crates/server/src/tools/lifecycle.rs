//! sw_install, sw_activate and sw_status tool implementations.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_client::{CacheController, Phase};
use swcache_core::cache::StoreInfo;

use super::json_result;

/// Output from the sw_status tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwStatusOutput {
    pub phase: Phase,
    /// Store owned by this deployment.
    pub store: String,
    pub clients_claimed: bool,
    /// Entries in the active store, once activated.
    pub entries: Option<u64>,
    /// Every store present in the database.
    pub stores: Vec<StoreInfo>,
}

/// Implementation of the sw_install tool.
pub async fn install_impl(controller: &CacheController) -> Result<CallToolResult, McpError> {
    let report = controller.install().await?;
    json_result(&report)
}

/// Implementation of the sw_activate tool.
pub async fn activate_impl(controller: &CacheController) -> Result<CallToolResult, McpError> {
    let report = controller.activate().await?;
    json_result(&report)
}

/// Implementation of the sw_status tool.
pub async fn status_impl(controller: &CacheController) -> Result<CallToolResult, McpError> {
    let status = controller.status().await;

    let entries = match controller.active_store().await {
        Some(store) => Some(store.entry_count().await?),
        None => None,
    };

    let output = SwStatusOutput {
        phase: status.phase,
        store: status.store,
        clients_claimed: status.clients_claimed,
        entries,
        stores: controller.db().list_stores().await?,
    };

    json_result(&output)
}
