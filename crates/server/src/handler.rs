//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.
use std::sync::Arc;

use crate::tools::{
    BackgroundSyncParams, CacheGetParams, CachePurgeParams, NotificationClickParams, PushNotifyParams, SwFetchParams,
    activate_impl, click_impl, fetch_impl, get_impl, install_impl, purge_impl, push_impl, status_impl, sync_impl,
};

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};
use swcache_client::CacheController;

/// The main MCP server handler for swcache.
#[derive(Clone)]
pub struct SwCacheServer {
    tool_router: ToolRouter<Self>,
    controller: Arc<CacheController>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl SwCacheServer {
    /// Create a new server handler around a controller.
    pub fn new(controller: Arc<CacheController>) -> Self {
        Self { tool_router: Self::tool_router(), controller }
    }

    #[tool(
        description = "Send a request through the offline cache controller. Returns the response and whether it came from the network, the store or the offline document."
    )]
    async fn sw_fetch(&self, params: Parameters<SwFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.controller, params.0).await
    }

    #[tool(description = "Open this version's store and seed it with the application shell.")]
    async fn sw_install(&self) -> Result<CallToolResult, McpError> {
        install_impl(&self.controller).await
    }

    #[tool(description = "Delete stores from previous versions and start intercepting requests.")]
    async fn sw_activate(&self) -> Result<CallToolResult, McpError> {
        activate_impl(&self.controller).await
    }

    #[tool(description = "Report lifecycle phase, active store and every store in the database.")]
    async fn sw_status(&self) -> Result<CallToolResult, McpError> {
        status_impl(&self.controller).await
    }

    #[tool(description = "Get the stored response for a URL from the active store.")]
    async fn cache_get(&self, params: Parameters<CacheGetParams>) -> Result<CallToolResult, McpError> {
        get_impl(&self.controller, params.0).await
    }

    #[tool(description = "Purge entries from the active store by URL pattern or keep only the newest N.")]
    async fn cache_purge(&self, params: Parameters<CachePurgeParams>) -> Result<CallToolResult, McpError> {
        purge_impl(&self.controller, params.0).await
    }

    #[tool(description = "Deliver a push message. Shows a notification built from the payload.")]
    async fn push_notify(&self, params: Parameters<PushNotifyParams>) -> Result<CallToolResult, McpError> {
        push_impl(&self.controller, params.0).await
    }

    #[tool(description = "Click a notification: close it and open its target document.")]
    async fn notification_click(&self, params: Parameters<NotificationClickParams>) -> Result<CallToolResult, McpError> {
        click_impl(&self.controller, params.0).await
    }

    #[tool(description = "Signal that connectivity returned. The `background-sync` tag runs reconciliation.")]
    async fn background_sync(&self, params: Parameters<BackgroundSyncParams>) -> Result<CallToolResult, McpError> {
        sync_impl(&self.controller, params.0).await
    }
}

impl ServerHandler for SwCacheServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "swcache".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::{ShellFetcher, controller};

    #[tokio::test]
    async fn test_all_tools_registered() {
        let server = SwCacheServer::new(Arc::new(controller(ShellFetcher::online()).await));

        let mut names: Vec<String> = server.tool_router.list_all().into_iter().map(|t| t.name.to_string()).collect();
        names.sort();

        assert_eq!(
            names,
            vec![
                "background_sync",
                "cache_get",
                "cache_purge",
                "notification_click",
                "push_notify",
                "sw_activate",
                "sw_fetch",
                "sw_install",
                "sw_status",
            ]
        );
    }
}
