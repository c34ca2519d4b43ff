//! sw_fetch tool implementation.
//!
//! Sends a request through the controller. Requests the controller does not
//! intercept go straight to the network.

use std::collections::BTreeMap;

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_client::header::{HeaderMap, HeaderName, HeaderValue};
use swcache_client::{CacheController, Interception, RequestMode, ResponseSource, Strategy};
use swcache_core::Error;

use super::{ResponseView, json_result, parse_method};

/// Input parameters for sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwFetchParams {
    /// Absolute URL, or a path resolved against the configured origin.
    pub url: String,

    /// HTTP method (default: GET).
    #[serde(default = "default_method")]
    pub method: String,

    /// Treat the request as a page navigation.
    #[serde(default)]
    pub navigate: bool,

    /// Request headers forwarded to the network.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    /// Request body forwarded to the network.
    #[serde(default)]
    pub body: Option<String>,
}

fn default_method() -> String {
    "GET".into()
}

/// Output structure for sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwFetchOutput {
    /// Whether the controller handled the request.
    pub intercepted: bool,
    pub strategy: Option<Strategy>,
    pub source: Option<ResponseSource>,
    pub response: ResponseView,
}

/// Implementation of the sw_fetch tool.
pub async fn fetch_impl(controller: &CacheController, params: SwFetchParams) -> Result<CallToolResult, McpError> {
    if params.url.trim().is_empty() {
        return Err(Error::InvalidInput("url cannot be empty".into()).into());
    }

    let method = parse_method(&params.method)?;
    let mode = if params.navigate { RequestMode::Navigate } else { RequestMode::Subresource };
    let mut request = controller.request(method, &params.url, mode)?.with_headers(header_map(&params.headers)?);
    if let Some(body) = params.body {
        request = request.with_body(body);
    }

    let output = match controller.handle(&request).await? {
        Interception::Handled(served) => SwFetchOutput {
            intercepted: true,
            strategy: Some(served.strategy),
            source: Some(served.source),
            response: ResponseView::from(&served.response),
        },
        Interception::Bypass => {
            let response = controller.passthrough(&request).await?;
            tracing::debug!(url = %request.url, fetch_ms = response.fetch_ms, "passthrough");
            SwFetchOutput {
                intercepted: false,
                strategy: None,
                source: None,
                response: ResponseView::from(&response.capture(&request)),
            }
        }
    };

    json_result(&output)
}

fn header_map(headers: &BTreeMap<String, String>) -> Result<HeaderMap, Error> {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| Error::InvalidInput(format!("invalid header name: {name}")))?;
        let value =
            HeaderValue::from_str(value).map_err(|_| Error::InvalidInput(format!("invalid header value for {name}")))?;
        map.insert(name, value);
    }
    Ok(map)
}
