//! push_notify, notification_click and background_sync tool implementations.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_client::{CacheController, Notification};

use super::json_result;

/// Parameters for the push_notify tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PushNotifyParams {
    /// Raw push payload, e.g. `{"title":"...","body":"...","data":{"url":"/profile"}}`.
    /// Omit for a push without data.
    #[serde(default)]
    pub payload: Option<String>,
}

/// Output from the push_notify tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PushNotifyOutput {
    pub shown: bool,
    pub notification: Option<Notification>,
}

/// Parameters for the notification_click tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct NotificationClickParams {
    /// The notification as returned by push_notify.
    pub notification: Notification,
}

/// Output from the notification_click tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct NotificationClickOutput {
    /// Document opened in a new window.
    pub opened: String,
}

/// Parameters for the background_sync tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct BackgroundSyncParams {
    pub tag: String,
}

/// Output from the background_sync tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct BackgroundSyncOutput {
    pub tag: String,
    /// Whether the tag triggered reconciliation.
    pub ran: bool,
}

/// Implementation of the push_notify tool.
pub async fn push_impl(controller: &CacheController, params: PushNotifyParams) -> Result<CallToolResult, McpError> {
    let notification = controller.on_push(params.payload.as_deref().map(str::as_bytes)).await?;
    json_result(&PushNotifyOutput { shown: notification.is_some(), notification })
}

/// Implementation of the notification_click tool.
pub async fn click_impl(
    controller: &CacheController, params: NotificationClickParams,
) -> Result<CallToolResult, McpError> {
    let opened = controller.on_notification_click(&params.notification).await?;
    json_result(&NotificationClickOutput { opened: opened.to_string() })
}

/// Implementation of the background_sync tool.
pub async fn sync_impl(controller: &CacheController, params: BackgroundSyncParams) -> Result<CallToolResult, McpError> {
    let ran = controller.on_sync(&params.tag).await?;
    json_result(&BackgroundSyncOutput { tag: params.tag, ran })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::{ShellFetcher, controller, output};

    #[tokio::test]
    async fn test_push_then_click() {
        let sw = controller(ShellFetcher::online()).await;
        let params = PushNotifyParams {
            payload: Some(r#"{"title":"New sign-in","body":"From a new device","data":{"url":"/profile"}}"#.into()),
        };

        let pushed: PushNotifyOutput = output(&push_impl(&sw, params).await.unwrap());
        assert!(pushed.shown);
        let notification = pushed.notification.unwrap();
        assert_eq!(notification.title, "New sign-in");
        assert_eq!(notification.vibrate, vec![200, 100, 200]);

        let clicked: NotificationClickOutput =
            output(&click_impl(&sw, NotificationClickParams { notification }).await.unwrap());
        assert_eq!(clicked.opened, "http://localhost:5173/profile");
    }

    #[tokio::test]
    async fn test_push_without_payload() {
        let sw = controller(ShellFetcher::online()).await;

        let pushed: PushNotifyOutput = output(&push_impl(&sw, PushNotifyParams { payload: None }).await.unwrap());
        assert!(!pushed.shown);
        assert!(pushed.notification.is_none());
    }

    #[tokio::test]
    async fn test_push_malformed_payload() {
        let sw = controller(ShellFetcher::online()).await;
        let params = PushNotifyParams { payload: Some("not json".into()) };

        assert!(push_impl(&sw, params).await.is_err());
    }

    #[tokio::test]
    async fn test_background_sync_tags() {
        let sw = controller(ShellFetcher::online()).await;

        let out: BackgroundSyncOutput =
            output(&sync_impl(&sw, BackgroundSyncParams { tag: "background-sync".into() }).await.unwrap());
        assert!(out.ran);

        let out: BackgroundSyncOutput =
            output(&sync_impl(&sw, BackgroundSyncParams { tag: "other".into() }).await.unwrap());
        assert!(!out.ran);
    }
}
