//! Push notification display and click handling.
//!
//! Inbound payloads look like
//! `{"title": "...", "body": "...", "data": {"url": "/profile"}}`.
//! Display and window opening go through the [`Notifier`] trait so the
//! host decides how a notification is surfaced.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use swcache_core::{AppConfig, Error};
use url::Url;

/// Parsed push payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushPayload {
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub data: Option<serde_json::Map<String, serde_json::Value>>,
}

impl PushPayload {
    /// Parse a raw payload.
    pub fn parse(raw: &[u8]) -> Result<Self, Error> {
        serde_json::from_slice(raw).map_err(|e| Error::InvalidPayload(e.to_string()))
    }
}

/// Notification handed to the [`Notifier`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    pub vibrate: Vec<u32>,
    /// Opaque data carried from the payload; `url` is the click target.
    pub data: serde_json::Map<String, serde_json::Value>,
}

impl Notification {
    /// Build a notification from a payload using the configured icon,
    /// badge and vibration pattern.
    pub fn from_payload(payload: PushPayload, config: &AppConfig) -> Self {
        Self {
            title: payload.title,
            body: payload.body,
            icon: config.notification_icon.clone(),
            badge: config.notification_badge.clone(),
            vibrate: config.notification_vibrate.clone(),
            data: payload.data.unwrap_or_default(),
        }
    }

    /// Document to open when the notification is clicked. A missing or
    /// empty `url` opens `/`.
    pub fn target(&self) -> &str {
        self.data
            .get("url")
            .and_then(|v| v.as_str())
            .filter(|url| !url.is_empty())
            .unwrap_or("/")
    }
}

/// Host surface for notifications.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn show(&self, notification: &Notification) -> Result<(), Error>;

    async fn close(&self, notification: &Notification) -> Result<(), Error>;

    async fn open_window(&self, url: &Url) -> Result<(), Error>;
}

/// Notifier that only records notifications in the log.
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn show(&self, notification: &Notification) -> Result<(), Error> {
        tracing::info!(title = %notification.title, body = %notification.body, "show notification");
        Ok(())
    }

    async fn close(&self, notification: &Notification) -> Result<(), Error> {
        tracing::debug!(title = %notification.title, "close notification");
        Ok(())
    }

    async fn open_window(&self, url: &Url) -> Result<(), Error> {
        tracing::info!(%url, "open window");
        Ok(())
    }
}
