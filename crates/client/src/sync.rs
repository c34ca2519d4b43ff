//! Deferred synchronization hook.
//!
//! Fired when connectivity returns with the `background-sync` tag. The
//! shell has no offline writes to replay yet, so the default hook only
//! logs.

use async_trait::async_trait;
use swcache_core::Error;

/// Tag that triggers reconciliation.
pub const BACKGROUND_SYNC_TAG: &str = "background-sync";

/// Reconciliation run after connectivity is restored.
#[async_trait]
pub trait BackgroundSync: Send + Sync {
    async fn reconcile(&self) -> Result<(), Error>;
}

/// Hook that does nothing.
#[derive(Debug, Default, Clone)]
pub struct NoopSync;

#[async_trait]
impl BackgroundSync for NoopSync {
    async fn reconcile(&self) -> Result<(), Error> {
        tracing::debug!("background sync: nothing to reconcile");
        Ok(())
    }
}
