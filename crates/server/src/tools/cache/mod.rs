//! Cache-related MCP tools.
//!
//! Both tools operate on the active store and fail until the controller is
//! activated.

pub mod get;
pub mod purge;

pub use get::{CacheGetParams, get_impl};
pub use purge::{CachePurgeParams, purge_impl};

use swcache_client::CacheController;
use swcache_core::{Error, Store};

pub(crate) async fn active_store(controller: &CacheController) -> Result<Store, Error> {
    controller
        .active_store()
        .await
        .ok_or_else(|| Error::Lifecycle("no active store; activate first".into()))
}
