//! SQLite-backed versioned response stores.
//!
//! This module provides the persistent store behind the offline cache
//! controller, using SQLite with async access via tokio-rusqlite:
//!
//! - Named stores, one per deployed version
//! - Entries keyed by request identity (method + URL), last write wins
//! - Automatic schema migrations
//! - Purge by URL pattern or by age

pub mod connection;
pub mod entries;
pub mod hash;
pub mod migrations;
pub mod stores;

pub use crate::Error;

pub use connection::CacheDb;
pub use entries::{Store, StoredResponse};
pub use stores::StoreInfo;
