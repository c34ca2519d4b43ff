//! Client side of swcache.
//!
//! Request classification, the retrieval strategies, the lifecycle
//! controller and the HTTP fetch pipeline they share.

pub mod controller;
pub mod fetch;
pub mod push;
pub mod request;
pub mod routes;
pub mod strategy;
pub mod sync;

pub use controller::{ActivateReport, CacheController, ControllerStatus, InstallReport, Interception, Phase, SeedFailure};
pub use fetch::{FetchClient, FetchConfig, FetchResponse, Fetcher};
pub use push::{LogNotifier, Notification, Notifier, PushPayload};
pub use request::{Request, RequestMode};
pub use routes::{Matcher, Route, RouteTable};
pub use strategy::{ResponseSource, Served, Strategy, StrategyContext};
pub use sync::{BACKGROUND_SYNC_TAG, BackgroundSync, NoopSync};

pub use reqwest::{Method, StatusCode, header};
