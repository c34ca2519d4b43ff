//! Offline cache controller.
//!
//! Lifecycle:
//!
//! ```text
//! Parsed -> Installing -> Installed -> Activating -> Activated
//! ```
//!
//! - **install** opens (or creates) this version's store and seeds it.
//!   Seed failures are logged and reported, never fatal. The controller
//!   does not wait for older instances to go away.
//! - **activate** deletes every store not named after this version, then
//!   claims clients. Only from then on are requests intercepted.
//!
//! Requests arriving before activation are bypassed and go straight to the
//! network without touching the store.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Method;
use serde::{Deserialize, Serialize};
use swcache_core::{AppConfig, CacheDb, Error, Store};
use tokio::sync::RwLock;
use url::Url;

use crate::fetch::{FetchResponse, Fetcher, resolve};
use crate::push::{LogNotifier, Notification, Notifier, PushPayload};
use crate::request::{Request, RequestMode};
use crate::routes::RouteTable;
use crate::strategy::{Served, StrategyContext};
use crate::sync::{BACKGROUND_SYNC_TAG, BackgroundSync, NoopSync};

/// Lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Parsed,
    Installing,
    Installed,
    Activating,
    Activated,
}

/// Outcome of intercepting a request.
#[derive(Debug, Clone)]
pub enum Interception {
    /// Not intercepted; the caller performs the request itself.
    Bypass,
    Handled(Served),
}

#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct SeedFailure {
    pub url: String,
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct InstallReport {
    pub store: String,
    pub seeded: Vec<String>,
    pub failed: Vec<SeedFailure>,
}

#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ActivateReport {
    pub store: String,
    /// Superseded stores removed during activation.
    pub deleted: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ControllerStatus {
    pub phase: Phase,
    pub store: String,
    pub clients_claimed: bool,
}

struct State {
    phase: Phase,
    /// Present once activated.
    active: Option<StrategyContext>,
    clients_claimed: bool,
}

/// Intercepts requests and routes them through the strategies against the
/// active store.
pub struct CacheController {
    config: AppConfig,
    db: CacheDb,
    store_name: String,
    origin: Url,
    seed: Vec<Url>,
    offline_url: Url,
    routes: RouteTable,
    fetcher: Arc<dyn Fetcher>,
    timeout: Duration,
    sync: Arc<dyn BackgroundSync>,
    notifier: Arc<dyn Notifier>,
    state: RwLock<State>,
}

fn invalid_url(target: &str, err: impl std::fmt::Display) -> Error {
    Error::InvalidUrl(format!("{target}: {err}"))
}

impl CacheController {
    /// Build a controller for the deployment described by `config`.
    pub fn new(config: &AppConfig, db: CacheDb, fetcher: Arc<dyn Fetcher>) -> Result<Self, Error> {
        let origin = Url::parse(&config.origin).map_err(|e| invalid_url(&config.origin, e))?;

        let seed = config
            .seed_assets
            .iter()
            .map(|asset| resolve(asset, &origin).map_err(|e| invalid_url(asset, e)))
            .collect::<Result<Vec<_>, _>>()?;

        let offline_url = resolve(&config.offline_url, &origin).map_err(|e| invalid_url(&config.offline_url, e))?;

        Ok(Self {
            config: config.clone(),
            db,
            store_name: config.store_name(),
            origin,
            seed,
            offline_url,
            routes: RouteTable::from_config(config),
            fetcher,
            timeout: config.timeout(),
            sync: Arc::new(NoopSync),
            notifier: Arc::new(LogNotifier),
            state: RwLock::new(State { phase: Phase::Parsed, active: None, clients_claimed: false }),
        })
    }

    pub fn with_sync(mut self, sync: Arc<dyn BackgroundSync>) -> Self {
        self.sync = sync;
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn origin(&self) -> &Url {
        &self.origin
    }

    pub fn store_name(&self) -> &str {
        &self.store_name
    }

    pub fn db(&self) -> &CacheDb {
        &self.db
    }

    pub async fn phase(&self) -> Phase {
        self.state.read().await.phase
    }

    pub async fn status(&self) -> ControllerStatus {
        let state = self.state.read().await;
        ControllerStatus {
            phase: state.phase,
            store: self.store_name.clone(),
            clients_claimed: state.clients_claimed,
        }
    }

    /// Store requests are served from, once activated.
    pub async fn active_store(&self) -> Option<Store> {
        self.state.read().await.active.as_ref().map(|ctx| ctx.store.clone())
    }

    /// Fetch straight from the network, bypassing the store.
    pub async fn passthrough(&self, request: &Request) -> Result<FetchResponse, Error> {
        match tokio::time::timeout(self.timeout, self.fetcher.fetch(request)).await {
            Ok(result) => result,
            Err(_) => Err(Error::FetchTimeout(format!("{} after {}ms", request.url, self.timeout.as_millis()))),
        }
    }

    /// Build a request for `target`, resolved against the shell origin.
    pub fn request(&self, method: Method, target: &str, mode: RequestMode) -> Result<Request, Error> {
        Request::parse(method, target, &self.origin, mode).map_err(|e| invalid_url(target, e))
    }

    /// Open this version's store and seed it.
    ///
    /// Individual seed failures are logged and listed in the report; the
    /// controller still moves to `Installed`.
    pub async fn install(&self) -> Result<InstallReport, Error> {
        {
            let mut state = self.state.write().await;
            if state.phase != Phase::Parsed {
                return Err(Error::Lifecycle(format!("cannot install from {:?}", state.phase)));
            }
            state.phase = Phase::Installing;
        }

        tracing::info!(store = %self.store_name, "installing");

        let mut report = InstallReport { store: self.store_name.clone(), seeded: Vec::new(), failed: Vec::new() };

        match self.db.open_store(&self.store_name).await {
            Ok(store) => {
                for url in &self.seed {
                    match self.seed_one(&store, url).await {
                        Ok(()) => report.seeded.push(url.to_string()),
                        Err(e) => {
                            tracing::error!(%url, error = %e, "failed to seed store");
                            report.failed.push(SeedFailure { url: url.to_string(), error: e.to_string() });
                        }
                    }
                }
            }
            Err(e) => {
                tracing::error!(store = %self.store_name, error = %e, "failed to open store");
                report.failed = self
                    .seed
                    .iter()
                    .map(|url| SeedFailure { url: url.to_string(), error: e.to_string() })
                    .collect();
            }
        }

        self.state.write().await.phase = Phase::Installed;
        tracing::info!(
            store = %self.store_name,
            seeded = report.seeded.len(),
            failed = report.failed.len(),
            "installed, skipping wait"
        );

        Ok(report)
    }

    async fn seed_one(&self, store: &Store, url: &Url) -> Result<(), Error> {
        let request = Request::get(url.clone());
        let response = self.passthrough(&request).await?;

        if !response.status.is_success() {
            return Err(Error::Network(format!("{url}: status {}", response.status.as_u16())));
        }

        store.put(&response.capture(&request)).await
    }

    /// Remove superseded stores and start intercepting.
    ///
    /// Fails if install has not completed. On failure the controller stays
    /// `Installed` and activation can be retried.
    pub async fn activate(&self) -> Result<ActivateReport, Error> {
        {
            let mut state = self.state.write().await;
            match state.phase {
                Phase::Installed => state.phase = Phase::Activating,
                Phase::Parsed | Phase::Installing => {
                    return Err(Error::Lifecycle("install must complete before activation".into()));
                }
                Phase::Activating | Phase::Activated => {
                    return Err(Error::Lifecycle(format!("cannot activate from {:?}", state.phase)));
                }
            }
        }

        tracing::info!(store = %self.store_name, "activating");

        let result = self.replace_stores().await;

        let mut state = self.state.write().await;
        match result {
            Ok((store, deleted)) => {
                state.active = Some(StrategyContext {
                    store,
                    fetcher: Arc::clone(&self.fetcher),
                    timeout: self.timeout,
                    offline_url: self.offline_url.clone(),
                });
                state.clients_claimed = true;
                state.phase = Phase::Activated;
                tracing::info!(store = %self.store_name, deleted = deleted.len(), "activated, clients claimed");
                Ok(ActivateReport { store: self.store_name.clone(), deleted })
            }
            Err(e) => {
                state.phase = Phase::Installed;
                tracing::error!(store = %self.store_name, error = %e, "activation failed");
                Err(e)
            }
        }
    }

    async fn replace_stores(&self) -> Result<(Store, Vec<String>), Error> {
        let mut deleted = Vec::new();
        for name in self.db.store_names().await? {
            if name != self.store_name {
                tracing::info!(store = %name, "deleting old store");
                self.db.delete_store(&name).await?;
                deleted.push(name);
            }
        }

        if !self.db.has_store(&self.store_name).await? {
            tracing::warn!(store = %self.store_name, "store missing at activation, recreating empty");
        }
        let store = self.db.open_store(&self.store_name).await?;
        self.db.mark_activated(&self.store_name).await?;

        Ok((store, deleted))
    }

    /// Install then activate.
    pub async fn register(&self) -> Result<(InstallReport, ActivateReport), Error> {
        let installed = self.install().await?;
        let activated = self.activate().await?;
        Ok((installed, activated))
    }

    /// Intercept a request.
    ///
    /// # Errors
    ///
    /// Returns `Error::Unavailable` when there is no network, no stored copy
    /// and the request is not a navigation.
    pub async fn handle(&self, request: &Request) -> Result<Interception, Error> {
        let ctx = match &self.state.read().await.active {
            Some(ctx) => ctx.clone(),
            None => {
                tracing::debug!(url = %request.url, "not active, bypassing");
                return Ok(Interception::Bypass);
            }
        };

        let Some(strategy) = self.routes.classify(request) else {
            tracing::debug!(url = %request.url, "not intercepted");
            return Ok(Interception::Bypass);
        };

        tracing::debug!(url = %request.url, ?strategy, "intercepted");
        strategy.execute(&ctx, request).await.map(Interception::Handled)
    }

    /// Run the deferred synchronization hook for `tag`.
    ///
    /// Returns whether the hook ran.
    pub async fn on_sync(&self, tag: &str) -> Result<bool, Error> {
        tracing::info!(tag, "background sync triggered");
        if tag != BACKGROUND_SYNC_TAG {
            return Ok(false);
        }
        self.sync.reconcile().await?;
        Ok(true)
    }

    /// Display an inbound push message.
    ///
    /// A push without data shows nothing.
    pub async fn on_push(&self, data: Option<&[u8]>) -> Result<Option<Notification>, Error> {
        let Some(raw) = data else {
            tracing::debug!("push without data");
            return Ok(None);
        };

        let notification = Notification::from_payload(PushPayload::parse(raw)?, &self.config);
        self.notifier.show(&notification).await?;
        Ok(Some(notification))
    }

    /// Close a clicked notification and open its target document.
    pub async fn on_notification_click(&self, notification: &Notification) -> Result<Url, Error> {
        self.notifier.close(notification).await?;
        let target = resolve(notification.target(), &self.origin).map_err(|e| invalid_url(notification.target(), e))?;
        self.notifier.open_window(&target).await?;
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::mock::{Scripted, ScriptedFetcher};
    use crate::strategy::ResponseSource;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const ORIGIN: &str = "http://localhost:5173";

    fn url(path: &str) -> String {
        format!("{ORIGIN}{path}")
    }

    fn config(version: &str) -> AppConfig {
        AppConfig { cache_version: version.into(), ..Default::default() }
    }

    fn scripted_shell() -> Arc<ScriptedFetcher> {
        let fetcher = Arc::new(ScriptedFetcher::new());
        fetcher.script(&url("/"), Scripted::Respond(200, "<h1>home</h1>"));
        fetcher.script(&url("/login"), Scripted::Respond(200, "<h1>login</h1>"));
        fetcher.script(&url("/offline.html"), Scripted::Respond(200, "<h1>offline</h1>"));
        fetcher
    }

    fn controller(version: &str, db: CacheDb, fetcher: Arc<ScriptedFetcher>) -> CacheController {
        CacheController::new(&config(version), db, fetcher).unwrap()
    }

    fn served(interception: Interception) -> Served {
        match interception {
            Interception::Handled(served) => served,
            Interception::Bypass => panic!("expected request to be handled"),
        }
    }

    #[tokio::test]
    async fn test_install_seeds_and_tolerates_failures() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let sw = controller("v1", db.clone(), scripted_shell());

        let report = sw.install().await.unwrap();

        assert_eq!(report.store, "authflow-v1");
        assert_eq!(report.seeded, vec![url("/"), url("/login"), url("/offline.html")]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].url, url("/register"));
        assert_eq!(sw.phase().await, Phase::Installed);

        let store = db.open_store("authflow-v1").await.unwrap();
        assert_eq!(store.entry_count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_install_with_no_network_still_installs() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let sw = controller("v1", db, Arc::new(ScriptedFetcher::new()));

        let report = sw.install().await.unwrap();

        assert!(report.seeded.is_empty());
        assert_eq!(report.failed.len(), 4);
        assert_eq!(sw.phase().await, Phase::Installed);
    }

    #[tokio::test]
    async fn test_install_twice_is_rejected() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let sw = controller("v1", db, scripted_shell());
        sw.install().await.unwrap();

        assert!(matches!(sw.install().await, Err(Error::Lifecycle(_))));
    }

    #[tokio::test]
    async fn test_activate_before_install_is_rejected() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let sw = controller("v1", db, scripted_shell());

        assert!(matches!(sw.activate().await, Err(Error::Lifecycle(_))));
        assert_eq!(sw.phase().await, Phase::Parsed);
    }

    #[tokio::test]
    async fn test_requests_bypassed_until_activated() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let fetcher = scripted_shell();
        let sw = controller("v1", db, fetcher.clone());
        sw.install().await.unwrap();
        let calls = fetcher.calls();

        let request = sw.request(Method::GET, "/login", RequestMode::Navigate).unwrap();
        assert!(matches!(sw.handle(&request).await.unwrap(), Interception::Bypass));
        assert_eq!(fetcher.calls(), calls);
    }

    #[tokio::test]
    async fn test_activation_removes_superseded_stores() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let v1 = controller("v1", db.clone(), scripted_shell());
        v1.register().await.unwrap();
        assert_eq!(db.store_names().await.unwrap(), vec!["authflow-v1"]);

        let v2 = controller("v2", db.clone(), scripted_shell());
        v2.install().await.unwrap();
        assert_eq!(db.store_names().await.unwrap().len(), 2);

        let report = v2.activate().await.unwrap();

        assert_eq!(report.deleted, vec!["authflow-v1"]);
        assert_eq!(db.store_names().await.unwrap(), vec!["authflow-v2"]);
        let status = v2.status().await;
        assert_eq!(status.phase, Phase::Activated);
        assert!(status.clients_claimed);
    }

    #[tokio::test]
    async fn test_activation_recreates_missing_store() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let sw = controller("v1", db.clone(), scripted_shell());
        sw.install().await.unwrap();
        db.delete_store("authflow-v1").await.unwrap();

        sw.activate().await.unwrap();

        assert!(db.has_store("authflow-v1").await.unwrap());
        let store = sw.active_store().await.unwrap();
        assert_eq!(store.entry_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_offline_login_served_from_seeded_store() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let fetcher = scripted_shell();
        let sw = controller("v1", db, fetcher.clone());
        sw.register().await.unwrap();
        fetcher.go_offline();

        let request = sw.request(Method::GET, "/login", RequestMode::Navigate).unwrap();
        let served = served(sw.handle(&request).await.unwrap());

        assert_eq!(served.source, ResponseSource::Cache);
        assert_eq!(served.response.body, b"<h1>login</h1>");
    }

    #[tokio::test]
    async fn test_offline_unknown_page_gets_offline_document() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let fetcher = scripted_shell();
        let sw = controller("v1", db, fetcher.clone());
        sw.register().await.unwrap();
        fetcher.go_offline();

        let request = sw.request(Method::GET, "/profile", RequestMode::Navigate).unwrap();
        let served = served(sw.handle(&request).await.unwrap());

        assert_eq!(served.source, ResponseSource::OfflineFallback);
        assert_eq!(served.response.body, b"<h1>offline</h1>");
    }

    #[tokio::test]
    async fn test_cached_script_served_while_refresh_fails() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let fetcher = scripted_shell();
        fetcher.script(&url("/app.js"), Scripted::Respond(200, "export default 1"));
        let sw = controller("v1", db, fetcher.clone());
        sw.register().await.unwrap();

        let request = sw.request(Method::GET, "/app.js", RequestMode::Subresource).unwrap();
        served(sw.handle(&request).await.unwrap());
        fetcher.script(&url("/app.js"), Scripted::Fail);

        let served = served(sw.handle(&request).await.unwrap());

        assert_eq!(served.source, ResponseSource::Cache);
        assert_eq!(served.response.body, b"export default 1");
    }

    #[tokio::test]
    async fn test_provider_call_offline_is_unavailable() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let sw = controller("v1", db, scripted_shell());
        sw.register().await.unwrap();

        let request = sw
            .request(
                Method::POST,
                "https://securetoken.googleapis.com/v1/token?key=abc",
                RequestMode::Subresource,
            )
            .unwrap();

        assert!(matches!(sw.handle(&request).await, Err(Error::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_non_web_scheme_bypassed_when_active() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let sw = controller("v1", db, scripted_shell());
        sw.register().await.unwrap();

        let request = sw
            .request(Method::GET, "chrome-extension://abcdef/content.js", RequestMode::Subresource)
            .unwrap();

        assert!(matches!(sw.handle(&request).await.unwrap(), Interception::Bypass));
    }

    struct CountingSync(AtomicUsize);

    #[async_trait]
    impl BackgroundSync for CountingSync {
        async fn reconcile(&self) -> Result<(), Error> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_sync_runs_only_for_background_tag() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let sync = Arc::new(CountingSync(AtomicUsize::new(0)));
        let sw = controller("v1", db, scripted_shell()).with_sync(sync.clone());

        assert!(sw.on_sync("background-sync").await.unwrap());
        assert!(!sw.on_sync("profile-upload").await.unwrap());
        assert_eq!(sync.0.load(Ordering::SeqCst), 1);
    }

    #[derive(Default)]
    struct RecordingNotifier {
        shown: Mutex<Vec<String>>,
        opened: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn show(&self, notification: &Notification) -> Result<(), Error> {
            self.shown.lock().unwrap().push(notification.title.clone());
            Ok(())
        }

        async fn close(&self, _notification: &Notification) -> Result<(), Error> {
            Ok(())
        }

        async fn open_window(&self, url: &Url) -> Result<(), Error> {
            self.opened.lock().unwrap().push(url.to_string());
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_push_shows_and_click_opens_target() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let notifier = Arc::new(RecordingNotifier::default());
        let sw = controller("v1", db, scripted_shell()).with_notifier(notifier.clone());

        let notification = sw
            .on_push(Some(br#"{"title":"Password changed","body":"If this wasn't you, reset it.","data":{"url":"/profile"}}"#))
            .await
            .unwrap()
            .unwrap();
        let target = sw.on_notification_click(&notification).await.unwrap();

        assert_eq!(*notifier.shown.lock().unwrap(), vec!["Password changed"]);
        assert_eq!(target.as_str(), url("/profile"));
        assert_eq!(*notifier.opened.lock().unwrap(), vec![url("/profile")]);
    }

    #[tokio::test]
    async fn test_click_with_empty_target_opens_root() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let notifier = Arc::new(RecordingNotifier::default());
        let sw = controller("v1", db, scripted_shell()).with_notifier(notifier.clone());

        let notification = sw
            .on_push(Some(br#"{"title":"Verify your email","data":{"url":""}}"#))
            .await
            .unwrap()
            .unwrap();
        let target = sw.on_notification_click(&notification).await.unwrap();

        assert_eq!(target.as_str(), url("/"));
        assert_eq!(*notifier.opened.lock().unwrap(), vec![url("/")]);
    }

    #[tokio::test]
    async fn test_push_without_data_shows_nothing() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let notifier = Arc::new(RecordingNotifier::default());
        let sw = controller("v1", db, scripted_shell()).with_notifier(notifier.clone());

        assert!(sw.on_push(None).await.unwrap().is_none());
        assert!(notifier.shown.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_push_malformed_payload() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let sw = controller("v1", db, scripted_shell());

        assert!(matches!(sw.on_push(Some(b"{")).await, Err(Error::InvalidPayload(_))));
    }
}
