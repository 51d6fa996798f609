//! HTTP side of the portal.
//!
//! Serves the network list and the connect endpoint to the UI, and the UI
//! itself as a single page app from the configured directory.

use async_trait::async_trait;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Request, State};
use axum::http::{Method, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use log::{error, info, warn};
use serde::Deserialize;
use serde_json::json;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};

use nmportal::{PortalConfig, PortalError, PortalHandle, PortalService};

/// Time of the last portal request.
///
/// A request counts as activity for as long as it is being handled, so a
/// slow `/connect` never looks idle.
pub struct Activity {
    origin: Instant,
    last_ms: AtomicU64,
    in_flight: AtomicUsize,
}

impl Activity {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            last_ms: AtomicU64::new(0),
            in_flight: AtomicUsize::new(0),
        }
    }

    pub fn touch(&self) {
        let now = u64::try_from(self.origin.elapsed().as_millis()).unwrap_or(u64::MAX);
        self.last_ms.store(now, Ordering::Relaxed);
    }

    /// Marks a request as in flight until the guard is dropped.
    pub fn begin(self: &Arc<Self>) -> InFlight {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        self.touch();
        InFlight(Arc::clone(self))
    }

    /// Time since the last request finished, or since startup if there was
    /// none. Zero while a request is in flight.
    pub fn idle(&self) -> Duration {
        if self.in_flight.load(Ordering::SeqCst) > 0 {
            return Duration::ZERO;
        }
        let last = Duration::from_millis(self.last_ms.load(Ordering::Relaxed));
        self.origin.elapsed().saturating_sub(last)
    }
}

/// Guard returned by [`Activity::begin`].
pub struct InFlight(Arc<Activity>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.touch();
        self.0.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Default for Activity {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone)]
struct AppState {
    portal: PortalHandle,
    provisioned: CancellationToken,
}

#[derive(Debug, Deserialize)]
struct ConnectRequest {
    #[serde(default)]
    identity: String,
    #[serde(default)]
    passphrase: String,
    #[serde(default)]
    ssid: String,
}

#[derive(Default)]
struct ServerSlot {
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

/// [`PortalService`] that runs the portal web server.
pub struct HttpPortal {
    port: u16,
    ui_directory: PathBuf,
    activity: Arc<Activity>,
    provisioned: CancellationToken,
    slot: Mutex<ServerSlot>,
}

impl HttpPortal {
    /// Creates a stopped server for the configured port and UI directory.
    pub fn new(config: &PortalConfig) -> Self {
        Self {
            port: config.listening_port,
            ui_directory: config.ui_directory.clone(),
            activity: Arc::new(Activity::new()),
            provisioned: CancellationToken::new(),
            slot: Mutex::new(ServerSlot::default()),
        }
    }

    pub fn activity(&self) -> Arc<Activity> {
        Arc::clone(&self.activity)
    }

    /// Fires once a connect request succeeded.
    pub fn provisioned(&self) -> CancellationToken {
        self.provisioned.clone()
    }

    /// Waits up to `timeout` for the last server to finish its requests.
    pub async fn join(&self, timeout: Duration) {
        let task = self.slot.lock().await.task.take();
        if let Some(task) = task
            && tokio::time::timeout(timeout, task).await.is_err()
        {
            warn!("Web server did not finish within {timeout:?}");
        }
    }

    fn router(&self, portal: PortalHandle) -> Router {
        let state = AppState {
            portal,
            provisioned: self.provisioned.clone(),
        };

        let index = self.ui_directory.join("index.html");
        let ui = ServeDir::new(&self.ui_directory).fallback(ServeFile::new(index));

        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_headers(Any)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS]);

        Router::new()
            .route("/networks", get(networks))
            .route("/connect", post(connect))
            .fallback_service(ui)
            .with_state(state)
            .layer(middleware::from_fn_with_state(
                Arc::clone(&self.activity),
                track_activity,
            ))
            .layer(cors)
    }
}

#[async_trait]
impl PortalService for HttpPortal {
    async fn start(&self, portal: PortalHandle) -> nmportal::Result<()> {
        let mut slot = self.slot.lock().await;
        if slot.shutdown.is_some() {
            return Ok(());
        }

        let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.port));
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| PortalError::Service(format!("failed to bind {addr}: {e}")))?;
        info!("HTTP server listening on {addr}");

        let app = self.router(portal);
        let (tx, rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            let server = axum::serve(listener, app).with_graceful_shutdown(async {
                let _ = rx.await;
            });
            if let Err(e) = server.await {
                error!("HTTP server failed: {e}");
            }
            info!("HTTP server stopped");
        });

        slot.shutdown = Some(tx);
        slot.task = Some(task);
        self.activity.touch();
        Ok(())
    }

    async fn stop(&self) -> nmportal::Result<()> {
        if let Some(tx) = self.slot.lock().await.shutdown.take() {
            info!("Stopping HTTP server");
            let _ = tx.send(());
        }
        Ok(())
    }
}

async fn track_activity(State(activity): State<Arc<Activity>>, req: Request, next: Next) -> Response {
    let _in_flight = activity.begin();
    next.run(req).await
}

async fn networks(State(state): State<AppState>) -> Response {
    info!("Network list requested");
    match state.portal.access_points().await {
        Ok(aps) => Json(aps).into_response(),
        Err(e) => {
            error!("Failed to list networks: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": "Internal Error"})),
            )
                .into_response()
        }
    }
}

async fn connect(
    State(state): State<AppState>,
    body: Result<Json<ConnectRequest>, JsonRejection>,
) -> Response {
    let Json(req) = match body {
        Ok(body) => body,
        Err(e) => {
            warn!("Malformed connect request: {e}");
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({"error": "Bad Request"})),
            )
                .into_response();
        }
    };

    info!("Connect requested for '{}'", req.ssid);
    match state
        .portal
        .connect(req.ssid, req.passphrase, req.identity)
        .await
    {
        Ok(true) => {
            state.provisioned.cancel();
            (StatusCode::OK, Json(serde_json::Value::Null)).into_response()
        }
        Ok(false) => (StatusCode::INTERNAL_SERVER_ERROR, Json("internal error")).into_response(),
        Err(e) => {
            error!("Connect request failed: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, Json("internal error")).into_response()
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, header};
    use nmportal::builders::ConnectionSettings;
    use nmportal::{
        ActivatedProfile, ActiveConnectionState, ApCapabilities, ConnectivityState,
        NetworkBackend, Portal, SavedProfile, Timings,
    };
    use std::collections::HashSet;
    use tower::ServiceExt;
    use zvariant::OwnedObjectPath;

    fn path(s: &str) -> OwnedObjectPath {
        OwnedObjectPath::try_from(s.to_string()).unwrap()
    }

    /// One WPA2 network called "Home". The hotspot always comes up; joining
    /// "Home" succeeds only when `joins` is set.
    struct HomeOnly {
        joins: bool,
        added: std::sync::Mutex<u32>,
        stuck: std::sync::Mutex<HashSet<OwnedObjectPath>>,
    }

    impl HomeOnly {
        fn new(joins: bool) -> Self {
            Self {
                joins,
                added: std::sync::Mutex::new(0),
                stuck: std::sync::Mutex::new(HashSet::new()),
            }
        }
    }

    #[async_trait]
    impl NetworkBackend for HomeOnly {
        fn interface_name(&self) -> &str {
            "wlan0"
        }

        async fn visible_access_points(&self) -> nmportal::Result<Vec<OwnedObjectPath>> {
            Ok(vec![path("/org/freedesktop/NetworkManager/AccessPoint/1")])
        }

        async fn access_point_ssid(&self, _ap: &OwnedObjectPath) -> nmportal::Result<Vec<u8>> {
            Ok(b"Home".to_vec())
        }

        async fn access_point_strength(&self, _ap: &OwnedObjectPath) -> nmportal::Result<u8> {
            Ok(80)
        }

        async fn access_point_capabilities(
            &self,
            _ap: &OwnedObjectPath,
        ) -> nmportal::Result<ApCapabilities> {
            Ok(ApCapabilities {
                flags: 0x1,
                wpa_flags: 0,
                rsn_flags: 0x188,
            })
        }

        async fn saved_profiles(&self) -> nmportal::Result<Vec<SavedProfile>> {
            Ok(Vec::new())
        }

        async fn delete_profile(&self, _profile: &OwnedObjectPath) -> nmportal::Result<()> {
            Ok(())
        }

        async fn add_and_activate(
            &self,
            _settings: ConnectionSettings,
            specific_object: Option<&OwnedObjectPath>,
        ) -> nmportal::Result<ActivatedProfile> {
            let n = {
                let mut added = self.added.lock().unwrap();
                *added += 1;
                *added
            };
            let profile = ActivatedProfile {
                connection: path(&format!("/org/freedesktop/NetworkManager/Settings/{n}")),
                active: path(&format!("/org/freedesktop/NetworkManager/ActiveConnection/{n}")),
            };
            if specific_object.is_some() && !self.joins {
                self.stuck.lock().unwrap().insert(profile.active.clone());
            }
            Ok(profile)
        }

        async fn deactivate(&self, _active: &OwnedObjectPath) -> nmportal::Result<()> {
            Ok(())
        }

        async fn activation_state(
            &self,
            active: &OwnedObjectPath,
        ) -> nmportal::Result<ActiveConnectionState> {
            if self.stuck.lock().unwrap().contains(active) {
                Ok(ActiveConnectionState::Activating)
            } else {
                Ok(ActiveConnectionState::Activated)
            }
        }

        async fn connectivity(&self) -> nmportal::Result<ConnectivityState> {
            Ok(ConnectivityState::Full)
        }
    }

    struct Detached;

    #[async_trait]
    impl PortalService for Detached {
        async fn start(&self, _portal: PortalHandle) -> nmportal::Result<()> {
            Ok(())
        }

        async fn stop(&self) -> nmportal::Result<()> {
            Ok(())
        }
    }

    fn config(activation_timeout: Duration) -> PortalConfig {
        PortalConfig {
            dhcp_helper: "true".into(),
            timings: Timings {
                scan_backoff: Duration::from_millis(1),
                scan_retries: 1,
                activation_timeout,
                connectivity_timeout: Duration::from_millis(40),
                poll_interval: Duration::from_millis(5),
                settle: Duration::from_millis(1),
                drain_timeout: Duration::from_millis(500),
            },
            ..PortalConfig::default()
        }
    }

    /// Opened portal plus the router an `HttpPortal` would serve for it.
    async fn serve(joins: bool, activation_timeout: Duration) -> (PortalHandle, HttpPortal, Router) {
        let config = config(activation_timeout);
        let http = HttpPortal::new(&config);
        let portal = Portal::with_backend(config, Arc::new(HomeOnly::new(joins)), Arc::new(Detached));
        portal.start().await.unwrap();
        let app = http.router(portal.clone());
        (portal, http, app)
    }

    fn connect_request(body: &str) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri("/connect")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(resp: Response) -> serde_json::Value {
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn activity_idle_resets_on_touch() {
        let activity = Activity::new();
        tokio::time::advance(Duration::from_secs(30)).await;
        assert!(activity.idle() >= Duration::from_secs(30));

        activity.touch();
        assert!(activity.idle() < Duration::from_secs(1));

        tokio::time::advance(Duration::from_secs(5)).await;
        assert!(activity.idle() >= Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn activity_is_not_idle_while_in_flight() {
        let activity = Arc::new(Activity::new());
        let guard = activity.begin();

        tokio::time::advance(Duration::from_secs(120)).await;
        assert_eq!(activity.idle(), Duration::ZERO);

        drop(guard);
        assert!(activity.idle() < Duration::from_secs(1));

        tokio::time::advance(Duration::from_secs(10)).await;
        assert!(activity.idle() >= Duration::from_secs(10));
    }

    #[test]
    fn connect_request_fields_default_to_empty() {
        let req: ConnectRequest = serde_json::from_str(r#"{"ssid":"Home"}"#).unwrap();
        assert_eq!(req.ssid, "Home");
        assert!(req.passphrase.is_empty());
        assert!(req.identity.is_empty());
    }

    #[tokio::test]
    async fn networks_lists_ssid_and_security() {
        let (portal, _http, app) = serve(true, Duration::from_millis(40)).await;

        let resp = app
            .oneshot(Request::builder().uri("/networks").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            json_body(resp).await,
            json!([{"ssid": "Home", "security": "wp2"}])
        );
        portal.shutdown().await;
    }

    #[tokio::test]
    async fn malformed_connect_is_bad_request() {
        let (portal, http, app) = serve(true, Duration::from_millis(40)).await;

        let resp = app.oneshot(connect_request("{not json")).await.unwrap();

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(resp).await, json!({"error": "Bad Request"}));
        assert!(!http.provisioned().is_cancelled());
        portal.shutdown().await;
    }

    #[tokio::test]
    async fn failed_connect_is_internal_error() {
        let (portal, http, app) = serve(false, Duration::from_millis(40)).await;

        let resp = app
            .oneshot(connect_request(r#"{"ssid":"Home","passphrase":"wrong"}"#))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json_body(resp).await, json!("internal error"));
        assert!(!http.provisioned().is_cancelled());
        assert!(portal.hotspot_active().await.unwrap());
        portal.shutdown().await;
    }

    #[tokio::test]
    async fn successful_connect_fires_provisioned() {
        let (portal, http, app) = serve(true, Duration::from_millis(40)).await;

        let resp = app
            .oneshot(connect_request(
                r#"{"ssid":"Home","passphrase":"password123","identity":""}"#,
            ))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(json_body(resp).await, serde_json::Value::Null);
        assert!(http.provisioned().is_cancelled());
        portal.shutdown().await;
    }

    #[tokio::test]
    async fn pending_connect_keeps_portal_active() {
        let (portal, http, app) = serve(false, Duration::from_secs(30)).await;
        let activity = http.activity();

        let pending = tokio::spawn(app.oneshot(connect_request(r#"{"ssid":"Home"}"#)));
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(activity.idle(), Duration::ZERO);

        portal.shutdown().await;
        let resp = pending.await.unwrap().unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(activity.idle() < Duration::from_secs(1));
    }
}
