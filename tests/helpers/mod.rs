#![allow(dead_code)] // Test helpers appear unused when compiled independently

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;

const WAIT_ATTEMPTS: usize = 50;
const WAIT_DELAY: Duration = Duration::from_millis(100);

/// Canned Garmin data keyed by metric type (`steps`, `heart_rates`, ...).
#[derive(Clone, Default)]
pub struct GarminFixture {
    pub health: HashMap<String, Vec<Value>>,
    pub activities: Vec<Value>,
    pub workouts: Vec<Value>,
}

impl GarminFixture {
    pub fn with_metric(mut self, metric_type: &str, entries: Vec<Value>) -> Self {
        self.health.insert(metric_type.to_string(), entries);
        self
    }

    pub fn with_activity(mut self, activity: Value) -> Self {
        self.activities.push(json!({ "activity": activity }));
        self
    }

    pub fn with_workout(mut self, workout: Value) -> Self {
        self.workouts.push(workout);
        self
    }
}

#[derive(Clone, Default)]
struct ServerState {
    batches: Arc<Mutex<Vec<Value>>>,
    auth: Arc<Mutex<Vec<Option<String>>>>,
    /// Statuses returned (in order) before submissions start succeeding
    failures: Arc<Mutex<VecDeque<u16>>>,
    garmin_requests: Arc<Mutex<Vec<Value>>>,
    garmin: Arc<GarminFixture>,
}

/// One axum server standing in for both the fitness server and the Garmin
/// microservice.
pub struct MockServer {
    state: ServerState,
    shutdown_tx: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

impl MockServer {
    pub async fn stop(self) {
        let _ = self.shutdown_tx.send(());
        let _ = self.handle.await;
    }

    /// Every submitted `/health-data` body, in arrival order.
    pub async fn batches(&self) -> Vec<Value> {
        self.state.batches.lock().await.clone()
    }

    /// Authorization header of every `/health-data` attempt, failed ones included.
    pub async fn auth_headers(&self) -> Vec<Option<String>> {
        self.state.auth.lock().await.clone()
    }

    pub async fn garmin_requests(&self) -> Vec<Value> {
        self.state.garmin_requests.lock().await.clone()
    }

    /// Queue error statuses for the next submissions.
    pub async fn fail_next(&self, statuses: &[u16]) {
        self.state.failures.lock().await.extend(statuses.iter().copied());
    }
}

/// Find an available TCP port
pub async fn free_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .await
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

/// Best-effort check for whether binding to loopback is permitted in the current sandbox.
pub async fn can_bind_loopback() -> bool {
    match TcpListener::bind("127.0.0.1:0").await {
        Ok(listener) => {
            drop(listener);
            true
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => false,
        Err(_) => true, // treat other errors as non-fatal for skipping
    }
}

/// Spawn the mock server, return (handle, base URL)
pub async fn spawn_mock_server(port: u16, garmin: GarminFixture) -> (MockServer, String) {
    let state = ServerState {
        garmin: Arc::new(garmin),
        ..ServerState::default()
    };

    let app = Router::new()
        .route("/", get(health))
        .route("/health-data", post(ingest))
        .route("/data/health_and_wellness", post(garmin_health))
        .route("/data/activities_and_workouts", post(garmin_activities))
        .with_state(state.clone());

    let listener = TcpListener::bind(("127.0.0.1", port))
        .await
        .expect("failed to bind mock server listener");

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let handle = tokio::spawn(async move {
        let server = axum::serve(listener, app).with_graceful_shutdown(async {
            let _ = shutdown_rx.await;
        });
        if let Err(err) = server.await {
            eprintln!("mock server error: {}", err);
        }
    });

    (
        MockServer {
            state,
            shutdown_tx,
            handle,
        },
        format!("http://127.0.0.1:{}", port),
    )
}

/// Wait until the server answers `GET /`
pub async fn wait_for_health(base_url: &str) {
    let client = reqwest::Client::new();
    poll_until(|| async {
        client
            .get(format!("{}/", base_url))
            .send()
            .await
            .ok()
            .filter(|r| r.status().is_success())
            .map(|_| ())
    })
    .await
    .unwrap_or_else(|| panic!("timed out waiting for {} to be healthy", base_url));
}

pub async fn poll_until<T, F, Fut>(mut f: F) -> Option<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Option<T>>,
{
    for _ in 0..WAIT_ATTEMPTS {
        if let Some(result) = f().await {
            return Some(result);
        }
        tokio::time::sleep(WAIT_DELAY).await;
    }
    None
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn ingest(
    State(state): State<ServerState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<Json<Value>, (StatusCode, String)> {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    state.auth.lock().await.push(auth);

    if let Some(status) = state.failures.lock().await.pop_front() {
        let code = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        return Err((code, "injected failure".to_string()));
    }

    let count = body.as_array().map(Vec::len).unwrap_or(0);
    state.batches.lock().await.push(body);
    Ok(Json(json!({ "status": "ok", "received": count })))
}

async fn garmin_health(State(state): State<ServerState>, Json(body): Json<Value>) -> Json<Value> {
    let requested: Vec<String> = body
        .get("metric_types")
        .and_then(Value::as_array)
        .map(|types| {
            types
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    state.garmin_requests.lock().await.push(body);

    let mut data = serde_json::Map::new();
    for metric_type in requested {
        if let Some(entries) = state.garmin.health.get(&metric_type) {
            data.insert(metric_type, Value::Array(entries.clone()));
        }
    }
    Json(json!({ "data": data }))
}

async fn garmin_activities(
    State(state): State<ServerState>,
    Json(body): Json<Value>,
) -> Json<Value> {
    state.garmin_requests.lock().await.push(body);
    Json(json!({
        "activities": state.garmin.activities.clone(),
        "workouts": state.garmin.workouts.clone()
    }))
}
