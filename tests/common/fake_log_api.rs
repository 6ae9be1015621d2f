//! Fake `mlv.cgi` server for integration tests.
//!
//! Spins up a minimal `axum` HTTP server on a random TCP port bound to
//! 127.0.0.1, serving `GET /cgi/mlv/mlv.cgi`:
//! - `api=logs&action=list`: the registered logs
//! - `api=logs&action=tail`: the last `lines` lines of a log, filtered by
//!   `search` (substring, case-folded unless `case=1`)
//! - `api=logs&action=search_all`: the same filter over every readable log
//! - `api=update&action=check|update`: canned payloads
//! - `download=<id>`: a registered attachment
//!
//! Every request's query parameters are recorded so tests can assert on
//! exactly what the client sent.
//!
//! # Example
//!
//! ```rust,no_run
//! let api = FakeLogApi::start().await.unwrap();
//! api.add_log(LogBuilder::new("apache").category("Web Server")).await;
//! api.set_lines("apache", &["GET / 200"]).await;
//! let client = api.client();
//! ```

use super::builders::LogBuilder;
use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use mlv_client::{resolve_base_url, ApiClient};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::Mutex;

type Params = HashMap<String, String>;

/// A canned raw response, served once instead of the normal handler.
#[derive(Clone)]
struct Canned {
    status: StatusCode,
    content_type: &'static str,
    body: String,
}

/// State shared between the router and test code.
struct ApiState {
    logs: Vec<Value>,
    lines: HashMap<String, Vec<String>>,
    /// Per-log artificial latency for `tail`.
    delays: HashMap<String, Duration>,
    downloads: HashMap<String, (String, Vec<u8>)>,
    update_check: Value,
    update_apply: Value,
    canned: Vec<Canned>,
    requests: Vec<Params>,
    headers: Vec<HeaderMap>,
}

impl Default for ApiState {
    fn default() -> Self {
        Self {
            logs: Vec::new(),
            lines: HashMap::new(),
            delays: HashMap::new(),
            downloads: HashMap::new(),
            update_check: json!({
                "status": "ok",
                "current_version": "1.0.0",
                "remote_version": "1.0.0",
                "has_update": false,
            }),
            update_apply: json!({ "status": "ok" }),
            canned: Vec::new(),
            requests: Vec::new(),
            headers: Vec::new(),
        }
    }
}

/// Handle to the running fake API server.
pub struct FakeLogApi {
    addr: SocketAddr,
    state: Arc<Mutex<ApiState>>,
}

impl FakeLogApi {
    /// Start the server on a random port. Returns once it is listening.
    pub async fn start() -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let state = Arc::new(Mutex::new(ApiState::default()));

        let app = Router::new()
            .route("/cgi/mlv/mlv.cgi", get(endpoint))
            .with_state(state.clone());

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Ok(Self { addr, state })
    }

    /// Base directory URL (e.g. `http://127.0.0.1:PORT/cgi/mlv/`).
    pub fn base_url(&self) -> String {
        format!("http://{}/cgi/mlv/", self.addr)
    }

    /// A client pointed at this server with a short timeout.
    pub fn client(&self) -> ApiClient {
        let base = resolve_base_url(Some(&self.base_url()), "").unwrap();
        ApiClient::new(base).with_timeout(Duration::from_secs(5))
    }

    pub async fn add_log(&self, log: LogBuilder) {
        self.state.lock().await.logs.push(log.json());
    }

    /// Register a raw catalog entry, for lenient-field tests.
    pub async fn add_raw_log(&self, log: Value) {
        self.state.lock().await.logs.push(log);
    }

    pub async fn remove_log(&self, id: &str) {
        self.state.lock().await.logs.retain(|log| log["id"] != id);
    }

    pub async fn set_lines(&self, id: &str, lines: &[&str]) {
        self.state
            .lock()
            .await
            .lines
            .insert(id.to_string(), lines.iter().map(|l| l.to_string()).collect());
    }

    pub async fn delay_tail(&self, id: &str, delay: Duration) {
        self.state.lock().await.delays.insert(id.to_string(), delay);
    }

    pub async fn set_download(&self, id: &str, file_name: &str, body: &[u8]) {
        self.state
            .lock()
            .await
            .downloads
            .insert(id.to_string(), (file_name.to_string(), body.to_vec()));
    }

    pub async fn set_update_check(&self, payload: Value) {
        self.state.lock().await.update_check = payload;
    }

    pub async fn set_update_apply(&self, payload: Value) {
        self.state.lock().await.update_apply = payload;
    }

    /// Serve `body` with `status` and `content_type` for the next request.
    pub async fn fail_next(&self, status: u16, content_type: &'static str, body: &str) {
        self.state.lock().await.canned.push(Canned {
            status: StatusCode::from_u16(status).unwrap(),
            content_type,
            body: body.to_string(),
        });
    }

    /// Query parameters of every request so far, in arrival order.
    pub async fn requests(&self) -> Vec<Params> {
        self.state.lock().await.requests.clone()
    }

    /// Requests whose `action` parameter equals `action`.
    pub async fn requests_for(&self, action: &str) -> Vec<Params> {
        self.requests()
            .await
            .into_iter()
            .filter(|p| p.get("action").map(String::as_str) == Some(action))
            .collect()
    }

    /// Value of header `name` on the most recent request.
    pub async fn last_header(&self, name: &str) -> Option<String> {
        let state = self.state.lock().await;
        state
            .headers
            .last()
            .and_then(|h| h.get(name))
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    }
}

// ---------------------------------------------------------------------------
// Route handler
// ---------------------------------------------------------------------------

async fn endpoint(
    Query(params): Query<Params>,
    headers: HeaderMap,
    State(state): State<Arc<Mutex<ApiState>>>,
) -> Response {
    let delay = {
        let mut state = state.lock().await;
        state.requests.push(params.clone());
        state.headers.push(headers);
        if !state.canned.is_empty() {
            let canned = state.canned.remove(0);
            return (
                canned.status,
                [(header::CONTENT_TYPE, canned.content_type)],
                canned.body,
            )
                .into_response();
        }
        params
            .get("id")
            .and_then(|id| state.delays.get(id))
            .copied()
    };
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }

    let state = state.lock().await;
    if let Some(id) = params.get("download") {
        return match state.downloads.get(id) {
            Some((name, body)) => (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, "application/gzip".to_string()),
                    (
                        header::CONTENT_DISPOSITION,
                        format!("attachment; filename=\"{name}\""),
                    ),
                ],
                body.clone(),
            )
                .into_response(),
            None => Json(json!({ "status": "error", "message": "Log not available" }))
                .into_response(),
        };
    }

    let param = |key: &str| params.get(key).map(String::as_str).unwrap_or("");
    let payload = match (param("api"), param("action")) {
        ("logs", "list") => json!({ "status": "ok", "data": state.logs }),
        ("logs", "tail") => tail(&state, &params),
        ("logs", "search_all") => search_all(&state, &params),
        ("update", "check") => state.update_check.clone(),
        ("update", "update") => state.update_apply.clone(),
        _ => json!({ "status": "error", "message": "Unknown action" }),
    };
    Json(payload).into_response()
}

fn filtered(lines: &[String], params: &Params) -> Vec<String> {
    let search = params.get("search").map(String::as_str).unwrap_or("");
    let case_sensitive = params.get("case").map(String::as_str) == Some("1");
    let limit: usize = params
        .get("lines")
        .and_then(|l| l.parse().ok())
        .unwrap_or(100);
    let hits: Vec<String> = lines
        .iter()
        .filter(|line| {
            search.is_empty()
                || if case_sensitive {
                    line.contains(search)
                } else {
                    line.to_lowercase().contains(&search.to_lowercase())
                }
        })
        .cloned()
        .collect();
    let skip = hits.len().saturating_sub(limit);
    hits.into_iter().skip(skip).collect()
}

fn tail(state: &ApiState, params: &Params) -> Value {
    let id = params.get("id").map(String::as_str).unwrap_or("");
    let Some(log) = state.logs.iter().find(|log| log["id"] == id) else {
        return json!({ "status": "error", "message": "Log not found" });
    };
    let lines = state.lines.get(id).cloned().unwrap_or_default();
    json!({
        "status": "ok",
        "lines": filtered(&lines, params),
        "meta": { "size": log["size"], "mtime": log["mtime"] },
    })
}

fn search_all(state: &ApiState, params: &Params) -> Value {
    let matches: Vec<Value> = state
        .logs
        .iter()
        .filter(|log| log["exists"] == true && log["compressed"] != true)
        .filter_map(|log| {
            let id = log["id"].as_str()?;
            let lines = state.lines.get(id).cloned().unwrap_or_default();
            let hits = filtered(&lines, params);
            (!hits.is_empty()).then(|| {
                json!({ "name": log["name"], "path": log["path"], "matches": hits })
            })
        })
        .collect();
    json!({ "status": "ok", "matches": matches })
}
