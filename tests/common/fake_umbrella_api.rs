//! Fake Umbrella + event collector server for integration tests.
//!
//! Spins up a minimal `axum` HTTP server on a random TCP port bound to
//! 127.0.0.1. Serves:
//! - `POST /auth/v2/token` — client-credentials token exchange
//! - `GET /deployments/v2/roamingcomputers` — paginated identity listing
//! - `GET /reports/v2/organizations/{org}/activity[/{kind}]` — paginated
//!   activity reports
//! - `POST /hec` — collector endpoint that records every payload
//!
//! [`FakeUmbrellaApi::config`] returns a connector configuration pointing at
//! all of the above.
//!
//! # Example
//!
//! ```rust,no_run
//! let api = FakeUmbrellaApi::start().await.unwrap();
//! api.add_activity_page("dns", vec![dns_record]).await;
//! let mut connector = Connector::new(&api.config()).unwrap();
//! connector.run_cycle(Utc::now()).await;
//! assert_eq!(api.hec_payloads().await.len(), 1);
//! ```

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use ubridge_core::config::Config;

pub const ORG_ID: &str = "1234567";
pub const TOKEN: &str = "fake-access-token";
pub const HEC_TOKEN: &str = "fake-hec-token";

/// One captured POST to the collector endpoint.
#[derive(Debug, Clone)]
pub struct HecRequest {
    pub authorization: Option<String>,
    pub body: String,
}

impl HecRequest {
    /// Parse the newline-delimited payload.
    pub fn events(&self) -> Vec<Value> {
        self.body
            .lines()
            .map(|line| serde_json::from_str(line).expect("payload line must be JSON"))
            .collect()
    }
}

/// State shared between the router and test code.
struct ApiState {
    base_url: String,
    token: Option<String>,
    auth_headers: Vec<Option<String>>,
    identity_pages: Vec<Vec<Value>>,
    identity_requests: usize,
    /// Activity pages per kind (`dns`, `proxy`, `firewall`).
    activity_pages: HashMap<String, Vec<Vec<Value>>>,
    /// Query strings received per kind, in request order.
    activity_queries: HashMap<String, Vec<HashMap<String, String>>>,
    /// Kind → page number that answers 500.
    failing_pages: HashMap<String, usize>,
    hec_status: StatusCode,
    hec_requests: Vec<HecRequest>,
}

/// Handle to the running fake server.
pub struct FakeUmbrellaApi {
    addr: SocketAddr,
    state: Arc<Mutex<ApiState>>,
}

impl FakeUmbrellaApi {
    /// Start the fake server on a random port. Returns once it is listening.
    pub async fn start() -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let state = Arc::new(Mutex::new(ApiState {
            base_url: format!("http://{addr}"),
            token: Some(TOKEN.to_string()),
            auth_headers: Vec::new(),
            identity_pages: Vec::new(),
            identity_requests: 0,
            activity_pages: HashMap::new(),
            activity_queries: HashMap::new(),
            failing_pages: HashMap::new(),
            hec_status: StatusCode::OK,
            hec_requests: Vec::new(),
        }));

        let app = Router::new()
            .route("/auth/v2/token", post(issue_token))
            .route("/deployments/v2/roamingcomputers", get(list_identities))
            .route("/reports/v2/organizations/{org}/activity", get(dns_activity))
            .route("/reports/v2/organizations/{org}/activity/{kind}", get(kind_activity))
            .route("/hec", post(collect))
            .with_state(state.clone());

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Ok(Self { addr, state })
    }

    /// Base URL for the server (e.g. `http://127.0.0.1:PORT`).
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// A complete, valid configuration aimed at this server.
    pub fn config(&self) -> Config {
        let base = self.base_url();
        let mut config = Config::defaults();
        config.umbrella.api_key = "key".to_string();
        config.umbrella.api_secret = "secret".to_string();
        config.umbrella.organization_id = ORG_ID.to_string();
        config.umbrella.auth_url = format!("{base}/auth/v2/token");
        config.umbrella.management_api_url = format!("{base}/deployments/v2");
        config.umbrella.reports_api_url = format!("{base}/reports/v2");
        config.hec.url = format!("{base}/hec");
        config.hec.token = HEC_TOKEN.to_string();
        config
    }

    /// Make the token endpoint answer 401.
    pub async fn reject_credentials(&self) {
        self.state.lock().await.token = None;
    }

    /// Make the token endpoint answer 200 without an `access_token`.
    pub async fn issue_empty_token(&self) {
        self.state.lock().await.token = Some(String::new());
    }

    pub async fn add_identity_page(&self, items: Vec<Value>) {
        self.state.lock().await.identity_pages.push(items);
    }

    pub async fn add_activity_page(&self, kind: &str, records: Vec<Value>) {
        self.state
            .lock()
            .await
            .activity_pages
            .entry(kind.to_string())
            .or_default()
            .push(records);
    }

    /// Answer 500 for `page` (1-based) of `kind`.
    pub async fn fail_activity_page(&self, kind: &str, page: usize) {
        self.state
            .lock()
            .await
            .failing_pages
            .insert(kind.to_string(), page);
    }

    pub async fn set_hec_status(&self, status: StatusCode) {
        self.state.lock().await.hec_status = status;
    }

    pub async fn hec_payloads(&self) -> Vec<HecRequest> {
        self.state.lock().await.hec_requests.clone()
    }

    pub async fn activity_queries(&self, kind: &str) -> Vec<HashMap<String, String>> {
        self.state
            .lock()
            .await
            .activity_queries
            .get(kind)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn auth_headers(&self) -> Vec<Option<String>> {
        self.state.lock().await.auth_headers.clone()
    }

    pub async fn identity_requests(&self) -> usize {
        self.state.lock().await.identity_requests
    }
}

// ---------------------------------------------------------------------------
// Route handlers
// ---------------------------------------------------------------------------

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
}

fn page_number(query: &HashMap<String, String>) -> usize {
    query.get("page").and_then(|p| p.parse().ok()).unwrap_or(1)
}

async fn issue_token(
    State(state): State<Arc<Mutex<ApiState>>>,
    headers: HeaderMap,
    body: String,
) -> Response {
    let mut state = state.lock().await;
    state.auth_headers.push(header(&headers, "authorization"));
    if !body.contains("grant_type=client_credentials") {
        return (StatusCode::BAD_REQUEST, "unsupported grant").into_response();
    }
    match &state.token {
        Some(token) if token.is_empty() => Json(json!({"token_type": "bearer"})).into_response(),
        Some(token) => Json(json!({"access_token": token, "token_type": "bearer", "expires_in": 3600}))
            .into_response(),
        None => (StatusCode::UNAUTHORIZED, "invalid client").into_response(),
    }
}

async fn list_identities(
    State(state): State<Arc<Mutex<ApiState>>>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let mut state = state.lock().await;
    state.identity_requests += 1;
    let page = page_number(&query);
    let items = state
        .identity_pages
        .get(page - 1)
        .cloned()
        .unwrap_or_default();
    let next = (page < state.identity_pages.len()).then(|| {
        format!(
            "{}/deployments/v2/roamingcomputers?page={}",
            state.base_url,
            page + 1
        )
    });
    Json(json!({"data": items, "meta": {"next": next}})).into_response()
}

async fn dns_activity(
    State(state): State<Arc<Mutex<ApiState>>>,
    Path(org): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    activity_page(state, org, "dns".to_string(), query).await
}

async fn kind_activity(
    State(state): State<Arc<Mutex<ApiState>>>,
    Path((org, kind)): Path<(String, String)>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    activity_page(state, org, kind, query).await
}

async fn activity_page(
    state: Arc<Mutex<ApiState>>,
    org: String,
    kind: String,
    query: HashMap<String, String>,
) -> Response {
    let mut state = state.lock().await;
    if org != ORG_ID {
        return (StatusCode::NOT_FOUND, "unknown organization").into_response();
    }
    let page = page_number(&query);
    state
        .activity_queries
        .entry(kind.clone())
        .or_default()
        .push(query);
    if state.failing_pages.get(&kind) == Some(&page) {
        return (StatusCode::INTERNAL_SERVER_ERROR, "upstream unavailable").into_response();
    }

    let pages = state.activity_pages.get(&kind).cloned().unwrap_or_default();
    let data = pages.get(page - 1).cloned().unwrap_or_default();
    let has_more = page < pages.len();
    let kind_path = if kind == "dns" {
        String::new()
    } else {
        format!("/{kind}")
    };
    let next_page = has_more.then(|| {
        format!(
            "{}/reports/v2/organizations/{}/activity{}?page={}",
            state.base_url,
            org,
            kind_path,
            page + 1
        )
    });
    Json(json!({
        "data": data,
        "meta": {"hasMoreData": has_more, "nextPage": next_page, "limit": 1000}
    }))
    .into_response()
}

async fn collect(
    State(state): State<Arc<Mutex<ApiState>>>,
    headers: HeaderMap,
    body: String,
) -> Response {
    let mut state = state.lock().await;
    state.hec_requests.push(HecRequest {
        authorization: header(&headers, "authorization"),
        body,
    });
    let status = state.hec_status;
    if status.is_success() {
        (status, Json(json!({"text": "Success", "code": 0}))).into_response()
    } else {
        (status, Json(json!({"text": "Invalid token", "code": 4}))).into_response()
    }
}
