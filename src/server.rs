//!
//! redress HTTP server
//! -------------------
//! Axum-based HTTP API over the service facade. Handlers resolve the bearer
//! credential into an Identity, call the facade, and map typed outcomes to
//! HTTP statuses; no authorization logic lives at this layer.
//!
//! Responsibilities:
//! - Login/logout endpoints backed by the identity module.
//! - Complaint list/detail/create/update/delete endpoints.
//! - Admin-only bulk export and account management endpoints.
//! - Dashboard summary and model retraining endpoints.
//! - Default admin bootstrap on startup.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info};

use crate::classify::{KeywordClassifier, LocalTrainer};
use crate::error::{AppError, AppResult};
use crate::identity::{self, AuthProvider, Identity, LocalAuthProvider, LoginRequest, SessionManager};
use crate::model::{AccountPatch, ComplaintPatch};
use crate::query::RawFilters;
use crate::security::Argon2Hasher;
use crate::service::{ComplaintService, ensure_default_admin};
use crate::storage::MemoryStore;

/// Shared server state injected into all handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ComplaintService>,
    pub sessions: Arc<SessionManager>,
    pub auth: Arc<LocalAuthProvider>,
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
}

fn identity_of(state: &AppState, headers: &HeaderMap) -> Identity {
    match bearer_token(headers) {
        Some(token) => identity::resolve(state.sessions.as_ref(), token, Utc::now()),
        None => Identity::Anonymous,
    }
}

fn error_response(e: AppError) -> Response {
    let status = StatusCode::from_u16(e.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    if status.is_server_error() {
        error!(target: "http", "request failed: {}", e);
    }
    (status, Json(json!({ "error": e.code_str(), "message": e.message() }))).into_response()
}

fn to_response<T: serde::Serialize>(result: AppResult<T>, ok_status: StatusCode) -> Response {
    match result {
        Ok(v) => (ok_status, Json(v)).into_response(),
        Err(e) => error_response(e),
    }
}

async fn health_check() -> Response {
    Json(json!({ "message": "API is running" })).into_response()
}

#[derive(Debug, Deserialize)]
struct LoginBody {
    username: String,
    password: String,
}

async fn login(State(state): State<AppState>, Json(body): Json<LoginBody>) -> Response {
    match state.auth.login(&LoginRequest { username: body.username, password: body.password }) {
        Ok(resp) => Json(json!({
            "token": resp.session.token,
            "role": resp.session.claims.role,
        }))
        .into_response(),
        Err(e) => error_response(e),
    }
}

async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Some(token) = bearer_token(&headers) {
        state.sessions.logout(token);
    }
    Json(json!({ "message": "logged out" })).into_response()
}

async fn list_complaints(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(raw): Query<RawFilters>,
) -> Response {
    let identity = identity_of(&state, &headers);
    match state.service.list_complaints(&identity, &raw) {
        Ok(result) => Json(json!({
            "complaints": result.items,
            "total": result.total,
            "page": result.spec.page,
            "page_size": result.spec.page_size,
            "groups": result.groups,
        }))
        .into_response(),
        Err(e) => error_response(e),
    }
}

#[derive(Debug, Deserialize)]
struct CreateComplaintBody {
    #[serde(default)]
    text: String,
}

async fn create_complaint(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<CreateComplaintBody>,
) -> Response {
    let identity = identity_of(&state, &headers);
    to_response(state.service.create_complaint(&identity, &body.text), StatusCode::CREATED)
}

async fn get_complaint(State(state): State<AppState>, headers: HeaderMap, Path(id): Path<String>) -> Response {
    let identity = identity_of(&state, &headers);
    to_response(state.service.get_complaint(&identity, &id), StatusCode::OK)
}

async fn update_complaint(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(patch): Json<ComplaintPatch>,
) -> Response {
    let identity = identity_of(&state, &headers);
    to_response(state.service.update_complaint(&identity, &id, &patch), StatusCode::OK)
}

async fn delete_complaint(State(state): State<AppState>, headers: HeaderMap, Path(id): Path<String>) -> Response {
    let identity = identity_of(&state, &headers);
    match state.service.delete_complaint(&identity, &id) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response(e),
    }
}

/// Export query parameters: the list filters plus the artifact format.
/// Kept as an explicit struct because the raw filters arrive untyped.
#[derive(Debug, Default, Deserialize)]
struct ExportParams {
    #[serde(default)]
    format: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    sentiment: Option<String>,
    #[serde(default)]
    priority: Option<String>,
}

impl ExportParams {
    fn raw_filters(&self) -> RawFilters {
        RawFilters {
            category: self.category.clone(),
            status: self.status.clone(),
            sentiment: self.sentiment.clone(),
            priority: self.priority.clone(),
            ..RawFilters::default()
        }
    }
}

async fn export_complaints(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<ExportParams>,
) -> Response {
    let identity = identity_of(&state, &headers);
    let format = params.format.as_deref().unwrap_or("csv");
    match state.service.export_complaints(&identity, &params.raw_filters(), format) {
        Ok(artifact) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, artifact.content_type.to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", artifact.file_name),
                ),
            ],
            artifact.bytes,
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}

async fn dashboard_summary(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let identity = identity_of(&state, &headers);
    to_response(state.service.dashboard_summary(&identity), StatusCode::OK)
}

async fn list_accounts(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let identity = identity_of(&state, &headers);
    to_response(state.service.list_accounts(&identity), StatusCode::OK)
}

#[derive(Debug, Deserialize)]
struct CreateAccountBody {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
    #[serde(default = "default_role")]
    role: String,
}

fn default_role() -> String {
    "user".to_string()
}

async fn create_account(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<CreateAccountBody>,
) -> Response {
    let identity = identity_of(&state, &headers);
    to_response(
        state.service.create_account(&identity, &body.username, &body.password, &body.role),
        StatusCode::CREATED,
    )
}

async fn update_account(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(patch): Json<AccountPatch>,
) -> Response {
    let identity = identity_of(&state, &headers);
    match state.service.update_account(&identity, &id, &patch) {
        Ok(account) => {
            if patch.role.is_some() || patch.password.as_deref().map(|p| !p.is_empty()).unwrap_or(false) {
                // stale sessions would keep the old role or password alive
                state.sessions.revoke_user(&account.username);
            }
            Json(account).into_response()
        }
        Err(e) => error_response(e),
    }
}

async fn delete_account(State(state): State<AppState>, headers: HeaderMap, Path(id): Path<String>) -> Response {
    let identity = identity_of(&state, &headers);
    let username = match state.service.get_account(&identity, &id) {
        Ok(a) => a.username,
        Err(e) => return error_response(e),
    };
    match state.service.delete_account(&identity, &id) {
        Ok(()) => {
            state.sessions.revoke_user(&username);
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => error_response(e),
    }
}

async fn trigger_retrain(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let identity = identity_of(&state, &headers);
    match state.service.trigger_retrain(&identity) {
        Ok(job) => (
            StatusCode::ACCEPTED,
            Json(json!({ "job_id": job.job_id, "status": job.status() })),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health_check))
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
        .route("/api/complaints", get(list_complaints).post(create_complaint))
        .route("/api/complaints/export", get(export_complaints))
        .route(
            "/api/complaints/{id}",
            get(get_complaint).put(update_complaint).delete(delete_complaint),
        )
        .route("/api/dashboard/summary", get(dashboard_summary))
        .route("/api/users", get(list_accounts).post(create_account))
        .route("/api/users/{id}", axum::routing::put(update_account).delete(delete_account))
        .route("/api/feedback/retrain", post(trigger_retrain))
        .with_state(state)
}

/// Build the default single-process state: in-memory store, keyword
/// classifier, Argon2 hashing, local trainer.
pub fn default_state(session_ttl_secs: i64, admin_password: &str) -> anyhow::Result<AppState> {
    let store = Arc::new(MemoryStore::new());
    let hasher = Arc::new(Argon2Hasher);
    let sessions = Arc::new(SessionManager::with_ttl(chrono::Duration::seconds(session_ttl_secs)));
    let trainer = Arc::new(LocalTrainer::new(store.clone()));
    let service = Arc::new(ComplaintService::new(
        store.clone(),
        store.clone(),
        Arc::new(KeywordClassifier),
        hasher.clone(),
        trainer,
    ));
    ensure_default_admin(store.as_ref(), hasher.as_ref(), admin_password)
        .map_err(|e| anyhow::anyhow!("while seeding default admin: {}", e))?;
    let auth = Arc::new(LocalAuthProvider::new(store, hasher, sessions.clone()));
    Ok(AppState { service, sessions, auth })
}

pub async fn run_with_port(http_port: u16, session_ttl_secs: i64, admin_password: &str) -> anyhow::Result<()> {
    let state = default_state(session_ttl_secs, admin_password)?;
    let app = router(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], http_port));
    info!(target: "startup", "redress listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
