use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, Method, StatusCode},
    routing::{get, post},
    Json, Router,
};
use linkheart_shared::{Decision, MatchId, UserId};
use linkheart_store::{Conversation, Match, Message, NewUser, Store, StoreStats, User};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::stream;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Store>,
    pub config: Arc<ServerConfig>,
    pub started_at: Instant,
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/info", get(server_info))
        .route("/candidates", get(candidates))
        .route("/swipe", post(swipe))
        .route("/swipe/reset", post(reset_swipes))
        .route("/matches", get(conversations))
        .route("/matches/:id/read", post(mark_read))
        .route("/matches/:id/events", get(stream::match_events))
        .route("/messages", get(messages))
        .route("/message", post(send_message))
        .route("/users", post(register_user))
        .route("/users/:id", get(get_user).put(update_user))
        .route("/admin/stats", get(admin_stats))
        .route("/admin/users", get(admin_users))
        .route("/admin/matches", post(admin_force_match))
        .route("/reset", post(admin_reset))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

#[derive(Serialize)]
struct ServerInfoResponse {
    name: String,
    version: &'static str,
    users: usize,
    matches: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AdminStatsResponse {
    name: String,
    #[serde(flatten)]
    stats: StoreStats,
    uptime_secs: u64,
}

#[derive(Deserialize)]
struct CandidatesQuery {
    viewer: UserId,
}

#[derive(Deserialize)]
struct SwipeRequest {
    from: UserId,
    to: UserId,
    decision: Decision,
}

#[derive(Serialize)]
struct SwipeResponse {
    matched: bool,
    #[serde(rename = "match", skip_serializing_if = "Option::is_none")]
    formed: Option<Match>,
}

#[derive(Deserialize)]
struct ViewerRequest {
    viewer: UserId,
}

#[derive(Deserialize)]
struct UserQuery {
    user: UserId,
}

#[derive(Deserialize)]
struct MessagesQuery {
    #[serde(rename = "match")]
    match_id: MatchId,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendMessageRequest {
    #[serde(rename = "match")]
    match_id: MatchId,
    sender: UserId,
    #[serde(default)]
    text: String,
    #[serde(default)]
    image_ref: Option<String>,
}

#[derive(Deserialize)]
struct ReadRequest {
    reader: UserId,
}

#[derive(Deserialize)]
struct ForceMatchRequest {
    a: UserId,
    b: UserId,
}

/// Run a store operation on the blocking pool.
///
/// Store calls take the writer mutex and may wait on the SQLite lock of
/// another process, so they never run on the async workers.
pub(crate) async fn with_store<T, F>(state: &AppState, op: F) -> Result<T, ServerError>
where
    T: Send + 'static,
    F: FnOnce(&Store) -> linkheart_store::Result<T> + Send + 'static,
{
    let store = state.store.clone();
    tokio::task::spawn_blocking(move || op(&store))
        .await
        .map_err(|e| ServerError::Internal(e.to_string()))?
        .map_err(ServerError::from)
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn server_info(
    State(state): State<AppState>,
) -> Result<Json<ServerInfoResponse>, ServerError> {
    let stats = with_store(&state, |store| store.stats()).await?;
    Ok(Json(ServerInfoResponse {
        name: state.config.instance_name.clone(),
        version: env!("CARGO_PKG_VERSION"),
        users: stats.users,
        matches: stats.matches,
    }))
}

// ─── Discovery ───

async fn candidates(
    State(state): State<AppState>,
    Query(query): Query<CandidatesQuery>,
) -> Result<Json<Vec<User>>, ServerError> {
    let feed = with_store(&state, move |store| store.candidates_for(&query.viewer)).await?;
    Ok(Json(feed))
}

async fn swipe(
    State(state): State<AppState>,
    Json(req): Json<SwipeRequest>,
) -> Result<Json<SwipeResponse>, ServerError> {
    let outcome = with_store(&state, move |store| {
        store.record_swipe(&req.from, &req.to, req.decision)
    })
    .await?;
    Ok(Json(SwipeResponse {
        matched: outcome.is_match(),
        formed: outcome.matched,
    }))
}

async fn reset_swipes(
    State(state): State<AppState>,
    Json(req): Json<ViewerRequest>,
) -> Result<Json<serde_json::Value>, ServerError> {
    let cleared = with_store(&state, move |store| store.clear_decisions(&req.viewer)).await?;
    Ok(Json(serde_json::json!({ "cleared": cleared })))
}

// ─── Conversations ───

async fn conversations(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> Result<Json<Vec<Conversation>>, ServerError> {
    let list = with_store(&state, move |store| store.conversations_for(&query.user)).await?;
    Ok(Json(list))
}

async fn messages(
    State(state): State<AppState>,
    Query(query): Query<MessagesQuery>,
) -> Result<Json<Vec<Message>>, ServerError> {
    let history = with_store(&state, move |store| store.messages_for(query.match_id)).await?;
    Ok(Json(history))
}

async fn send_message(
    State(state): State<AppState>,
    Json(req): Json<SendMessageRequest>,
) -> Result<(StatusCode, Json<Message>), ServerError> {
    let message = with_store(&state, move |store| {
        store.append_message(
            req.match_id,
            &req.sender,
            &req.text,
            req.image_ref.as_deref(),
        )
    })
    .await?;
    Ok((StatusCode::CREATED, Json(message)))
}

async fn mark_read(
    State(state): State<AppState>,
    Path(match_id): Path<MatchId>,
    Json(req): Json<ReadRequest>,
) -> Result<Json<serde_json::Value>, ServerError> {
    let marked = with_store(&state, move |store| store.mark_read(match_id, &req.reader)).await?;
    Ok(Json(serde_json::json!({ "marked": marked })))
}

// ─── Profiles ───

async fn register_user(
    State(state): State<AppState>,
    Json(req): Json<NewUser>,
) -> Result<(StatusCode, Json<User>), ServerError> {
    let user = with_store(&state, move |store| store.create_user(req)).await?;
    info!(user = %user.id, "User registered");
    Ok((StatusCode::CREATED, Json(user)))
}

async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<UserId>,
) -> Result<Json<User>, ServerError> {
    let user = with_store(&state, move |store| store.get_user(&id)).await?;
    Ok(Json(user))
}

async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<UserId>,
    Json(user): Json<User>,
) -> Result<Json<User>, ServerError> {
    if user.id != id {
        return Err(ServerError::BadRequest(format!(
            "Body id {} does not match path id {}",
            user.id, id
        )));
    }
    let stored = with_store(&state, move |store| store.update_user(user)).await?;
    Ok(Json(stored))
}

// ─── Admin ───

fn verify_admin_token(headers: &HeaderMap, config: &ServerConfig) -> Result<(), ServerError> {
    let Some(ref expected) = config.admin_token else {
        return Err(ServerError::Forbidden(
            "Admin API is disabled (no ADMIN_TOKEN configured)".into(),
        ));
    };

    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let token = auth.strip_prefix("Bearer ").unwrap_or(auth);

    use subtle::ConstantTimeEq;
    let token_bytes = token.as_bytes();
    let expected_bytes = expected.as_bytes();
    if token_bytes.len() != expected_bytes.len()
        || token_bytes.ct_eq(expected_bytes).unwrap_u8() != 1
    {
        return Err(ServerError::Forbidden("Invalid admin token".into()));
    }

    Ok(())
}

async fn admin_stats(
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Result<Json<AdminStatsResponse>, ServerError> {
    verify_admin_token(&headers, &state.config)?;

    let stats = with_store(&state, |store| store.stats()).await?;
    Ok(Json(AdminStatsResponse {
        name: state.config.instance_name.clone(),
        stats,
        uptime_secs: state.started_at.elapsed().as_secs(),
    }))
}

/// Every account, admin included, in registration order.
async fn admin_users(
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Result<Json<Vec<User>>, ServerError> {
    verify_admin_token(&headers, &state.config)?;

    let users = with_store(&state, |store| store.list_users()).await?;
    Ok(Json(users))
}

async fn admin_force_match(
    headers: HeaderMap,
    State(state): State<AppState>,
    Json(req): Json<ForceMatchRequest>,
) -> Result<Json<Match>, ServerError> {
    verify_admin_token(&headers, &state.config)?;

    let (a, b) = (req.a.clone(), req.b.clone());
    let created = with_store(&state, move |store| store.create_match(&a, &b)).await?;
    info!(match_id = %created.id, a = %req.a, b = %req.b, "Admin forced match");
    Ok(Json(created))
}

async fn admin_reset(
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, ServerError> {
    verify_admin_token(&headers, &state.config)?;

    with_store(&state, |store| store.reset()).await?;
    info!("Admin reset the store to the seed dataset");
    Ok(Json(serde_json::json!({ "reset": true })))
}

pub async fn serve(state: AppState, addr: std::net::SocketAddr) -> anyhow::Result<()> {
    let app = build_router(state);

    info!(addr = %addr, "Starting HTTP API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
