use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, Multipart, Path, Request, State};
use axum::http::header;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use chrono::{SecondsFormat, Utc};
use neutron_core::db::{
    Database, LibSqlPlaytimeLedger, LibSqlSaveStore, PlaytimeLedger, SaveStore,
};
use neutron_core::storage::BlobStore;
use neutron_core::{GameId, PlaytimeRecord, SaveVersion};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::auth::{extract_bearer_token, optional_bearer_token, AuthenticatedUser, JwtVerifier};
use crate::config::AppConfig;
use crate::error::AppError;

/// Room for multipart framing on top of the save payload itself.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    db: Arc<Mutex<Database>>,
    blobs: Arc<BlobStore>,
    jwt_verifier: Arc<JwtVerifier>,
}

impl AppState {
    pub async fn open(config: Arc<AppConfig>) -> neutron_core::Result<Self> {
        let db = Database::open(&config.db_path).await?;
        let blobs = BlobStore::new(&config.save_dir);
        blobs.ensure_root().await?;
        Ok(Self::from_parts(config, db, blobs))
    }

    pub fn from_parts(config: Arc<AppConfig>, db: Database, blobs: BlobStore) -> Self {
        Self {
            jwt_verifier: Arc::new(JwtVerifier::new(&config)),
            db: Arc::new(Mutex::new(db)),
            blobs: Arc::new(blobs),
            config,
        }
    }
}

pub fn app_router(state: AppState) -> Router {
    let body_limit = state
        .config
        .max_save_bytes
        .saturating_add(MULTIPART_OVERHEAD_BYTES);

    let save_routes = Router::new()
        .route("/games/{game_id}/save", post(upload_save))
        .route("/games/{game_id}/save/latest", get(latest_save_content))
        .route("/games/{game_id}/save/latest/info", get(latest_save_info))
        .route("/games/{game_id}/saves", get(list_saves))
        .route("/games/{game_id}/saves/{save_id}", get(save_content))
        .route_layer(middleware::from_fn_with_state(state.clone(), optional_auth));

    let playtime_routes = Router::new()
        .route(
            "/games/{game_id}/playtime",
            get(get_playtime).post(add_playtime),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .route("/healthz", get(healthz))
        .merge(save_routes)
        .merge(playtime_routes)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_headers(Any)
                .allow_methods(Any),
        )
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp: i64,
}

async fn healthz() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        timestamp: Utc::now().timestamp(),
    })
}

async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_bearer_token(request.headers())?;
    let user = state.jwt_verifier.verify_access_token(token)?;
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

/// Saves are game-scoped; a bearer token is optional, but a bad one is still rejected.
async fn optional_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if let Some(token) = optional_bearer_token(request.headers())? {
        let user = state.jwt_verifier.verify_access_token(token)?;
        request.extensions_mut().insert(user);
    }
    Ok(next.run(request).await)
}

#[derive(Debug, Serialize)]
struct SaveInfoResponse {
    id: i64,
    created_at: String,
}

#[derive(Debug, Serialize)]
struct SaveVersionResponse {
    id: i64,
    created_at: String,
    size_bytes: i64,
}

impl From<&SaveVersion> for SaveVersionResponse {
    fn from(version: &SaveVersion) -> Self {
        Self {
            id: version.id,
            created_at: version.info().created_at_iso(),
            size_bytes: version.size_bytes,
        }
    }
}

#[derive(Debug, Serialize)]
struct UploadResponse {
    save_id: i64,
    created_at: String,
}

#[derive(Debug, Deserialize)]
struct PlaytimeRequest {
    seconds: i64,
}

#[derive(Debug, Serialize)]
struct PlaytimeResponse {
    game_id: GameId,
    seconds: i64,
    last_played: String,
}

impl From<PlaytimeRecord> for PlaytimeResponse {
    fn from(record: PlaytimeRecord) -> Self {
        Self {
            game_id: record.game_id,
            seconds: record.seconds,
            last_played: record
                .last_played
                .to_rfc3339_opts(SecondsFormat::Micros, true),
        }
    }
}

async fn latest_save_info(
    State(state): State<AppState>,
    Path(game_id): Path<i64>,
) -> Result<Json<SaveInfoResponse>, AppError> {
    let game_id = GameId::new(game_id);
    let db = state.db.lock().await;
    let store = LibSqlSaveStore::new(db.connection(), &state.blobs);

    let info = store
        .latest_info(game_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("No save for game {game_id}")))?;
    Ok(Json(SaveInfoResponse {
        id: info.id,
        created_at: info.created_at_iso(),
    }))
}

async fn latest_save_content(
    State(state): State<AppState>,
    Path(game_id): Path<i64>,
) -> Result<Response, AppError> {
    let game_id = GameId::new(game_id);
    let db = state.db.lock().await;
    let store = LibSqlSaveStore::new(db.connection(), &state.blobs);

    let bytes = store
        .latest_content(game_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("No save for game {game_id}")))?;
    Ok(save_bytes_response(bytes))
}

async fn list_saves(
    State(state): State<AppState>,
    Path(game_id): Path<i64>,
) -> Result<Json<Vec<SaveVersionResponse>>, AppError> {
    let db = state.db.lock().await;
    let store = LibSqlSaveStore::new(db.connection(), &state.blobs);

    let versions = store.list(GameId::new(game_id)).await?;
    Ok(Json(versions.iter().map(SaveVersionResponse::from).collect()))
}

async fn save_content(
    State(state): State<AppState>,
    Path((game_id, save_id)): Path<(i64, i64)>,
) -> Result<Response, AppError> {
    let game_id = GameId::new(game_id);
    let db = state.db.lock().await;
    let store = LibSqlSaveStore::new(db.connection(), &state.blobs);

    let bytes = store
        .content(game_id, save_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Save {save_id} for game {game_id}")))?;
    Ok(save_bytes_response(bytes))
}

async fn upload_save(
    State(state): State<AppState>,
    Path(game_id): Path<i64>,
    user: Option<Extension<AuthenticatedUser>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let game_id = GameId::new(game_id);
    let max_bytes = state.config.max_save_bytes;

    let mut payload = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some("file") {
            payload = Some(field.bytes().await?);
            break;
        }
    }
    let bytes = payload.ok_or_else(|| AppError::bad_request("Missing multipart field `file`"))?;
    if bytes.is_empty() {
        return Err(AppError::bad_request("Save file is empty"));
    }
    if bytes.len() > max_bytes {
        return Err(AppError::payload_too_large(format!(
            "Save file exceeds {max_bytes} bytes"
        )));
    }

    let user_id = user.map(|Extension(user)| user.user_id);
    let db = state.db.lock().await;
    let store = LibSqlSaveStore::new(db.connection(), &state.blobs);
    let version = store.create(game_id, user_id.as_deref(), &bytes).await?;

    tracing::info!(
        endpoint = "save_upload",
        game_id = %game_id,
        save_id = version.id,
        size_bytes = version.size_bytes,
        authenticated = user_id.is_some(),
        "Stored save version"
    );
    Ok(Json(UploadResponse {
        save_id: version.id,
        created_at: version.info().created_at_iso(),
    }))
}

async fn add_playtime(
    State(state): State<AppState>,
    Path(game_id): Path<i64>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(request): Json<PlaytimeRequest>,
) -> Result<Json<PlaytimeResponse>, AppError> {
    if request.seconds < 0 {
        return Err(AppError::bad_request("seconds must not be negative"));
    }

    let game_id = GameId::new(game_id);
    let db = state.db.lock().await;
    let ledger = LibSqlPlaytimeLedger::new(db.connection());
    let record = ledger
        .add_seconds(&user.user_id, game_id, request.seconds)
        .await?;

    tracing::info!(
        endpoint = "playtime",
        game_id = %game_id,
        delta_secs = request.seconds,
        total_secs = record.seconds,
        "Recorded playtime"
    );
    Ok(Json(record.into()))
}

async fn get_playtime(
    State(state): State<AppState>,
    Path(game_id): Path<i64>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<Json<PlaytimeResponse>, AppError> {
    let game_id = GameId::new(game_id);
    let db = state.db.lock().await;
    let ledger = LibSqlPlaytimeLedger::new(db.connection());

    let record = ledger
        .get(&user.user_id, game_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("No playtime for game {game_id}")))?;
    Ok(Json(record.into()))
}

fn save_bytes_response(bytes: Vec<u8>) -> Response {
    (
        [
            (header::CONTENT_TYPE, "application/octet-stream"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        bytes,
    )
        .into_response()
}
