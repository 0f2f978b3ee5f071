// Card Forge - Web Server
// JSON API over the card engine and the per-user generation history

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{delete, get, post},
    Router,
};
use card_forge::{
    classify, extract_record_pattern, extrapolate, generate_records, history_stats,
    open_database, prefix_patterns, AppConfig, CardError, CardRecord, CardTemplate,
    GenerateRequest, HistoryEntry, HistoryStats, HistoryStore, MaskRange, NewHistoryEntry,
    RandomDigits, SimilarityPattern, DEFAULT_EXTRAPOLATIONS,
};
use chrono::Local;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const USER_HEADER: &str = "x-user-id";

/// Shared application state
#[derive(Clone)]
struct AppState {
    db: Arc<Mutex<Connection>>,
    config: Arc<AppConfig>,
}

impl AppState {
    fn db(&self) -> Result<MutexGuard<'_, Connection>, ApiError> {
        self.db
            .lock()
            .map_err(|_| ApiError::Internal("database lock poisoned".to_string()))
    }

    /// Caller identity from the header, falling back to the configured user
    fn user(&self, headers: &HeaderMap) -> String {
        headers
            .get(USER_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| self.config.user.clone())
    }
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

impl ApiResponse<()> {
    fn err(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
        }
    }
}

#[derive(Debug)]
enum ApiError {
    BadRequest(String),
    NotFound(String),
    Internal(String),
}

impl From<CardError> for ApiError {
    fn from(e: CardError) -> Self {
        ApiError::BadRequest(e.to_string())
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        ApiError::Internal(e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m),
            ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m),
            ApiError::Internal(m) => {
                error!("Internal error: {}", m);
                (StatusCode::INTERNAL_SERVER_ERROR, m)
            }
        };
        (status, Json(ApiResponse::err(message))).into_response()
    }
}

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

fn check_quantity(quantity: usize, max: usize) -> Result<(), ApiError> {
    if quantity == 0 || quantity > max {
        return Err(ApiError::BadRequest(format!(
            "quantity must be 1-{}, got {}",
            max, quantity
        )));
    }
    Ok(())
}

// ============================================================================
// Request / Response Types
// ============================================================================

#[derive(Serialize)]
struct GenerateResponse {
    brand: &'static str,
    cards: Vec<CardRecord>,
    text: String,
}

#[derive(Deserialize)]
struct SimilarityRequest {
    first: String,
    second: String,
}

#[derive(Serialize)]
struct SimilarityResponse {
    #[serde(flatten)]
    pattern: SimilarityPattern,
    shared_digits: usize,
    text: String,
}

#[derive(Deserialize)]
struct ExtrapolateRequest {
    card: String,
    #[serde(default)]
    count: Option<usize>,
    #[serde(default)]
    mask: Option<MaskRange>,
}

#[derive(Serialize)]
struct ExtrapolateResponse {
    cards: Vec<CardRecord>,
    patterns: Vec<String>,
}

#[derive(Serialize)]
struct BrandResponse {
    bin: String,
    brand: &'static str,
}

#[derive(Serialize)]
struct FavoriteResponse {
    id: String,
    is_favorite: bool,
}

#[derive(Serialize)]
struct ClearResponse {
    removed: usize,
}

#[derive(Serialize)]
struct HistoryResponse {
    entries: Vec<HistoryEntry>,
    stats: HistoryStats,
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// POST /api/generate - Synthesize a batch and record the request
async fn generate(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<GenerateRequest>,
) -> ApiResult<GenerateResponse> {
    check_quantity(request.quantity, state.config.max_quantity)?;

    let today = Local::now().date_naive();
    let cards = generate_records(&request, &mut rand::thread_rng(), today)?;

    let user = state.user(&headers);
    state.db()?.create(
        &user,
        &NewHistoryEntry {
            bin: request.bin.clone(),
            month: request.month.clone().unwrap_or_default(),
            year: request.year.clone().unwrap_or_default(),
            security_code: request.security_code.clone().unwrap_or_default(),
            quantity: request.quantity as i64,
            target_length: request.target_length as i64,
        },
    )?;
    info!("Generated {} cards for {}", cards.len(), user);

    let text = card_forge::format_batch(&cards);
    Ok(Json(ApiResponse::ok(GenerateResponse {
        brand: classify(&request.bin).as_str(),
        cards,
        text,
    })))
}

/// POST /api/similarity - Mask the digits two records don't share
async fn similarity(Json(request): Json<SimilarityRequest>) -> ApiResult<SimilarityResponse> {
    let first: CardRecord = request.first.parse()?;
    let second: CardRecord = request.second.parse()?;
    let pattern = extract_record_pattern(&first, &second)?;

    Ok(Json(ApiResponse::ok(SimilarityResponse {
        shared_digits: pattern.shared_digits(),
        text: pattern.to_string(),
        pattern,
    })))
}

/// POST /api/extrapolate - Variants of a known card
async fn extrapolate_card(
    State(state): State<AppState>,
    Json(request): Json<ExtrapolateRequest>,
) -> ApiResult<ExtrapolateResponse> {
    let seed: CardRecord = request.card.parse()?;
    let count = request.count.unwrap_or(DEFAULT_EXTRAPOLATIONS);
    check_quantity(count, state.config.max_quantity)?;

    let mask = request.mask.unwrap_or_default();
    let cards = extrapolate(&seed, count, mask, RandomDigits(rand::thread_rng()))?;

    Ok(Json(ApiResponse::ok(ExtrapolateResponse {
        cards,
        patterns: prefix_patterns(&seed.number),
    })))
}

/// GET /api/brand/:bin - Brand of a BIN prefix
async fn brand(Path(bin): Path<String>) -> ApiResult<BrandResponse> {
    let brand = classify(&bin).as_str();
    Ok(Json(ApiResponse::ok(BrandResponse { bin, brand })))
}

/// GET /api/history - Newest requests for the caller
async fn list_history(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<HistoryResponse> {
    let user = state.user(&headers);
    let entries = state.db()?.list(&user, state.config.history_limit)?;
    let stats = history_stats(&entries);
    Ok(Json(ApiResponse::ok(HistoryResponse { entries, stats })))
}

/// POST /api/history - Record a request without generating
async fn create_history(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(entry): Json<NewHistoryEntry>,
) -> ApiResult<HistoryEntry> {
    if entry.quantity < 1 {
        return Err(ApiError::BadRequest(format!(
            "quantity must be at least 1, got {}",
            entry.quantity
        )));
    }
    let target_length = usize::try_from(entry.target_length).unwrap_or(0);
    CardTemplate::parse(&entry.bin, target_length)?;
    let user = state.user(&headers);
    let created = state.db()?.create(&user, &entry)?;
    Ok(Json(ApiResponse::ok(created)))
}

/// DELETE /api/history - Remove all of the caller's entries
async fn clear_history(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<ClearResponse> {
    let user = state.user(&headers);
    let removed = state.db()?.clear(&user)?;
    warn!("Cleared {} history entries for {}", removed, user);
    Ok(Json(ApiResponse::ok(ClearResponse { removed })))
}

/// POST /api/history/:id/favorite - Flip the favourite flag
async fn toggle_favorite(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<FavoriteResponse> {
    let user = state.user(&headers);
    match state.db()?.toggle_favorite(&user, &id)? {
        Some(is_favorite) => Ok(Json(ApiResponse::ok(FavoriteResponse { id, is_favorite }))),
        None => Err(ApiError::NotFound(format!("no history entry {}", id))),
    }
}

/// DELETE /api/history/:id - Remove one entry
async fn delete_history(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<String> {
    let user = state.user(&headers);
    if state.db()?.delete(&user, &id)? {
        Ok(Json(ApiResponse::ok(id)))
    } else {
        Err(ApiError::NotFound(format!("no history entry {}", id)))
    }
}

fn api_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/generate", post(generate))
        .route("/similarity", post(similarity))
        .route("/extrapolate", post(extrapolate_card))
        .route("/brand/:bin", get(brand))
        .route(
            "/history",
            get(list_history).post(create_history).delete(clear_history),
        )
        .route("/history/:id/favorite", post(toggle_favorite))
        .route("/history/:id", delete(delete_history))
        .with_state(state)
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "card_forge=info,card_server=info,tower_http=info".into()),
        )
        .init();

    let config = AppConfig::from_env()?;
    info!("🌐 Card Forge - Web Server");

    let conn = open_database(&config.db_path)?;
    info!("✓ Database opened: {:?}", config.db_path);

    let addr = config.server_addr.clone();
    let state = AppState {
        db: Arc::new(Mutex::new(conn)),
        config: Arc::new(config),
    };

    let app = Router::new().nest("/api", api_routes(state)).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive()),
    );

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("🚀 Server running on http://{}", addr);
    info!("   API: http://{}/api/health", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
