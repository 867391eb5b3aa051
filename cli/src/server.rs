use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    Json, Router,
    extract::{Request, State},
    http::{HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::Local;
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::services::{ServeDir, ServeFile};

use pantry_core::PantryError;
use pantry_core::models::{MergedFoodItem, MergedInventory, RawItem};
use pantry_core::service::{NOTHING_EXPIRING_TEXT, PantryService};

const BODY_LIMIT: usize = 1024 * 1024; // 1 MB

const ALLOWED_ORIGINS: [&str; 3] = [
    "http://localhost:3000",
    "http://localhost:5000",
    "http://127.0.0.1:5000",
];

#[derive(Clone)]
struct AppState {
    service: Arc<PantryService>,
    development: bool,
}

// --- Response types ---

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DataResponse {
    success: bool,
    inventory: Vec<MergedFoodItem>,
    expiring_soon: Vec<MergedFoodItem>,
    recipe_text: Option<String>,
    title: Option<String>,
    image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'static str>,
}

#[derive(Serialize)]
struct InventoryResponse {
    success: bool,
    inventory: Vec<MergedFoodItem>,
}

#[derive(Serialize)]
struct DebugResponse {
    success: bool,
    raw_data: Vec<RawItem>,
    processed_data: MergedInventory,
}

#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

// --- Error handling ---

struct ApiError {
    err: anyhow::Error,
    development: bool,
}

impl ApiError {
    fn new(err: impl Into<anyhow::Error>, development: bool) -> Self {
        Self {
            err: err.into(),
            development,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        tracing::error!("request failed: {:#}", self.err);
        let body = ErrorResponse {
            success: false,
            error: self.err.to_string(),
            details: self.development.then(|| format!("{:?}", self.err)),
        };
        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}

/// Run a blocking service call off the async workers.
async fn run_blocking<T, F>(state: &AppState, f: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&PantryService) -> Result<T, PantryError> + Send + 'static,
{
    let service = Arc::clone(&state.service);
    tokio::task::spawn_blocking(move || f(&service))
        .await
        .context("service task panicked")
        .map_err(|e| ApiError::new(e, state.development))?
        .map_err(|e| ApiError::new(e, state.development))
}

// --- Middleware ---

async fn security_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(
        "x-content-type-options",
        HeaderValue::from_static("nosniff"),
    );
    headers.insert("x-frame-options", HeaderValue::from_static("DENY"));
    response
}

fn cors_layer() -> CorsLayer {
    let origins: Vec<HeaderValue> = ALLOWED_ORIGINS
        .into_iter()
        .map(HeaderValue::from_static)
        .collect();
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET])
        .allow_credentials(true)
}

// --- Handlers ---

async fn get_data(State(state): State<AppState>) -> Result<Json<DataResponse>, ApiError> {
    let today = Local::now().date_naive();
    let report = run_blocking(&state, move |service| service.report(today)).await?;

    let message = report
        .expiring_soon
        .is_empty()
        .then_some(NOTHING_EXPIRING_TEXT);
    let (recipe_text, title, image_url) = match report.recipe {
        Some(r) => (Some(r.recipe_text), Some(r.title), r.image_url),
        None => (None, None, None),
    };

    Ok(Json(DataResponse {
        success: true,
        inventory: report.inventory.all,
        expiring_soon: report.expiring_soon,
        recipe_text,
        title,
        image_url,
        message,
    }))
}

async fn get_inventory(
    State(state): State<AppState>,
) -> Result<Json<InventoryResponse>, ApiError> {
    let inventory = run_blocking(&state, PantryService::inventory).await?;
    Ok(Json(InventoryResponse {
        success: true,
        inventory: inventory.all,
    }))
}

async fn get_debug(State(state): State<AppState>) -> Result<Json<DebugResponse>, ApiError> {
    let dump = run_blocking(&state, PantryService::debug_dump).await?;
    Ok(Json(DebugResponse {
        success: true,
        raw_data: dump.raw_data,
        processed_data: dump.processed_data,
    }))
}

// --- Router builder ---

fn build_router(state: AppState, public_dir: Option<PathBuf>) -> Router {
    let api = Router::new()
        .route("/api/data", get(get_data))
        .route("/api/inventory", get(get_inventory))
        .route("/api/debug", get(get_debug))
        .with_state(state);

    let app = match public_dir {
        Some(dir) => {
            let index = ServeFile::new(dir.join("index.html"));
            api.fallback_service(ServeDir::new(dir).not_found_service(index))
        }
        None => api,
    };

    app.layer(RequestBodyLimitLayer::new(BODY_LIMIT))
        .layer(cors_layer())
        .layer(middleware::from_fn(security_headers))
}

// --- Server startup ---

pub async fn start_server(
    service: PantryService,
    port: u16,
    bind: &str,
    public_dir: Option<PathBuf>,
    development: bool,
) -> anyhow::Result<()> {
    let state = AppState {
        service: Arc::new(service),
        development,
    };

    if let Some(ref dir) = public_dir {
        if !dir.is_dir() {
            tracing::warn!(dir = %dir.display(), "static directory not found, serving API only");
        }
    }

    let app = build_router(state, public_dir);

    let listener = tokio::net::TcpListener::bind(format!("{bind}:{port}"))
        .await
        .with_context(|| format!("failed to bind {bind}:{port}"))?;
    tracing::info!("Listening on http://{bind}:{port}");
    tracing::info!("Recipe report: http://{bind}:{port}/api/data");
    tracing::info!("Inventory:     http://{bind}:{port}/api/inventory");
    axum::serve(listener, app).await?;

    Ok(())
}
