use axum::{
    body::Body,
    extract::{Path, Query, Request, State},
    http::{header, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower::ServiceExt;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tracing::{debug, error, info, instrument, warn};
use utoipa::{IntoParams, OpenApi, ToSchema};

use crate::export_error::ExportError;
use crate::fires::{Alerte, FireRecord, FireStats, InseeMetric, MetricFilters};
use crate::qgis2web::LayerInfo;
use crate::services::{
    ExportList, ExportService, FireService, FireServiceError, InseeMetricsResponse, LayerGeoJson,
    LayerListResponse,
};

#[derive(Clone)]
pub struct AppState {
    pub fire_service: FireService,
    pub export_service: ExportService,
}

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Serialize, ToSchema)]
pub struct ServiceInfo {
    pub service: String,
    pub endpoints: Vec<String>,
}

#[derive(Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

/// Default envelope of the fire listing
#[derive(Serialize, ToSchema)]
pub struct FireListResponse {
    pub value: Vec<FireRecord>,
    #[serde(rename = "Count")]
    pub count: usize,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct FiresQuery {
    /// `list`, `array` or `raw` returns the bare array
    pub mode: Option<String>,
    /// `1`, `true` or `yes` indents the JSON
    pub pretty: Option<String>,
}

impl FiresQuery {
    fn bare_array(&self) -> bool {
        matches!(
            self.mode.as_deref().map(|m| m.trim().to_lowercase()).as_deref(),
            Some("list" | "array" | "raw")
        )
    }

    fn pretty(&self) -> bool {
        matches!(
            self.pretty.as_deref().map(|p| p.trim().to_lowercase()).as_deref(),
            Some("1" | "true" | "yes")
        )
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ExportQuery {
    /// Export directory name; empty, `latest` or `default` selects the most recent
    pub export: Option<String>,
}

/// Error mapped to a status code with a JSON `{"error": ...}` body
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl From<FireServiceError> for ApiError {
    fn from(e: FireServiceError) -> Self {
        let status = match e {
            FireServiceError::SourceUnavailable(_) => StatusCode::NOT_FOUND,
            FireServiceError::Db(_) | FireServiceError::Csv(_) | FireServiceError::Task(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self {
            status,
            message: e.to_string(),
        }
    }
}

impl From<ExportError> for ApiError {
    fn from(e: ExportError) -> Self {
        let status = match e {
            ExportError::ExportNotFound(_)
            | ExportError::LayerNotFound(_)
            | ExportError::AssetNotFound(_) => StatusCode::NOT_FOUND,
            ExportError::InvalidExportName(_)
            | ExportError::InvalidLayerId(_)
            | ExportError::InvalidLayerFormat(_)
            | ExportError::InvalidAssetPath(_) => StatusCode::BAD_REQUEST,
            ExportError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            message: e.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!("Request failed: {}", self.message);
        } else {
            warn!("Request rejected ({}): {}", self.status, self.message);
        }
        (
            self.status,
            Json(ErrorResponse {
                error: self.message,
            }),
        )
            .into_response()
    }
}

/// Run blocking export filesystem work off the async workers
async fn blocking<T, F>(work: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, ExportError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| ApiError::internal(format!("Background task failed: {e}")))?
        .map_err(ApiError::from)
}

pub fn create_router(state: AppState) -> Router {
    let asset_routes = Router::new()
        .route("/qgis2web/{export}/{*asset_path}", get(serve_asset))
        .with_state(state.clone());

    let api_routes = Router::new()
        .route("/health", get(health))
        .route("/fires", get(list_fires))
        .route("/stats", get(get_stats))
        .route("/metrics/insee", get(get_insee_metrics))
        .route("/qgis2web/exports", get(list_exports))
        .route("/qgis2web/layers", get(list_layers))
        .route("/qgis2web/layers/{layer_id}", get(get_layer))
        .with_state(state);

    Router::new()
        .route("/", get(root))
        .nest("/api", api_routes)
        .merge(asset_routes)
        .layer(CorsLayer::permissive())
}

#[utoipa::path(
    get,
    path = "/",
    responses((status = 200, description = "Service description", body = ServiceInfo)),
    tag = "service"
)]
async fn root() -> Json<ServiceInfo> {
    Json(ServiceInfo {
        service: "PACA Incendies API".to_string(),
        endpoints: ["/api/health", "/api/fires", "/api/stats", "/api/metrics/insee"]
            .iter()
            .map(|e| e.to_string())
            .collect(),
    })
}

#[utoipa::path(
    get,
    path = "/api/health",
    responses((status = 200, description = "Service is up", body = HealthResponse)),
    tag = "service"
)]
#[instrument]
async fn health() -> impl IntoResponse {
    debug!("Health check requested");
    let response = HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    };
    (StatusCode::OK, Json(response))
}

#[utoipa::path(
    get,
    path = "/api/fires",
    params(FiresQuery),
    responses(
        (status = 200, description = "Recent fires, newest first for registry sources", body = FireListResponse),
        (status = 500, description = "Source failure", body = ErrorResponse)
    ),
    tag = "fires"
)]
#[instrument(skip(state))]
async fn list_fires(
    State(state): State<AppState>,
    Query(query): Query<FiresQuery>,
) -> Result<Response, ApiError> {
    let (fires, source) = state.fire_service.list_fires().await?;
    info!("Returning {} fires from {}", fires.len(), source);

    let body = if query.bare_array() {
        serde_json::to_value(&fires)
    } else {
        let count = fires.len();
        serde_json::to_value(FireListResponse {
            value: fires,
            count,
        })
    }
    .map_err(|e| ApiError::internal(format!("Failed to serialize fires: {e}")))?;

    if !query.pretty() {
        return Ok(Json(body).into_response());
    }

    let text = serde_json::to_string_pretty(&body)
        .map_err(|e| ApiError::internal(format!("Failed to serialize fires: {e}")))?;
    Ok((
        [(header::CONTENT_TYPE, "application/json; charset=utf-8")],
        text,
    )
        .into_response())
}

#[utoipa::path(
    get,
    path = "/api/stats",
    responses(
        (status = 200, description = "Counts by alert tier and commune", body = FireStats),
        (status = 500, description = "Source failure", body = ErrorResponse)
    ),
    tag = "fires"
)]
#[instrument(skip(state))]
async fn get_stats(State(state): State<AppState>) -> Result<Json<FireStats>, ApiError> {
    let stats = state.fire_service.stats().await?;
    Ok(Json(stats))
}

#[utoipa::path(
    get,
    path = "/api/metrics/insee",
    params(MetricFilters),
    responses(
        (status = 200, description = "Fire count and burned area per INSEE code", body = InseeMetricsResponse),
        (status = 404, description = "No fire registry configured", body = ErrorResponse),
        (status = 500, description = "Source failure", body = ErrorResponse)
    ),
    tag = "fires"
)]
#[instrument(skip(state))]
async fn get_insee_metrics(
    State(state): State<AppState>,
    Query(filters): Query<MetricFilters>,
) -> Result<Json<InseeMetricsResponse>, ApiError> {
    let response = state.fire_service.metrics_by_insee(&filters).await?;
    Ok(Json(response))
}

#[utoipa::path(
    get,
    path = "/api/qgis2web/exports",
    responses((status = 200, description = "Available exports", body = ExportList)),
    tag = "qgis2web"
)]
#[instrument(skip(state))]
async fn list_exports(State(state): State<AppState>) -> Result<Json<ExportList>, ApiError> {
    let service = state.export_service.clone();
    let list = blocking(move || service.list_exports()).await?;
    Ok(Json(list))
}

#[utoipa::path(
    get,
    path = "/api/qgis2web/layers",
    params(ExportQuery),
    responses(
        (status = 200, description = "Ordered layer catalog with interpreted styles", body = LayerListResponse),
        (status = 400, description = "Invalid export name", body = ErrorResponse),
        (status = 404, description = "Export not found", body = ErrorResponse)
    ),
    tag = "qgis2web"
)]
#[instrument(skip(state))]
async fn list_layers(
    State(state): State<AppState>,
    Query(query): Query<ExportQuery>,
) -> Result<Json<LayerListResponse>, ApiError> {
    let service = state.export_service.clone();
    let response = blocking(move || service.layers(query.export.as_deref())).await?;
    Ok(Json(response))
}

#[utoipa::path(
    get,
    path = "/api/qgis2web/layers/{layer_id}",
    params(("layer_id" = String, Path, description = "Layer identifier (data file stem)"), ExportQuery),
    responses(
        (status = 200, description = "Layer GeoJSON", body = LayerGeoJson),
        (status = 400, description = "Invalid layer id or layer file", body = ErrorResponse),
        (status = 404, description = "Export or layer not found", body = ErrorResponse)
    ),
    tag = "qgis2web"
)]
#[instrument(skip(state), fields(layer_id = %layer_id))]
async fn get_layer(
    State(state): State<AppState>,
    Path(layer_id): Path<String>,
    Query(query): Query<ExportQuery>,
) -> Result<Json<LayerGeoJson>, ApiError> {
    let service = state.export_service.clone();
    let layer = blocking(move || service.layer_geojson(query.export.as_deref(), &layer_id)).await?;
    Ok(Json(layer))
}

/// Percent-encode a checked relative path so it can be replayed as a request URI
fn encode_asset_path(path: &str) -> String {
    let mut encoded = String::with_capacity(path.len());
    for byte in path.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'.' | b'_' | b'~' | b'/') {
            encoded.push(byte as char);
        } else {
            encoded.push_str(&format!("%{byte:02X}"));
        }
    }
    encoded
}

#[utoipa::path(
    get,
    path = "/qgis2web/{export}/{asset_path}",
    params(
        ("export" = String, Path, description = "Export directory name, or `latest`"),
        ("asset_path" = String, Path, description = "File path relative to the export directory")
    ),
    responses(
        (status = 200, description = "Static file of the export (html, js, css, images)"),
        (status = 400, description = "Invalid export name or asset path", body = ErrorResponse),
        (status = 404, description = "Export or asset not found", body = ErrorResponse)
    ),
    tag = "qgis2web"
)]
#[instrument(skip(state, request))]
async fn serve_asset(
    State(state): State<AppState>,
    Path((export, asset_path)): Path<(String, String)>,
    request: Request,
) -> Result<Response, ApiError> {
    let service = state.export_service.clone();
    let (export_dir, asset_path) = blocking(move || service.asset(&export, &asset_path)).await?;

    // ServeDir resolves the request path against the export directory
    let uri: Uri = format!("/{}", encode_asset_path(&asset_path))
        .parse()
        .map_err(|e| ApiError::internal(format!("Invalid asset URI: {e}")))?;
    let (mut parts, body) = request.into_parts();
    parts.uri = uri;

    let response = ServeDir::new(export_dir)
        .append_index_html_on_directories(false)
        .oneshot(Request::from_parts(parts, body))
        .await
        .unwrap_or_else(|never| match never {});
    Ok(response.map(Body::new))
}

#[derive(OpenApi)]
#[openapi(
    info(title = "PACA Fire Service API", description = "Wildfire registry and QGIS2Web export API"),
    paths(
        root,
        health,
        list_fires,
        get_stats,
        get_insee_metrics,
        list_exports,
        list_layers,
        get_layer,
        serve_asset
    ),
    components(schemas(
        Alerte,
        FireRecord,
        FireListResponse,
        FireStats,
        InseeMetric,
        InseeMetricsResponse,
        ExportList,
        LayerInfo,
        LayerListResponse,
        LayerGeoJson,
        HealthResponse,
        ServiceInfo,
        ErrorResponse
    )),
    tags(
        (name = "service", description = "Service status"),
        (name = "fires", description = "Fire registry records and aggregates"),
        (name = "qgis2web", description = "QGIS2Web export layers and styles")
    )
)]
pub struct ApiDoc;

pub fn generate_openapi_spec() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}
