use axum::{
    Json, Router,
    extract::{Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::net::TcpListener;

use crate::access::authorize;
use crate::config::Config;
use crate::downloader;
use crate::error::ReportError;
use crate::report::{Report, build_report};
use crate::source::{CsvDirSource, Dataset, SheetSource};
use crate::token::TokenValidator;

/// Message shown for every denied request
pub const DENIED_MESSAGE: &str = "Acesso negado. Parâmetros inválidos.";
/// Message for exports with nothing to export
pub const NO_DATA_MESSAGE: &str = "Nenhum dado disponível para os filtros selecionados.";

/// Date format of the `start` and `end` query parameters
const QUERY_DATE_FORMAT: &str = "%Y-%m-%d";

pub struct AppState {
    config: Config,
    source: Box<dyn SheetSource>,
}

impl AppState {
    pub fn new(config: Config, source: Box<dyn SheetSource>) -> Self {
        AppState { config, source }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ReportQuery {
    #[serde(default)]
    site: String,
    #[serde(default)]
    veiculo: String,
    start: Option<String>,
    end: Option<String>,
}

#[derive(Serialize)]
struct StatusResponse {
    status: String,
    message: Option<String>,
}

/// Ways a report request can fail
#[derive(Debug)]
pub enum ApiError {
    Denied,
    BadRequest(String),
    NoData,
    Internal(ReportError),
}

impl From<ReportError> for ApiError {
    fn from(err: ReportError) -> Self {
        ApiError::Internal(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Denied => (StatusCode::FORBIDDEN, DENIED_MESSAGE.to_string()),
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::NoData => (StatusCode::NOT_FOUND, NO_DATA_MESSAGE.to_string()),
            ApiError::Internal(err) => {
                log::error!("Report request failed: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Falha ao carregar os dados do relatório.".to_string(),
                )
            }
        };

        let body = StatusResponse {
            status: "error".to_string(),
            message: Some(message),
        };
        (status, Json(body)).into_response()
    }
}

/// Build the HTTP routes over shared state.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/report", get(get_report))
        .route("/api/report.csv", get(export_csv))
        .route("/api/report.xlsx", get(export_xlsx))
        .with_state(state)
}

/// Serve reports from the CSV sheets under `config.data_dir`
///
/// # Arguments
/// * `config` - Validated process configuration
///
/// # Returns
/// * `Result<(), Box<dyn std::error::Error>>` - Returns only when the server stops
pub async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let source = CsvDirSource::new(config.data_dir.clone());
    let bind_addr = config.bind_addr.clone();

    let app_state = Arc::new(AppState::new(config, Box::new(source)));
    let app = router(app_state);

    let listener = TcpListener::bind(&bind_addr).await?;
    log::info!("Listening on http://{}", bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}

async fn health() -> &'static str {
    "ok"
}

async fn get_report(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ReportQuery>,
) -> Result<Json<Report>, ApiError> {
    load_report(&state, &params).map(Json)
}

async fn export_csv(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ReportQuery>,
) -> Result<Response, ApiError> {
    let report = load_report(&state, &params)?;
    let table = report.summary.ok_or(ApiError::NoData)?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"relatorio.csv\"",
            ),
        ],
        downloader::to_csv(&table),
    )
        .into_response())
}

async fn export_xlsx(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ReportQuery>,
) -> Result<Response, ApiError> {
    let report = load_report(&state, &params)?;
    let table = report.summary.ok_or(ApiError::NoData)?;
    let bytes = downloader::to_xlsx(&table)?;

    Ok((
        [
            (
                header::CONTENT_TYPE,
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            ),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"relatorio.xlsx\"",
            ),
        ],
        bytes,
    )
        .into_response())
}

/// One request's pass: fresh snapshot, token checks, report.
fn load_report(state: &AppState, params: &ReportQuery) -> Result<Report, ApiError> {
    let start = parse_query_date("start", params.start.as_deref())?;
    let end = parse_query_date("end", params.end.as_deref())?;

    let dataset = Dataset::load(state.source.as_ref(), &state.config)?;
    let validator = TokenValidator::from_config(&state.config);
    let decision = authorize(&validator, &params.site, &params.veiculo, &dataset.rows);

    build_report(&dataset, &decision, start, end).ok_or(ApiError::Denied)
}

fn parse_query_date(name: &str, value: Option<&str>) -> Result<Option<NaiveDate>, ApiError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(v) => NaiveDate::parse_from_str(v, QUERY_DATE_FORMAT)
            .map(Some)
            .map_err(|_| ApiError::BadRequest(format!("Data inválida em '{}': {}", name, v))),
    }
}
