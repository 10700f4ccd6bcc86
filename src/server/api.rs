use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use utoipa::OpenApi;

use crate::export;
use crate::tpbank::RateRow;

use super::config::Config;
use super::error::{ApiError, ApiResult};
use super::AppState;

#[derive(Debug, Deserialize)]
pub struct RateQuery {
    date: Option<String>,
}

impl RateQuery {
    /// dateはセッション生成前に検証する（欠落時はブラウザを起動しない）
    fn require_date(&self) -> Result<&str, ApiError> {
        self.date
            .as_deref()
            .filter(|d| !d.is_empty())
            .ok_or(ApiError::MissingDate)
    }
}

#[utoipa::path(get, path = "/healthz", responses((status = 200, description = "Health")))]
pub async fn healthz() -> &'static str {
    "ok"
}

#[utoipa::path(
    get,
    path = "/rates",
    params(("date" = String, Query, description = "照会日 (YYYY-MM-DD)")),
    responses(
        (status = 200, description = "通貨ごとのレート一覧", body = [RateRow]),
        (status = 400, description = "dateパラメータ欠落"),
        (status = 500, description = "照会失敗")
    )
)]
async fn get_rates(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RateQuery>,
) -> ApiResult<Json<Vec<RateRow>>> {
    let date = query.require_date()?.to_string();

    // 同時セッション数の上限。パラメータ検証の後に取得する
    let _permit = state
        .sessions
        .acquire()
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    let rows = state.fetcher.fetch_rates(&date).await?;
    Ok(Json(rows))
}

#[utoipa::path(
    get,
    path = "/export-excel",
    params(("date" = String, Query, description = "照会日 (YYYY-MM-DD)")),
    responses(
        (status = 200, description = "レート一覧のxlsxダウンロード (attachment)"),
        (status = 400, description = "dateパラメータ欠落"),
        (status = 500, description = "照会またはエクスポート失敗")
    )
)]
async fn export_excel(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RateQuery>,
) -> ApiResult<Response> {
    let date = query.require_date()?.to_string();

    let _permit = state
        .sessions
        .acquire()
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    let rows = state.fetcher.fetch_rates(&date).await?;

    let buffer = export::build_workbook(&rows)?;
    let filename = export::export_filename(&date);

    Ok((
        [
            (header::CONTENT_TYPE, export::XLSX_CONTENT_TYPE.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        buffer,
    )
        .into_response())
}

#[derive(OpenApi)]
#[openapi(
    paths(healthz, get_rates, export_excel),
    components(schemas(RateRow)),
    tags((name = "tpbank-rates"))
)]
pub struct ApiDoc;

pub fn app_router(state: Arc<AppState>, config: &Config) -> Router {
    let cors = if config.cors_allow.iter().any(|o| o == "*") {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins = config
            .cors_allow
            .iter()
            .map(|o| o.parse().unwrap())
            .collect::<Vec<_>>();
        CorsLayer::new().allow_origin(origins)
    };

    let openapi = ApiDoc::openapi();

    Router::new()
        .route("/rates", get(get_rates))
        .route("/export-excel", get(export_excel))
        .route("/healthz", get(healthz))
        .route("/openapi.json", get(|| async { Json(openapi) }))
        .with_state(state)
        .layer(cors)
        .layer(TimeoutLayer::new(config.request_timeout))
        .layer(TraceLayer::new_for_http())
}
