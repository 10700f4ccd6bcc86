use std::sync::{
    atomic::{AtomicU32, Ordering},
    Arc,
};

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::Request;
use tokio::sync::Semaphore;
use tower::ServiceExt;

use tpbank_rate_service::server::{api::app_router, config::Config, AppState};
use tpbank_rate_service::{RateFetcher, RateRow, ScraperError};

/// シミュレートされた抽出ソース
struct MockFetcher {
    rows: Vec<RateRow>,
    fail_with_timeout: bool,
    calls: Arc<AtomicU32>,
}

#[async_trait]
impl RateFetcher for MockFetcher {
    async fn fetch_rates(&self, _date: &str) -> Result<Vec<RateRow>, ScraperError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_with_timeout {
            return Err(ScraperError::ElementNotFound(
                "結果テーブル (.table) が300秒以内に出現しませんでした".into(),
            ));
        }
        Ok(self.rows.clone())
    }
}

fn state_with(fetcher: MockFetcher) -> Arc<AppState> {
    Arc::new(AppState {
        fetcher: Arc::new(fetcher),
        sessions: Arc::new(Semaphore::new(4)),
    })
}

fn sample_rows() -> Vec<RateRow> {
    vec![
        RateRow {
            currency_code: Some("USD".to_string()),
            currency_name: Some("US Dollar".to_string()),
            buy_cash: Some("25150".to_string()),
            buy_transfer: Some("25200".to_string()),
            sell_cash: Some("25400".to_string()),
            sell_transfer: Some("25500".to_string()),
        },
        RateRow {
            currency_code: Some("EUR".to_string()),
            currency_name: Some("Euro".to_string()),
            buy_cash: Some("27000".to_string()),
            buy_transfer: Some("27100".to_string()),
            sell_cash: None,
            sell_transfer: Some("28100".to_string()),
        },
    ]
}

async fn get(app: axum::Router, uri: &str) -> axum::http::Response<axum::body::Body> {
    app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

#[tokio::test]
async fn healthz_works() {
    let calls = Arc::new(AtomicU32::new(0));
    let state = state_with(MockFetcher {
        rows: vec![],
        fail_with_timeout: false,
        calls,
    });
    let app = app_router(state, &Config::from_env());

    let response = get(app, "/healthz").await;
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn rates_returns_rows_as_json() {
    let calls = Arc::new(AtomicU32::new(0));
    let state = state_with(MockFetcher {
        rows: sample_rows(),
        fail_with_timeout: false,
        calls: calls.clone(),
    });
    let app = app_router(state, &Config::from_env());

    let response = get(app, "/rates?date=2024-06-01").await;
    assert_eq!(response.status(), 200);

    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let rows: serde_json::Value = serde_json::from_slice(&body).unwrap();
    let rows = rows.as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["CurrencyCode"], "USD");
    assert_eq!(rows[0]["BuyCash"], "25150");
    assert_eq!(rows[1]["CurrencyCode"], "EUR");
    // 欠損フィールドはキーごと省略される
    assert!(rows[1].get("SellCash").is_none());

    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn rates_empty_extraction_returns_empty_array() {
    let calls = Arc::new(AtomicU32::new(0));
    let state = state_with(MockFetcher {
        rows: vec![],
        fail_with_timeout: false,
        calls,
    });
    let app = app_router(state, &Config::from_env());

    let response = get(app, "/rates?date=2024-06-01").await;
    assert_eq!(response.status(), 200);

    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(body, "[]".as_bytes());
}

#[tokio::test]
async fn rates_missing_date_is_400_without_session() {
    let calls = Arc::new(AtomicU32::new(0));
    let state = state_with(MockFetcher {
        rows: sample_rows(),
        fail_with_timeout: false,
        calls: calls.clone(),
    });
    let app = app_router(state, &Config::from_env());

    let response = get(app, "/rates").await;
    assert_eq!(response.status(), 400);

    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["error"], "Missing date parameter");

    // ブラウザセッションは一切起動されない
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn export_missing_date_is_400_without_session() {
    let calls = Arc::new(AtomicU32::new(0));
    let state = state_with(MockFetcher {
        rows: sample_rows(),
        fail_with_timeout: false,
        calls: calls.clone(),
    });
    let app = app_router(state, &Config::from_env());

    let response = get(app, "/export-excel").await;
    assert_eq!(response.status(), 400);

    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["error"], "Missing date parameter");
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn export_excel_returns_xlsx_download() {
    let calls = Arc::new(AtomicU32::new(0));
    let state = state_with(MockFetcher {
        rows: sample_rows(),
        fail_with_timeout: false,
        calls,
    });
    let app = app_router(state, &Config::from_env());

    let response = get(app, "/export-excel?date=2024-06-01").await;
    assert_eq!(response.status(), 200);

    let content_type = response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert_eq!(
        content_type,
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
    );

    let disposition = response
        .headers()
        .get("content-disposition")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert_eq!(
        disposition,
        "attachment; filename=\"ExchangeRates_2024-06-01.xlsx\""
    );

    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    // xlsxはZIPコンテナ
    assert!(body.starts_with(b"PK"));
}

#[tokio::test]
async fn upstream_timeout_is_500_with_error_body() {
    let calls = Arc::new(AtomicU32::new(0));
    let state = state_with(MockFetcher {
        rows: vec![],
        fail_with_timeout: true,
        calls: calls.clone(),
    });
    let app = app_router(state, &Config::from_env());

    let response = get(app, "/rates?date=2024-06-01").await;
    assert_eq!(response.status(), 500);

    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert!(json["error"].as_str().unwrap().contains("要素が見つかりません"));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn openapi_document_describes_routes() {
    let calls = Arc::new(AtomicU32::new(0));
    let state = state_with(MockFetcher {
        rows: vec![],
        fail_with_timeout: false,
        calls,
    });
    let app = app_router(state, &Config::from_env());

    let response = get(app, "/openapi.json").await;
    assert_eq!(response.status(), 200);

    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let doc: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert!(doc["paths"].get("/rates").is_some());
    assert!(doc["paths"].get("/export-excel").is_some());
}
