//! TPBank為替レートスクレイパーライブラリ
//!
//! - ヘッドレスブラウザでTPBank公開ページの日付照会を自動操作
//! - 抽出したレートテーブルをJSON / Excel (xlsx) で提供するHTTPサーバー
//!
//! # レート照会の使用例
//!
//! ```rust,ignore
//! use tpbank_rate_service::{RateRequest, RateService};
//! use tower::Service;
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut service = RateService::new();
//!
//!     let request = RateRequest::new("2024-06-01");
//!
//!     let result = service.call(request).await.unwrap();
//!     println!("Rows: {}", result.rows.len());
//! }
//! ```
//!
//! # サーバーの使用例
//!
//! ```rust,ignore
//! use tpbank_rate_service::server::{api::app_router, build_state, config::Config, init_tracing};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = Config::from_env();
//!     init_tracing();
//!     let state = build_state(&config);
//!     let router = app_router(state, &config);
//!     let listener = tokio::net::TcpListener::bind(config.listen_addr).await.unwrap();
//!     axum::serve(listener, router).await.unwrap();
//! }
//! ```

pub mod config;
pub mod error;
pub mod export;
pub mod server;
pub mod service;
pub mod tpbank;
pub mod traits;

// 主要な型をリエクスポート
pub use config::ScraperConfig;
pub use error::ScraperError;
pub use service::{BrowserRateFetcher, RateRequest, RateResult, RateService};
pub use tpbank::{format_lookup_date, RateRow, TpbankScraper};
pub use traits::{RateFetcher, Scraper};
