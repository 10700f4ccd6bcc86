use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use async_trait::async_trait;
use tower::{Service, ServiceExt};
use tracing::info;

use crate::config::{ScraperConfig, DEFAULT_ELEMENT_TIMEOUT_SECS};
use crate::error::ScraperError;
use crate::tpbank::{RateRow, TpbankScraper};
use crate::traits::{RateFetcher, Scraper};

/// レート照会リクエスト
#[derive(Debug, Clone)]
pub struct RateRequest {
    /// 照会日 (YYYY-MM-DD)
    pub date: String,
    pub headless: bool,
    pub debug: bool,
    pub element_timeout: Duration,
}

impl RateRequest {
    pub fn new(date: impl Into<String>) -> Self {
        Self {
            date: date.into(),
            headless: true,
            debug: false,
            element_timeout: Duration::from_secs(DEFAULT_ELEMENT_TIMEOUT_SECS),
        }
    }

    pub fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_element_timeout(mut self, timeout: Duration) -> Self {
        self.element_timeout = timeout;
        self
    }
}

impl From<RateRequest> for ScraperConfig {
    fn from(req: RateRequest) -> Self {
        ScraperConfig {
            lookup_date: req.date,
            headless: req.headless,
            debug: req.debug,
            element_timeout: req.element_timeout,
        }
    }
}

/// レート照会結果
#[derive(Debug)]
pub struct RateResult {
    pub rows: Vec<RateRow>,
}

/// tower::Serviceを実装したレート照会サービス
///
/// 1リクエスト = 1ブラウザセッション。状態は持たない。
#[derive(Debug, Clone, Default)]
pub struct RateService {
    // 将来的な拡張用（レートリミット、キャッシュなど）
}

impl RateService {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Service<RateRequest> for RateService {
    type Response = RateResult;
    type Error = ScraperError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: RateRequest) -> Self::Future {
        info!("レート照会リクエスト受信: date={}", req.date);

        Box::pin(async move {
            let config: ScraperConfig = req.into();
            let mut scraper = TpbankScraper::new(config);

            // セッション実行（成功・失敗どちらでもブラウザは解放される）
            let rows = scraper.execute().await?;

            info!("レート照会完了: rows={}", rows.len());
            Ok(RateResult { rows })
        })
    }
}

/// 本番用レートフェッチャー
///
/// デプロイ時の既定値を保持し、リクエストごとにRateServiceへ
/// 新しいRateRequestをディスパッチする。
#[derive(Debug, Clone)]
pub struct BrowserRateFetcher {
    headless: bool,
    debug: bool,
    element_timeout: Duration,
}

impl Default for BrowserRateFetcher {
    fn default() -> Self {
        Self {
            headless: true,
            debug: false,
            element_timeout: Duration::from_secs(DEFAULT_ELEMENT_TIMEOUT_SECS),
        }
    }
}

impl BrowserRateFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_element_timeout(mut self, timeout: Duration) -> Self {
        self.element_timeout = timeout;
        self
    }
}

#[async_trait]
impl RateFetcher for BrowserRateFetcher {
    async fn fetch_rates(&self, date: &str) -> Result<Vec<RateRow>, ScraperError> {
        let request = RateRequest::new(date)
            .with_headless(self.headless)
            .with_debug(self.debug)
            .with_element_timeout(self.element_timeout);

        let result = RateService::new().oneshot(request).await?;
        Ok(result.rows)
    }
}
