//! TPBank スクレイパー実装
//!
//! 日付を入力して照会ボタンを押し、描画されたレートテーブルを抽出する

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::emulation::SetUserAgentOverrideParams;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::Page;
use chrono::{offset::FixedOffset, Utc};
use futures::StreamExt;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::config::ScraperConfig;
use crate::error::ScraperError;
use crate::traits::Scraper;

use super::types::{format_lookup_date, RateRow};

const RATE_PAGE_URL: &str = "https://tpb.vn/cong-cu-tinh-toan/ty-gia-ngoai-te";
const DATE_INPUT_SELECTOR: &str = "#datepickerInput";
const LOOKUP_BUTTON_SELECTOR: &str = "#xem-ty-gia";
const RATE_TABLE_SELECTOR: &str = ".table";

/// ボット対策に弾かれないための通常ブラウザ相当のUA
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// ネットワークアイドル待機のタイムアウト（ミリ秒）
const NETWORK_IDLE_TIMEOUT_MS: u64 = 30000;
/// ネットワークアイドル判定のインターバル（ミリ秒）
const NETWORK_IDLE_CHECK_INTERVAL_MS: u64 = 500;
/// アイドル判定で許容する実行中リクエスト数
const MAX_INFLIGHT_REQUESTS: usize = 2;
/// ページ安定待機のタイムアウト（ミリ秒）
const PAGE_STABLE_TIMEOUT_MS: u64 = 10000;
/// 要素待機のポーリング間隔（ミリ秒）
const ELEMENT_POLL_INTERVAL_MS: u64 = 500;

/// テーブルのtbody行を固定6列で読み出す。行ごとのセル配列をJSONで返す。
const EXTRACT_ROWS_SCRIPT: &str = r#"
    (() => {
        const table = document.querySelector('.table');
        if (!table) return JSON.stringify([]);
        const rows = Array.from(table.querySelectorAll('tbody tr'));
        return JSON.stringify(rows.map(row =>
            Array.from(row.querySelectorAll('td')).map(td => td.innerText)
        ));
    })()
"#;

/// TPBank レートスクレイパー
pub struct TpbankScraper {
    config: ScraperConfig,
    browser: Option<Browser>,
    page: Option<Arc<Page>>,
}

impl TpbankScraper {
    pub fn new(config: ScraperConfig) -> Self {
        Self {
            config,
            browser: None,
            page: None,
        }
    }

    fn get_page(&self) -> Result<&Arc<Page>, ScraperError> {
        self.page
            .as_ref()
            .ok_or_else(|| ScraperError::BrowserInit("ブラウザが初期化されていません".into()))
    }

    /// セレクタが出現するまで待機（上限は設定のelement_timeout）
    async fn wait_for_selector(
        &self,
        page: &Page,
        selector: &str,
        label: &str,
    ) -> Result<(), ScraperError> {
        info!("Waiting for {} ({})...", label, selector);
        let timeout = self.config.element_timeout;
        let start = std::time::Instant::now();
        let script = format!("document.querySelector({:?}) !== null", selector);

        let mut checks = 0u32;
        while start.elapsed() < timeout {
            let found = page
                .evaluate(script.as_str())
                .await
                .map_err(|e| ScraperError::JavaScript(e.to_string()))?;

            if found.into_value::<bool>().unwrap_or(false) {
                info!("{} detected after {:?}", label, start.elapsed());
                return Ok(());
            }

            if checks % 20 == 0 {
                debug!("{} not present yet... ({:?})", label, start.elapsed());
            }
            checks += 1;
            sleep(Duration::from_millis(ELEMENT_POLL_INTERVAL_MS)).await;
        }

        Err(ScraperError::ElementNotFound(format!(
            "{} ({}) が{}秒以内に出現しませんでした",
            label,
            selector,
            timeout.as_secs()
        )))
    }

    /// ネットワークリクエストがアイドル状態になるまで待機
    ///
    /// Performance APIで直近の実行中リクエストを数え、
    /// MAX_INFLIGHT_REQUESTS以下が連続したらアイドルとみなす。
    async fn wait_request_idle(&self, page: &Page) -> Result<(), ScraperError> {
        info!("Waiting for network to become idle...");
        let start = std::time::Instant::now();
        let timeout = Duration::from_millis(NETWORK_IDLE_TIMEOUT_MS);

        let mut idle_count = 0;
        const REQUIRED_IDLE_CHECKS: u32 = 3; // 連続3回アイドルでOK

        while start.elapsed() < timeout {
            let result = page
                .evaluate(
                    r#"
                    (() => {
                        const entries = performance.getEntriesByType('resource');
                        const now = performance.now();

                        // 直近500ms以内に開始されて未完了のリクエストを数える
                        const inflight = entries.filter(e => {
                            return (now - e.startTime) < 500 && e.duration === 0;
                        });
                        return inflight.length;
                    })()
                "#,
                )
                .await;

            match result {
                Ok(val) => {
                    let inflight = val.into_value::<usize>().unwrap_or(0);
                    if inflight <= MAX_INFLIGHT_REQUESTS {
                        idle_count += 1;
                        if idle_count >= REQUIRED_IDLE_CHECKS {
                            info!(
                                "Network idle after {:?} ({} consecutive checks)",
                                start.elapsed(),
                                idle_count
                            );
                            return Ok(());
                        }
                    } else {
                        idle_count = 0;
                    }
                }
                Err(e) => {
                    debug!("Network idle check error: {}", e);
                    idle_count = 0;
                }
            }

            sleep(Duration::from_millis(NETWORK_IDLE_CHECK_INTERVAL_MS)).await;
        }

        warn!(
            "Network idle timeout after {:?}, proceeding anyway",
            start.elapsed()
        );
        Ok(())
    }

    /// ページが安定するまで待機
    async fn wait_stable(&self, page: &Page) -> Result<(), ScraperError> {
        info!("Waiting for page to stabilize...");
        let start = std::time::Instant::now();
        let timeout = Duration::from_millis(PAGE_STABLE_TIMEOUT_MS);

        let mut last_html_len: Option<usize> = None;
        let mut stable_count = 0;
        const REQUIRED_STABLE_CHECKS: u32 = 3; // 連続3回同じでOK

        while start.elapsed() < timeout {
            let result = page
                .evaluate("document.documentElement.outerHTML.length")
                .await;

            match result {
                Ok(val) => {
                    let current_len = val.into_value::<usize>().unwrap_or(0);

                    match last_html_len {
                        Some(last) if last == current_len => {
                            stable_count += 1;
                            if stable_count >= REQUIRED_STABLE_CHECKS {
                                info!(
                                    "Page stable after {:?} ({} consecutive checks)",
                                    start.elapsed(),
                                    stable_count
                                );
                                return Ok(());
                            }
                        }
                        _ => {
                            stable_count = 0;
                        }
                    }

                    last_html_len = Some(current_len);
                }
                Err(e) => {
                    debug!("Page stable check error: {}", e);
                    stable_count = 0;
                }
            }

            sleep(Duration::from_millis(300)).await;
        }

        warn!(
            "Page stable timeout after {:?}, proceeding anyway",
            start.elapsed()
        );
        Ok(())
    }

    /// レートテーブルを抽出してRateRowに変換
    async fn extract_rate_rows(&self, page: &Page) -> Result<Vec<RateRow>, ScraperError> {
        info!("Extracting rate table rows...");

        let result = page
            .evaluate(EXTRACT_ROWS_SCRIPT)
            .await
            .map_err(|e| ScraperError::JavaScript(e.to_string()))?;

        let json_str = result.into_value::<String>().unwrap_or_default();

        let raw_rows: Vec<Vec<String>> =
            serde_json::from_str(&json_str).map_err(|e| ScraperError::Json(e.to_string()))?;

        Ok(self.parse_rate_rows(&raw_rows))
    }

    /// セル配列をRateRowに変換
    ///
    /// セル数が足りない行はNoneで埋める。金額4列はカンマ区切りを除去。
    fn parse_rate_rows(&self, raw_rows: &[Vec<String>]) -> Vec<RateRow> {
        fn text_cell(cols: &[String], idx: usize) -> Option<String> {
            cols.get(idx).map(|s| s.trim().to_string())
        }

        fn money_cell(cols: &[String], idx: usize) -> Option<String> {
            cols.get(idx).map(|s| s.trim().replace(',', ""))
        }

        raw_rows
            .iter()
            .map(|cols| RateRow {
                currency_code: text_cell(cols, 0),
                currency_name: text_cell(cols, 1),
                buy_cash: money_cell(cols, 2),
                buy_transfer: money_cell(cols, 3),
                sell_cash: money_cell(cols, 4),
                sell_transfer: money_cell(cols, 5),
            })
            .collect()
    }

    /// 抽出結果をファイルに保存（デバッグ用）
    async fn save_raw_rows(&self, rows: &[RateRow]) {
        let ict = FixedOffset::east_opt(7 * 3600).unwrap();
        let timestamp = Utc::now().with_timezone(&ict).format("%Y%m%d_%H%M%S");
        let filename = format!("./data/rates_{}.json", timestamp);

        if let Err(e) = std::fs::create_dir_all("./data") {
            warn!("Failed to create data directory: {}", e);
            return;
        }

        match serde_json::to_string_pretty(rows) {
            Ok(json) => {
                if let Err(e) = std::fs::write(&filename, json) {
                    error!("Failed to save rate data: {}", e);
                } else {
                    info!("Saved rate data to {}", filename);
                }
            }
            Err(e) => error!("Failed to serialize rate data: {}", e),
        }
    }
}

#[async_trait]
impl Scraper for TpbankScraper {
    async fn initialize(&mut self) -> Result<(), ScraperError> {
        info!("Initializing browser for TPBank rate scraper...");

        // ユニークなユーザーデータディレクトリを生成
        let unique_id = format!(
            "{}-{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_nanos()
        );
        let user_data_dir = std::env::temp_dir().join(format!("tpbank-rate-{}", unique_id));

        // Chrome パスを取得
        let chrome_path = std::env::var("CHROME_PATH")
            .or_else(|_| std::env::var("CHROMIUM_PATH"))
            .unwrap_or_else(|_| "chromium".to_string());

        // ブラウザ設定を構築
        let mut builder = BrowserConfig::builder()
            .chrome_executable(chrome_path)
            .user_data_dir(&user_data_dir);

        if !self.config.headless {
            builder = builder.with_head();
        }

        builder = builder
            .no_sandbox()
            .request_timeout(Duration::from_secs(60)) // CDPリクエストタイムアウト
            .arg("--disable-setuid-sandbox")
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-gpu");

        if self.config.debug {
            builder = builder.arg("--enable-logging=stderr").arg("--v=1");
        }

        let browser_config = builder
            .build()
            .map_err(|e| ScraperError::BrowserInit(e.to_string()))?;

        // ブラウザを起動
        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| ScraperError::BrowserInit(e.to_string()))?;

        // ハンドラータスクを起動
        tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                debug!("Browser event: {:?}", event);
            }
        });

        // 新しいページを作成
        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| ScraperError::BrowserInit(e.to_string()))?;

        // UAを通常ブラウザ相当に上書き
        let ua_params = SetUserAgentOverrideParams::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ScraperError::BrowserInit(format!("UA設定エラー: {}", e)))?;

        page.execute(ua_params)
            .await
            .map_err(|e| ScraperError::BrowserInit(format!("UA設定エラー: {}", e)))?;

        self.browser = Some(browser);
        self.page = Some(Arc::new(page));

        info!("Browser initialized successfully");
        Ok(())
    }

    async fn fetch(&mut self) -> Result<Vec<RateRow>, ScraperError> {
        let page = self.get_page()?.clone();
        info!(
            "Starting rate lookup for date: {}",
            self.config.lookup_date
        );

        // レートページにナビゲート
        page.goto(RATE_PAGE_URL)
            .await
            .map_err(|e| ScraperError::Navigation(e.to_string()))?;

        page.wait_for_navigation()
            .await
            .map_err(|e| ScraperError::Navigation(e.to_string()))?;

        // SPAの非同期ロードが落ち着くまで待機
        self.wait_request_idle(&page).await?;

        // 日付入力欄の出現を待機して入力
        self.wait_for_selector(&page, DATE_INPUT_SELECTOR, "日付入力欄")
            .await?;

        let formatted_date = format_lookup_date(&self.config.lookup_date);
        info!("Typing lookup date: {}", formatted_date);

        page.find_element(DATE_INPUT_SELECTOR)
            .await
            .map_err(|e| ScraperError::ElementNotFound(format!("日付入力欄: {}", e)))?
            .type_str(&formatted_date)
            .await
            .map_err(|e| ScraperError::JavaScript(format!("日付入力: {}", e)))?;

        // 照会ボタンをクリック
        page.find_element(LOOKUP_BUTTON_SELECTOR)
            .await
            .map_err(|e| ScraperError::ElementNotFound(format!("照会ボタン: {}", e)))?
            .click()
            .await
            .map_err(|e| ScraperError::Navigation(format!("照会ボタンクリック: {}", e)))?;

        // 固定スリープではなく結果テーブルの出現を条件待機する
        self.wait_for_selector(&page, RATE_TABLE_SELECTOR, "結果テーブル")
            .await?;
        self.wait_stable(&page).await?;

        // デバッグスクリーンショット
        if self.config.debug {
            if let Ok(screenshot) = page
                .screenshot(ScreenshotParams::builder().full_page(true).build())
                .await
            {
                use base64::Engine;
                let encoded = base64::engine::general_purpose::STANDARD.encode(&screenshot);
                debug!("Result page screenshot: data:image/png;base64,{}", encoded);
            }
        }

        let rows = self.extract_rate_rows(&page).await?;

        if self.config.debug {
            self.save_raw_rows(&rows).await;
        }

        info!("Extracted {} rate rows", rows.len());
        Ok(rows)
    }

    async fn close(&mut self) -> Result<(), ScraperError> {
        info!("ブラウザを終了中...");

        // ハンドルを落とすと起動したChromiumプロセスも終了する
        self.page = None;
        self.browser = None;

        info!("ブラウザ終了完了");
        Ok(())
    }
}
