use std::time::Duration;

/// 要素待機のデフォルトタイムアウト（ネットワーク/レンダリング遅延を考慮して長め）
pub const DEFAULT_ELEMENT_TIMEOUT_SECS: u64 = 300;

#[derive(Debug, Clone)]
pub struct ScraperConfig {
    /// 照会日 (呼び出し側フォーマット: YYYY-MM-DD)
    pub lookup_date: String,
    pub headless: bool,
    pub debug: bool,
    /// 日付入力欄・結果テーブルの出現待機タイムアウト
    pub element_timeout: Duration,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            lookup_date: String::new(),
            headless: true,
            debug: false,
            element_timeout: Duration::from_secs(DEFAULT_ELEMENT_TIMEOUT_SECS),
        }
    }
}

impl ScraperConfig {
    pub fn new(lookup_date: impl Into<String>) -> Self {
        Self {
            lookup_date: lookup_date.into(),
            ..Default::default()
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
