//! HTTPサーバーレイヤー
//!
//! 起動時に一度だけAppStateを構築し、各ハンドラーへ明示的に渡す。
//! モジュールレベルの共有状態は持たない。

pub mod api;
pub mod config;
pub mod error;

use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing_subscriber::EnvFilter;

use crate::service::BrowserRateFetcher;
use crate::traits::RateFetcher;

use config::Config;

pub struct AppState {
    pub fetcher: Arc<dyn RateFetcher>,
    /// 同時ブラウザセッション数を制限するセマフォ
    pub sessions: Arc<Semaphore>,
}

pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

pub fn build_state(config: &Config) -> Arc<AppState> {
    let fetcher = BrowserRateFetcher::new()
        .with_headless(config.headless)
        .with_debug(config.debug)
        .with_element_timeout(config.element_timeout);

    Arc::new(AppState {
        fetcher: Arc::new(fetcher),
        sessions: Arc::new(Semaphore::new(config.max_sessions)),
    })
}
