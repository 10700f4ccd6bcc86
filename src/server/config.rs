use std::{net::SocketAddr, time::Duration};

use crate::config::DEFAULT_ELEMENT_TIMEOUT_SECS;

pub struct Config {
    pub listen_addr: SocketAddr,
    pub headless: bool,
    pub debug: bool,
    /// スクレイパーの要素待機タイムアウト
    pub element_timeout: Duration,
    /// 同時ブラウザセッション数の上限
    pub max_sessions: usize,
    pub cors_allow: Vec<String>,
    /// HTTPリクエスト全体のタイムアウト
    /// （要素待機の上限より長くし、内部タイムアウトが500として返るようにする）
    pub request_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let listen_addr: SocketAddr = std::env::var("TPB_LISTEN_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:3000".to_string())
            .parse()
            .expect("Invalid TPB_LISTEN_ADDR");
        let headless = std::env::var("TPB_HEADLESS")
            .map(|v| v != "false" && v != "0")
            .unwrap_or(true);
        let debug = std::env::var("TPB_DEBUG")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);
        let element_timeout_secs: u64 = std::env::var("TPB_ELEMENT_TIMEOUT_SECS")
            .unwrap_or_else(|_| DEFAULT_ELEMENT_TIMEOUT_SECS.to_string())
            .parse()
            .unwrap_or(DEFAULT_ELEMENT_TIMEOUT_SECS);
        let max_sessions: usize = std::env::var("TPB_MAX_SESSIONS")
            .unwrap_or_else(|_| "4".into())
            .parse()
            .unwrap_or(4);
        let cors_allow = std::env::var("TPB_CORS_ALLOW_ORIGINS")
            .unwrap_or_else(|_| "*".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        let timeout_ms: u64 = std::env::var("TPB_REQUEST_TIMEOUT_MS")
            .unwrap_or_else(|_| "330000".into())
            .parse()
            .unwrap_or(330000);
        Self {
            listen_addr,
            headless,
            debug,
            element_timeout: Duration::from_secs(element_timeout_secs),
            max_sessions,
            cors_allow,
            request_timeout: Duration::from_millis(timeout_ms),
        }
    }
}
