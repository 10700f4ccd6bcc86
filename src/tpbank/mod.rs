//! TPBank 為替レートスクレイパーモジュール
//!
//! 公開ページの日付照会を自動操作してレートテーブルを抽出する

mod scraper;
mod types;

pub use scraper::TpbankScraper;
pub use types::{format_lookup_date, RateRow};
