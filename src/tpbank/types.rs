//! TPBank レート関連の型定義

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// 通貨1件分のレート行
///
/// 抽出はベストエフォート。セル数が足りない行は該当フィールドがNoneになり、
/// JSON出力では省略される。金額系4列はカンマ区切りを除去した数値文字列。
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RateRow {
    #[serde(rename = "CurrencyCode", skip_serializing_if = "Option::is_none")]
    pub currency_code: Option<String>,
    #[serde(rename = "CurrencyName", skip_serializing_if = "Option::is_none")]
    pub currency_name: Option<String>,
    #[serde(rename = "BuyCash", skip_serializing_if = "Option::is_none")]
    pub buy_cash: Option<String>,
    #[serde(rename = "BuyTransfer", skip_serializing_if = "Option::is_none")]
    pub buy_transfer: Option<String>,
    #[serde(rename = "SellCash", skip_serializing_if = "Option::is_none")]
    pub sell_cash: Option<String>,
    #[serde(rename = "SellTransfer", skip_serializing_if = "Option::is_none")]
    pub sell_transfer: Option<String>,
}

impl RateRow {
    /// エクスポート列順（CurrencyCode, CurrencyName, BuyCash, BuyTransfer, SellCash, SellTransfer）
    pub fn cells(&self) -> [Option<&str>; 6] {
        [
            self.currency_code.as_deref(),
            self.currency_name.as_deref(),
            self.buy_cash.as_deref(),
            self.buy_transfer.as_deref(),
            self.sell_cash.as_deref(),
            self.sell_transfer.as_deref(),
        ]
    }
}

/// 照会日をページの入力フォーマットに変換 (YYYY-MM-DD → DD/MM/YYYY)
///
/// 単純な文字列分解のみでカレンダー検証はしない。
/// 不正な入力は不正なまま送信される。
pub fn format_lookup_date(date: &str) -> String {
    let mut parts = date.split('-');
    let year = parts.next().unwrap_or_default();
    let month = parts.next().unwrap_or_default();
    let day = parts.next().unwrap_or_default();
    format!("{}/{}/{}", day, month, year)
}
