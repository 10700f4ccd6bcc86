//! レートテーブルのExcelエクスポート
//!
//! 固定ヘッダー行 + 抽出順の通貨行でワークブックを構築し、
//! ダウンロード用のバイト列として返す

use rust_xlsxwriter::Workbook;

use crate::error::ScraperError;
use crate::tpbank::RateRow;

pub const SHEET_NAME: &str = "ExchangeRates";

pub const HEADER_ROW: [&str; 6] = [
    "CurrencyCode",
    "CurrencyName",
    "BuyCash",
    "BuyTransfer",
    "SellCash",
    "SellTransfer",
];

pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// ワークブックを構築してxlsxバイト列にする
///
/// 0行の抽出結果はヘッダー行のみのシートになる（エラーではない）。
pub fn build_workbook(rows: &[RateRow]) -> Result<Vec<u8>, ScraperError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(SHEET_NAME)?;

    for (col, title) in HEADER_ROW.iter().enumerate() {
        worksheet.write_string(0, col as u16, *title)?;
    }

    for (i, row) in rows.iter().enumerate() {
        let sheet_row = (i + 1) as u32;
        for (col, cell) in row.cells().iter().enumerate() {
            // 欠損セルは空欄のまま残す
            if let Some(value) = cell {
                worksheet.write_string(sheet_row, col as u16, *value)?;
            }
        }
    }

    Ok(workbook.save_to_buffer()?)
}

/// ダウンロードファイル名（照会日を埋め込む）
pub fn export_filename(date: &str) -> String {
    format!("ExchangeRates_{}.xlsx", date)
}
