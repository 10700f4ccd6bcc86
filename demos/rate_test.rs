use tpbank_rate_service::{RateRequest, RateService};
use tower::Service;

#[tokio::main]
async fn main() {
    // ログ設定
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    // 照会日を環境変数から取得
    let date = std::env::var("RATE_DATE").unwrap_or_else(|_| "2024-06-01".to_string());

    let request = RateRequest::new(&date)
        .with_headless(false) // デバッグ用に表示モード
        .with_debug(true);

    let mut service = RateService::new();

    println!("=== TPBank Rate Scraper Test ===");

    match service.call(request).await {
        Ok(result) => {
            println!("成功! 取得行数: {}", result.rows.len());
            for row in &result.rows {
                println!("{:?}", row);
            }
        }
        Err(e) => {
            eprintln!("エラー: {}", e);
        }
    }
}
