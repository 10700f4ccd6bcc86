use async_trait::async_trait;

use crate::error::ScraperError;
use crate::tpbank::RateRow;

#[async_trait]
pub trait Scraper: Send + Sync {
    /// ブラウザ初期化
    async fn initialize(&mut self) -> Result<(), ScraperError>;

    /// レートテーブル取得
    async fn fetch(&mut self) -> Result<Vec<RateRow>, ScraperError>;

    /// リソース解放
    async fn close(&mut self) -> Result<(), ScraperError>;

    /// 一括実行（initialize → fetch → close）
    ///
    /// closeは成功・失敗どちらの経路でも必ず一度だけ呼ばれる。
    async fn execute(&mut self) -> Result<Vec<RateRow>, ScraperError> {
        let result = match self.initialize().await {
            Ok(()) => self.fetch().await,
            Err(e) => Err(e),
        };
        let closed = self.close().await;
        let rows = result?;
        closed?;
        Ok(rows)
    }
}

/// リクエスト単位のレート取得境界
///
/// HTTPレイヤーはこのトレイトオブジェクトだけに依存する。
/// テストではモック実装に差し替える。
#[async_trait]
pub trait RateFetcher: Send + Sync {
    async fn fetch_rates(&self, date: &str) -> Result<Vec<RateRow>, ScraperError>;
}
