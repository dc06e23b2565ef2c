use async_trait::async_trait;

use crate::{database::table::daily_price::DailyPrice, error::SyncError};

/// 韓國交易所 上市公司清單
pub mod krx;
/// Naver 금융 日股價
pub mod naver;

/// 上市公司清單中的一筆公司
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Company {
    /// 6 碼、左補零的股票代號
    pub code: String,
    pub name: String,
}

impl Company {
    pub fn new(code: String, name: String) -> Self {
        Company { code, name }
    }
}

/// 取得目前的上市公司清單，不做重試由呼叫端決定
#[async_trait]
pub trait CompanyList: Send + Sync {
    async fn fetch(&self) -> Result<Vec<Company>, SyncError>;
}

/// 取得某家公司日股價的第 `page` 頁 HTML（從 1 開始）
#[async_trait]
pub trait DailyPricePage: Send + Sync {
    async fn page(&self, code: &str, page: u32) -> Result<String, SyncError>;
}

/// 取得某家公司最多 `page_cap` 頁的日股價。
///
/// 回傳 `None` 表示這家公司這一輪沒有可用的資料，不是錯誤。
#[async_trait]
pub trait DailyPriceSource: Send + Sync {
    async fn fetch(&self, code: &str, name: &str, page_cap: u32) -> Option<Vec<DailyPrice>>;
}
