//! # Naver 금융 日股價
//!
//! `sise_day.naver` 每頁 10 個交易日，頁面底部的分頁列會標示最後一頁（`td.pgRR`）。

use async_trait::async_trait;
use concat_string::concat_string;

use crate::{crawler::DailyPricePage, error::SyncError, util::http};

/// 日股價分頁抓取與解析
pub mod daily_price;
/// 把頁面上的欄位轉成 `daily_price` 的欄位
pub mod normalize;

const HOST: &str = "finance.naver.com";

/// Naver 금융 日股價頁面
pub struct Naver {}

impl Naver {
    pub fn url(code: &str, page: u32) -> String {
        concat_string!(
            "https://",
            HOST,
            "/item/sise_day.naver?code=",
            code,
            "&page=",
            page.to_string()
        )
    }
}

#[async_trait]
impl DailyPricePage for Naver {
    async fn page(&self, code: &str, page: u32) -> Result<String, SyncError> {
        http::get_use_euc_kr(&Self::url(code, page)).await
    }
}
