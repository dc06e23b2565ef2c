//! # 韓國交易所（KRX）上市公司清單
//!
//! 來源為 KIND 公示系統的「上場法人目錄」下載，內容是 EUC-KR 的 HTML 表格。

use async_trait::async_trait;

use crate::{
    crawler::{Company, CompanyList},
    error::SyncError,
};

/// 上場法人目錄
pub mod company_list;

const HOST: &str = "kind.krx.co.kr";

/// KRX 上市公司清單採集器
pub struct Krx {}

#[async_trait]
impl CompanyList for Krx {
    async fn fetch(&self) -> Result<Vec<Company>, SyncError> {
        company_list::visit().await
    }
}
