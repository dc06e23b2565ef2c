use std::collections::BTreeMap;

use chrono::{Local, NaiveDate};

use crate::{
    crawler::CompanyList,
    database::{table::company_info::CompanyInfo, Store},
    error::SyncError,
    logging,
};

/// 一次 [`CompanyRegistry::sync`] 的結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// 今天已經更新過，沒有向 KRX 取資料
    Fresh,
    /// 今天第一次同步，寫入了這麼多家公司
    Refreshed(usize),
    /// 上市公司清單抓取失敗，沿用資料庫內既有的清單
    RefreshFailed(SyncError),
}

/// 上市公司清單的同步器，同時持有代號→公司名稱的對照表。
///
/// 對照表只會由 [`sync`](Self::sync) 更新：先從資料庫載入，
/// 當天尚未更新時再以 KRX 的清單覆蓋並擴充。
pub struct CompanyRegistry<L> {
    list: L,
    lookup: BTreeMap<String, String>,
}

impl<L: CompanyList> CompanyRegistry<L> {
    pub fn new(list: L) -> Self {
        CompanyRegistry {
            list,
            lookup: BTreeMap::new(),
        }
    }

    /// 代號→公司名稱，依代號排序
    pub fn lookup(&self) -> &BTreeMap<String, String> {
        &self.lookup
    }

    pub async fn sync(&mut self, store: &dyn Store) -> Result<SyncOutcome, SyncError> {
        self.sync_on(store, Local::now().date_naive()).await
    }

    /// 以 `today` 作為本地日期進行同步。
    ///
    /// 資料庫錯誤直接回傳；單筆公司寫入被拒絕時只記錄下來，其餘照常寫入。
    pub async fn sync_on(
        &mut self,
        store: &dyn Store,
        today: NaiveDate,
    ) -> Result<SyncOutcome, SyncError> {
        for c in store.load_all_companies().await? {
            self.lookup.insert(c.code, c.company);
        }

        if let Some(last_update) = store.max_company_last_update().await? {
            if last_update >= today {
                return Ok(SyncOutcome::Fresh);
            }
        }

        let companies = match self.list.fetch().await {
            Ok(companies) => companies,
            Err(why) => {
                logging::error_file_async(format!(
                    "Failed to fetch the company list because {:?}",
                    why
                ));
                return Ok(SyncOutcome::RefreshFailed(why));
            }
        };

        let mut written = 0;
        for (idx, company) in companies.into_iter().enumerate() {
            let record = CompanyInfo::new(company.code, company.name, today);
            match store.upsert_company(&record).await {
                Ok(_) => {
                    logging::info_file_async(format!(
                        "#{:04} REPLACE INTO company_info (code, company, last_update) VALUES ('{}', '{}', '{}')",
                        idx + 1,
                        record.code,
                        record.company,
                        record.last_update
                    ));
                    self.lookup.insert(record.code, record.company);
                    written += 1;
                }
                Err(why) if why.is_fatal() => return Err(why),
                Err(why) => {
                    logging::error_file_async(format!(
                        "Failed to upsert {} ({}) because {:?}",
                        record.company, record.code, why
                    ));
                }
            }
        }

        Ok(SyncOutcome::Refreshed(written))
    }
}
