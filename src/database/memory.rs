use std::{
    collections::{BTreeMap, HashMap},
    sync::Mutex,
};

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::{
    database::{
        table::{company_info::CompanyInfo, daily_price::DailyPrice},
        Store,
    },
    error::SyncError,
};

/// 測試用的記憶體 [`Store`]，可針對指定代號注入寫入錯誤
#[derive(Default)]
pub(crate) struct MemoryStore {
    companies: Mutex<BTreeMap<String, CompanyInfo>>,
    prices: Mutex<BTreeMap<(String, NaiveDate), DailyPrice>>,
    price_failures: Mutex<HashMap<String, SyncError>>,
    company_failures: Mutex<HashMap<String, SyncError>>,
    pub(crate) schema_calls: Mutex<usize>,
}

impl MemoryStore {
    pub(crate) fn with_companies(companies: Vec<CompanyInfo>) -> Self {
        let store = MemoryStore::default();
        {
            let mut map = store.companies.lock().unwrap();
            for c in companies {
                map.insert(c.code.clone(), c);
            }
        }
        store
    }

    /// 之後寫入 `code` 的日股價都回傳 `why`
    pub(crate) fn fail_prices_for(&self, code: &str, why: SyncError) {
        self.price_failures
            .lock()
            .unwrap()
            .insert(code.to_string(), why);
    }

    /// 之後寫入 `code` 的公司資料都回傳 `why`
    pub(crate) fn fail_companies_for(&self, code: &str, why: SyncError) {
        self.company_failures
            .lock()
            .unwrap()
            .insert(code.to_string(), why);
    }

    pub(crate) fn companies(&self) -> Vec<CompanyInfo> {
        self.companies.lock().unwrap().values().cloned().collect()
    }

    pub(crate) fn prices(&self) -> Vec<DailyPrice> {
        self.prices.lock().unwrap().values().cloned().collect()
    }

    pub(crate) fn prices_of(&self, code: &str) -> Vec<DailyPrice> {
        self.prices()
            .into_iter()
            .filter(|p| p.code == code)
            .collect()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ensure_schema(&self) -> Result<(), SyncError> {
        *self.schema_calls.lock().unwrap() += 1;
        Ok(())
    }

    async fn load_all_companies(&self) -> Result<Vec<CompanyInfo>, SyncError> {
        Ok(self.companies())
    }

    async fn max_company_last_update(&self) -> Result<Option<NaiveDate>, SyncError> {
        Ok(self
            .companies
            .lock()
            .unwrap()
            .values()
            .map(|c| c.last_update)
            .max())
    }

    async fn upsert_company(&self, company: &CompanyInfo) -> Result<(), SyncError> {
        if let Some(why) = self.company_failures.lock().unwrap().get(&company.code) {
            return Err(why.clone());
        }

        self.companies
            .lock()
            .unwrap()
            .insert(company.code.clone(), company.clone());
        Ok(())
    }

    async fn upsert_price_bars(&self, code: &str, bars: &[DailyPrice]) -> Result<u64, SyncError> {
        if let Some(why) = self.price_failures.lock().unwrap().get(code) {
            return Err(why.clone());
        }

        let mut prices = self.prices.lock().unwrap();
        for bar in bars {
            let mut bar = bar.clone();
            bar.code = code.to_string();
            prices.insert((code.to_string(), bar.date), bar);
        }

        Ok(bars.len() as u64)
    }
}
