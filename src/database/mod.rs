use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use once_cell::sync::OnceCell;
use sqlx::{
    postgres::{PgConnectOptions, PgPoolOptions},
    PgPool, Postgres, Transaction,
};

use crate::{
    config,
    database::table::{company_info::CompanyInfo, daily_price::DailyPrice},
    error::SyncError,
    logging,
};

#[cfg(test)]
pub(crate) mod memory;
pub mod schema;
pub mod table;

static POSTGRES: OnceCell<PostgresSQL> = OnceCell::new();

/// PostgreSQL 連線池封裝。
pub struct PostgresSQL {
    pub pool: PgPool,
}

impl PostgresSQL {
    /// 建立 PostgreSQL 連線池，連線參數來自 `config::SETTINGS.postgresql`。
    ///
    /// 連線是 lazy 的，第一次查詢時才會真的連到資料庫。
    pub fn new() -> PostgresSQL {
        let settings = &config::SETTINGS.postgresql;
        let options = PgConnectOptions::new()
            .host(&settings.host)
            .port(u16::try_from(settings.port).unwrap_or(5432))
            .username(&settings.user)
            .password(&settings.password)
            .database(&settings.db)
            .application_name("daily_price_crawler");
        // 同一時間只有一個寫入者
        let pool = PgPoolOptions::new()
            .max_lifetime(Some(Duration::from_secs(1800)))
            .max_connections(2)
            .min_connections(0)
            .acquire_timeout(Duration::from_secs(5))
            .idle_timeout(Some(Duration::from_secs(600)))
            .connect_lazy_with(options);

        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn tx(&self) -> Result<Transaction<'_, Postgres>, SyncError> {
        Ok(self.pool().begin().await?)
    }
}

impl Default for PostgresSQL {
    fn default() -> Self {
        Self::new()
    }
}

fn get_postgresql() -> &'static PostgresSQL {
    POSTGRES.get_or_init(PostgresSQL::new)
}

/// 取得全域 PostgreSQL 連線池。
pub fn get_connection() -> &'static PgPool {
    get_postgresql().pool()
}

/// 從全域 PostgreSQL 連線池建立 transaction。
pub async fn get_tx() -> Result<Transaction<'static, Postgres>, SyncError> {
    get_postgresql().tx().await
}

/// 公司清單與日股價的持久化介面，所有寫入都是依主鍵覆蓋（upsert）
#[async_trait]
pub trait Store: Send + Sync {
    /// 建立 `company_info` 與 `daily_price`（若不存在），成功一次之後再呼叫不做任何事
    async fn ensure_schema(&self) -> Result<(), SyncError>;

    async fn load_all_companies(&self) -> Result<Vec<CompanyInfo>, SyncError>;

    /// 公司清單中最新的 `last_update`，清單為空時回傳 `None`
    async fn max_company_last_update(&self) -> Result<Option<NaiveDate>, SyncError>;

    async fn upsert_company(&self, company: &CompanyInfo) -> Result<(), SyncError>;

    /// 在同一個 transaction 內寫入一家公司的日股價，回傳寫入筆數
    async fn upsert_price_bars(&self, code: &str, bars: &[DailyPrice]) -> Result<u64, SyncError>;
}

/// 以 PostgreSQL 實作的 [`Store`]
#[derive(Default)]
pub struct PostgresStore {
    schema_ready: AtomicBool,
}

impl PostgresStore {
    pub fn new() -> Self {
        Default::default()
    }
}

#[async_trait]
impl Store for PostgresStore {
    async fn ensure_schema(&self) -> Result<(), SyncError> {
        if self.schema_ready.load(Ordering::Acquire) {
            return Ok(());
        }

        schema::ensure(get_connection()).await?;
        self.schema_ready.store(true, Ordering::Release);
        logging::info_file_async("company_info, daily_price are ready".to_string());

        Ok(())
    }

    async fn load_all_companies(&self) -> Result<Vec<CompanyInfo>, SyncError> {
        CompanyInfo::fetch_all().await
    }

    async fn max_company_last_update(&self) -> Result<Option<NaiveDate>, SyncError> {
        CompanyInfo::fetch_max_last_update().await
    }

    async fn upsert_company(&self, company: &CompanyInfo) -> Result<(), SyncError> {
        company.upsert().await
    }

    async fn upsert_price_bars(&self, code: &str, bars: &[DailyPrice]) -> Result<u64, SyncError> {
        DailyPrice::upsert_batch(code, bars).await
    }
}
