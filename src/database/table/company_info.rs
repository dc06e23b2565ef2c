use chrono::NaiveDate;

use crate::{database, error::SyncError};

/// 上市公司清單 `company_info` 的資料列
#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Eq)]
pub struct CompanyInfo {
    /// 6 碼、左補零的股票代號
    pub code: String,
    /// 公司名稱
    pub company: String,
    /// 這筆資料最後一次由上市公司清單更新的日期
    pub last_update: NaiveDate,
}

impl CompanyInfo {
    pub fn new(code: String, company: String, last_update: NaiveDate) -> Self {
        CompanyInfo {
            code,
            company,
            last_update,
        }
    }

    /// 取得所有公司
    pub async fn fetch_all() -> Result<Vec<CompanyInfo>, SyncError> {
        let sql = r#"
SELECT
    code,
    company,
    last_update
FROM
    company_info
"#;
        Ok(sqlx::query_as::<_, CompanyInfo>(sql)
            .fetch_all(database::get_connection())
            .await?)
    }

    /// 取得最新的更新日期，表內沒有資料時回傳 `None`
    pub async fn fetch_max_last_update() -> Result<Option<NaiveDate>, SyncError> {
        let max: Option<NaiveDate> =
            sqlx::query_scalar("SELECT MAX(last_update) FROM company_info;")
                .fetch_one(database::get_connection())
                .await?;

        Ok(max)
    }

    /// 新增或覆蓋同一代號的公司
    pub async fn upsert(&self) -> Result<(), SyncError> {
        let sql = r#"
INSERT INTO company_info
    (code, company, last_update)
VALUES
    ($1, $2, $3)
ON CONFLICT (code)
DO UPDATE SET
    company = excluded.company,
    last_update = excluded.last_update;"#;
        sqlx::query(sql)
            .bind(&self.code)
            .bind(&self.company)
            .bind(self.last_update)
            .execute(database::get_connection())
            .await?;

        Ok(())
    }
}
