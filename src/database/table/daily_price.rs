use chrono::NaiveDate;

use crate::{database, error::SyncError};

/// 日股價 `daily_price` 的資料列，主鍵為 (code, date)
#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Eq)]
pub struct DailyPrice {
    pub code: String,
    pub date: NaiveDate,
    /// 開盤價
    pub open: i64,
    /// 最高價
    pub high: i64,
    /// 最低價
    pub low: i64,
    /// 收盤價
    pub close: i64,
    /// 漲跌價差，下跌為負數
    pub diff: i64,
    /// 成交量
    pub volume: i64,
}

impl DailyPrice {
    /// 在同一個 transaction 內新增或覆蓋一家公司的日股價，任何一筆失敗就整批 rollback
    pub async fn upsert_batch(code: &str, bars: &[DailyPrice]) -> Result<u64, SyncError> {
        if bars.is_empty() {
            return Ok(0);
        }

        let sql = r#"
INSERT INTO daily_price
    (code, date, open, high, low, close, diff, volume)
VALUES
    ($1, $2, $3, $4, $5, $6, $7, $8)
ON CONFLICT (code, date)
DO UPDATE SET
    open = excluded.open,
    high = excluded.high,
    low = excluded.low,
    close = excluded.close,
    diff = excluded.diff,
    volume = excluded.volume;"#;

        let mut tx = database::get_tx().await?;
        let mut affected = 0;

        for bar in bars {
            let result = sqlx::query(sql)
                .bind(code)
                .bind(bar.date)
                .bind(bar.open)
                .bind(bar.high)
                .bind(bar.low)
                .bind(bar.close)
                .bind(bar.diff)
                .bind(bar.volume)
                .execute(&mut *tx)
                .await;

            match result {
                Ok(r) => affected += r.rows_affected(),
                Err(why) => {
                    tx.rollback().await?;
                    return Err(SyncError::from(why));
                }
            }
        }

        tx.commit().await?;

        Ok(affected)
    }

    /// 取得指定公司的日股價，依日期新到舊排序
    #[cfg(test)]
    pub async fn fetch_by_code(code: &str) -> Result<Vec<DailyPrice>, SyncError> {
        let sql = r#"
SELECT
    code, date, open, high, low, close, diff, volume
FROM
    daily_price
WHERE
    code = $1
ORDER BY
    date DESC
"#;
        Ok(sqlx::query_as::<_, DailyPrice>(sql)
            .bind(code)
            .fetch_all(database::get_connection())
            .await?)
    }
}
