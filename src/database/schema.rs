use sqlx::PgPool;

use crate::error::SyncError;

const CREATE_COMPANY_INFO: &str = r#"
CREATE TABLE IF NOT EXISTS company_info (
    code VARCHAR(20) NOT NULL,
    company VARCHAR(40) NOT NULL,
    last_update DATE NOT NULL,
    PRIMARY KEY (code)
);"#;

const CREATE_DAILY_PRICE: &str = r#"
CREATE TABLE IF NOT EXISTS daily_price (
    code VARCHAR(20) NOT NULL,
    date DATE NOT NULL,
    open BIGINT NOT NULL,
    high BIGINT NOT NULL,
    low BIGINT NOT NULL,
    close BIGINT NOT NULL,
    diff BIGINT NOT NULL,
    volume BIGINT NOT NULL,
    PRIMARY KEY (code, date)
);"#;

/// 建立公司清單與日股價兩張表，已存在時不做任何事
pub async fn ensure(pool: &PgPool) -> Result<(), SyncError> {
    let mut tx = pool.begin().await?;

    for ddl in [CREATE_COMPANY_INFO, CREATE_DAILY_PRICE] {
        if let Err(why) = sqlx::query(ddl).execute(&mut *tx).await {
            tx.rollback().await?;
            return Err(SyncError::from(why));
        }
    }

    tx.commit().await?;

    Ok(())
}
