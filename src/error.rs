use thiserror::Error;

/// 同步流程在各元件邊界上回報的錯誤分類
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// 上市公司清單或股價來源無法連線，或回應內容完全無法辨識
    #[error("source unavailable: {0}")]
    SourceUnavailable(String),
    /// 頁面結構與預期不符
    #[error("parse error: {0}")]
    Parse(String),
    /// 資料庫無法連線，本輪同步需中止
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),
    /// 資料庫可連線但拒絕了這次寫入，只影響單一公司
    #[error("storage rejected the statement: {0}")]
    Storage(String),
}

impl SyncError {
    /// 是否需要中止本輪同步
    pub fn is_fatal(&self) -> bool {
        matches!(self, SyncError::StorageUnavailable(_))
    }
}

impl From<sqlx::Error> for SyncError {
    fn from(why: sqlx::Error) -> Self {
        match why {
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::Protocol(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => SyncError::StorageUnavailable(why.to_string()),
            _ => SyncError::Storage(why.to_string()),
        }
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(why: reqwest::Error) -> Self {
        SyncError::SourceUnavailable(why.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sqlx_error_classification() {
        let unreachable: SyncError = sqlx::Error::PoolTimedOut.into();
        assert!(unreachable.is_fatal());

        let closed: SyncError = sqlx::Error::PoolClosed.into();
        assert!(closed.is_fatal());

        let rejected: SyncError = sqlx::Error::RowNotFound.into();
        assert!(!rejected.is_fatal());
        assert!(matches!(rejected, SyncError::Storage(_)));
    }
}
