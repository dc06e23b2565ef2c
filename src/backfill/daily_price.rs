use std::collections::BTreeMap;

use crate::{crawler::DailyPriceSource, database::Store, error::SyncError, logging};

/// 一輪日股價同步的統計
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Report {
    /// 成功寫入的公司數
    pub stored: usize,
    /// 沒有可用資料而略過的公司數
    pub skipped: usize,
    /// 寫入被拒絕的公司數
    pub failed: usize,
    /// 寫入的日股價筆數
    pub rows: u64,
}

/// 依代號順序逐一抓取每家公司的日股價並寫入資料庫。
///
/// 單一公司沒有資料或寫入被拒絕時記錄後繼續下一家；
/// 只有資料庫無法連線（[`SyncError::is_fatal`]）會中止這一輪。
pub async fn execute<P>(
    store: &dyn Store,
    source: &P,
    companies: &BTreeMap<String, String>,
    page_cap: u32,
) -> Result<Report, SyncError>
where
    P: DailyPriceSource + ?Sized,
{
    logging::info_file_async(format!(
        "更新日股價開始 companies:{} pages_to_fetch:{}",
        companies.len(),
        page_cap
    ));

    let mut report = Report::default();
    for (idx, (code, name)) in companies.iter().enumerate() {
        let Some(bars) = source.fetch(code, name, page_cap).await else {
            report.skipped += 1;
            continue;
        };

        match store.upsert_price_bars(code, &bars).await {
            Ok(affected) => {
                logging::info_file_async(format!(
                    "#{:04} {} ({}): {} rows > REPLACE INTO daily_price [OK]",
                    idx + 1,
                    name,
                    code,
                    bars.len()
                ));
                report.stored += 1;
                report.rows += affected;
            }
            Err(why) if why.is_fatal() => {
                logging::error_file_async(format!(
                    "Stop updating daily prices at {} ({}) because {:?}",
                    name, code, why
                ));
                return Err(why);
            }
            Err(why) => {
                logging::error_file_async(format!(
                    "#{:04} {} ({}): REPLACE INTO daily_price failed because {:?}",
                    idx + 1,
                    name,
                    code,
                    why
                ));
                report.failed += 1;
            }
        }
    }

    logging::info_file_async(format!("更新日股價結束 {:?}", report));

    Ok(report)
}
