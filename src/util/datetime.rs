use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone};

/// 股價頁面上可能出現的日期格式
const DATE_FORMATS: [&str; 3] = ["%Y.%m.%d", "%Y-%m-%d", "%Y/%m/%d"];

/// Parses a trading date such as `2024.05.03` into a `NaiveDate`.
pub fn parse_trading_date(date_str: &str) -> Option<NaiveDate> {
    let date_str = date_str.trim();
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(date_str, format).ok())
}

/// 把本地時間的 `NaiveDateTime` 轉成 `DateTime<Local>`，遇到夏令時間的空隙時往後找第一個有效時間
pub fn to_local(naive: NaiveDateTime) -> Option<DateTime<Local>> {
    Local
        .from_local_datetime(&naive)
        .earliest()
        .or_else(|| {
            Local
                .from_local_datetime(&(naive + chrono::TimeDelta::hours(1)))
                .earliest()
        })
}
