/// 上市公司清單
pub mod company_info;
/// 日股價
pub mod daily_price;
