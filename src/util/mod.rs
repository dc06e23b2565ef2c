/// 日期與時間
pub mod datetime;
/// HTTP 請求與 HTML 解析
pub mod http;
/// 文字與數值轉換
pub mod text;
