use std::collections::HashMap;

use strum::{Display, EnumIter, IntoEnumIterator};

use crate::{
    database::table::daily_price::DailyPrice,
    error::SyncError,
    util::{datetime, http::element::Table, text},
};

/// `daily_price` 的欄位，宣告順序即寫入順序
#[derive(Display, EnumIter, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[strum(serialize_all = "lowercase")]
pub enum PriceField {
    Date,
    Open,
    High,
    Low,
    Close,
    Diff,
    Volume,
}

impl PriceField {
    /// 頁面表頭文字對應的欄位
    pub fn from_label(label: &str) -> Option<PriceField> {
        match label.trim() {
            "날짜" => Some(PriceField::Date),
            "종가" => Some(PriceField::Close),
            "전일비" => Some(PriceField::Diff),
            "시가" => Some(PriceField::Open),
            "고가" => Some(PriceField::High),
            "저가" => Some(PriceField::Low),
            "거래량" => Some(PriceField::Volume),
            _ => None,
        }
    }
}

/// 以欄位名稱索引的一列原始文字
pub type RawRow = HashMap<PriceField, String>;

/// 下跌的標記
const DOWN_MARKERS: [&str; 2] = ["하락", "하한"];

/// 依表頭把每一列轉成 [`RawRow`]，不認得的欄位忽略，缺少的儲存格就不放進去
pub fn rows_from_table(table: &Table) -> Vec<RawRow> {
    let fields: Vec<Option<PriceField>> = table
        .headers
        .iter()
        .map(|h| PriceField::from_label(h))
        .collect();

    table
        .rows
        .iter()
        .map(|cells| {
            cells
                .iter()
                .zip(fields.iter())
                .filter_map(|(cell, field)| field.map(|f| (f, cell.clone())))
                .collect::<RawRow>()
        })
        .collect()
}

/// 把累積的原始資料轉成 [`DailyPrice`]。
///
/// 任一欄位缺少或空白的列（例如停止交易日）直接捨棄；
/// 欄位有值但無法轉成日期或整數時整批失敗。
pub fn normalize(code: &str, rows: &[RawRow]) -> Result<Vec<DailyPrice>, SyncError> {
    let mut result = Vec::with_capacity(rows.len());

    for row in rows {
        let complete =
            PriceField::iter().all(|f| row.get(&f).is_some_and(|v| !text::is_blank(v)));
        if !complete {
            continue;
        }

        let value =
            move |field: PriceField| row.get(&field).map(String::as_str).unwrap_or_default();
        let date = datetime::parse_trading_date(value(PriceField::Date)).ok_or_else(|| {
            SyncError::Parse(format!("Failed to parse date '{}'", value(PriceField::Date)))
        })?;
        let number = move |field: PriceField| {
            text::parse_i64(value(field), None).map_err(|why| {
                SyncError::Parse(format!("Failed to parse {} because {:?}", field, why))
            })
        };

        result.push(DailyPrice {
            code: code.to_string(),
            date,
            open: number(PriceField::Open)?,
            high: number(PriceField::High)?,
            low: number(PriceField::Low)?,
            close: number(PriceField::Close)?,
            diff: parse_diff(value(PriceField::Diff))?,
            volume: number(PriceField::Volume)?,
        });
    }

    Ok(result)
}

/// 解析漲跌價差，`하락`/`하한` 或負號表示下跌
pub fn parse_diff(s: &str) -> Result<i64, SyncError> {
    let negative =
        DOWN_MARKERS.iter().any(|m| s.contains(m)) || s.trim_start().starts_with('-');
    let digits: String = s.chars().filter(|c| c.is_ascii_digit()).collect();
    let value = text::parse_i64(&digits, None)
        .map_err(|why| SyncError::Parse(format!("Failed to parse diff because {:?}", why)))?;

    Ok(if negative { -value } else { value })
}
