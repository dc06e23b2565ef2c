use scraper::{ElementRef, Html, Selector};

use crate::error::SyncError;

/// 從 HTML 表格解析出的原始文字資料
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    /// 表頭文字
    pub headers: Vec<String>,
    /// 每一列的儲存格文字，長度可能與表頭不同（例如分隔列）
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// 回傳表頭文字所在的欄位索引
    pub fn column(&self, label: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == label)
    }
}

/// Returns the value of `attr` on the first element matched by `css_selector` in the document.
pub fn parse_attr(document: &Html, css_selector: &str, attr: &str) -> Option<String> {
    let selector = Selector::parse(css_selector).ok()?;
    document
        .select(&selector)
        .next()
        .and_then(|e| e.value().attr(attr))
        .map(str::to_string)
}

/// 儲存格的文字，連續空白壓縮成一個空白
pub fn cell_text(cell: &ElementRef) -> String {
    cell.text()
        .flat_map(|t| t.split(char::is_whitespace))
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// 解析第一個符合 `table_selector` 的表格。
///
/// 含有 `th` 的第一列當作表頭；若表格沒有 `th`，則以第一列的 `td` 當表頭。
/// 其餘含 `td` 的列以 `cell` 轉成文字。
pub fn parse_table<F>(document: &Html, table_selector: &str, cell: F) -> Result<Table, SyncError>
where
    F: Fn(&ElementRef) -> String,
{
    let selector = |css: &str| {
        Selector::parse(css)
            .map_err(|why| SyncError::Parse(format!("Failed to Selector::parse because: {:?}", why)))
    };
    let table_selector = selector(table_selector)?;
    let tr = selector("tr")?;
    let th = selector("th")?;
    let td = selector("td")?;

    let table = document
        .select(&table_selector)
        .next()
        .ok_or_else(|| SyncError::Parse("The table not found".to_string()))?;

    let mut result = Table::default();
    for row in table.select(&tr) {
        let header_cells: Vec<String> = row.select(&th).map(|c| cell_text(&c)).collect();
        if !header_cells.is_empty() {
            if result.headers.is_empty() {
                result.headers = header_cells;
            }
            continue;
        }

        let cells: Vec<String> = row.select(&td).map(|c| cell(&c)).collect();
        if cells.is_empty() {
            continue;
        }

        if result.headers.is_empty() {
            result.headers = cells;
            continue;
        }

        result.rows.push(cells);
    }

    if result.headers.is_empty() {
        return Err(SyncError::Parse("The table has no header".to_string()));
    }

    Ok(result)
}
