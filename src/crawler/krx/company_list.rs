use scraper::Html;

use crate::{
    crawler::{krx, Company},
    error::SyncError,
    logging,
    util::{
        http,
        http::element::{self, Table},
    },
};

/// 股票代號固定為 6 碼
const CODE_WIDTH: usize = 6;
const CODE_LABEL: &str = "종목코드";
const NAME_LABEL: &str = "회사명";

/// 下載並解析上場法人目錄
pub async fn visit() -> Result<Vec<Company>, SyncError> {
    let url = format!(
        "http://{}/corpgeneral/corpList.do?method=download&searchType=13",
        krx::HOST
    );
    let text = http::get_use_euc_kr(&url).await?;

    parse(&text)
}

/// 從上場法人目錄的 HTML 取出 (代號, 公司名稱)
pub fn parse(html: &str) -> Result<Vec<Company>, SyncError> {
    let document = Html::parse_document(html);
    let table = element::parse_table(&document, "table", element::cell_text)?;

    companies_from_table(&table)
}

fn companies_from_table(table: &Table) -> Result<Vec<Company>, SyncError> {
    let code_col = table
        .column(CODE_LABEL)
        .ok_or_else(|| SyncError::Parse(format!("The column {} not found", CODE_LABEL)))?;
    let name_col = table
        .column(NAME_LABEL)
        .ok_or_else(|| SyncError::Parse(format!("The column {} not found", NAME_LABEL)))?;

    let mut result = Vec::with_capacity(table.rows.len());
    for row in &table.rows {
        let (Some(code), Some(name)) = (row.get(code_col), row.get(name_col)) else {
            continue;
        };

        let name = name.trim();
        match normalize_code(code) {
            Some(code) if !name.is_empty() => {
                result.push(Company::new(code, name.to_string()));
            }
            _ => {
                logging::warn_file_async(format!(
                    "Skip the listed company because code({}) or name({}) is invalid",
                    code, name
                ));
            }
        }
    }

    if result.is_empty() {
        return Err(SyncError::Parse("The company list is empty".to_string()));
    }

    Ok(result)
}

/// 把純數字代號左補零到 6 碼，例如 `5930` => `005930`
pub fn normalize_code(code: &str) -> Option<String> {
    let code = code.trim();
    if code.is_empty() || code.len() > CODE_WIDTH || !code.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    Some(format!("{:0>width$}", code, width = CODE_WIDTH))
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = r#"
<html><head><meta http-equiv="Content-Type" content="text/html; charset=euc-kr"></head>
<body>
<table border="1">
  <tr><th>회사명</th><th>종목코드</th><th>업종</th></tr>
  <tr><td>삼성전자</td><td style="mso-number-format:'\@';">5930</td><td>통신 및 방송 장비 제조업</td></tr>
  <tr><td>SK하이닉스</td><td>000660</td><td>반도체 제조업</td></tr>
  <tr><td>이상한회사</td><td>12A45</td><td>기타</td></tr>
  <tr><td></td><td>123456</td><td>기타</td></tr>
</table>
</body></html>"#;

    #[test]
    fn test_normalize_code() {
        assert_eq!(normalize_code("5930"), Some("005930".to_string()));
        assert_eq!(normalize_code(" 000660 "), Some("000660".to_string()));
        assert_eq!(normalize_code("123456"), Some("123456".to_string()));
        assert_eq!(normalize_code("1234567"), None);
        assert_eq!(normalize_code("0088M0"), None);
        assert_eq!(normalize_code(""), None);
    }

    #[test]
    fn test_parse() {
        let companies = parse(LISTING).unwrap();
        assert_eq!(
            companies,
            vec![
                Company::new("005930".to_string(), "삼성전자".to_string()),
                Company::new("000660".to_string(), "SK하이닉스".to_string()),
            ]
        );
    }

    #[test]
    fn test_parse_without_code_column() {
        let html = "<table><tr><th>회사명</th></tr><tr><td>삼성전자</td></tr></table>";
        assert!(matches!(parse(html), Err(SyncError::Parse(_))));
    }

    #[tokio::test]
    #[ignore]
    async fn test_visit() {
        dotenv::dotenv().ok();
        let _ = rustls::crypto::ring::default_provider().install_default();
        logging::debug_file_async("開始 visit".to_string());

        match visit().await {
            Ok(list) => {
                logging::debug_file_async(format!("companies:{}", list.len()));
            }
            Err(why) => {
                logging::debug_file_async(format!("Failed to visit because: {:?}", why));
            }
        }

        logging::debug_file_async("結束 visit".to_string());
    }
}
