use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::{
    crawler::{
        naver::normalize::{self, RawRow},
        DailyPricePage, DailyPriceSource,
    },
    database::table::daily_price::DailyPrice,
    error::SyncError,
    logging,
    util::http::element,
};

/// 分頁連結中的頁碼
static REG_PAGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"page=(\d+)").expect("Failed to compile page regex"));

/// 依分頁抓取日股價並轉成 [`DailyPrice`]
pub struct DailyPriceFetcher<P> {
    source: P,
}

/// 解析單一頁面的結果
#[derive(Debug, Default)]
struct Page {
    /// 分頁列標示的最後一頁，頁面沒有分頁列時為 `None`
    last_page: Option<u32>,
    rows: Vec<RawRow>,
}

impl<P: DailyPricePage> DailyPriceFetcher<P> {
    pub fn new(source: P) -> Self {
        DailyPriceFetcher { source }
    }

    /// 第 1 頁同時用來取得總頁數，之後依序抓到 min(總頁數, page_cap) 頁。
    ///
    /// 第 1 頁失敗或沒有分頁列時回傳錯誤；之後的頁面失敗則保留已累積的資料。
    async fn collect(&self, code: &str, name: &str, page_cap: u32) -> Result<Vec<RawRow>, SyncError> {
        let first = parse_page(&self.source.page(code, 1).await?)?;
        let last_page = first
            .last_page
            .ok_or_else(|| SyncError::Parse(format!("The pagination of {} not found", code)))?;
        let pages = last_page.min(page_cap.max(1));
        let mut rows = first.rows;

        logging::info_file_async(format!(
            "{} ({}): {:04}/{:04} pages are downloading...",
            name, code, 1, pages
        ));

        for page in 2..=pages {
            let result = match self.source.page(code, page).await {
                Ok(html) => parse_page(&html),
                Err(why) => Err(why),
            };

            match result {
                Ok(p) => rows.extend(p.rows),
                Err(why) => {
                    logging::warn_file_async(format!(
                        "Stop fetching {} ({}) at page {} because {:?}",
                        name, code, page, why
                    ));
                    break;
                }
            }

            logging::info_file_async(format!(
                "{} ({}): {:04}/{:04} pages are downloading...",
                name, code, page, pages
            ));
        }

        Ok(rows)
    }
}

#[async_trait]
impl<P: DailyPricePage> DailyPriceSource for DailyPriceFetcher<P> {
    async fn fetch(&self, code: &str, name: &str, page_cap: u32) -> Option<Vec<DailyPrice>> {
        let rows = match self.collect(code, name, page_cap).await {
            Ok(rows) => rows,
            Err(why) => {
                logging::warn_file_async(format!(
                    "No daily price for {} ({}) because {:?}",
                    name, code, why
                ));
                return None;
            }
        };

        match normalize::normalize(code, &rows) {
            Ok(bars) => Some(bars),
            Err(why) => {
                logging::error_file_async(format!(
                    "Failed to normalize the daily price of {} ({}) because {:?}",
                    name, code, why
                ));
                None
            }
        }
    }
}

/// 解析一頁日股價
fn parse_page(html: &str) -> Result<Page, SyncError> {
    let document = Html::parse_document(html);
    let table = element::parse_table(&document, "table.type2", diff_aware_cell)?;

    Ok(Page {
        last_page: parse_last_page(&document),
        rows: normalize::rows_from_table(&table),
    })
}

/// 從 `td.pgRR` (맨뒤) 的連結取出最後一頁的頁碼
fn parse_last_page(document: &Html) -> Option<u32> {
    let href = element::parse_attr(document, "td.pgRR a", "href")?;

    REG_PAGE
        .captures_iter(&href)
        .last()
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<u32>().ok())
}

/// 儲存格文字；舊版頁面以圖示表示漲跌，下跌時補上 `하락` 讓後續能判斷正負
fn diff_aware_cell(cell: &ElementRef) -> String {
    let text = element::cell_text(cell);
    let Ok(img) = Selector::parse("img") else {
        return text;
    };

    let down = cell.select(&img).any(|i| {
        let alt = i.value().attr("alt").unwrap_or_default();
        let src = i.value().attr("src").unwrap_or_default();
        alt.contains("하락") || alt.contains("하한") || src.contains("down")
    });

    if down && !text.contains("하락") && !text.contains("하한") {
        return format!("하락 {}", text);
    }

    text
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::{Arc, Mutex};

    use chrono::NaiveDate;

    use crate::crawler::naver::Naver;

    use super::*;

    type Bar<'a> = (&'a str, &'a str, &'a str, &'a str, &'a str, &'a str, &'a str);

    /// 產生與 sise_day.naver 相同結構的頁面
    pub(crate) fn page_html(last_page: Option<u32>, bars: &[Bar]) -> String {
        let mut rows = String::new();
        for (date, close, diff, open, high, low, volume) in bars {
            rows.push_str(&format!(
                r#"<tr onmouseover="mouseOver(this)">
<td align="center"><span class="tah p10 gray03">{date}</span></td>
<td class="num"><span class="tah p11">{close}</span></td>
<td class="num"><em class="bu_p bu_pdn"><span class="blind"></span></em><span class="tah p11 nv01">{diff}</span></td>
<td class="num"><span class="tah p11">{open}</span></td>
<td class="num"><span class="tah p11">{high}</span></td>
<td class="num"><span class="tah p11">{low}</span></td>
<td class="num"><span class="tah p11">{volume}</span></td>
</tr>
<tr><td colspan="7" height="8"></td></tr>"#
            ));
        }

        let navi = match last_page {
            Some(last) => format!(
                r#"<table class="Nnavi"><tr>
<td class="on"><a href="/item/sise_day.naver?code=005930&amp;page=1">1</a></td>
<td class="pgR"><a href="/item/sise_day.naver?code=005930&amp;page=11">다음</a></td>
<td class="pgRR"><a href="/item/sise_day.naver?code=005930&amp;page={last}">맨뒤</a></td>
</tr></table>"#
            ),
            None => String::new(),
        };

        format!(
            r#"<html><body>
<table cellspacing="0" class="type2">
<tr><th>날짜</th><th>종가</th><th>전일비</th><th>시가</th><th>고가</th><th>저가</th><th>거래량</th></tr>
<tr><td colspan="7" height="8"></td></tr>
{rows}
</table>
{navi}
</body></html>"#
        )
    }

    /// 記錄請求頁碼的假頁面來源
    #[derive(Clone, Default)]
    pub(crate) struct FakePages {
        pub(crate) last_page: Option<u32>,
        /// 從這一頁開始回傳錯誤
        pub(crate) fail_from: Option<u32>,
        pub(crate) requested: Arc<Mutex<Vec<u32>>>,
    }

    impl FakePages {
        pub(crate) fn new(last_page: Option<u32>) -> Self {
            FakePages {
                last_page,
                ..Default::default()
            }
        }

        pub(crate) fn requested(&self) -> Vec<u32> {
            self.requested.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl DailyPricePage for FakePages {
        async fn page(&self, _code: &str, page: u32) -> Result<String, SyncError> {
            self.requested.lock().unwrap().push(page);
            if self.fail_from.is_some_and(|f| page >= f) {
                return Err(SyncError::SourceUnavailable(format!("page {}", page)));
            }

            let date = format!("2024.01.{:02}", page);
            let close = format!("{}", 1_000 + page);
            Ok(page_html(
                self.last_page,
                &[(&date, &close, "10", "990", "1,100", "980", "12,345")],
            ))
        }
    }

    #[test]
    fn test_parse_page() {
        let html = page_html(
            Some(680),
            &[
                ("2024.05.03", "77,600", "하락 1,100", "79,000", "79,800", "77,500", "13,151,889"),
                ("2024.05.02", "78,700", "1,200", "77,600", "78,800", "77,500", "18,900,640"),
            ],
        );
        let page = parse_page(&html).unwrap();

        assert_eq!(page.last_page, Some(680));
        // 表頭後的分隔列與每列後的分隔列
        assert_eq!(page.rows.len(), 5);

        let bars = normalize::normalize("005930", &page.rows).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].date, NaiveDate::from_ymd_opt(2024, 5, 3).unwrap());
        assert_eq!(bars[0].diff, -1_100);
        assert_eq!(bars[1].diff, 1_200);
        assert_eq!(bars[1].volume, 18_900_640);
    }

    #[test]
    fn test_parse_last_page_from_href() {
        let document = Html::parse_document(
            r#"<table><tr><td class="pgRR"><a href="/item/sise_day.naver?code=000660&amp;page=412">맨뒤</a></td></tr></table>"#,
        );
        assert_eq!(parse_last_page(&document), Some(412));

        let document = Html::parse_document(
            r#"<table><tr><td class="pgRR"><a href="/item/sise_day.naver?code=000660">맨뒤</a></td></tr></table>"#,
        );
        assert_eq!(parse_last_page(&document), None);
    }

    #[test]
    fn test_parse_page_without_pagination() {
        let html = page_html(None, &[("2024.05.03", "1", "0", "1", "1", "1", "1")]);
        assert_eq!(parse_page(&html).unwrap().last_page, None);
    }

    #[test]
    fn test_diff_with_down_icon() {
        let html = r#"<table class="type2">
<tr><th>전일비</th></tr>
<tr><td class="num"><img src="https://ssl.pstatic.net/imgstock/images/images4/ico_down.gif" alt="하락"><span class="tah p11 nv01">1,100</span></td></tr>
<tr><td class="num"><img src="https://ssl.pstatic.net/imgstock/images/images4/ico_up.gif" alt="상승"><span class="tah p11 red02">300</span></td></tr>
</table>"#;
        let document = Html::parse_document(html);
        let table = element::parse_table(&document, "table.type2", diff_aware_cell).unwrap();

        assert_eq!(table.rows[0], vec!["하락 1,100"]);
        assert_eq!(normalize::parse_diff(&table.rows[0][0]).unwrap(), -1_100);
        assert_eq!(normalize::parse_diff(&table.rows[1][0]).unwrap(), 300);
    }

    #[tokio::test]
    async fn test_pagination_bound() {
        for (advertised, cap, expected) in [(680, 1, 1), (680, 3, 3), (2, 5, 2), (1, 1, 1), (5, 0, 1)] {
            let pages = FakePages::new(Some(advertised));
            let fetcher = DailyPriceFetcher::new(pages.clone());
            let bars = fetcher.fetch("005930", "삼성전자", cap).await.unwrap();

            let requested = pages.requested();
            assert_eq!(requested, (1..=expected).collect::<Vec<_>>());
            assert_eq!(bars.len(), expected as usize);
        }
    }

    #[tokio::test]
    async fn test_no_pagination_is_no_data() {
        let pages = FakePages::new(None);
        let fetcher = DailyPriceFetcher::new(pages.clone());

        assert!(fetcher.fetch("005930", "삼성전자", 10).await.is_none());
        assert_eq!(pages.requested(), vec![1]);
    }

    #[tokio::test]
    async fn test_first_page_failure_is_no_data() {
        let mut pages = FakePages::new(Some(10));
        pages.fail_from = Some(1);
        let fetcher = DailyPriceFetcher::new(pages.clone());

        assert!(fetcher.fetch("005930", "삼성전자", 10).await.is_none());
    }

    #[tokio::test]
    async fn test_later_page_failure_keeps_accumulated_rows() {
        let mut pages = FakePages::new(Some(10));
        pages.fail_from = Some(3);
        let fetcher = DailyPriceFetcher::new(pages.clone());

        let bars = fetcher.fetch("005930", "삼성전자", 10).await.unwrap();
        assert_eq!(pages.requested(), vec![1, 2, 3]);
        assert_eq!(
            bars.iter().map(|b| b.close).collect::<Vec<_>>(),
            vec![1_001, 1_002]
        );
    }

    #[tokio::test]
    #[ignore]
    async fn test_fetch_from_naver() {
        dotenv::dotenv().ok();
        let _ = rustls::crypto::ring::default_provider().install_default();
        logging::debug_file_async("開始 DailyPriceFetcher::fetch".to_string());

        let fetcher = DailyPriceFetcher::new(Naver {});
        match fetcher.fetch("005930", "삼성전자", 2).await {
            Some(bars) => logging::debug_file_async(format!("bars:{:#?}", bars)),
            None => logging::debug_file_async("no data".to_string()),
        }

        logging::debug_file_async("結束 DailyPriceFetcher::fetch".to_string());
    }
}
