use std::{collections::HashSet, str::FromStr};

use anyhow::{anyhow, Result};
use encoding_rs::EUC_KR;

const NUMBER_ESCAPE_CHAR: &[char] = &['원', '%', ',', ' ', '"', '\n', '\r', '\t', '\u{a0}'];

/// Converts an EUC-KR encoded byte slice to a UTF-8 `String`.
///
/// Both the KRX listing download and the Naver daily price pages are served as EUC-KR
/// (`charset=euc-kr`). Malformed sequences are replaced instead of failing the whole page.
pub fn euc_kr_2_utf8(data: &[u8]) -> String {
    let (text, _, had_errors) = EUC_KR.decode(data);
    if had_errors {
        crate::logging::warn_file_async(
            "EUC-KR decoding replaced malformed sequences".to_string(),
        );
    }

    text.into_owned()
}

/// Parses an `i64` value from a given string.
///
/// Thousands separators and the characters in `NUMBER_ESCAPE_CHAR` are removed before
/// parsing, as are any extra `escape_chars`.
///
/// # Example
///
/// ```
/// let s = "1,234";
/// let i64_value = parse_i64(s, None).unwrap();
/// ```
pub fn parse_i64(s: &str, escape_chars: Option<Vec<char>>) -> Result<i64> {
    let cleaned = clean_escape_chars(s, escape_chars);
    i64::from_str(&cleaned)
        .map_err(|why| anyhow!("Failed to parse '{}' as i64 because: {:?}", cleaned, why))
}

/// Removes a set of escape characters from a given string.
pub(crate) fn clean_escape_chars(s: &str, escape_chars: Option<Vec<char>>) -> String {
    let mut combined: Vec<char> = NUMBER_ESCAPE_CHAR.to_vec();
    if let Some(ec) = escape_chars {
        combined.extend(ec);
    }

    let filters = combined.iter().collect::<HashSet<_>>();
    s.chars().filter(|c| !filters.contains(c)).collect()
}

/// 表格儲存格是否為空白（含 &nbsp;）
pub fn is_blank(s: &str) -> bool {
    s.trim_matches(char::is_whitespace).is_empty()
}
