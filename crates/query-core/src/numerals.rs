//! Chinese numeral conversion
//!
//! Converts Chinese quantity expressions to Arabic numbers, mainly for
//! result-limit phrases in queries: "前十" -> 10, "TOP二十" -> 20,
//! "前一百名" -> 100. Formal accounting variants (壹贰叁...) are accepted.

use regex::Regex;
use std::sync::LazyLock;

/// Character class matching one Chinese or Arabic numeral
const NUMERAL_RUN: &str = "[零一二三四五六七八九十百千万壹贰叁肆伍陆柒捌玖拾佰仟萬两俩〇0-9]+";

static PREFIX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!("前({NUMERAL_RUN})")).expect("valid pattern")
});
static TOP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"[Tt][Oo][Pp]\s*({NUMERAL_RUN})")).expect("valid pattern")
});
static ORDINAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!("第({NUMERAL_RUN})")).expect("valid pattern")
});
static COUNT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!("({NUMERAL_RUN})([名个只])")).expect("valid pattern")
});
static ARABIC_LIMIT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:前|[Tt][Oo][Pp])\s*(\d+)").expect("valid pattern"));

/// Value of a single numeral character, or None for anything else
fn numeral_value(c: char) -> Option<i64> {
    match c {
        '零' | '〇' | '0' => Some(0),
        '一' | '壹' | '1' => Some(1),
        '二' | '贰' | '两' | '俩' | '2' => Some(2),
        '三' | '叁' | '3' => Some(3),
        '四' | '肆' | '4' => Some(4),
        '五' | '伍' | '5' => Some(5),
        '六' | '陆' | '6' => Some(6),
        '七' | '柒' | '7' => Some(7),
        '八' | '捌' | '8' => Some(8),
        '九' | '玖' | '9' => Some(9),
        '十' | '拾' => Some(10),
        '百' | '佰' => Some(100),
        '千' | '仟' => Some(1000),
        '万' | '萬' => Some(10_000),
        _ => None,
    }
}

/// Convert a Chinese numeral string to its Arabic value
///
/// Pure digit strings pass through unchanged. Unknown characters inside
/// the string are skipped. Elliptical tens work: "十五" -> 15.
///
/// # Examples
///
/// ```
/// use query_core::numerals::chinese_to_arabic;
///
/// assert_eq!(chinese_to_arabic("二十三"), 23);
/// assert_eq!(chinese_to_arabic("一百零五"), 105);
/// assert_eq!(chinese_to_arabic("三千五百"), 3500);
/// ```
pub fn chinese_to_arabic(text: &str) -> i64 {
    if !text.is_empty() && text.chars().all(|c| c.is_ascii_digit()) {
        return text.parse().unwrap_or(0);
    }

    let mut result: i64 = 0;
    let mut temp: i64 = 0;
    for c in text.chars() {
        let Some(num) = numeral_value(c) else {
            continue;
        };
        if num >= 10 {
            // Unit character: "十" alone means one ten
            if temp == 0 {
                temp = 1;
            }
            result += temp * num;
            temp = 0;
        } else {
            temp = temp * 10 + num;
        }
    }
    result + temp
}

/// Extract a number from text containing a quantity expression
///
/// Tries the common patterns (前N, TOPN, 第N, N名, N个, N只) first,
/// then falls back to scanning for any run of numeral characters.
pub fn extract_number_from_chinese(text: &str) -> Option<i64> {
    for re in [&*PREFIX_RE, &*TOP_RE, &*ORDINAL_RE, &*COUNT_RE] {
        if let Some(caps) = re.captures(text) {
            let value = chinese_to_arabic(&caps[1]);
            tracing::debug!(text, value, "matched quantity pattern");
            return Some(value);
        }
    }

    // No pattern matched; look for a bare numeral run
    let mut run = String::new();
    for c in text.chars() {
        if numeral_value(c).is_some() {
            run.push(c);
        } else if !run.is_empty() {
            let value = chinese_to_arabic(&run);
            if value > 0 {
                return Some(value);
            }
            run.clear();
        }
    }
    if !run.is_empty() {
        let value = chinese_to_arabic(&run);
        if value > 0 {
            return Some(value);
        }
    }
    None
}

/// Extract a result-count limit from a query
///
/// Arabic digits after 前/TOP win over Chinese numerals. When the query
/// has ranking vocabulary but no explicit count, `default` applies
/// (falling back to 10).
pub fn extract_limit_from_query(query: &str, default: Option<i64>) -> Option<i64> {
    if let Some(caps) = ARABIC_LIMIT_RE.captures(query) {
        return caps[1].parse().ok();
    }

    if let Some(n) = extract_number_from_chinese(query) {
        if n > 0 {
            return Some(n);
        }
    }

    if ["排名", "排行", "前几", "TOP", "top"]
        .iter()
        .any(|kw| query.contains(kw))
    {
        return Some(default.unwrap_or(10));
    }

    default
}

/// Rewrite Chinese quantity expressions as Arabic digits in place
///
/// # Examples
///
/// ```
/// use query_core::numerals::normalize_quantity_expression;
///
/// assert_eq!(normalize_quantity_expression("涨幅前十"), "涨幅前10");
/// assert_eq!(normalize_quantity_expression("TOP二十股票"), "TOP20股票");
/// ```
pub fn normalize_quantity_expression(query: &str) -> String {
    let mut normalized = PREFIX_RE
        .replace_all(query, |caps: &regex::Captures<'_>| {
            format!("前{}", chinese_to_arabic(&caps[1]))
        })
        .into_owned();
    normalized = TOP_RE
        .replace_all(&normalized, |caps: &regex::Captures<'_>| {
            format!("TOP{}", chinese_to_arabic(&caps[1]))
        })
        .into_owned();
    normalized = ORDINAL_RE
        .replace_all(&normalized, |caps: &regex::Captures<'_>| {
            format!("第{}", chinese_to_arabic(&caps[1]))
        })
        .into_owned();
    COUNT_RE
        .replace_all(&normalized, |caps: &regex::Captures<'_>| {
            format!("{}{}", chinese_to_arabic(&caps[1]), &caps[2])
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_numerals() {
        assert_eq!(chinese_to_arabic("二"), 2);
        assert_eq!(chinese_to_arabic("十"), 10);
        assert_eq!(chinese_to_arabic("十五"), 15);
        assert_eq!(chinese_to_arabic("二十"), 20);
        assert_eq!(chinese_to_arabic("二十三"), 23);
        assert_eq!(chinese_to_arabic("一百"), 100);
        assert_eq!(chinese_to_arabic("一百零五"), 105);
        assert_eq!(chinese_to_arabic("三千五百"), 3500);
        assert_eq!(chinese_to_arabic("一万"), 10_000);
    }

    #[test]
    fn test_formal_variants() {
        assert_eq!(chinese_to_arabic("壹佰"), 100);
        assert_eq!(chinese_to_arabic("贰拾"), 20);
        assert_eq!(chinese_to_arabic("两"), 2);
        assert_eq!(chinese_to_arabic("俩"), 2);
    }

    #[test]
    fn test_digit_passthrough() {
        assert_eq!(chinese_to_arabic("42"), 42);
        assert_eq!(chinese_to_arabic("100"), 100);
    }

    #[test]
    fn test_unknown_chars_skipped() {
        assert_eq!(chinese_to_arabic("约二十家"), 20);
    }

    #[test]
    fn test_pattern_extraction() {
        assert_eq!(extract_number_from_chinese("前十名"), Some(10));
        assert_eq!(extract_number_from_chinese("TOP二十"), Some(20));
        assert_eq!(extract_number_from_chinese("第三个"), Some(3));
        assert_eq!(extract_number_from_chinese("三十只股票"), Some(30));
        assert_eq!(extract_number_from_chinese("没有数字"), None);
    }

    #[test]
    fn test_limit_extraction() {
        assert_eq!(extract_limit_from_query("涨幅前十", None), Some(10));
        assert_eq!(extract_limit_from_query("市值排名前20", None), Some(20));
        assert_eq!(extract_limit_from_query("TOP二十的股票", None), Some(20));
        assert_eq!(extract_limit_from_query("前100名", None), Some(100));
        assert_eq!(extract_limit_from_query("top 5 股票", None), Some(5));
    }

    #[test]
    fn test_limit_default_for_ranking_vocabulary() {
        assert_eq!(extract_limit_from_query("涨幅排行", None), Some(10));
        assert_eq!(extract_limit_from_query("涨幅排行", Some(20)), Some(20));
        assert_eq!(extract_limit_from_query("贵州茅台的股价", None), None);
    }

    #[test]
    fn test_normalization() {
        assert_eq!(normalize_quantity_expression("涨幅前十的股票"), "涨幅前10的股票");
        assert_eq!(normalize_quantity_expression("市值排名前二十"), "市值排名前20");
        assert_eq!(normalize_quantity_expression("TOP三十只股票"), "TOP30只股票");
        assert_eq!(normalize_quantity_expression("第五个交易日"), "第5个交易日");
    }
}
