//! Date, date-range, and report-period extraction
//!
//! Resolves both absolute forms ("2025-07-04", "2025年7月4日", "20250704")
//! and relative forms ("昨天", "最近30天", "前3个交易日") against an
//! injected [`TradingCalendar`]. Range detection runs before single-date
//! detection so "最近30天" never degrades into a single date.

use crate::calendar::TradingCalendar;
use chrono::{Datelike, Duration, Months, NaiveDate};
use regex::Regex;
use std::sync::{Arc, LazyLock};

static ISO_DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{4})-(\d{1,2})-(\d{1,2})").expect("valid pattern"));
static SLASH_DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{4})/(\d{1,2})/(\d{1,2})").expect("valid pattern"));
static CJK_DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{4})年(\d{1,2})月(\d{1,2})日").expect("valid pattern"));
static COMPACT_DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{8}").expect("valid pattern"));

static FROM_TO_RE: LazyLock<Regex> = LazyLock::new(|| {
    let atom = r"\d{8}|\d{4}-\d{1,2}-\d{1,2}|\d{4}/\d{1,2}/\d{1,2}|\d{4}年\d{1,2}月\d{1,2}日";
    Regex::new(&format!(r"(?:从)?({atom})\s*(?:到|至|~|-)\s*({atom})")).expect("valid pattern")
});
static RECENT_DAYS_RE: LazyLock<Regex> = LazyLock::new(|| {
    // "前N个交易日" stays a single date, so it is excluded here
    Regex::new(r"(?:最近|过去|近|前)(\d+)天|(?:最近|过去|近)(\d+)个?交易日").expect("valid pattern")
});
static RECENT_MONTHS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:最近|过去|近)(\d+)个月").expect("valid pattern"));
static MONTH_RANGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{4})年(\d{1,2})月(?:到|至)(?:(\d{4})年)?(\d{1,2})月").expect("valid pattern")
});
static SINGLE_MONTH_RE: LazyLock<Regex> = LazyLock::new(|| {
    // The trailing class keeps "2025年7月4日" from matching as a month
    Regex::new(r"(\d{4})年(\d{1,2})月(?:[^\d日到至]|$)").expect("valid pattern")
});
static YEAR_RANGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{4})年?(?:到|至)(\d{4})年?").expect("valid pattern"));
static FULL_YEAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{4})年的").expect("valid pattern"));

static TRADING_DAYS_AGO_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[前上](\d+)个?交易日").expect("valid pattern"));
static DAYS_AGO_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)天前").expect("valid pattern"));
static MONTHS_AGO_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)个月前").expect("valid pattern"));
static YEARS_AGO_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)年前").expect("valid pattern"));

static ANNUAL_PERIOD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{4})年?(?:年报|年度报告|全年)").expect("valid pattern")
});
static INTERIM_PERIOD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{4})年?(?:中报|半年报|中期报告|上半年)").expect("valid pattern")
});
static Q1_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{4})年?(?:第?[一1]季[度报]?|Q1|q1)").expect("valid pattern")
});
static Q2_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{4})年?(?:第?[二2]季[度报]?|Q2|q2)").expect("valid pattern")
});
static Q3_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{4})年?(?:第?[三3]季[度报]?|Q3|q3)").expect("valid pattern")
});
static Q4_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{4})年?(?:第?[四4]季[度报]?|Q4|q4)").expect("valid pattern")
});
static BARE_PERIOD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{8}").expect("valid pattern"));

/// Words that mark an 8-digit number as a report period rather than a
/// plain date
const PERIOD_CONTEXT: &[&str] = &["报告期", "财报", "季报", "年报", "中报", "报告"];

/// Fixed-length duration words and their day counts
const DURATION_WORDS: &[(&str, i64)] = &[
    ("一周", 7),
    ("1周", 7),
    ("一个月", 30),
    ("1个月", 30),
    ("三个月", 90),
    ("3个月", 90),
    ("半年", 180),
    ("一年", 365),
    ("1年", 365),
    ("两年", 730),
    ("2年", 730),
];

fn date_from_parts(y: &str, m: &str, d: &str) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(y.parse().ok()?, m.parse().ok()?, d.parse().ok()?)
}

/// Parse one absolute date in any accepted surface form
pub fn parse_flexible_date(text: &str) -> Option<NaiveDate> {
    for re in [&*ISO_DATE_RE, &*SLASH_DATE_RE, &*CJK_DATE_RE] {
        if let Some(caps) = re.captures(text) {
            if let Some(date) = date_from_parts(&caps[1], &caps[2], &caps[3]) {
                return Some(date);
            }
        }
    }
    if COMPACT_DATE_RE.is_match(text) {
        if let Ok(date) = NaiveDate::parse_from_str(text, "%Y%m%d") {
            return Some(date);
        }
    }
    None
}

/// All valid absolute dates in a query, with byte positions
fn absolute_dates(query: &str) -> Vec<(usize, NaiveDate)> {
    let mut dates: Vec<(usize, NaiveDate)> = Vec::new();
    for re in [&*ISO_DATE_RE, &*SLASH_DATE_RE, &*CJK_DATE_RE] {
        for caps in re.captures_iter(query) {
            let pos = caps.get(0).map_or(0, |m| m.start());
            if let Some(date) = date_from_parts(&caps[1], &caps[2], &caps[3]) {
                dates.push((pos, date));
            }
        }
    }
    for m in COMPACT_DATE_RE.find_iter(query) {
        // Compact dates must not be part of a longer digit run
        let prev_digit = query[..m.start()]
            .chars()
            .next_back()
            .is_some_and(|c| c.is_ascii_digit());
        let next_digit = query[m.end()..]
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_digit());
        if prev_digit || next_digit {
            continue;
        }
        if let Ok(date) = NaiveDate::parse_from_str(m.as_str(), "%Y%m%d") {
            dates.push((m.start(), date));
        }
    }
    dates.sort_by_key(|(pos, _)| *pos);
    dates.dedup();
    dates
}

/// Resolves query time expressions against a trading calendar
#[derive(Clone)]
pub struct DateResolver {
    calendar: Arc<dyn TradingCalendar>,
}

impl DateResolver {
    pub fn new(calendar: Arc<dyn TradingCalendar>) -> Self {
        Self { calendar }
    }

    /// Extract an explicit or relative date range
    pub fn extract_date_range(&self, query: &str) -> Option<(NaiveDate, NaiveDate)> {
        // 1. Explicit from/to
        if let Some(caps) = FROM_TO_RE.captures(query) {
            if let (Some(start), Some(end)) =
                (parse_flexible_date(&caps[1]), parse_flexible_date(&caps[2]))
            {
                return Some((start, end));
            }
        }

        // 2. Recent N (trading) days
        if let Some(caps) = RECENT_DAYS_RE.captures(query) {
            let count = caps.get(1).or_else(|| caps.get(2));
            if let Some(n) = count.and_then(|m| m.as_str().parse::<u32>().ok()) {
                if n > 0 {
                    return Some(self.calendar.trading_days_range(n));
                }
            }
        }

        // 3. Fixed duration words ("前N个交易日" is already excluded
        // above, so 前 here only pairs with calendar durations)
        for prefix in ["最近", "过去", "近", "前"] {
            for (word, days) in DURATION_WORDS {
                if query.contains(&format!("{prefix}{word}")) {
                    let end = self.calendar.latest_trading_day();
                    return Some((end - Duration::days(*days), end));
                }
            }
        }
        if let Some(caps) = RECENT_MONTHS_RE.captures(query) {
            if let Ok(n) = caps[1].parse::<i64>() {
                if n > 0 {
                    let end = self.calendar.latest_trading_day();
                    return Some((end - Duration::days(n * 30), end));
                }
            }
        }

        // 4. Calendar-relative ranges (上个月, 去年, 本季度, ...)
        if let Some(range) = self.calendar_relative_range(query) {
            return Some(range);
        }

        // 5. Month-to-month
        if let Some(caps) = MONTH_RANGE_RE.captures(query) {
            let start_year: i32 = caps[1].parse().ok()?;
            let end_year: i32 = caps
                .get(3)
                .map_or(Some(start_year), |m| m.as_str().parse().ok())?;
            let start = date_from_parts(&caps[1], &caps[2], "1")?;
            let end_month: u32 = caps[4].parse().ok()?;
            let end = last_day_of_month(end_year, end_month)?;
            return Some((start, end));
        }

        // 6. Whole month
        if let Some(caps) = SINGLE_MONTH_RE.captures(query) {
            let year: i32 = caps[1].parse().ok()?;
            let month: u32 = caps[2].parse().ok()?;
            if let (Some(start), Some(end)) = (
                NaiveDate::from_ymd_opt(year, month, 1),
                last_day_of_month(year, month),
            ) {
                return Some((start, end));
            }
        }

        // 7. Year-to-year
        if let Some(caps) = YEAR_RANGE_RE.captures(query) {
            let start = date_from_parts(&caps[1], "1", "1")?;
            let end = date_from_parts(&caps[2], "12", "31")?;
            return Some((start, end));
        }

        // 8. Whole year
        if let Some(caps) = FULL_YEAR_RE.captures(query) {
            let start = date_from_parts(&caps[1], "1", "1")?;
            let end = date_from_parts(&caps[1], "12", "31")?;
            return Some((start, end));
        }

        // 9. Two or more absolute dates anywhere
        let dates = absolute_dates(query);
        if dates.len() >= 2 {
            return Some((dates[0].1, dates[1].1));
        }

        None
    }

    /// Ranges anchored on the calendar position of "today": last/current
    /// month, quarter, and year
    fn calendar_relative_range(&self, query: &str) -> Option<(NaiveDate, NaiveDate)> {
        let today = self.calendar.latest_trading_day();

        if query.contains("上个月") || query.contains("上月") {
            let first_of_this = NaiveDate::from_ymd_opt(today.year(), today.month(), 1)?;
            let end = first_of_this - Duration::days(1);
            let start = NaiveDate::from_ymd_opt(end.year(), end.month(), 1)?;
            return Some((start, end));
        }
        if query.contains("本月") || query.contains("这个月") {
            let start = NaiveDate::from_ymd_opt(today.year(), today.month(), 1)?;
            return Some((start, today));
        }
        if ["上个季度", "上一个季度", "上季度"]
            .iter()
            .any(|kw| query.contains(kw))
        {
            let this_q_start =
                NaiveDate::from_ymd_opt(today.year(), quarter_start_month(today), 1)?;
            let end = this_q_start - Duration::days(1);
            let start = NaiveDate::from_ymd_opt(end.year(), quarter_start_month(end), 1)?;
            return Some((start, end));
        }
        if query.contains("本季度") || query.contains("这个季度") {
            let start =
                NaiveDate::from_ymd_opt(today.year(), quarter_start_month(today), 1)?;
            return Some((start, today));
        }
        if query.contains("去年") {
            let start = NaiveDate::from_ymd_opt(today.year() - 1, 1, 1)?;
            let end = NaiveDate::from_ymd_opt(today.year() - 1, 12, 31)?;
            return Some((start, end));
        }
        if query.contains("今年") {
            let start = NaiveDate::from_ymd_opt(today.year(), 1, 1)?;
            return Some((start, today));
        }
        None
    }

    /// Extract a single date; returns None when the query names a range
    pub fn extract_date(&self, query: &str) -> Option<NaiveDate> {
        if self.extract_date_range(query).is_some() {
            return None;
        }

        // Explicit dates win over relative words; the last one in the
        // query is taken
        if let Some((_, date)) = absolute_dates(query).into_iter().next_back() {
            tracing::debug!(%date, "absolute date");
            return Some(date);
        }

        self.relative_date(query)
    }

    fn relative_date(&self, query: &str) -> Option<NaiveDate> {
        let latest = || self.calendar.latest_trading_day();

        if query.contains("大前天") {
            return Some(self.calendar.n_trading_days_before(latest(), 3));
        }
        if query.contains("前天") {
            return Some(self.calendar.n_trading_days_before(latest(), 2));
        }
        if query.contains("昨天") {
            return Some(self.calendar.n_trading_days_before(latest(), 1));
        }
        if query.contains("上个交易日") || query.contains("上一个交易日") {
            return Some(latest());
        }
        if let Some(caps) = TRADING_DAYS_AGO_RE.captures(query) {
            if let Ok(n) = caps[1].parse::<u32>() {
                return Some(self.calendar.n_trading_days_before(latest(), n));
            }
        }
        if let Some(caps) = DAYS_AGO_RE.captures(query) {
            if let Ok(n) = caps[1].parse::<i64>() {
                return Some(
                    self.calendar
                        .trading_day_on_or_before(latest() - Duration::days(n)),
                );
            }
        }
        if let Some(caps) = MONTHS_AGO_RE.captures(query) {
            if let Ok(n) = caps[1].parse::<u32>() {
                let anchor = latest().checked_sub_months(Months::new(n))?;
                return Some(self.calendar.trading_day_on_or_before(anchor));
            }
        }
        if let Some(caps) = YEARS_AGO_RE.captures(query) {
            if let Ok(n) = caps[1].parse::<u32>() {
                let anchor = latest().checked_sub_months(Months::new(n * 12))?;
                return Some(self.calendar.trading_day_on_or_before(anchor));
            }
        }
        if ["最新", "今天", "现在", "当前", "最后"]
            .iter()
            .any(|kw| query.contains(kw))
        {
            return Some(latest());
        }
        None
    }
}

/// Extract a financial report period as a YYYYMMDD quarter-end string
pub fn extract_period(query: &str) -> Option<String> {
    let quarters: [(&LazyLock<Regex>, &str); 4] = [
        (&Q1_RE, "0331"),
        (&Q2_RE, "0630"),
        (&Q3_RE, "0930"),
        (&Q4_RE, "1231"),
    ];
    for (re, suffix) in quarters {
        if let Some(caps) = re.captures(query) {
            return Some(format!("{}{suffix}", &caps[1]));
        }
    }
    if let Some(caps) = INTERIM_PERIOD_RE.captures(query) {
        return Some(format!("{}0630", &caps[1]));
    }
    if let Some(caps) = ANNUAL_PERIOD_RE.captures(query) {
        return Some(format!("{}1231", &caps[1]));
    }
    if PERIOD_CONTEXT.iter().any(|kw| query.contains(kw)) {
        if let Some(m) = BARE_PERIOD_RE.find(query) {
            return Some(m.as_str().to_string());
        }
    }
    None
}

fn quarter_start_month(date: NaiveDate) -> u32 {
    (date.month0() / 3) * 3 + 1
}

fn last_day_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    Some(next - Duration::days(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::WeekdayCalendar;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn resolver() -> DateResolver {
        // Monday
        DateResolver::new(Arc::new(WeekdayCalendar::new(date(2025, 8, 25))))
    }

    #[test]
    fn test_absolute_date_forms() {
        let r = resolver();
        for query in [
            "贵州茅台2025-07-04的股价",
            "贵州茅台2025/07/04的股价",
            "贵州茅台2025年7月4日的股价",
            "贵州茅台20250704的股价",
        ] {
            assert_eq!(r.extract_date(query), Some(date(2025, 7, 4)), "query: {query}");
        }
    }

    #[test]
    fn test_last_absolute_date_wins() {
        let r = resolver();
        // Two dates form a range instead
        assert_eq!(r.extract_date("2025-07-01到2025-07-04"), None);
        assert_eq!(
            r.extract_date("截至2025年7月4日的市值"),
            Some(date(2025, 7, 4))
        );
    }

    #[test]
    fn test_invalid_dates_rejected() {
        let r = resolver();
        assert_eq!(r.extract_date("2024年13月的数据"), None);
        assert_eq!(r.extract_date_range("2024年13月的数据"), None);
        assert_eq!(parse_flexible_date("20251301"), None);
    }

    #[test]
    fn test_relative_days() {
        let r = resolver();
        assert_eq!(r.extract_date("昨天的股价"), Some(date(2025, 8, 22)));
        assert_eq!(r.extract_date("前天的股价"), Some(date(2025, 8, 21)));
        assert_eq!(r.extract_date("大前天的股价"), Some(date(2025, 8, 20)));
        assert_eq!(r.extract_date("最新股价"), Some(date(2025, 8, 25)));
        assert_eq!(r.extract_date("上3个交易日"), Some(date(2025, 8, 20)));
    }

    #[test]
    fn test_days_ago_lands_on_trading_day() {
        let r = resolver();
        // 2 days before Monday is Saturday, rolls back to Friday
        assert_eq!(r.extract_date("2天前的收盘价"), Some(date(2025, 8, 22)));
    }

    #[test]
    fn test_recent_trading_days_range() {
        let r = resolver();
        let (start, end) = r.extract_date_range("最近5天的K线").expect("range");
        assert_eq!(end, date(2025, 8, 25));
        assert_eq!(start, date(2025, 8, 19));
        assert!(r.extract_date("最近5天的K线").is_none());
    }

    #[test]
    fn test_explicit_range() {
        let r = resolver();
        assert_eq!(
            r.extract_date_range("从2025-01-01到2025-03-31的数据"),
            Some((date(2025, 1, 1), date(2025, 3, 31)))
        );
        assert_eq!(
            r.extract_date_range("2025年1月1日至2025年3月31日"),
            Some((date(2025, 1, 1), date(2025, 3, 31)))
        );
    }

    #[test]
    fn test_month_and_year_ranges() {
        let r = resolver();
        assert_eq!(
            r.extract_date_range("2024年1月到3月的行情"),
            Some((date(2024, 1, 1), date(2024, 3, 31)))
        );
        assert_eq!(
            r.extract_date_range("2024年2月的成交量"),
            Some((date(2024, 2, 1), date(2024, 2, 29)))
        );
        assert_eq!(
            r.extract_date_range("2023到2024年的走势"),
            Some((date(2023, 1, 1), date(2024, 12, 31)))
        );
        assert_eq!(
            r.extract_date_range("2024年的K线"),
            Some((date(2024, 1, 1), date(2024, 12, 31)))
        );
    }

    #[test]
    fn test_calendar_relative_ranges() {
        let r = resolver();
        assert_eq!(
            r.extract_date_range("平安银行上个月的K线"),
            Some((date(2025, 7, 1), date(2025, 7, 31)))
        );
        assert_eq!(
            r.extract_date_range("本月的成交量"),
            Some((date(2025, 8, 1), date(2025, 8, 25)))
        );
        assert_eq!(
            r.extract_date_range("上个季度的现金流"),
            Some((date(2025, 4, 1), date(2025, 6, 30)))
        );
        assert_eq!(
            r.extract_date_range("本季度的涨幅"),
            Some((date(2025, 7, 1), date(2025, 8, 25)))
        );
        assert_eq!(
            r.extract_date_range("去年的走势"),
            Some((date(2024, 1, 1), date(2024, 12, 31)))
        );
        assert_eq!(
            r.extract_date_range("今年的行情"),
            Some((date(2025, 1, 1), date(2025, 8, 25)))
        );
        assert!(r.extract_date("上个月的K线").is_none());
    }

    #[test]
    fn test_duration_words() {
        let r = resolver();
        let (start, end) = r.extract_date_range("最近一个月的走势").expect("range");
        assert_eq!(end, date(2025, 8, 25));
        assert_eq!(start, date(2025, 7, 26));

        let (start, end) = r.extract_date_range("过去半年的K线").expect("range");
        assert_eq!(end, date(2025, 8, 25));
        assert_eq!(start, end - Duration::days(180));

        // 前 pairs with calendar durations, not with 前N个交易日
        let (start, end) = r.extract_date_range("贵州茅台前一个月的K线").expect("range");
        assert_eq!(end, date(2025, 8, 25));
        assert_eq!(start, date(2025, 7, 26));
        assert!(r.extract_date_range("前3个交易日的数据").is_none());
    }

    #[test]
    fn test_period_extraction() {
        assert_eq!(extract_period("2024年报"), Some("20241231".to_string()));
        assert_eq!(extract_period("2024年年度报告"), Some("20241231".to_string()));
        assert_eq!(extract_period("2024年第一季度"), Some("20240331".to_string()));
        assert_eq!(extract_period("2024Q3"), Some("20240930".to_string()));
        assert_eq!(extract_period("2024年中报"), Some("20240630".to_string()));
        assert_eq!(extract_period("2024年半年报"), Some("20240630".to_string()));
        assert_eq!(extract_period("报告期20240331"), Some("20240331".to_string()));
        assert_eq!(extract_period("贵州茅台的利润"), None);
        // A bare 8-digit date without report vocabulary is not a period
        assert_eq!(extract_period("20250704的行情"), None);
    }
}
