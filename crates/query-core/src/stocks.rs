//! Stock identifier resolution
//!
//! Maps surface-form tokens (bare 6-digit codes, exchange-qualified codes,
//! full company names, ST/*ST-prefixed names) to canonical `NNNNNN.XX`
//! identifiers, and extracts multi-stock lists from free-form queries.
//!
//! Nicknames collide with common words, so resolution is conservative:
//! a known shorthand ("茅台", "建行") is rejected with the expected full
//! name instead of being guessed.

use crate::error::ResolveError;
use regex::Regex;
use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

/// Read-only stock reference table
pub trait StockDirectory: Send + Sync {
    /// Display name for a canonical ts_code, if listed
    fn name_of(&self, ts_code: &str) -> Option<String>;
    /// Canonical ts_code for a registered company name
    fn ts_code_of(&self, name: &str) -> Option<String>;
}

/// In-memory directory backed by two hash maps
#[derive(Debug, Default, Clone)]
pub struct StockTable {
    by_code: HashMap<String, String>,
    by_name: HashMap<String, String>,
}

impl StockTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from `(ts_code, name)` pairs
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, S)>,
        S: Into<String>,
    {
        let mut table = Self::new();
        for (code, name) in pairs {
            table.insert(code.into(), name.into());
        }
        table
    }

    pub fn insert(&mut self, ts_code: String, name: String) {
        self.by_name.insert(name.clone(), ts_code.clone());
        self.by_code.insert(ts_code, name);
    }

    pub fn len(&self) -> usize {
        self.by_code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_code.is_empty()
    }
}

impl StockDirectory for StockTable {
    fn name_of(&self, ts_code: &str) -> Option<String> {
        self.by_code.get(ts_code).cloned()
    }

    fn ts_code_of(&self, name: &str) -> Option<String> {
        self.by_name.get(name).cloned()
    }
}

/// Exchange suffix inferred from the leading digit of a bare 6-digit code
pub fn infer_exchange(code: &str) -> Option<&'static str> {
    match code.chars().next()? {
        '6' => Some("SH"),
        '0' | '3' => Some("SZ"),
        '4' | '8' | '9' => Some("BJ"),
        _ => None,
    }
}

/// A successfully resolved stock
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedStock {
    pub ts_code: String,
    pub name: String,
}

/// Outcome of multi-stock extraction over a whole query
#[derive(Debug, Clone, Default)]
pub struct StockExtraction {
    /// Resolved stocks in order of appearance, deduplicated
    pub stocks: Vec<ResolvedStock>,
    /// First resolution error worth surfacing to the user
    pub error: Option<ResolveError>,
}

/// Common shorthand names that must be rejected in favor of the full name
mod shorthand {
    pub const NAMES: &[(&str, &str)] = &[
        ("茅台", "贵州茅台"),
        ("万科", "万科A"),
        ("格力", "格力电器"),
        ("美的", "美的集团"),
        ("建行", "建设银行"),
        ("工行", "工商银行"),
        ("农行", "农业银行"),
        ("中行", "中国银行"),
        ("招行", "招商银行"),
        ("中石油", "中国石油"),
        ("中石化", "中国石化"),
    ];
}

/// Vocabulary used when deciding whether an unresolved query should error
mod keywords {
    /// Phrases that demand one specific stock ("X的股价")
    pub const SPECIFIC_STOCK: &[&str] = &[
        "的股价", "的K线", "的成交量", "的市值", "的涨跌", "的PE", "的PB", "的ROE",
        "的市盈率", "的市净率", "的走势", "的价格", "的数据", "的行情", "的分析",
    ];

    /// Leading verbs stripped from name candidates
    pub const LEADING_VERBS: &[&str] = &["查询", "分析", "比较", "对比", "看看", "所有", "请", "查", "看"];

    /// Trailing query words stripped from name candidates, longest first
    pub const TRAILING_STOPS: &[&str] = &[
        "上一个季度", "上个季度", "这个季度", "资金流向", "最新股价", "财务状况",
        "主力资金", "怎么样", "健康度", "收盘价", "开盘价", "最高价", "最低价",
        "涨跌幅", "成交量", "成交额", "换手率", "市盈率", "市净率", "现金流",
        "报告期", "上个月", "这个月", "本季度", "最新", "最近", "过去", "今天",
        "昨天", "本月", "去年", "今年", "股价", "走势", "行情", "数据", "价格",
        "市值", "涨幅", "跌幅", "对比", "比较", "分析", "财务", "利润", "年报",
        "公告", "列表", "股票", "股", "的", "从", "前",
    ];
}

static SUSPECT_CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\.([A-Za-z]*)").expect("valid pattern"));
static DIGIT_RUN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+").expect("valid pattern"));
static SEGMENT_SPLIT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[和与及、，,]|vs|VS|\s+").expect("valid pattern"));
static ST_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\*?ST[一-龥]{2,6}?)(?:[和与及、，,\s的最从]|$)").expect("valid pattern")
});
static AB_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[一-龥]{2,4}[AB]").expect("valid pattern"));
static EN_CJK_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Z]{2,5}[一-龥]{2,4}").expect("valid pattern"));
static CJK_RUN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[一-龥]+").expect("valid pattern"));
static NON_STOCK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"排名|排行|前\d+|最[大小高低]的?\d*只?股票|涨幅榜|跌幅榜|龙虎榜|板块|行业|概念")
        .expect("valid pattern")
});
static DEMAND_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([一-龥A-Za-z0-9]+)的").expect("valid pattern"));

fn is_cjk(c: char) -> bool {
    ('一'..='龥').contains(&c)
}

/// Resolves surface tokens and extracts stock lists from queries
#[derive(Clone)]
pub struct StockResolver {
    directory: Arc<dyn StockDirectory>,
}

impl StockResolver {
    pub fn new(directory: Arc<dyn StockDirectory>) -> Self {
        Self { directory }
    }

    /// Resolve a single surface token to a canonical stock
    pub fn resolve(&self, token: &str) -> Result<ResolvedStock, ResolveError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(ResolveError::Empty);
        }

        // Code-shaped input has highest priority
        if let Some(caps) = SUSPECT_CODE_RE.captures(token) {
            if !Self::is_decimal_number(token, &caps) {
                return self.classify_code(&caps[1], &caps[2]);
            }
        }

        if token.chars().all(|c| c.is_ascii_digit()) {
            return match token.len() {
                6 => self
                    .lookup_bare_code(token)
                    .ok_or(ResolveError::Unrecognized),
                3..=8 => Err(ResolveError::InvalidLength { len: token.len() }),
                _ => Err(ResolveError::Unrecognized),
            };
        }

        if let Some(found) = self.lookup_name(token) {
            return Ok(found);
        }
        if let Some(found) = self.resolve_name_candidate(token) {
            return Ok(found);
        }

        for (short, full) in shorthand::NAMES {
            if token.contains(short) && !token.contains(full) {
                return Err(ResolveError::UseFullName {
                    full_name: (*full).to_string(),
                });
            }
        }

        Err(ResolveError::Unrecognized)
    }

    /// Extract every stock a query names, in order of appearance
    pub fn extract_stocks(&self, query: &str) -> StockExtraction {
        let mut found: Vec<(usize, ResolvedStock)> = Vec::new();
        let mut first_error: Option<ResolveError> = None;
        let mut pending_length: Option<ResolveError> = None;

        // Explicit exchange-qualified (or almost-qualified) codes
        for caps in SUSPECT_CODE_RE.captures_iter(query) {
            if Self::is_decimal_number(query, &caps) {
                continue;
            }
            let pos = caps.get(0).map_or(0, |m| m.start());
            match self.classify_code(&caps[1], &caps[2]) {
                Ok(stock) => found.push((pos, stock)),
                Err(err) => {
                    tracing::debug!(token = %&caps[0], %err, "rejected code token");
                    first_error.get_or_insert(err);
                }
            }
        }

        // Company names, segment by segment so connectors never get
        // swallowed into a name
        let mut cursor = 0usize;
        for seg in SEGMENT_SPLIT_RE.split(query) {
            let seg_off = query[cursor..]
                .find(seg)
                .map_or(cursor, |off| cursor + off);
            cursor = seg_off + seg.len();
            if seg.is_empty() {
                continue;
            }
            self.extract_names_from_segment(seg, seg_off, &mut found);
        }

        // Bare digit runs with boundary and context guards
        for m in DIGIT_RUN_RE.find_iter(query) {
            if !Self::digit_run_is_isolated(query, m.start(), m.end()) {
                continue;
            }
            if Self::digit_run_is_non_stock(query, m.start(), m.end(), m.as_str()) {
                continue;
            }
            let run = m.as_str();
            match run.len() {
                6 => {
                    if let Some(stock) = self.lookup_bare_code(run) {
                        found.push((m.start(), stock));
                    }
                }
                3..=8 => {
                    pending_length
                        .get_or_insert(ResolveError::InvalidLength { len: run.len() });
                }
                _ => {}
            }
        }

        // Order by first appearance, drop duplicates
        found.sort_by_key(|(pos, _)| *pos);
        let mut stocks: Vec<ResolvedStock> = Vec::new();
        for (_, stock) in found {
            if !stocks.iter().any(|s| s.ts_code == stock.ts_code) {
                stocks.push(stock);
            }
        }

        if stocks.is_empty() && first_error.is_none() {
            first_error = self
                .shorthand_error(query)
                .or(pending_length)
                .or_else(|| self.demand_error(query));
        }

        if !stocks.is_empty() {
            tracing::debug!(?stocks, "extracted stocks");
        }
        StockExtraction {
            stocks,
            error: first_error,
        }
    }

    /// Classify a `digits.suffix` token
    fn classify_code(
        &self,
        digits: &str,
        suffix: &str,
    ) -> Result<ResolvedStock, ResolveError> {
        if digits.len() != 6 {
            return Err(ResolveError::InvalidLength { len: digits.len() });
        }
        if suffix.is_empty() {
            return Err(ResolveError::MissingSuffix);
        }
        let upper = suffix.to_ascii_uppercase();
        if matches!(upper.as_str(), "SZ" | "SH" | "BJ") {
            if suffix != upper {
                return Err(ResolveError::InvalidCase {
                    expected: format!(".{upper}"),
                });
            }
        } else {
            return Err(ResolveError::InvalidSuffix {
                suffix: suffix.to_string(),
            });
        }
        let ts_code = format!("{digits}.{suffix}");
        match self.directory.name_of(&ts_code) {
            Some(name) => Ok(ResolvedStock { ts_code, name }),
            None => Err(ResolveError::NotListed { ts_code }),
        }
    }

    /// A bare 6-digit code resolves only if the inferred ts_code is listed
    fn lookup_bare_code(&self, digits: &str) -> Option<ResolvedStock> {
        let exchange = infer_exchange(digits)?;
        let ts_code = format!("{digits}.{exchange}");
        let name = self.directory.name_of(&ts_code)?;
        Some(ResolvedStock { ts_code, name })
    }

    fn lookup_name(&self, name: &str) -> Option<ResolvedStock> {
        let ts_code = self.directory.ts_code_of(name)?;
        Some(ResolvedStock {
            ts_code,
            name: name.to_string(),
        })
    }

    /// Collect name candidates from one connector-free segment
    fn extract_names_from_segment(
        &self,
        seg: &str,
        seg_off: usize,
        found: &mut Vec<(usize, ResolvedStock)>,
    ) {
        for caps in ST_NAME_RE.captures_iter(seg) {
            if let Some(m) = caps.get(1) {
                if let Some(stock) = self.lookup_name(m.as_str()) {
                    found.push((seg_off + m.start(), stock));
                }
            }
        }

        for m in AB_NAME_RE.find_iter(seg) {
            // A/B suffix must not be the start of a longer ASCII word
            let next = seg[m.end()..].chars().next();
            if next.is_some_and(|c| c.is_ascii_alphabetic()) {
                continue;
            }
            if let Some(stock) = self.resolve_trim_leading(m.as_str()) {
                found.push((seg_off + m.start(), stock));
            }
        }

        for m in EN_CJK_NAME_RE.find_iter(seg) {
            if let Some(stock) = self.resolve_trim_trailing_cjk(m.as_str()) {
                found.push((seg_off + m.start(), stock));
            }
        }

        for m in CJK_RUN_RE.find_iter(seg) {
            if let Some(stock) = self.resolve_name_candidate(m.as_str()) {
                found.push((seg_off + m.start(), stock));
            }
        }
    }

    /// Try a candidate after stripping leading characters one at a time
    fn resolve_trim_leading(&self, candidate: &str) -> Option<ResolvedStock> {
        let mut rest = candidate;
        loop {
            if let Some(stock) = self.lookup_name(rest) {
                return Some(stock);
            }
            let mut chars = rest.chars();
            chars.next()?;
            rest = chars.as_str();
            if rest.chars().count() < 3 {
                return None;
            }
        }
    }

    /// Try a candidate after stripping trailing CJK characters one at a time
    fn resolve_trim_trailing_cjk(&self, candidate: &str) -> Option<ResolvedStock> {
        let mut rest = candidate.to_string();
        loop {
            if let Some(stock) = self.lookup_name(&rest) {
                return Some(stock);
            }
            let tail = rest.pop()?;
            if !is_cjk(tail) || rest.chars().filter(|c| is_cjk(*c)).count() < 2 {
                return None;
            }
        }
    }

    /// Resolve a plain CJK run: strip leading verbs, then trailing query
    /// words, also trying the part before the first "的"
    fn resolve_name_candidate(&self, run: &str) -> Option<ResolvedStock> {
        let mut base = run;
        'outer: loop {
            for verb in keywords::LEADING_VERBS {
                if let Some(rest) = base.strip_prefix(verb) {
                    base = rest;
                    continue 'outer;
                }
            }
            break;
        }
        if base.chars().count() < 2 {
            return None;
        }

        if let Some(stock) = self.resolve_trim_trailing_stops(base) {
            return Some(stock);
        }
        if let Some((prefix, _)) = base.split_once('的') {
            return self.resolve_trim_trailing_stops(prefix);
        }
        None
    }

    fn resolve_trim_trailing_stops(&self, candidate: &str) -> Option<ResolvedStock> {
        let mut rest = candidate;
        loop {
            if rest.chars().count() >= 2 {
                if let Some(stock) = self.lookup_name(rest) {
                    return Some(stock);
                }
            }
            let mut trimmed = None;
            for stop in keywords::TRAILING_STOPS {
                if let Some(shorter) = rest.strip_suffix(stop) {
                    trimmed = Some(shorter);
                    break;
                }
            }
            match trimmed {
                Some(shorter) if !shorter.is_empty() => rest = shorter,
                _ => return None,
            }
        }
    }

    fn shorthand_error(&self, query: &str) -> Option<ResolveError> {
        for (short, full) in shorthand::NAMES {
            if query.contains(short) && !query.contains(full) {
                tracing::debug!(short, full, "shorthand rejected");
                return Some(ResolveError::UseFullName {
                    full_name: (*full).to_string(),
                });
            }
        }
        None
    }

    /// When a query clearly demands one stock ("X的股价") but nothing
    /// resolved, surface why the candidate before "的" failed
    fn demand_error(&self, query: &str) -> Option<ResolveError> {
        let needs_stock = keywords::SPECIFIC_STOCK.iter().any(|kw| query.contains(kw));
        if !needs_stock || NON_STOCK_RE.is_match(query) {
            return None;
        }
        let candidate = DEMAND_RE.captures(query)?.get(1)?.as_str().to_string();
        match self.resolve(&candidate) {
            Ok(_) => None,
            Err(err) => {
                tracing::debug!(candidate, %err, "demanded stock failed to resolve");
                Some(err)
            }
        }
    }

    /// True when the "code.suffix" match is actually a decimal number
    fn is_decimal_number(text: &str, caps: &regex::Captures<'_>) -> bool {
        let whole = caps.get(0).expect("group 0 always present");
        caps[2].is_empty()
            && text[whole.end()..]
                .chars()
                .next()
                .is_some_and(|c| c.is_ascii_digit())
    }

    /// Digit runs count as code candidates only when bounded by start/end,
    /// whitespace, or CJK text (mirrors how codes appear in Chinese queries)
    fn digit_run_is_isolated(query: &str, start: usize, end: usize) -> bool {
        let prev = query[..start].chars().next_back();
        let next = query[end..].chars().next();
        let ok = |c: Option<char>| c.is_none_or(|c| c.is_whitespace() || is_cjk(c));
        ok(prev) && ok(next)
    }

    /// Context that marks a digit run as a quantity, year, or date
    fn digit_run_is_non_stock(query: &str, start: usize, end: usize, run: &str) -> bool {
        let prev = query[..start].chars().next_back();
        if matches!(prev, Some('前' | '第')) {
            return true;
        }
        let next = query[end..].chars().next();
        if matches!(
            next,
            Some('天' | '日' | '月' | '年' | '个' | '只' | '名' | '倍' | '万' | '亿')
        ) {
            return true;
        }
        if run.len() == 4 && (run.starts_with("19") || run.starts_with("20")) {
            return true;
        }
        if run.len() == 8
            && chrono::NaiveDate::parse_from_str(run, "%Y%m%d").is_ok()
        {
            return true;
        }
        false
    }
}
