//! Parameter extraction pipeline
//!
//! Turns one Chinese natural-language stock query into a structured
//! [`ExtractedParams`]: which stocks, which date or range, which report
//! period, metrics, result limit, ordering, and sector. The pipeline is
//! template-scoped: the matched [`QueryTemplate`] decides which slots are
//! even considered, and supplies defaults for the ones the query leaves
//! out. Sort-order, fiscal-period, and exclusion extraction always run.

use crate::calendar::TradingCalendar;
use crate::dates::{extract_period, DateResolver};
use crate::numerals::{extract_limit_from_query, normalize_quantity_expression};
use crate::stocks::{StockDirectory, StockResolver};
use crate::templates::{Field, QueryTemplate, RouteType, TemplateLibrary, TemplateType};
use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, LazyLock};

/// Sort direction for ranking queries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderDirection {
    Asc,
    #[default]
    Desc,
}

/// Optional mapping from sector/industry names to classification codes
pub trait SectorCodeMap: Send + Sync {
    fn sector_code(&self, name: &str) -> Option<String>;
}

fn default_limit() -> i64 {
    10
}

/// Structured view of one query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedParams {
    /// Cleaned input, preserved for diagnostics
    pub raw_query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_type: Option<TemplateType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route: Option<RouteType>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub stocks: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub stock_names: Vec<String>,
    /// Single date, YYYY-MM-DD; absent when a range was recognized
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    /// Inclusive (start, end) pair, YYYY-MM-DD; takes precedence over
    /// `date` downstream
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_range: Option<(String, String)>,
    /// Report period, YYYYMMDD
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub metrics: Vec<String>,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub order_by: OrderDirection,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sector: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sector_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub exclude_st: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub exclude_bj: bool,
    /// User-facing extraction error, verbatim
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Default for ExtractedParams {
    fn default() -> Self {
        Self {
            raw_query: String::new(),
            template: None,
            query_type: None,
            route: None,
            stocks: Vec::new(),
            stock_names: Vec::new(),
            date: None,
            date_range: None,
            period: None,
            metrics: Vec::new(),
            limit: default_limit(),
            order_by: OrderDirection::Desc,
            order_field: None,
            sector: None,
            sector_code: None,
            industry: None,
            exclude_st: false,
            exclude_bj: false,
            error: None,
        }
    }
}

/// Metric vocabulary, longest keyword first so "流通市值" never matches
/// as "市值"
const METRIC_KEYWORDS: &[(&str, &str)] = &[
    ("流通市值", "circ_market_cap"),
    ("总市值", "market_cap"),
    ("开盘价", "open"),
    ("最高价", "high"),
    ("最低价", "low"),
    ("收盘价", "close"),
    ("涨跌幅", "pct_chg"),
    ("成交量", "vol"),
    ("成交额", "amount"),
    ("换手率", "turnover_rate"),
    ("市盈率", "pe_ttm"),
    ("市净率", "pb"),
    ("市值", "market_cap"),
    ("涨幅", "pct_chg"),
    ("ROE", "roe"),
    ("PE", "pe_ttm"),
    ("PB", "pb"),
];

/// Sort-field vocabulary for ranking queries, most specific first
const ORDER_FIELDS: &[(&str, &str)] = &[
    ("总市值", "market_cap"),
    ("流通市值", "circ_market_cap"),
    ("市值", "market_cap"),
    ("涨跌幅", "pct_chg"),
    ("涨幅", "pct_chg"),
    ("成交额", "amount"),
    ("成交量", "vol"),
    ("换手率", "turnover_rate"),
    ("市盈率", "pe_ttm"),
    ("PE", "pe_ttm"),
    ("市净率", "pb"),
    ("PB", "pb"),
    ("ROE", "roe"),
    ("净利润", "n_income"),
    ("利润", "n_income"),
    ("营业收入", "total_revenue"),
    ("营收", "total_revenue"),
];

const DESC_WORDS: &[&str] = &["最高", "最大", "最多", "降序", "从高到低"];
const ASC_WORDS: &[&str] = &["最低", "最小", "最少", "升序", "从低到高"];

/// Phrases that rank by decline, which flips the sort to ascending
/// change; an incidental 跌幅 mention does not qualify
const DROP_RANKING_TRIGGERS: &[&str] =
    &["跌幅榜", "跌幅最大", "跌幅排名", "跌幅排行", "跌幅前"];

const ST_EXCLUDE_TRIGGERS: &[&str] =
    &["排除ST", "不含ST", "剔除ST", "去除ST", "非ST", "排除*ST"];
const BJ_EXCLUDE_TRIGGERS: &[&str] =
    &["排除北交所", "不含北交所", "剔除北交所", "去除北交所", "非北交所"];

static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid pattern"));
static SECTOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([一-龥]+)(板块|行业|概念)").expect("valid pattern"));
static YEAR_TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:19|20)\d{2}年").expect("valid pattern"));
static DATE_TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d{4}-\d{1,2}-\d{1,2}|\d{4}/\d{1,2}/\d{1,2}|\d{8}").expect("valid pattern")
});

const SECTOR_VERBS: &[&str] = &["查询", "分析", "比较", "对比", "看看", "请", "查", "看"];

/// Stateless extraction engine over injected reference data
#[derive(Clone)]
pub struct ParameterExtractor {
    resolver: StockResolver,
    dates: DateResolver,
    calendar: Arc<dyn TradingCalendar>,
    templates: Arc<TemplateLibrary>,
    sectors: Option<Arc<dyn SectorCodeMap>>,
}

impl ParameterExtractor {
    pub fn new(
        directory: Arc<dyn StockDirectory>,
        calendar: Arc<dyn TradingCalendar>,
    ) -> Self {
        Self {
            resolver: StockResolver::new(directory),
            dates: DateResolver::new(calendar.clone()),
            calendar,
            templates: Arc::new(TemplateLibrary::new()),
            sectors: None,
        }
    }

    pub fn with_sector_map(mut self, sectors: Arc<dyn SectorCodeMap>) -> Self {
        self.sectors = Some(sectors);
        self
    }

    /// Run the full pipeline, matching a template first
    pub fn extract(&self, query: &str) -> ExtractedParams {
        let cleaned = WHITESPACE_RE.replace_all(query.trim(), " ").into_owned();
        let normalized = normalize_quantity_expression(&cleaned);
        let template = self.templates.match_template(&normalized);
        self.extract_with_template(query, template)
    }

    /// Run the pipeline against a known template (or none, which
    /// extracts every field opportunistically)
    pub fn extract_with_template(
        &self,
        query: &str,
        template: Option<&QueryTemplate>,
    ) -> ExtractedParams {
        let mut params = ExtractedParams::default();
        let cleaned = WHITESPACE_RE.replace_all(query.trim(), " ").into_owned();
        if cleaned.is_empty() {
            params.error = Some(crate::error::ResolveError::Empty.to_string());
            return params;
        }
        let normalized = normalize_quantity_expression(&cleaned);
        params.raw_query = normalized.clone();
        tracing::debug!(query = %normalized, "extracting parameters");

        if let Some(t) = template {
            params.template = Some(t.name.to_string());
            params.query_type = Some(t.template_type);
            params.route = Some(t.route);
        }

        let extraction = self.resolver.extract_stocks(&normalized);
        params.stocks = extraction
            .stocks
            .iter()
            .map(|s| s.ts_code.clone())
            .collect();
        params.stock_names = extraction.stocks.iter().map(|s| s.name.clone()).collect();
        if let Some(err) = extraction.error {
            params.error = Some(err.to_string());
        }

        self.fill_dates(&normalized, template, &mut params);
        params.period = extract_period(&normalized);
        Self::fill_limit(&normalized, template, &mut params);
        Self::fill_order(&normalized, template, &mut params);
        self.fill_sector(&normalized, &mut params);
        Self::fill_exclusions(&normalized, &mut params);
        Self::fill_metrics(&normalized, template, &mut params);

        params
    }

    fn fill_dates(
        &self,
        query: &str,
        template: Option<&QueryTemplate>,
        params: &mut ExtractedParams,
    ) {
        let wants_range = template.is_none_or(|t| t.accepts(Field::DateRange));
        let wants_date = template.is_none_or(|t| t.accepts(Field::Date));

        if wants_range {
            if let Some((start, end)) = self.dates.extract_date_range(query) {
                params.date_range = Some((fmt_date(start), fmt_date(end)));
                return;
            }
        }
        if wants_date {
            if let Some(date) = self.dates.extract_date(query) {
                params.date = Some(fmt_date(date));
                return;
            }
        }

        // Template defaults for queries that name no time at all
        if let Some(t) = template {
            if let Some(days) = t.range_default_days {
                let (start, end) = self.calendar.trading_days_range(days);
                params.date_range = Some((fmt_date(start), fmt_date(end)));
            } else if t.date_defaults_to_latest {
                params.date = Some(fmt_date(self.calendar.latest_trading_day()));
            }
        }
    }

    /// Limit extraction runs over a masked query so dates, codes, and
    /// names never parse as counts
    fn fill_limit(
        query: &str,
        template: Option<&QueryTemplate>,
        params: &mut ExtractedParams,
    ) {
        let accepts = template.is_none_or(|t| t.accepts(Field::Limit));
        if !accepts {
            if let Some(default) = template.and_then(|t| t.default_limit) {
                params.limit = default;
            }
            return;
        }
        let mut masked = query.to_string();
        masked = YEAR_TOKEN_RE.replace_all(&masked, " ").into_owned();
        masked = DATE_TOKEN_RE.replace_all(&masked, " ").into_owned();
        for code in &params.stocks {
            masked = masked.replace(code.as_str(), " ");
            if let Some(bare) = code.split('.').next() {
                masked = masked.replace(bare, " ");
            }
        }
        for name in &params.stock_names {
            masked = masked.replace(name.as_str(), " ");
        }
        let default = template.and_then(|t| t.default_limit);
        if let Some(limit) = extract_limit_from_query(&masked, default) {
            params.limit = limit;
        }
    }

    /// Sort-order inference runs whenever ranking or direction
    /// vocabulary is present, template or not
    fn fill_order(
        query: &str,
        template: Option<&QueryTemplate>,
        params: &mut ExtractedParams,
    ) {
        let ranking_like = template.is_some_and(|t| {
            matches!(
                t.template_type,
                TemplateType::Ranking | TemplateType::MoneyFlow
            )
        }) || query.contains("排名")
            || query.contains("排行")
            || query.contains("榜");
        let directed = DESC_WORDS
            .iter()
            .chain(ASC_WORDS.iter())
            .any(|w| query.contains(w));
        if !ranking_like && !directed {
            return;
        }

        for (keyword, field) in ORDER_FIELDS {
            if query.contains(keyword) {
                params.order_field = Some((*field).to_string());
                break;
            }
        }
        if ASC_WORDS.iter().any(|w| query.contains(w)) {
            params.order_by = OrderDirection::Asc;
        }

        // 跌幅榜-style phrases mean ascending change
        if DROP_RANKING_TRIGGERS.iter().any(|t| query.contains(t)) {
            params.order_field = Some("pct_chg".to_string());
            params.order_by = OrderDirection::Asc;
        }
    }

    fn fill_sector(&self, query: &str, params: &mut ExtractedParams) {
        let Some(caps) = SECTOR_RE.captures(query) else {
            return;
        };
        let mut name = caps[1].to_string();
        'outer: loop {
            for verb in SECTOR_VERBS {
                if let Some(rest) = name.strip_prefix(verb) {
                    name = rest.to_string();
                    continue 'outer;
                }
            }
            break;
        }
        if name.is_empty() {
            return;
        }
        match &caps[2] {
            "行业" => params.industry = Some(name.clone()),
            _ => params.sector = Some(name.clone()),
        }
        if let Some(map) = &self.sectors {
            params.sector_code = map.sector_code(&name);
        }
    }

    fn fill_exclusions(query: &str, params: &mut ExtractedParams) {
        params.exclude_st = ST_EXCLUDE_TRIGGERS.iter().any(|t| query.contains(t));
        params.exclude_bj = BJ_EXCLUDE_TRIGGERS.iter().any(|t| query.contains(t));
        // "排除ST和北交所" names both with one trigger word
        if params.exclude_st && query.contains("北交所") {
            params.exclude_bj = true;
        }
    }

    fn fill_metrics(
        query: &str,
        template: Option<&QueryTemplate>,
        params: &mut ExtractedParams,
    ) {
        let mut found: Vec<String> = Vec::new();
        let mut consumed = query.to_string();
        for (keyword, field) in METRIC_KEYWORDS {
            if consumed.contains(keyword) {
                if !found.iter().any(|f| f == field) {
                    found.push((*field).to_string());
                }
                consumed = consumed.replace(keyword, " ");
            }
        }

        match template {
            Some(t) if t.accepts(Field::Metrics) => {
                params.metrics = if found.is_empty() {
                    t.default_metrics.iter().map(|m| (*m).to_string()).collect()
                } else {
                    found
                };
            }
            Some(_) => {}
            None => params.metrics = found,
        }
    }
}

fn fmt_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}
