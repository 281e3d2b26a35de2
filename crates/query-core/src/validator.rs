//! Parameter validation
//!
//! Checks an [`ExtractedParams`] against hard bounds (stock count, date
//! window, result limits) and against the matched template's required
//! fields. Checks run in a fixed order and stop at the first failure;
//! soft problems are appended to `warnings` and leave the result valid.
//! [`QueryValidator::validate_enhanced`] adds business rules that need
//! the original query text, like rejecting ranking queries aimed at a
//! single stock.

use crate::extractor::ExtractedParams;
use crate::templates::{Field, QueryTemplate, TemplateLibrary};
use chrono::{Datelike, Local, NaiveDate};
use query_utils::EngineConfig;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::sync::Arc;

/// Machine-readable validation failure codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationErrorCode {
    TooManyStocks,
    InvalidStockFormat,
    MissingRequiredStock,
    MissingRequiredDate,
    MissingRequiredDateRange,
    InvalidDateFormat,
    DateTooEarly,
    FutureDate,
    InvalidDateRange,
    DateRangeTooLarge,
    DateTooFar,
    LimitTooSmall,
    LimitTooLarge,
    InvalidLimit,
    InvalidPeriodFormat,
    MissingSectorSuffix,
    InvalidQuery,
    NonStandardTerm,
    ParamExtractionError,
    /// Catch-all for internal validation faults
    ValidationError,
}

impl ValidationErrorCode {
    /// Short Chinese label used as the user-friendly message prefix
    fn label(self) -> &'static str {
        match self {
            Self::TooManyStocks => "股票数量超限",
            Self::InvalidStockFormat => "股票代码错误",
            Self::MissingRequiredStock => "缺少股票",
            Self::MissingRequiredDate => "缺少日期",
            Self::MissingRequiredDateRange => "缺少日期范围",
            Self::InvalidDateFormat | Self::DateTooEarly | Self::DateTooFar => "日期错误",
            Self::FutureDate => "未来日期",
            Self::InvalidDateRange | Self::DateRangeTooLarge => "日期范围错误",
            Self::LimitTooSmall | Self::LimitTooLarge | Self::InvalidLimit => "数量限制错误",
            Self::InvalidPeriodFormat => "报告期错误",
            Self::MissingSectorSuffix => "板块名称不完整",
            Self::InvalidQuery => "查询方式错误",
            Self::NonStandardTerm => "术语不规范",
            Self::ParamExtractionError => "参数提取失败",
            Self::ValidationError => "参数验证失败",
        }
    }
}

/// Outcome of validating one parameter set
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<ValidationErrorCode>,
    /// Structured context for the failure; always carries `message`
    #[serde(skip_serializing_if = "Map::is_empty", default)]
    pub error_detail: Map<String, Value>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub warnings: Vec<String>,
}

impl ValidationResult {
    /// The human-readable failure message, when invalid
    pub fn message(&self) -> Option<&str> {
        self.error_detail.get("message").and_then(Value::as_str)
    }
}

/// One failed check, carried internally until it becomes the result
struct Failure {
    code: ValidationErrorCode,
    detail: Map<String, Value>,
}

impl Failure {
    fn with(mut self, key: &str, value: Value) -> Self {
        self.detail.insert(key.to_string(), value);
        self
    }
}

fn fail(code: ValidationErrorCode, message: impl Into<String>) -> Failure {
    let mut detail = Map::new();
    detail.insert("message".to_string(), Value::String(message.into()));
    Failure { code, detail }
}

/// Metric fields downstream data sources actually carry
const KNOWN_METRICS: &[&str] = &[
    "open", "high", "low", "close", "vol", "amount", "pct_chg", "turnover_rate",
    "pe_ttm", "pb", "roe", "market_cap", "circ_market_cap", "n_income",
    "total_revenue",
];

/// Colloquial fund-flow terms and their standard replacements
const FUND_TERM_MAPPING: &[(&str, &str)] = &[
    ("游资", "主力资金"),
    ("庄家", "主力资金"),
    ("热钱", "主力资金"),
    ("大资金", "主力资金"),
    ("机构资金", "超大单"),
    ("大户", "大单"),
    ("中户", "中单"),
    ("小户", "小单"),
    ("散户", "小单"),
];

const RANKING_PHRASES: &[&str] = &["涨幅排名", "成交量排名", "市值排名"];
const SECTOR_BARE_NAMES: &[&str] =
    &["银行", "房地产", "新能源", "白酒", "汽车", "医药", "科技"];
const SECTOR_CONTEXT: &[&str] = &["主力资金", "资金流向", "涨幅", "市值"];

/// Validates extracted parameters against configured bounds
pub struct QueryValidator {
    config: EngineConfig,
    templates: Arc<TemplateLibrary>,
    today: NaiveDate,
}

impl QueryValidator {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            templates: Arc::new(TemplateLibrary::new()),
            today: Local::now().date_naive(),
        }
    }

    /// Pin "today" for deterministic validation
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    /// Base validation against the template the extractor matched
    pub fn validate_params(&self, params: &ExtractedParams) -> ValidationResult {
        self.validate_with_template(params, self.lookup_template(params))
    }

    /// Base validation: bounds, formats, and template-required fields
    pub fn validate_with_template(
        &self,
        params: &ExtractedParams,
        template: Option<&QueryTemplate>,
    ) -> ValidationResult {
        let mut warnings = Vec::new();
        let outcome = self.run_base_checks(params, template, &mut warnings);
        finish(outcome, warnings)
    }

    /// Base validation plus business rules that need the query text
    pub fn validate_enhanced(&self, query: &str, params: &ExtractedParams) -> ValidationResult {
        let template = self.lookup_template(params);
        let mut warnings = Vec::new();
        // Business rules run first so their specific codes win over the
        // generic bound checks
        let outcome = self
            .check_business_rules(query, params)
            .and_then(|()| self.run_base_checks(params, template, &mut warnings));
        finish(outcome, warnings)
    }

    /// One-line Chinese summary for end users
    pub fn user_friendly_message(result: &ValidationResult) -> String {
        if result.is_valid {
            return "参数验证通过".to_string();
        }
        match (result.error_code, result.message()) {
            (Some(code), Some(message)) => format!("{}: {message}", code.label()),
            _ => "参数验证失败".to_string(),
        }
    }

    fn lookup_template(&self, params: &ExtractedParams) -> Option<&QueryTemplate> {
        let name = params.template.as_deref()?;
        self.templates.iter().find(|t| t.name == name)
    }

    fn run_base_checks(
        &self,
        params: &ExtractedParams,
        template: Option<&QueryTemplate>,
        warnings: &mut Vec<String>,
    ) -> Result<(), Failure> {
        if let Some(error) = &params.error {
            return Err(fail(
                ValidationErrorCode::ParamExtractionError,
                error.clone(),
            ));
        }
        Self::check_required_fields(params, template)?;
        self.check_stocks(params)?;
        self.check_date(params)?;
        self.check_range(params, warnings)?;
        self.check_limit(params)?;
        Self::check_period(params, warnings)?;
        Self::check_metrics(params, warnings);
        Self::check_sector(params, warnings);
        Ok(())
    }

    fn check_business_rules(
        &self,
        query: &str,
        params: &ExtractedParams,
    ) -> Result<(), Failure> {
        if params.error.is_some() {
            // The base checks surface it with the extraction code
            return Ok(());
        }
        self.check_ranking_limit(query, params)?;
        Self::check_single_stock_ranking(query, params)?;
        Self::check_sector_suffix(query, params)?;
        Self::check_fund_terms(query)?;
        Ok(())
    }

    fn check_required_fields(
        params: &ExtractedParams,
        template: Option<&QueryTemplate>,
    ) -> Result<(), Failure> {
        let Some(template) = template else {
            return Ok(());
        };

        if template.requires(Field::Stocks) && params.stocks.is_empty() {
            return Err(fail(
                ValidationErrorCode::MissingRequiredStock,
                "此查询需要指定股票",
            ));
        }
        // A single date or a range both satisfy a date requirement
        if template.requires(Field::Date)
            && params.date.is_none()
            && params.date_range.is_none()
        {
            return Err(fail(
                ValidationErrorCode::MissingRequiredDate,
                "此查询需要指定日期",
            ));
        }
        // K-line-style templates fill a default window instead
        if template.requires(Field::DateRange)
            && params.date_range.is_none()
            && template.range_default_days.is_none()
        {
            return Err(fail(
                ValidationErrorCode::MissingRequiredDateRange,
                "此查询需要指定日期范围",
            ));
        }
        Ok(())
    }

    fn check_stocks(&self, params: &ExtractedParams) -> Result<(), Failure> {
        let count = params.stocks.len();
        if count > self.config.max_stocks_per_query {
            return Err(fail(
                ValidationErrorCode::TooManyStocks,
                format!("一次查询最多支持{}只股票", self.config.max_stocks_per_query),
            )
            .with("count", json!(count))
            .with("max", json!(self.config.max_stocks_per_query)));
        }

        let invalid: Vec<&str> = params
            .stocks
            .iter()
            .filter(|code| !is_canonical_ts_code(code))
            .map(String::as_str)
            .collect();
        if !invalid.is_empty() {
            return Err(fail(
                ValidationErrorCode::InvalidStockFormat,
                format!("股票代码格式错误: {}", invalid.join(", ")),
            )
            .with("invalid_stocks", json!(invalid)));
        }
        Ok(())
    }

    fn check_date(&self, params: &ExtractedParams) -> Result<(), Failure> {
        let Some(raw) = &params.date else {
            return Ok(());
        };
        let Some(date) = parse_param_date(raw) else {
            return Err(fail(
                ValidationErrorCode::InvalidDateFormat,
                "日期格式错误，应为YYYY-MM-DD",
            ));
        };
        if date > self.today {
            return Err(fail(
                ValidationErrorCode::FutureDate,
                format!("不能查询未来日期的数据：{raw}"),
            ));
        }
        if date < self.earliest() {
            return Err(fail(
                ValidationErrorCode::DateTooEarly,
                "日期早于1990年，没有相关数据",
            ));
        }
        Ok(())
    }

    fn check_range(
        &self,
        params: &ExtractedParams,
        warnings: &mut Vec<String>,
    ) -> Result<(), Failure> {
        let Some((start_raw, end_raw)) = &params.date_range else {
            return Ok(());
        };
        let (Some(start), Some(end)) = (parse_param_date(start_raw), parse_param_date(end_raw))
        else {
            return Err(fail(
                ValidationErrorCode::InvalidDateFormat,
                "日期格式错误，应为YYYY-MM-DD",
            ));
        };

        if start > self.today {
            return Err(fail(
                ValidationErrorCode::FutureDate,
                format!("不能查询未来日期的数据：{start_raw}"),
            ));
        }
        if start < self.earliest() {
            return Err(fail(
                ValidationErrorCode::DateTooEarly,
                "日期早于1990年，没有相关数据",
            ));
        }
        let horizon = self.today + chrono::Duration::days(self.config.max_date_range_days);
        if end > horizon {
            return Err(fail(
                ValidationErrorCode::DateTooFar,
                format!("结束日期{end_raw}太远，超出可查询范围"),
            ));
        }
        if start > end {
            return Err(fail(
                ValidationErrorCode::InvalidDateRange,
                "开始日期不能晚于结束日期",
            ));
        }
        let days = (end - start).num_days();
        if days > self.config.max_date_range_days {
            return Err(fail(
                ValidationErrorCode::DateRangeTooLarge,
                format!("日期范围不能超过{}天", self.config.max_date_range_days),
            )
            .with("days", json!(days))
            .with("max_days", json!(self.config.max_date_range_days)));
        }
        if end > self.today {
            // Open-ended "to present" ranges are allowed; the data just
            // stops early
            warnings.push(format!("日期{end_raw}是未来日期，可能没有数据"));
        }
        Ok(())
    }

    fn check_limit(&self, params: &ExtractedParams) -> Result<(), Failure> {
        if params.limit < self.config.min_limit {
            return Err(fail(
                ValidationErrorCode::LimitTooSmall,
                format!("数量限制不能小于{}", self.config.min_limit),
            ));
        }
        if params.limit > self.config.max_limit {
            return Err(fail(
                ValidationErrorCode::LimitTooLarge,
                format!("数量限制不能大于{}", self.config.max_limit),
            ));
        }
        Ok(())
    }

    fn check_period(
        params: &ExtractedParams,
        warnings: &mut Vec<String>,
    ) -> Result<(), Failure> {
        let Some(period) = &params.period else {
            return Ok(());
        };
        let parsed = (period.len() == 8)
            .then(|| NaiveDate::parse_from_str(period, "%Y%m%d").ok())
            .flatten();
        let Some(date) = parsed else {
            return Err(fail(
                ValidationErrorCode::InvalidPeriodFormat,
                "报告期格式错误，应为YYYYMMDD",
            ));
        };
        let quarter_end = matches!(
            (date.month(), date.day()),
            (3, 31) | (6, 30) | (9, 30) | (12, 31)
        );
        if !quarter_end {
            warnings.push(format!("报告期{period}可能不是标准的季度报告日期"));
        }
        Ok(())
    }

    fn check_metrics(params: &ExtractedParams, warnings: &mut Vec<String>) {
        let unknown: Vec<&str> = params
            .metrics
            .iter()
            .filter(|m| !KNOWN_METRICS.contains(&m.as_str()))
            .map(String::as_str)
            .collect();
        if !unknown.is_empty() {
            warnings.push(format!("以下指标可能不可用: {}", unknown.join(", ")));
        }
    }

    fn check_sector(params: &ExtractedParams, warnings: &mut Vec<String>) {
        let checks = [
            (params.sector.as_deref(), "板块"),
            (params.industry.as_deref(), "行业"),
        ];
        for (name, kind) in checks {
            let Some(name) = name else { continue };
            if name.chars().count() > 20 {
                warnings.push(format!("{kind}名称'{name}'可能过长"));
            }
        }
    }

    /// Ranking queries with a non-positive limit get the specific code
    fn check_ranking_limit(&self, query: &str, params: &ExtractedParams) -> Result<(), Failure> {
        let ranking = query.contains("排名") || query.contains("排行");
        if ranking && params.limit < self.config.min_limit {
            return Err(fail(
                ValidationErrorCode::InvalidLimit,
                format!("排名查询的数量必须大于0，当前值：{}", params.limit),
            )
            .with("field", json!("limit"))
            .with("value", json!(params.limit)));
        }
        Ok(())
    }

    fn check_single_stock_ranking(
        query: &str,
        params: &ExtractedParams,
    ) -> Result<(), Failure> {
        let ranking_phrase = RANKING_PHRASES.iter().any(|p| query.contains(p));
        if !ranking_phrase || params.stocks.len() != 1 || query.contains("板块") {
            return Ok(());
        }
        let name = params
            .stock_names
            .first()
            .map_or_else(|| params.stocks[0].clone(), Clone::clone);
        Err(fail(
            ValidationErrorCode::InvalidQuery,
            "个股不能进行排名查询，请查询该股票的具体数据",
        )
        .with(
            "suggestion",
            json!(format!("您可以查询\"{name}的涨幅\"或\"涨幅排名前10\"")),
        ))
    }

    /// A resolved stock means an individual-stock query, not a sector
    /// query, so the suffix rule does not apply
    fn check_sector_suffix(query: &str, params: &ExtractedParams) -> Result<(), Failure> {
        if query.contains("板块") || !params.stocks.is_empty() {
            return Ok(());
        }
        let context = SECTOR_CONTEXT.iter().any(|c| query.contains(c));
        if !context {
            return Ok(());
        }
        let Some(sector) = SECTOR_BARE_NAMES.iter().find(|s| query.contains(*s)) else {
            return Ok(());
        };
        Err(fail(
            ValidationErrorCode::MissingSectorSuffix,
            format!("板块查询必须使用完整名称，如\"{sector}板块\""),
        )
        .with("suggestion", json!(format!("{sector}板块"))))
    }

    fn check_fund_terms(query: &str) -> Result<(), Failure> {
        for (term, standard) in FUND_TERM_MAPPING {
            // 主力资金 itself is the standard term
            if query.contains(term) && !query.contains(standard) {
                return Err(fail(
                    ValidationErrorCode::NonStandardTerm,
                    format!("\"{term}\"不是标准术语，请使用\"{standard}\""),
                )
                .with("standard_term", json!(standard)));
            }
        }
        Ok(())
    }

    fn earliest(&self) -> NaiveDate {
        NaiveDate::parse_from_str(&self.config.earliest_date, "%Y-%m-%d")
            .unwrap_or_else(|_| NaiveDate::from_ymd_opt(1990, 1, 1).unwrap_or_default())
    }
}

fn finish(outcome: Result<(), Failure>, warnings: Vec<String>) -> ValidationResult {
    match outcome {
        Ok(()) => ValidationResult {
            is_valid: true,
            error_code: None,
            error_detail: Map::new(),
            warnings,
        },
        Err(failure) => ValidationResult {
            is_valid: false,
            error_code: Some(failure.code),
            error_detail: failure.detail,
            warnings,
        },
    }
}

fn is_canonical_ts_code(code: &str) -> bool {
    let Some((digits, suffix)) = code.split_once('.') else {
        return false;
    };
    digits.len() == 6
        && digits.chars().all(|c| c.is_ascii_digit())
        && matches!(suffix, "SH" | "SZ" | "BJ")
}

fn parse_param_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%Y%m%d"))
        .ok()
}
