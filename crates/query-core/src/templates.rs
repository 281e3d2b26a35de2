//! Query template catalogue
//!
//! Each template pairs a recognition pattern with the parameter contract
//! of one query shape: which fields are required, which defaults apply,
//! and how the query routes downstream. Templates are tried in order, so
//! the more specific shapes are listed first.

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Broad category a template belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateType {
    PriceQuery,
    FinancialHealth,
    MoneyFlow,
    Announcement,
    Comparison,
    Ranking,
    Dupont,
    CashFlow,
}

/// Downstream route for a matched template
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteType {
    Sql,
    Rag,
}

/// Parameter slots a template can require or accept
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Stocks,
    Date,
    DateRange,
    Period,
    Metrics,
    Limit,
    Sector,
}

/// One recognized query shape and its parameter contract
#[derive(Debug, Clone)]
pub struct QueryTemplate {
    pub name: &'static str,
    pub template_type: TemplateType,
    pub route: RouteType,
    pattern: Regex,
    pub required: &'static [Field],
    pub optional: &'static [Field],
    /// Result-count default when the query gives none
    pub default_limit: Option<i64>,
    /// Metrics filled in when the query names none
    pub default_metrics: &'static [&'static str],
    /// Missing single date falls back to the latest trading day
    pub date_defaults_to_latest: bool,
    /// Missing range falls back to the most recent N trading days
    pub range_default_days: Option<u32>,
    /// Template honors 排除ST / 排除北交所 exclusions
    pub supports_exclusions: bool,
    pub example: &'static str,
}

impl QueryTemplate {
    pub fn matches(&self, query: &str) -> bool {
        self.pattern.is_match(query)
    }

    pub fn requires(&self, field: Field) -> bool {
        self.required.contains(&field)
    }

    pub fn accepts(&self, field: Field) -> bool {
        self.required.contains(&field) || self.optional.contains(&field)
    }
}

/// Ordered template collection
pub struct TemplateLibrary {
    templates: Vec<QueryTemplate>,
}

impl Default for TemplateLibrary {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateLibrary {
    pub fn new() -> Self {
        let re = |p: &str| Regex::new(p).expect("valid pattern");
        let templates = vec![
            QueryTemplate {
                name: "主力净流入排行",
                template_type: TemplateType::MoneyFlow,
                route: RouteType::Sql,
                pattern: re(r"主力.*(净流入|净流出|流入|流出)|(主力资金|资金流向).*(排行|排名|榜)"),
                required: &[],
                optional: &[Field::Limit, Field::Date, Field::DateRange, Field::Sector],
                default_limit: Some(10),
                default_metrics: &[],
                date_defaults_to_latest: true,
                range_default_days: None,
                supports_exclusions: true,
                example: "主力净流入排行前10",
            },
            QueryTemplate {
                name: "杜邦分析",
                template_type: TemplateType::Dupont,
                route: RouteType::Sql,
                pattern: re(r"杜邦"),
                required: &[Field::Stocks],
                optional: &[Field::Period],
                default_limit: None,
                default_metrics: &["roe", "n_income", "total_revenue"],
                date_defaults_to_latest: false,
                range_default_days: None,
                supports_exclusions: false,
                example: "贵州茅台的杜邦分析",
            },
            QueryTemplate {
                name: "财务健康度分析",
                template_type: TemplateType::FinancialHealth,
                route: RouteType::Sql,
                pattern: re(r"财务健康|健康度|财务状况|财务分析"),
                required: &[Field::Stocks],
                optional: &[Field::Period],
                default_limit: None,
                default_metrics: &["total_revenue", "n_income", "roe", "pe_ttm", "pb"],
                date_defaults_to_latest: false,
                range_default_days: None,
                supports_exclusions: false,
                example: "贵州茅台的财务健康度",
            },
            QueryTemplate {
                name: "现金流查询",
                template_type: TemplateType::CashFlow,
                route: RouteType::Sql,
                pattern: re(r"现金流"),
                required: &[Field::Stocks],
                optional: &[Field::Period, Field::DateRange],
                default_limit: None,
                default_metrics: &[],
                date_defaults_to_latest: false,
                range_default_days: None,
                supports_exclusions: false,
                example: "贵州茅台的现金流",
            },
            QueryTemplate {
                name: "公告查询",
                template_type: TemplateType::Announcement,
                route: RouteType::Rag,
                pattern: re(r"公告|年报披露|公示"),
                required: &[Field::Stocks],
                optional: &[Field::Date, Field::DateRange],
                default_limit: None,
                default_metrics: &[],
                date_defaults_to_latest: false,
                range_default_days: Some(30),
                supports_exclusions: false,
                example: "贵州茅台最近的公告",
            },
            QueryTemplate {
                name: "股票对比",
                template_type: TemplateType::Comparison,
                route: RouteType::Sql,
                pattern: re(r"对比|比较|vs|VS"),
                required: &[Field::Stocks],
                optional: &[Field::Metrics, Field::Date, Field::DateRange, Field::Period],
                default_limit: None,
                default_metrics: &["close", "pct_chg", "pe_ttm", "pb", "market_cap"],
                date_defaults_to_latest: true,
                range_default_days: None,
                supports_exclusions: false,
                example: "比较贵州茅台和五粮液的市值",
            },
            QueryTemplate {
                name: "排名查询",
                template_type: TemplateType::Ranking,
                route: RouteType::Sql,
                pattern: re(
                    r"排名|排行|龙虎榜|涨幅榜|跌幅榜|最[大小高低]的?\d*只?(?:股票|股)|(?:涨幅|跌幅|市值|成交量|成交额|换手率|主力)前\d+|前\d+(?:只|名|个股票)",
                ),
                required: &[],
                optional: &[
                    Field::Limit,
                    Field::Date,
                    Field::Period,
                    Field::Sector,
                    Field::Metrics,
                ],
                default_limit: Some(10),
                default_metrics: &[],
                date_defaults_to_latest: true,
                range_default_days: None,
                supports_exclusions: true,
                example: "涨幅排名前10",
            },
            QueryTemplate {
                name: "历史K线查询",
                template_type: TemplateType::PriceQuery,
                route: RouteType::Sql,
                pattern: re(r"K线|k线|走势|历史(?:行情|价格|股价)"),
                required: &[Field::Stocks],
                optional: &[Field::DateRange, Field::Metrics],
                default_limit: None,
                default_metrics: &["open", "high", "low", "close", "vol", "amount", "pct_chg"],
                date_defaults_to_latest: false,
                range_default_days: Some(90),
                supports_exclusions: false,
                example: "600519.SH最近30天的K线",
            },
            QueryTemplate {
                name: "历史交易量查询",
                template_type: TemplateType::PriceQuery,
                route: RouteType::Sql,
                pattern: re(r"成交量|成交额|交易量|换手率"),
                required: &[Field::Stocks],
                optional: &[Field::Date, Field::DateRange, Field::Metrics],
                default_limit: None,
                default_metrics: &["vol", "amount", "turnover_rate"],
                date_defaults_to_latest: true,
                range_default_days: None,
                supports_exclusions: false,
                example: "贵州茅台昨天的成交量",
            },
            QueryTemplate {
                name: "利润查询",
                template_type: TemplateType::FinancialHealth,
                route: RouteType::Sql,
                pattern: re(r"利润|营收|营业收入|业绩"),
                required: &[Field::Stocks],
                optional: &[Field::Period, Field::Metrics],
                default_limit: None,
                default_metrics: &["total_revenue", "n_income"],
                date_defaults_to_latest: false,
                range_default_days: None,
                supports_exclusions: false,
                example: "贵州茅台2024年的利润",
            },
            QueryTemplate {
                name: "估值指标查询",
                template_type: TemplateType::PriceQuery,
                route: RouteType::Sql,
                pattern: re(r"PE|PB|ROE|市盈率|市净率|估值"),
                required: &[Field::Stocks],
                optional: &[Field::Date, Field::Metrics],
                default_limit: None,
                default_metrics: &["pe_ttm", "pb"],
                date_defaults_to_latest: true,
                range_default_days: None,
                supports_exclusions: false,
                example: "贵州茅台的PE和PB",
            },
            QueryTemplate {
                name: "今日股价查询",
                template_type: TemplateType::PriceQuery,
                route: RouteType::Sql,
                pattern: re(r"(?:今天|今日).*(?:股价|价格|行情|收盘|开盘)"),
                required: &[Field::Stocks],
                optional: &[Field::Metrics],
                default_limit: None,
                default_metrics: &["close", "pct_chg", "vol", "amount"],
                date_defaults_to_latest: true,
                range_default_days: None,
                supports_exclusions: false,
                example: "贵州茅台今天的股价",
            },
            QueryTemplate {
                name: "最新股价查询",
                template_type: TemplateType::PriceQuery,
                route: RouteType::Sql,
                pattern: re(r"股价|价格|行情|报价|收盘价|开盘价|市值|涨跌幅|涨幅|跌幅"),
                required: &[Field::Stocks],
                optional: &[Field::Date, Field::Metrics],
                default_limit: None,
                default_metrics: &["close", "pct_chg", "vol", "amount"],
                date_defaults_to_latest: true,
                range_default_days: None,
                supports_exclusions: false,
                example: "贵州茅台的最新股价",
            },
        ];
        Self { templates }
    }

    /// First template whose pattern matches, in catalogue order
    pub fn match_template(&self, query: &str) -> Option<&QueryTemplate> {
        let matched = self.templates.iter().find(|t| t.matches(query));
        if let Some(t) = matched {
            tracing::debug!(template = t.name, "matched template");
        }
        matched
    }

    pub fn iter(&self) -> impl Iterator<Item = &QueryTemplate> {
        self.templates.iter()
    }
}
