//! End-to-end extraction scenarios

mod common;

use common::extractor;
use query_core::OrderDirection;

#[test]
fn latest_price_query_fills_date_default() {
    let params = extractor().extract("贵州茅台的最新股价");
    assert_eq!(params.template.as_deref(), Some("最新股价查询"));
    assert_eq!(params.stocks, vec!["600519.SH"]);
    assert_eq!(params.stock_names, vec!["贵州茅台"]);
    assert_eq!(params.date.as_deref(), Some("2025-08-25"));
    assert!(params.error.is_none());
}

#[test]
fn explicit_code_with_range() {
    let params = extractor().extract("600519.SH最近30天的K线");
    assert_eq!(params.stocks, vec!["600519.SH"]);
    assert_eq!(
        params.date_range,
        Some(("2025-07-15".to_string(), "2025-08-25".to_string()))
    );
    assert!(params.date.is_none());
}

#[test]
fn two_stocks_with_trading_day_window() {
    let params = extractor().extract("贵州茅台和五粮液最近30天的走势");
    assert_eq!(params.template.as_deref(), Some("历史K线查询"));
    assert_eq!(params.stocks, vec!["600519.SH", "000858.SZ"]);
    // Exactly 30 trading days ending at the latest trading day
    assert_eq!(
        params.date_range,
        Some(("2025-07-15".to_string(), "2025-08-25".to_string()))
    );
    assert!(params.error.is_none());
}

#[test]
fn market_cap_ranking_with_exclusion() {
    let params = extractor().extract("市值最大的前20只股票，排除ST");
    assert!(params.stocks.is_empty());
    assert_eq!(params.limit, 20);
    assert_eq!(params.order_by, OrderDirection::Desc);
    assert_eq!(params.order_field.as_deref(), Some("market_cap"));
    assert!(params.exclude_st);
    assert!(!params.exclude_bj);
}

#[test]
fn sector_annual_report_ranking() {
    let params = extractor().extract("银行板块2024年年报净利润排名前20，排除ST和北交所");
    assert_eq!(params.sector.as_deref(), Some("银行"));
    assert_eq!(params.period.as_deref(), Some("20241231"));
    assert_eq!(params.limit, 20);
    assert_eq!(params.order_field.as_deref(), Some("n_income"));
    assert!(params.exclude_st);
    assert!(params.exclude_bj);
    assert!(params.stocks.is_empty());
}

#[test]
fn bare_code_resolves_by_leading_digit() {
    let params = extractor().extract("000001的成交量");
    assert_eq!(params.stocks, vec!["000001.SZ"]);
    assert_eq!(params.stock_names, vec!["平安银行"]);
    assert_eq!(params.template.as_deref(), Some("历史交易量查询"));
}

#[test]
fn bse_code_passes_through() {
    let params = extractor().extract("430047.BJ的行情");
    assert_eq!(params.stocks, vec!["430047.BJ"]);
    assert_eq!(params.stock_names, vec!["诺思兰德"]);
}

#[test]
fn name_with_parenthesized_code_dedupes() {
    let params = extractor().extract("贵州茅台（600519）的股价");
    assert_eq!(params.stocks, vec!["600519.SH"]);
}

#[test]
fn comparison_of_three_stocks() {
    let params = extractor().extract("贵州茅台、五粮液、泸州老窖的市盈率对比");
    assert_eq!(params.template.as_deref(), Some("股票对比"));
    assert_eq!(
        params.stocks,
        vec!["600519.SH", "000858.SZ", "000568.SZ"]
    );
    assert_eq!(params.metrics, vec!["pe_ttm"]);
}

#[test]
fn suffix_named_stocks_resolve() {
    let params = extractor().extract("万科A和南玻A的对比");
    assert_eq!(params.stocks, vec!["000002.SZ", "000012.SZ"]);
}

#[test]
fn st_names_resolve_with_prefix() {
    let params = extractor().extract("ST特信和*ST国华的股价");
    assert_eq!(params.stocks, vec!["000070.SZ", "000004.SZ"]);
    assert_eq!(params.stock_names, vec!["ST特信", "*ST国华"]);
}

#[test]
fn ranking_with_exclusions() {
    let params = extractor().extract("涨幅排名前10，排除ST和北交所");
    assert_eq!(params.template.as_deref(), Some("排名查询"));
    assert!(params.stocks.is_empty());
    assert_eq!(params.limit, 10);
    assert_eq!(params.order_field.as_deref(), Some("pct_chg"));
    assert_eq!(params.order_by, OrderDirection::Desc);
    assert!(params.exclude_st);
    assert!(params.exclude_bj);
}

#[test]
fn chinese_numeral_limit() {
    let params = extractor().extract("市值最大的二十只股票");
    assert_eq!(params.limit, 20);
    assert_eq!(params.order_field.as_deref(), Some("market_cap"));
    assert_eq!(params.order_by, OrderDirection::Desc);
}

#[test]
fn quarterly_report_period() {
    let params = extractor().extract("贵州茅台2024年第一季度的利润");
    assert_eq!(params.template.as_deref(), Some("利润查询"));
    assert_eq!(params.period.as_deref(), Some("20240331"));
    assert_eq!(params.stocks, vec!["600519.SH"]);
}

#[test]
fn explicit_date_range() {
    let params = extractor().extract("贵州茅台从2025-01-01到2025-03-31的K线");
    assert_eq!(
        params.date_range,
        Some(("2025-01-01".to_string(), "2025-03-31".to_string()))
    );
}

#[test]
fn relative_single_date() {
    let params = extractor().extract("贵州茅台昨天的收盘价");
    // Friday before Monday 2025-08-25
    assert_eq!(params.date.as_deref(), Some("2025-08-22"));
    assert_eq!(params.metrics, vec!["close"]);
}

#[test]
fn last_calendar_month_becomes_range() {
    let params = extractor().extract("平安银行上个月的K线");
    assert_eq!(params.stocks, vec!["000001.SZ"]);
    assert_eq!(
        params.date_range,
        Some(("2025-07-01".to_string(), "2025-07-31".to_string()))
    );
}

#[test]
fn duration_word_with_qian_prefix() {
    let params = extractor().extract("贵州茅台前一个月的K线");
    assert_eq!(params.stocks, vec!["600519.SH"]);
    // 30 calendar days ending at the latest trading day
    assert_eq!(
        params.date_range,
        Some(("2025-07-26".to_string(), "2025-08-25".to_string()))
    );
}

#[test]
fn whole_year_becomes_range() {
    let params = extractor().extract("比亚迪2024年的走势");
    assert_eq!(params.stocks, vec!["002594.SZ"]);
    assert_eq!(
        params.date_range,
        Some(("2024-01-01".to_string(), "2024-12-31".to_string()))
    );
}

#[test]
fn sector_money_flow() {
    let params = extractor().extract("白酒板块的主力资金流向排行");
    assert_eq!(params.template.as_deref(), Some("主力净流入排行"));
    assert_eq!(params.sector.as_deref(), Some("白酒"));
    assert_eq!(params.limit, 10);
}

#[test]
fn shorthand_name_is_rejected_with_hint() {
    let params = extractor().extract("茅台的股价");
    assert!(params.stocks.is_empty());
    assert_eq!(
        params.error.as_deref(),
        Some("请使用完整公司名称，如：贵州茅台")
    );
}

#[test]
fn bank_shorthand_is_rejected() {
    let params = extractor().extract("招行的市值");
    assert!(params.stocks.is_empty());
    assert_eq!(
        params.error.as_deref(),
        Some("请使用完整公司名称，如：招商银行")
    );
}

#[test]
fn lowercase_suffix_reports_case_error() {
    let params = extractor().extract("查询600519.sh的股价");
    assert!(params.stocks.is_empty());
    assert_eq!(
        params.error.as_deref(),
        Some("证券代码后缀大小写错误，应为.SH")
    );
}

#[test]
fn unlisted_demanded_code_is_unrecognized() {
    let params = extractor().extract("999999的市值");
    assert!(params.stocks.is_empty());
    assert!(params
        .error
        .as_deref()
        .is_some_and(|e| e.starts_with("无法识别输入内容")));
}

#[test]
fn generic_sector_query_extracts_no_stocks() {
    let params = extractor().extract("所有银行股的列表");
    assert!(params.stocks.is_empty());
    assert!(params.error.is_none());
}
