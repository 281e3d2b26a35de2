//! Shared fixtures for integration tests
#![allow(dead_code)]

use chrono::NaiveDate;
use query_core::{ParameterExtractor, QueryValidator, StockTable, WeekdayCalendar};
use query_utils::EngineConfig;
use std::sync::Arc;

/// Anchor date for all tests, a Monday
pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 8, 25).expect("valid date")
}

/// Seeded reference table covering main board, STAR, ChiNext, BSE, and
/// ST names
pub fn directory() -> Arc<StockTable> {
    Arc::new(StockTable::from_pairs(vec![
        ("600519.SH", "贵州茅台"),
        ("000858.SZ", "五粮液"),
        ("000568.SZ", "泸州老窖"),
        ("000002.SZ", "万科A"),
        ("000012.SZ", "南玻A"),
        ("000025.SZ", "特力A"),
        ("000001.SZ", "平安银行"),
        ("300750.SZ", "宁德时代"),
        ("601318.SH", "中国平安"),
        ("688009.SH", "中国通号"),
        ("002594.SZ", "比亚迪"),
        ("430047.BJ", "诺思兰德"),
        ("831726.BJ", "朱老六"),
        ("920002.BJ", "万达轴承"),
        ("000070.SZ", "ST特信"),
        ("000430.SZ", "ST张家界"),
        ("000004.SZ", "*ST国华"),
        ("000504.SZ", "*ST生物"),
        ("600036.SH", "招商银行"),
        ("601939.SH", "建设银行"),
        ("601398.SH", "工商银行"),
    ]))
}

pub fn extractor() -> ParameterExtractor {
    ParameterExtractor::new(directory(), Arc::new(WeekdayCalendar::new(today())))
}

pub fn validator() -> QueryValidator {
    QueryValidator::new(EngineConfig::default()).with_today(today())
}
