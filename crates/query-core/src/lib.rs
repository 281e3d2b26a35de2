//! Parameter extraction and validation engine for Chinese stock queries
//!
//! Takes natural-language queries like "比较贵州茅台和五粮液的市值" or
//! "涨幅排名前10，排除ST" and produces a structured, validated parameter
//! set: resolved `ts_code` identifiers, dates and ranges anchored on a
//! trading calendar, report periods, metrics, limits, and exclusions.
//!
//! The engine is stateless and synchronous. Reference data comes in
//! through three seams the host implements: [`StockDirectory`] for the
//! listed-stock table, [`TradingCalendar`] for the exchange calendar, and
//! [`SectorCodeMap`] for optional sector classification codes.
//!
//! ```
//! use query_core::{ParameterExtractor, StockTable, WeekdayCalendar};
//! use chrono::NaiveDate;
//! use std::sync::Arc;
//!
//! let directory = Arc::new(StockTable::from_pairs(vec![("600519.SH", "贵州茅台")]));
//! let today = NaiveDate::from_ymd_opt(2025, 8, 25).expect("valid date");
//! let calendar = Arc::new(WeekdayCalendar::new(today));
//!
//! let extractor = ParameterExtractor::new(directory, calendar);
//! let params = extractor.extract("贵州茅台的最新股价");
//! assert_eq!(params.stocks, vec!["600519.SH"]);
//! ```

pub mod calendar;
pub mod dates;
pub mod error;
pub mod extractor;
pub mod numerals;
pub mod router;
pub mod stocks;
pub mod templates;
pub mod validator;

pub use calendar::{CachedCalendar, TradingCalendar, WeekdayCalendar};
pub use dates::DateResolver;
pub use error::ResolveError;
pub use extractor::{ExtractedParams, OrderDirection, ParameterExtractor, SectorCodeMap};
pub use router::{QueryIntent, QueryRouter};
pub use stocks::{ResolvedStock, StockDirectory, StockResolver, StockTable};
pub use templates::{Field, QueryTemplate, RouteType, TemplateLibrary, TemplateType};
pub use validator::{QueryValidator, ValidationErrorCode, ValidationResult};
