//! Command-line interface for the stock query parameter engine
//!
//! Reads one Chinese query, runs extraction and validation against a
//! stock table loaded from JSON (or a small built-in sample), and prints
//! the structured result as JSON.

use anyhow::Context;
use chrono::{Local, NaiveDate};
use clap::Parser;
use query_core::{
    ParameterExtractor, QueryRouter, QueryValidator, StockTable, WeekdayCalendar,
};
use query_utils::EngineConfig;
use serde_json::json;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "query-cli")]
#[command(about = "Extract and validate parameters from Chinese stock queries", long_about = None)]
struct Args {
    /// Query text, e.g. "贵州茅台的最新股价"
    query: String,

    /// Stock table JSON file: {"600519.SH": "贵州茅台", ...}
    #[arg(short, long)]
    stocks: Option<PathBuf>,

    /// Engine configuration JSON file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Pin "today" (YYYY-MM-DD) instead of the system date
    #[arg(short, long)]
    today: Option<NaiveDate>,

    /// Also run the enhanced business-rule checks
    #[arg(long)]
    enhanced: bool,
}

/// Small built-in table so the CLI works without a data file
fn sample_table() -> StockTable {
    StockTable::from_pairs(vec![
        ("600519.SH", "贵州茅台"),
        ("000858.SZ", "五粮液"),
        ("000001.SZ", "平安银行"),
        ("000002.SZ", "万科A"),
        ("300750.SZ", "宁德时代"),
        ("601318.SH", "中国平安"),
        ("002594.SZ", "比亚迪"),
    ])
}

fn load_table(path: &PathBuf) -> anyhow::Result<StockTable> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading stock table {}", path.display()))?;
    let pairs: std::collections::HashMap<String, String> =
        serde_json::from_str(&raw).context("stock table must map ts_code to name")?;
    Ok(StockTable::from_pairs(pairs))
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<EngineConfig> {
    match path {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            serde_json::from_str(&raw).context("invalid engine config")
        }
        None => Ok(EngineConfig::default()),
    }
}

fn main() -> anyhow::Result<()> {
    query_utils::init_tracing();

    let args = Args::parse();
    let today = args.today.unwrap_or_else(|| Local::now().date_naive());

    let table = match &args.stocks {
        Some(path) => load_table(path)?,
        None => sample_table(),
    };
    info!(stocks = table.len(), %today, "engine ready");

    let config = load_config(args.config.as_ref())?;
    let extractor = ParameterExtractor::new(
        Arc::new(table),
        Arc::new(WeekdayCalendar::new(today)),
    );
    let validator = QueryValidator::new(config).with_today(today);
    let router = QueryRouter::new();

    let params = extractor.extract(&args.query);
    let validation = if args.enhanced {
        validator.validate_enhanced(&args.query, &params)
    } else {
        validator.validate_params(&params)
    };
    let intent = router.classify(&args.query);

    let output = json!({
        "query": args.query,
        "intent": intent.handler_name(),
        "params": params,
        "validation": validation,
        "message": QueryValidator::user_friendly_message(&validation),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}
