//! Shared utilities for stock-query-rs
//!
//! This crate provides common functionality used across the stock-query-rs
//! workspace, including logging setup and engine configuration.

pub mod config;
pub mod logging;

pub use config::EngineConfig;
pub use logging::init_tracing;
