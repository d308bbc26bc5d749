//! Core business logic: quote series, normalization and strategy math

pub mod cache;
pub mod calculator;
pub mod comparison;
pub mod config;
pub mod error;
pub mod facade;
pub mod log;
pub mod normalize;
pub mod quote;
pub mod strategy;
pub mod symbol;

// Re-export main types for cleaner imports
pub use error::CalcError;
pub use facade::QuoteService;
pub use quote::{DateRange, Quote, QuoteProvider, QuoteSeries};
pub use strategy::{Frequency, StrategyResult};
