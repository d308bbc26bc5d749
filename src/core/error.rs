//! Typed failures raised by the calculation and normalization core.

use thiserror::Error;

/// Errors exposed by the core. Provider and CLI code wraps these in
/// `anyhow::Error` via `?`.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CalcError {
    #[error("invalid parameter '{field}': {reason}")]
    InvalidParameter { field: &'static str, reason: String },

    #[error("invalid symbol '{0}'")]
    InvalidSymbol(String),

    #[error("no currency data for pair {pair} in the requested period")]
    NoCurrencyData { pair: String },
}

impl CalcError {
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        CalcError::InvalidParameter {
            field,
            reason: reason.into(),
        }
    }
}

/// Rejects negative or non-finite amounts.
pub fn ensure_amount(field: &'static str, value: f64) -> Result<(), CalcError> {
    if !value.is_finite() {
        return Err(CalcError::invalid(field, "must be finite"));
    }
    if value < 0.0 {
        return Err(CalcError::invalid(
            field,
            format!("must be non-negative, got {value}"),
        ));
    }
    Ok(())
}
