//! Symbol-shape conventions understood by the quote service.

use crate::core::error::CalcError;
use std::collections::HashMap;

/// Prefix of synthetic fixed-income symbols, e.g. `FIXED-BRL-10.5`.
pub const SYNTHETIC_PREFIX: &str = "FIXED-";

/// How a symbol must be resolved.
#[derive(Debug, Clone, PartialEq)]
pub enum Symbol<'a> {
    /// Modelled fixed-rate instrument denominated in `currency`.
    Synthetic { currency: String, annual_rate: f64 },
    /// Equity listed on a foreign market quoted in `currency`.
    Foreign { symbol: &'a str, currency: String },
    /// Anything else, fetched as-is.
    Plain(&'a str),
}

impl<'a> Symbol<'a> {
    /// Classifies `raw` using `markets`, a map from market suffix (the part
    /// after the last `.`) to the currency that market quotes in.
    pub fn parse(raw: &'a str, markets: &HashMap<String, String>) -> Result<Self, CalcError> {
        if let Some(rest) = raw.strip_prefix(SYNTHETIC_PREFIX) {
            return parse_synthetic(raw, rest);
        }

        if let Some((ticker, market)) = raw.rsplit_once('.')
            && !ticker.is_empty()
            && let Some(currency) = markets.get(&market.to_uppercase())
        {
            return Ok(Symbol::Foreign {
                symbol: raw,
                currency: currency.to_uppercase(),
            });
        }

        Ok(Symbol::Plain(raw))
    }
}

fn parse_synthetic<'a>(raw: &str, rest: &str) -> Result<Symbol<'a>, CalcError> {
    let (currency, rate) = rest
        .split_once('-')
        .ok_or_else(|| CalcError::InvalidSymbol(raw.to_string()))?;

    if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(CalcError::InvalidSymbol(raw.to_string()));
    }

    let annual_rate: f64 = rate.parse().map_err(|_| {
        CalcError::invalid(
            "annual_rate_percent",
            format!("'{rate}' in symbol {raw} is not a number"),
        )
    })?;

    Ok(Symbol::Synthetic {
        currency: currency.to_uppercase(),
        annual_rate,
    })
}

/// Symbol of the series quoting `currency` units per US dollar.
pub fn currency_pair_symbol(currency: &str) -> String {
    format!("{currency}=X")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn markets() -> HashMap<String, String> {
        HashMap::from([("SA".to_string(), "BRL".to_string())])
    }

    #[test]
    fn test_parse_synthetic() {
        assert_eq!(
            Symbol::parse("FIXED-BRL-6.17", &markets()).unwrap(),
            Symbol::Synthetic {
                currency: "BRL".to_string(),
                annual_rate: 6.17
            }
        );
        assert_eq!(
            Symbol::parse("FIXED-eur-3", &markets()).unwrap(),
            Symbol::Synthetic {
                currency: "EUR".to_string(),
                annual_rate: 3.0
            }
        );
    }

    #[test]
    fn test_parse_malformed_synthetic() {
        assert!(matches!(
            Symbol::parse("FIXED-BRL-abc", &markets()),
            Err(CalcError::InvalidParameter { .. })
        ));
        assert!(matches!(
            Symbol::parse("FIXED-BRL", &markets()),
            Err(CalcError::InvalidSymbol(_))
        ));
        assert!(matches!(
            Symbol::parse("FIXED-BR1-5", &markets()),
            Err(CalcError::InvalidSymbol(_))
        ));
    }

    #[test]
    fn test_parse_foreign() {
        assert_eq!(
            Symbol::parse("PETR4.SA", &markets()).unwrap(),
            Symbol::Foreign {
                symbol: "PETR4.SA",
                currency: "BRL".to_string()
            }
        );
        assert_eq!(
            Symbol::parse("VOD.L", &markets()).unwrap(),
            Symbol::Plain("VOD.L")
        );
    }

    #[test]
    fn test_parse_plain() {
        for raw in ["BTC-USD", "^GSPC", "GC=F", "AAPL", ".SA"] {
            assert_eq!(Symbol::parse(raw, &markets()).unwrap(), Symbol::Plain(raw));
        }
    }

    #[test]
    fn test_currency_pair_symbol() {
        assert_eq!(currency_pair_symbol("BRL"), "BRL=X");
    }
}
