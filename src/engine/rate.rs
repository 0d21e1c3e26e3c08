//! Price → implied rate conversion.
//!
//! The set of formulas is closed: an identifier either names one of the
//! variants below or the run fails with a configuration error.

use crate::error::EngineError;

/// A registered price formula.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceFormula {
    /// `rate = 100 - price` (IMM-style index quotes).
    HundredMinusPrice,
    /// `rate = price` (the quote is already a rate).
    RateDirect,
}

impl PriceFormula {
    /// Every accepted identifier. `default` and `100_minus_rate` name the same formula.
    pub const IDS: [(&'static str, PriceFormula); 3] = [
        ("default", PriceFormula::HundredMinusPrice),
        ("100_minus_rate", PriceFormula::HundredMinusPrice),
        ("rate_direct", PriceFormula::RateDirect),
    ];

    pub fn from_id(id: &str) -> Option<Self> {
        Self::IDS
            .iter()
            .find(|(name, _)| *name == id.trim())
            .map(|(_, formula)| *formula)
    }

    /// Resolve a configured identifier, failing with context when it is unknown.
    pub fn resolve(institution: &str, id: &str) -> Result<Self, EngineError> {
        Self::from_id(id).ok_or_else(|| {
            let known: Vec<&str> = Self::IDS.iter().map(|(name, _)| *name).collect();
            EngineError::config(
                institution,
                "futures.price_formula",
                format!("unknown formula `{id}` (expected one of: {})", known.join(", ")),
            )
        })
    }

    pub fn id(self) -> &'static str {
        match self {
            PriceFormula::HundredMinusPrice => "100_minus_rate",
            PriceFormula::RateDirect => "rate_direct",
        }
    }
}

/// Convert a raw futures price to an implied rate (percent).
pub fn convert(price: f64, formula: PriceFormula) -> f64 {
    match formula {
        PriceFormula::HundredMinusPrice => 100.0 - price,
        PriceFormula::RateDirect => price,
    }
}
