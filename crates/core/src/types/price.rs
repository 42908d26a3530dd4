//! Currency types for money display and the payment provider boundary.
//!
//! Amounts themselves travel as `rust_decimal::Decimal`; money never touches
//! floating point inside the system. The only unit conversion (decimal
//! dollars to integer cents) lives with the payment provider client, not
//! here.

use serde::{Deserialize, Serialize};

/// ISO 4217 currency codes.
///
/// The store currently sells in a single currency; the enum exists so the
/// provider boundary and display formatting agree on what that currency is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    USD,
    EUR,
    GBP,
    CAD,
    AUD,
}

impl CurrencyCode {
    /// The display symbol for the currency.
    #[must_use]
    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::USD | Self::CAD | Self::AUD => "$",
            Self::EUR => "\u{20ac}",
            Self::GBP => "\u{a3}",
        }
    }

    /// The lowercase ISO 4217 code, as the payment provider expects it.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::USD => "usd",
            Self::EUR => "eur",
            Self::GBP => "gbp",
            Self::CAD => "cad",
            Self::AUD => "aud",
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_currency_code_lowercase_for_provider() {
        assert_eq!(CurrencyCode::USD.code(), "usd");
        assert_eq!(CurrencyCode::GBP.code(), "gbp");
    }

    #[test]
    fn test_currency_symbols() {
        assert_eq!(CurrencyCode::USD.symbol(), "$");
        assert_eq!(CurrencyCode::EUR.symbol(), "\u{20ac}");
    }
}
