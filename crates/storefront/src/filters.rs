//! Custom Askama template filters.

#![allow(clippy::unnecessary_wraps)]

use std::fmt::Display;

use driftwood_core::CurrencyCode;

/// The store sells in a single currency.
const STORE_CURRENCY: CurrencyCode = CurrencyCode::USD;

/// Format a decimal amount as a price with two decimal places.
///
/// Usage in templates: `{{ totals.subtotal|money }}`
#[allow(clippy::unnecessary_wraps)]
#[askama::filter_fn]
pub fn money(value: impl Display, _env: &dyn askama::Values) -> askama::Result<String> {
    Ok(format!("{}{value:.2}", STORE_CURRENCY.symbol()))
}

/// Returns the current year.
///
/// Usage in templates: `{{ ""|current_year }}`
#[allow(clippy::unnecessary_wraps)]
#[askama::filter_fn]
pub fn current_year(_value: impl Display, _env: &dyn askama::Values) -> askama::Result<i32> {
    use chrono::Datelike;
    Ok(chrono::Utc::now().year())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    #[test]
    fn test_money_pads_to_two_decimals() {
        assert_eq!(format!("${:.2}", Decimal::from(240)), "$240.00");
        assert_eq!(format!("${:.2}", Decimal::new(1250, 2)), "$12.50");
    }
}
