//! Discount-aware price computation for carts.
//!
//! Everything that displays or persists a subtotal goes through
//! [`price_cart`] exactly once and reuses the resulting [`CartTotals`].
//! Deriving totals a second time from separately-rounded intermediates is how
//! a summary and a persisted order end up disagreeing by a cent.

use rust_decimal::Decimal;

use driftwood_core::ProductId;

use crate::cart::CartItem;

/// One cart line with its discount applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedLine {
    pub product_id: ProductId,
    pub name: String,
    pub quantity: u32,
    /// Unit price after the percentage discount.
    pub discounted_unit_price: Decimal,
    /// `discounted_unit_price * quantity`.
    pub line_total: Decimal,
}

/// The priced view of a whole cart.
///
/// `total` equals `subtotal`: the store models no taxes or shipping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartTotals {
    pub lines: Vec<PricedLine>,
    pub subtotal: Decimal,
    pub total: Decimal,
}

impl CartTotals {
    /// Totals for an empty cart.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            lines: Vec::new(),
            subtotal: Decimal::ZERO,
            total: Decimal::ZERO,
        }
    }
}

/// Apply a percentage discount (0-100) to a unit price.
///
/// The discount is applied multiplicatively to the unit price and never
/// compounds across recomputation: callers always start from the undiscounted
/// `unit_price` stored on the cart item.
#[must_use]
pub fn discounted_unit_price(unit_price: Decimal, discount_percentage: Decimal) -> Decimal {
    unit_price * (Decimal::ONE - discount_percentage / Decimal::ONE_HUNDRED)
}

/// Price every line of a cart and aggregate the total.
///
/// An empty cart prices to zero; that is a valid cart, not an error.
#[must_use]
pub fn price_cart(items: &[CartItem]) -> CartTotals {
    let lines: Vec<PricedLine> = items
        .iter()
        .map(|item| {
            let unit = discounted_unit_price(item.unit_price, item.discount_percentage);
            PricedLine {
                product_id: item.product_id.clone(),
                name: item.name.clone(),
                quantity: item.quantity,
                discounted_unit_price: unit,
                line_total: unit * Decimal::from(item.quantity),
            }
        })
        .collect();

    let subtotal: Decimal = lines.iter().map(|line| line.line_total).sum();

    CartTotals {
        lines,
        subtotal,
        total: subtotal,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn item(id: &str, price: &str, quantity: u32, discount: &str) -> CartItem {
        CartItem {
            product_id: ProductId::new(id),
            name: format!("Item {id}"),
            unit_price: price.parse().unwrap(),
            quantity,
            discount_percentage: discount.parse().unwrap(),
        }
    }

    #[test]
    fn test_twenty_percent_off_hundred_times_three_is_240() {
        let totals = price_cart(&[item("p1", "100", 3, "20")]);
        assert_eq!(totals.lines.len(), 1);
        assert_eq!(totals.lines[0].discounted_unit_price, dec("80"));
        assert_eq!(totals.lines[0].line_total, dec("240.00"));
        assert_eq!(totals.total, dec("240.00"));
    }

    #[test]
    fn test_empty_cart_is_zero_not_an_error() {
        let totals = price_cart(&[]);
        assert!(totals.lines.is_empty());
        assert_eq!(totals.subtotal, Decimal::ZERO);
        assert_eq!(totals.total, Decimal::ZERO);
    }

    #[test]
    fn test_subtotal_always_equals_total() {
        let totals = price_cart(&[
            item("p1", "19.99", 2, "0"),
            item("p2", "5.25", 1, "50"),
            item("p3", "100", 4, "12.5"),
        ]);
        assert_eq!(totals.subtotal, totals.total);

        let summed: Decimal = totals.lines.iter().map(|l| l.line_total).sum();
        assert_eq!(totals.subtotal, summed);
    }

    #[test]
    fn test_discount_does_not_compound_across_recomputation() {
        let items = [item("p1", "100", 1, "10")];
        let first = price_cart(&items);
        let second = price_cart(&items);
        assert_eq!(first, second);
        assert_eq!(first.total, dec("90"));
    }

    #[test]
    fn test_zero_and_full_discount_bounds() {
        let totals = price_cart(&[item("p1", "40", 1, "0"), item("p2", "40", 1, "100")]);
        assert_eq!(totals.lines[0].line_total, dec("40"));
        assert_eq!(totals.lines[1].line_total, dec("0"));
        assert_eq!(totals.total, dec("40"));
    }
}
