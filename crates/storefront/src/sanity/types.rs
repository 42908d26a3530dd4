//! Document and response types for the content backend.
//!
//! Field names follow the studio schema (camelCase); the `_type` and `_key`
//! discriminators are what the backend requires on documents and array
//! members respectively.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use driftwood_core::{OrderStatus, PaymentMethod, ProductId};

/// A product as projected out of the content backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    /// Percentage discount (0-100); products without one read as zero.
    #[serde(default, with = "rust_decimal::serde::float")]
    pub discount_percentage: Decimal,
}

/// Billing fields captured by the checkout form.
///
/// Every field is free text; the form does not validate shapes beyond
/// presence of a payment method (which lives outside this struct).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingDetails {
    pub first_name: String,
    pub last_name: String,
    pub company_name: String,
    pub country_region: String,
    pub street_address: String,
    pub city: String,
    pub postal_code: String,
    pub phone: String,
    pub email: String,
    pub additional_notes: String,
}

/// One order line: a snapshot of a cart item at order-creation time.
///
/// `key` is a fresh random token minted per line (the backend requires a
/// `_key` on array members); it is independent of the product ID.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    #[serde(rename = "_type")]
    pub line_type: &'static str,
    #[serde(rename = "_key")]
    pub key: String,
    pub product_id: ProductId,
    pub quantity: u32,
    #[serde(with = "rust_decimal::serde::float")]
    pub discounted_unit_price: Decimal,
}

impl OrderLine {
    /// The `_type` value for order lines in the studio schema.
    pub const TYPE: &'static str = "orderLine";
}

/// The order aggregate as persisted to the content backend.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDocument {
    #[serde(rename = "_type")]
    pub doc_type: &'static str,
    #[serde(flatten)]
    pub billing: BillingDetails,
    pub payment_method: PaymentMethod,
    pub lines: Vec<OrderLine>,
    #[serde(with = "rust_decimal::serde::float")]
    pub subtotal: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

impl OrderDocument {
    /// The `_type` value for orders in the studio schema.
    pub const TYPE: &'static str = "order";
}

// =============================================================================
// API response shapes
// =============================================================================

/// Response envelope for query requests.
#[derive(Debug, Deserialize)]
pub(super) struct QueryResponse<T> {
    pub result: T,
}

/// Response envelope for mutation requests (with `returnIds=true`).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct MutateResponse {
    #[serde(default)]
    pub results: Vec<MutateResult>,
}

#[derive(Debug, Deserialize)]
pub(super) struct MutateResult {
    pub id: String,
}

/// Error envelope returned by the content API on non-success statuses.
#[derive(Debug, Deserialize)]
pub(super) struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Deserialize)]
pub(super) struct ErrorBody {
    pub description: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_product_discount_defaults_to_zero() {
        let product: Product =
            serde_json::from_str(r#"{"id": "p1", "name": "Oak Table", "price": 129.5}"#).unwrap();
        assert_eq!(product.discount_percentage, Decimal::ZERO);
        assert_eq!(product.price, Decimal::new(1295, 1));
    }

    #[test]
    fn test_product_reads_camel_case_discount() {
        let product: Product = serde_json::from_str(
            r#"{"id": "p1", "name": "Oak Table", "price": 100, "discountPercentage": 20}"#,
        )
        .unwrap();
        assert_eq!(product.discount_percentage, Decimal::from(20));
    }

    #[test]
    fn test_order_document_shape() {
        let doc = OrderDocument {
            doc_type: OrderDocument::TYPE,
            billing: BillingDetails {
                first_name: "Ada".to_string(),
                email: "ada@example.com".to_string(),
                ..BillingDetails::default()
            },
            payment_method: PaymentMethod::CashOnDelivery,
            lines: vec![OrderLine {
                line_type: OrderLine::TYPE,
                key: "k-1".to_string(),
                product_id: ProductId::new("p1"),
                quantity: 3,
                discounted_unit_price: Decimal::from(80),
            }],
            subtotal: Decimal::from(240),
            total: Decimal::from(240),
            status: OrderStatus::Pending,
            created_at: Utc::now(),
        };

        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(value["_type"], "order");
        assert_eq!(value["firstName"], "Ada");
        assert_eq!(value["paymentMethod"], "cash_on_delivery");
        assert_eq!(value["status"], "pending");
        assert_eq!(value["lines"][0]["_type"], "orderLine");
        assert_eq!(value["lines"][0]["_key"], "k-1");
        assert_eq!(value["lines"][0]["productId"], "p1");
        assert_eq!(value["lines"][0]["discountedUnitPrice"], 80.0);
        assert_eq!(value["subtotal"], 240.0);
        assert_eq!(value["total"], 240.0);
    }
}
