//! Status and payment-method enums for orders.

use serde::{Deserialize, Serialize};

/// Order lifecycle status as stored in the content backend.
///
/// The storefront only ever writes `Pending`; later transitions (payment
/// capture, fulfillment) happen in the backend and are read-only from here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Paid,
    Fulfilled,
    Cancelled,
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Paid => write!(f, "paid"),
            Self::Fulfilled => write!(f, "fulfilled"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Error returned when parsing a [`PaymentMethod`] from a string.
#[derive(Debug, Clone, thiserror::Error)]
#[error("invalid payment method: {0}")]
pub struct ParsePaymentMethodError(String);

/// How the customer chose to pay.
///
/// The checkout form constrains the selection to this set; anything else is
/// a validation failure before any network call is made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Pay the courier on delivery; the order is complete once persisted.
    CashOnDelivery,
    /// Card payment through the payment provider's intent flow.
    Card,
}

impl PaymentMethod {
    /// Whether this method routes the customer through the payment provider.
    #[must_use]
    pub const fn requires_payment_step(self) -> bool {
        matches!(self, Self::Card)
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CashOnDelivery => write!(f, "cash_on_delivery"),
            Self::Card => write!(f, "card"),
        }
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = ParsePaymentMethodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cash_on_delivery" => Ok(Self::CashOnDelivery),
            "card" => Ok(Self::Card),
            other => Err(ParsePaymentMethodError(other.to_owned())),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_order_status_serializes_snake_case() {
        let json = serde_json::to_string(&OrderStatus::Pending).unwrap();
        assert_eq!(json, "\"pending\"");
    }

    #[test]
    fn test_payment_method_roundtrip() {
        for method in [PaymentMethod::CashOnDelivery, PaymentMethod::Card] {
            let parsed = PaymentMethod::from_str(&method.to_string()).unwrap();
            assert_eq!(parsed, method);
        }
    }

    #[test]
    fn test_payment_method_rejects_unknown() {
        assert!(PaymentMethod::from_str("direct_bank_transfer").is_err());
        assert!(PaymentMethod::from_str("").is_err());
    }

    #[test]
    fn test_requires_payment_step() {
        assert!(PaymentMethod::Card.requires_payment_step());
        assert!(!PaymentMethod::CashOnDelivery.requires_payment_step());
    }
}
