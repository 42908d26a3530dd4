//! Order submission: one validated, one-shot write to the content backend.

use chrono::Utc;
use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

use driftwood_core::{OrderId, OrderStatus, PaymentMethod};

use crate::cart::CartItem;
use crate::pricing;
use crate::sanity::types::{BillingDetails, OrderDocument, OrderLine};
use crate::sanity::{SanityClient, SanityError};

/// Everything the checkout form captured about the customer.
#[derive(Debug, Clone, Default)]
pub struct CustomerDetails {
    pub billing: BillingDetails,
    /// `None` when the customer never picked a payment method; submission
    /// rejects that before doing anything else.
    pub payment_method: Option<PaymentMethod>,
}

/// Why an order submission was rejected or failed.
#[derive(Debug, Error)]
pub enum SubmissionError {
    /// The form is incomplete; nothing was sent anywhere.
    #[error("{0}")]
    Validation(&'static str),

    /// The backend refused or failed to store the order. Not retried: the
    /// order must not be assumed to exist.
    #[error("failed to save order: {0}")]
    Persistence(#[from] SanityError),
}

/// What the caller should do after a successful submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderReceipt {
    /// Terminal: acknowledge the order, nothing else to do.
    CashOnDelivery { order_id: OrderId },
    /// Send the customer to the payment step for this amount.
    CardPayment { order_id: OrderId, amount: Decimal },
}

/// Shown when the form is submitted without a payment method.
pub const PAYMENT_METHOD_REQUIRED: &str = "Please select a payment method.";

/// Submit an order built from the live cart.
///
/// The payment-method check happens before any network interaction. Pricing
/// is computed exactly once from the cart as it exists now - never from
/// numbers a page rendered earlier. Persisting the document is the single
/// side-effecting step, and the cash/card branch happens strictly after it
/// succeeds, so a payment failure can never leave an order unrecorded.
///
/// # Errors
///
/// `SubmissionError::Validation` when no payment method is selected;
/// `SubmissionError::Persistence` when the backend write fails.
pub async fn submit_order(
    sanity: &SanityClient,
    details: CustomerDetails,
    cart: &[CartItem],
) -> Result<OrderReceipt, SubmissionError> {
    let payment_method = details
        .payment_method
        .ok_or(SubmissionError::Validation(PAYMENT_METHOD_REQUIRED))?;

    let totals = pricing::price_cart(cart);

    let lines = totals
        .lines
        .iter()
        .map(|line| OrderLine {
            line_type: OrderLine::TYPE,
            // Fresh key per line, independent of the product ID.
            key: Uuid::new_v4().to_string(),
            product_id: line.product_id.clone(),
            quantity: line.quantity,
            discounted_unit_price: line.discounted_unit_price,
        })
        .collect();

    let document = OrderDocument {
        doc_type: OrderDocument::TYPE,
        billing: details.billing,
        payment_method,
        lines,
        subtotal: totals.subtotal,
        total: totals.total,
        status: OrderStatus::Pending,
        created_at: Utc::now(),
    };

    let order_id = sanity.create_order(&document).await?;

    tracing::info!(
        order_id = %order_id,
        payment_method = %payment_method,
        total = %totals.total,
        "Order persisted"
    );

    if payment_method.requires_payment_step() {
        Ok(OrderReceipt::CardPayment {
            order_id,
            amount: totals.total,
        })
    } else {
        Ok(OrderReceipt::CashOnDelivery { order_id })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use secrecy::SecretString;

    use driftwood_core::ProductId;

    use crate::config::SanityConfig;

    /// A client pointed at a port nothing listens on: any attempt to talk to
    /// the network fails fast and loudly.
    fn unreachable_client() -> SanityClient {
        SanityClient::new(&SanityConfig {
            project_id: "test".to_string(),
            dataset: "test".to_string(),
            api_version: "2021-06-07".to_string(),
            api_token: SecretString::from("token"),
            api_base: Some("http://127.0.0.1:9".to_string()),
        })
    }

    fn cart_item() -> CartItem {
        CartItem {
            product_id: ProductId::new("p1"),
            name: "Oak Table".to_string(),
            unit_price: Decimal::from(100),
            quantity: 3,
            discount_percentage: Decimal::from(20),
        }
    }

    #[tokio::test]
    async fn test_missing_payment_method_fails_before_any_network_call() {
        let details = CustomerDetails {
            payment_method: None,
            ..CustomerDetails::default()
        };

        // The client cannot reach anything; a validation failure proves no
        // request was attempted.
        let result = submit_order(&unreachable_client(), details, &[cart_item()]).await;

        match result {
            Err(SubmissionError::Validation(message)) => {
                assert_eq!(message, PAYMENT_METHOD_REQUIRED);
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_persistence_failure_is_surfaced_not_retried() {
        let details = CustomerDetails {
            payment_method: Some(PaymentMethod::CashOnDelivery),
            ..CustomerDetails::default()
        };

        let result = submit_order(&unreachable_client(), details, &[cart_item()]).await;
        assert!(matches!(result, Err(SubmissionError::Persistence(_))));
    }
}
