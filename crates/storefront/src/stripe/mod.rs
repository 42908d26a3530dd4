//! Payment provider (Stripe) API client.
//!
//! Talks to the form-encoded payment-intents API with the secret key. Two
//! calls matter to the checkout flow: creating an intent for an amount, and
//! confirming it with the payment-method token the browser-side elements
//! produced.
//!
//! The decimal-dollars to integer-cents conversion the provider requires is
//! isolated in [`minor_units`]; nothing else in the codebase converts money
//! units.

use std::sync::Arc;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;
use tracing::instrument;

use driftwood_core::{CurrencyCode, PaymentIntentId};

use crate::config::StripeConfig;

/// Hosted API base used when no override is configured.
const DEFAULT_API_BASE: &str = "https://api.stripe.com";

/// Errors that can occur when interacting with the payment provider.
#[derive(Debug, Error)]
pub enum StripeError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response. The message is the provider's own
    /// wording and is shown to the customer verbatim on confirmation
    /// failures.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Failed to parse a response body.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// The provider returned an intent without a client secret.
    #[error("payment intent response missing client secret")]
    MissingClientSecret,

    /// The amount cannot be expressed in minor units.
    #[error("amount not representable in minor units: {0}")]
    InvalidAmount(Decimal),
}

/// A provider-issued handle for an authorized-but-unconfirmed charge.
///
/// Held in memory for the duration of one confirmation attempt; never
/// persisted anywhere by the storefront.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentIntent {
    pub id: PaymentIntentId,
    pub client_secret: String,
}

/// Outcome of a confirmation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentOutcome {
    pub id: PaymentIntentId,
    /// Provider-side status, e.g. `succeeded` or `processing`.
    pub status: String,
}

/// Convert a decimal currency amount into the provider's integer minor units.
///
/// A `$12.50` charge becomes `1250`. This multiplication-by-100 contract is
/// the provider's, not a business rule; keep every unit conversion behind
/// this one function.
///
/// # Errors
///
/// Returns `StripeError::InvalidAmount` if the amount does not fit an `i64`
/// after conversion.
pub fn minor_units(amount: Decimal) -> Result<i64, StripeError> {
    (amount * Decimal::ONE_HUNDRED)
        .round_dp(0)
        .to_i64()
        .ok_or(StripeError::InvalidAmount(amount))
}

/// Client for the payment provider HTTP API.
#[derive(Clone)]
pub struct StripeClient {
    inner: Arc<StripeClientInner>,
}

struct StripeClientInner {
    client: reqwest::Client,
    api_base: String,
    secret_key: SecretString,
}

impl StripeClient {
    /// Create a new payment provider client.
    #[must_use]
    pub fn new(config: &StripeConfig) -> Self {
        let api_base = config
            .api_base
            .clone()
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());

        Self {
            inner: Arc::new(StripeClientInner {
                client: reqwest::Client::new(),
                api_base,
                secret_key: config.secret_key.clone(),
            }),
        }
    }

    /// POST a form-encoded request and decode the response, mapping provider
    /// error envelopes (`{"error": {"message": ...}}`) to `StripeError::Api`.
    async fn post_form<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, StripeError> {
        let url = format!("{}{path}", self.inner.api_base);
        let response = self
            .inner
            .client
            .post(url)
            .bearer_auth(self.inner.secret_key.expose_secret())
            .form(params)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ApiErrorResponse>(&text).map_or_else(
                |_| text.chars().take(200).collect::<String>(),
                |e| e.error.message,
            );
            tracing::warn!(
                status = %status,
                message = %message,
                "Payment API returned non-success status"
            );
            return Err(StripeError::Api {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_str(&text).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %text.chars().take(500).collect::<String>(),
                "Failed to parse payment API response"
            );
            StripeError::Parse(e)
        })
    }

    /// Create a payment intent for an amount already converted to minor
    /// units.
    ///
    /// Callers guard against non-positive amounts before reaching this; the
    /// client itself does no amount policy.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails, the provider rejects it, or
    /// the response carries no client secret.
    #[instrument(skip(self))]
    pub async fn create_payment_intent(
        &self,
        amount_minor: i64,
        currency: CurrencyCode,
    ) -> Result<PaymentIntent, StripeError> {
        let params = [
            ("amount", amount_minor.to_string()),
            ("currency", currency.code().to_string()),
            ("automatic_payment_methods[enabled]", "true".to_string()),
        ];

        let intent: PaymentIntentResponse = self.post_form("/v1/payment_intents", &params).await?;

        let client_secret = intent
            .client_secret
            .ok_or(StripeError::MissingClientSecret)?;

        Ok(PaymentIntent {
            id: PaymentIntentId::new(intent.id),
            client_secret,
        })
    }

    /// Confirm a payment intent with the payment-method token produced by
    /// the browser-side elements.
    ///
    /// # Errors
    ///
    /// Returns `StripeError::Api` with the provider's message on validation
    /// or confirmation failure.
    #[instrument(skip(self, payment_method), fields(intent_id = %intent_id))]
    pub async fn confirm_payment_intent(
        &self,
        intent_id: &PaymentIntentId,
        payment_method: &str,
        return_url: &str,
    ) -> Result<PaymentOutcome, StripeError> {
        let params = [
            ("payment_method", payment_method.to_string()),
            ("return_url", return_url.to_string()),
        ];

        let intent: PaymentIntentResponse = self
            .post_form(
                &format!("/v1/payment_intents/{intent_id}/confirm"),
                &params,
            )
            .await?;

        Ok(PaymentOutcome {
            id: PaymentIntentId::new(intent.id),
            status: intent.status,
        })
    }
}

/// Wire shape of an intent, shared by create and confirm responses.
#[derive(Debug, Deserialize)]
struct PaymentIntentResponse {
    id: String,
    #[serde(default)]
    client_secret: Option<String>,
    status: String,
}

/// Error envelope for non-success responses.
#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn test_twelve_fifty_is_1250_minor_units() {
        assert_eq!(minor_units(dec("12.50")).unwrap(), 1250);
    }

    #[test]
    fn test_whole_dollars_convert_exactly() {
        assert_eq!(minor_units(dec("240")).unwrap(), 24000);
        assert_eq!(minor_units(dec("0.01")).unwrap(), 1);
    }

    #[test]
    fn test_minor_units_overflow_is_an_error() {
        let huge = Decimal::MAX;
        assert!(matches!(
            minor_units(huge),
            Err(StripeError::InvalidAmount(_))
        ));
    }

    #[test]
    fn test_error_envelope_parses_provider_message() {
        let body = r#"{"error": {"message": "Your card was declined.", "type": "card_error"}}"#;
        let parsed: ApiErrorResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.error.message, "Your card was declined.");
    }

    #[test]
    fn test_intent_response_without_secret() {
        let body = r#"{"id": "pi_123", "status": "requires_payment_method"}"#;
        let parsed: PaymentIntentResponse = serde_json::from_str(body).unwrap();
        assert!(parsed.client_secret.is_none());
    }
}
