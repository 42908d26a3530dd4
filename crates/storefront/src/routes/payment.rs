//! Payment page, confirmation, and success display handlers.
//!
//! These handlers own the network calls of the card-payment flow; the
//! transition rules live in [`crate::checkout::payment_flow`]. Nothing
//! payment-related is stored server-side between requests: the rendered form
//! carries the intent back on confirmation, matching the
//! one-attempt-in-memory lifecycle of the intent.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::instrument;

use driftwood_core::{CurrencyCode, PaymentIntentId};

use crate::checkout::PaymentConfirmation;
use crate::checkout::payment_flow::CONFIRM_FAILED_MESSAGE;
use crate::error::Result;
use crate::filters;
use crate::middleware::CspNonce;
use crate::state::AppState;
use crate::stripe::{PaymentIntent, StripeError, minor_units};

/// Provider statuses that end the attempt successfully. Anything else that
/// comes back without an error is surfaced as a failure with the status
/// named; settlement truth stays with the provider either way.
const SUCCESS_STATUSES: &[&str] = &["succeeded", "processing", "requires_capture"];

/// Intent data embedded in the rendered payment form.
#[derive(Clone)]
pub struct IntentView {
    pub id: String,
    pub client_secret: String,
}

/// Payment page template.
#[derive(Template, WebTemplate)]
#[template(path = "payment/show.html")]
pub struct PaymentTemplate {
    pub amount: Decimal,
    pub intent: Option<IntentView>,
    pub error: Option<String>,
    pub publishable_key: String,
    pub nonce: String,
}

impl PaymentTemplate {
    fn from_flow(flow: &PaymentConfirmation, state: &AppState, nonce: String) -> Self {
        Self {
            amount: flow.amount(),
            intent: flow.intent().map(|intent| IntentView {
                id: intent.id.to_string(),
                client_secret: intent.client_secret.clone(),
            }),
            error: flow.error().map(ToOwned::to_owned),
            publishable_key: state.config().stripe.publishable_key.clone(),
            nonce,
        }
    }
}

/// Payment success template.
#[derive(Template, WebTemplate)]
#[template(path = "payment/success.html")]
pub struct PaymentSuccessTemplate {
    /// The displayed amount string; `"0"` when absent or malformed. Display
    /// only - arriving here is not proof of settlement.
    pub amount: String,
}

/// Query parameters for the payment page.
#[derive(Debug, Deserialize)]
pub struct PaymentQuery {
    pub amount: Option<String>,
}

/// Confirmation form data posted by the payment page.
#[derive(Debug, Deserialize)]
pub struct ConfirmPaymentForm {
    pub amount: String,
    pub intent_id: String,
    pub client_secret: String,
    /// Payment-method token minted by the provider's browser elements;
    /// absent when the form was submitted before they finished loading.
    pub payment_method: Option<String>,
}

fn parse_amount(raw: Option<&str>) -> Decimal {
    raw.and_then(|value| value.parse::<Decimal>().ok())
        .unwrap_or(Decimal::ZERO)
}

/// Display the payment page, creating a payment intent when an amount is
/// due.
///
/// A non-positive amount mounts the page without touching the provider.
#[instrument(skip(state, nonce))]
pub async fn show(
    State(state): State<AppState>,
    Query(query): Query<PaymentQuery>,
    CspNonce(nonce): CspNonce,
) -> Result<PaymentTemplate> {
    let amount = parse_amount(query.amount.as_deref());
    let mut flow = PaymentConfirmation::mount(amount);

    if flow.should_request_intent() {
        match request_intent(&state, amount).await {
            Ok(intent) => flow.intent_obtained(intent),
            Err(e) => {
                sentry::capture_error(&e);
                tracing::error!(error = %e, "Failed to create payment intent");
                flow.intent_failed();
            }
        }
    }

    Ok(PaymentTemplate::from_flow(&flow, &state, nonce))
}

/// Create an intent for the amount, converting to minor units at this single
/// boundary.
async fn request_intent(state: &AppState, amount: Decimal) -> std::result::Result<PaymentIntent, StripeError> {
    let amount_minor = minor_units(amount)?;
    state
        .stripe()
        .create_payment_intent(amount_minor, CurrencyCode::USD)
        .await
}

/// Confirm the payment with the provider.
///
/// Provider validation and confirmation errors are shown verbatim and leave
/// the attempt retryable with its intent; transport errors get a generic
/// retry message.
#[instrument(skip(state, nonce, form), fields(intent_id = %form.intent_id))]
pub async fn confirm(
    State(state): State<AppState>,
    CspNonce(nonce): CspNonce,
    Form(form): Form<ConfirmPaymentForm>,
) -> Result<Response> {
    let amount = parse_amount(Some(&form.amount));
    let intent = PaymentIntent {
        id: PaymentIntentId::new(form.intent_id),
        client_secret: form.client_secret,
    };
    let mut flow = PaymentConfirmation::resume(amount, intent);

    let elements_ready = form
        .payment_method
        .as_deref()
        .is_some_and(|token| !token.is_empty());

    if let Err(message) = flow.begin_submission(elements_ready) {
        tracing::warn!(message = %message, "Payment submission rejected before provider call");
        let mut template = PaymentTemplate::from_flow(&flow, &state, nonce);
        template.error = Some(message);
        return Ok(template.into_response());
    }

    let amount_display = format!("{amount:.2}");
    let success_path = format!(
        "/checkout/payment/success?amount={}",
        urlencoding::encode(&amount_display)
    );
    let return_url = format!(
        "{}{success_path}",
        state.config().base_url.trim_end_matches('/')
    );

    // flow.intent() is always present after resume(); read it back rather
    // than trusting a stale local.
    let (intent_id, payment_method) = match (flow.intent(), form.payment_method.as_deref()) {
        (Some(intent), Some(token)) => (intent.id.clone(), token.to_owned()),
        _ => {
            let mut template = PaymentTemplate::from_flow(&flow, &state, nonce);
            template.error = Some(CONFIRM_FAILED_MESSAGE.to_string());
            return Ok(template.into_response());
        }
    };

    match state
        .stripe()
        .confirm_payment_intent(&intent_id, &payment_method, &return_url)
        .await
    {
        Ok(outcome) if SUCCESS_STATUSES.contains(&outcome.status.as_str()) => {
            flow.confirmed();
            tracing::info!(intent_id = %outcome.id, status = %outcome.status, "Payment confirmed");
            Ok(Redirect::to(&success_path).into_response())
        }
        Ok(outcome) => {
            flow.confirmation_failed(format!(
                "Payment could not be completed (status: {}).",
                outcome.status
            ));
            Ok(PaymentTemplate::from_flow(&flow, &state, nonce).into_response())
        }
        Err(StripeError::Api { message, .. }) => {
            // The provider's own message, verbatim, with the form still
            // rendered for a retry against the same intent.
            flow.confirmation_failed(message);
            Ok(PaymentTemplate::from_flow(&flow, &state, nonce).into_response())
        }
        Err(e) => {
            sentry::capture_error(&e);
            tracing::error!(error = %e, "Payment confirmation transport failure");
            flow.confirmation_failed(CONFIRM_FAILED_MESSAGE.to_string());
            Ok(PaymentTemplate::from_flow(&flow, &state, nonce).into_response())
        }
    }
}

/// Query parameters for the success display.
#[derive(Debug, Deserialize)]
pub struct SuccessQuery {
    pub amount: Option<String>,
}

/// Display the payment success page.
///
/// Stateless: the amount is whatever the query string says, defaulting to
/// `"0"` when absent or malformed. No attempt is made to verify it against a
/// real transaction.
#[instrument]
pub async fn success(Query(query): Query<SuccessQuery>) -> PaymentSuccessTemplate {
    let amount = query
        .amount
        .filter(|value| value.parse::<Decimal>().is_ok())
        .unwrap_or_else(|| "0".to_string());

    PaymentSuccessTemplate { amount }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_amount_defaults_to_zero() {
        assert_eq!(parse_amount(None), Decimal::ZERO);
        assert_eq!(parse_amount(Some("not-a-number")), Decimal::ZERO);
        assert_eq!(parse_amount(Some("12.50")), Decimal::new(1250, 2));
    }
}
