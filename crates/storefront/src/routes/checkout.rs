//! Checkout form and order placement handlers.

use std::str::FromStr;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;
use uuid::Uuid;

use driftwood_core::PaymentMethod;

use crate::cart::session_keys;
use crate::checkout::{CustomerDetails, OrderReceipt, SubmissionError, submit_order};
use crate::error::{AppError, Result};
use crate::filters;
use crate::routes::cart::{CartView, current_cart};
use crate::sanity::types::BillingDetails;
use crate::state::AppState;

/// Shown when the one-time form token is missing, stale, or reused.
pub const DUPLICATE_SUBMISSION_MESSAGE: &str =
    "This order was already submitted or the form expired. Please review your cart and try again.";

/// Shown when the backend rejects or fails the order write.
pub const ORDER_SAVE_FAILED_MESSAGE: &str = "An unknown error occurred. Please try again.";

/// Checkout page template: billing form plus order summary.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/show.html")]
pub struct CheckoutTemplate {
    pub cart: CartView,
    pub checkout_token: String,
    pub error: Option<String>,
}

/// Terminal confirmation page for cash-on-delivery orders.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/confirmed.html")]
pub struct OrderConfirmedTemplate {
    pub order_id: String,
}

/// Billing form data as posted by the checkout page.
///
/// All billing fields are free text; only the payment method is constrained,
/// and that constraint is enforced by the submission controller rather than
/// the deserializer so the "nothing selected" case is a proper validation
/// failure.
#[derive(Debug, Deserialize)]
pub struct PlaceOrderForm {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub company_name: String,
    #[serde(default)]
    pub country_region: String,
    #[serde(default)]
    pub street_address: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub postal_code: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub additional_notes: String,
    pub payment_method: Option<String>,
    pub checkout_token: String,
}

impl PlaceOrderForm {
    fn into_customer_details(self) -> CustomerDetails {
        CustomerDetails {
            billing: BillingDetails {
                first_name: self.first_name,
                last_name: self.last_name,
                company_name: self.company_name,
                country_region: self.country_region,
                street_address: self.street_address,
                city: self.city,
                postal_code: self.postal_code,
                phone: self.phone,
                email: self.email,
                additional_notes: self.additional_notes,
            },
            payment_method: self
                .payment_method
                .as_deref()
                .and_then(|value| PaymentMethod::from_str(value).ok()),
        }
    }
}

/// Render the checkout page with a fresh one-time token.
async fn checkout_page(
    state: &AppState,
    session: &Session,
    error: Option<String>,
) -> Result<CheckoutTemplate> {
    let cart = current_cart(state, session).await;

    let checkout_token = Uuid::new_v4().to_string();
    session
        .insert(session_keys::CHECKOUT_TOKEN, &checkout_token)
        .await
        .map_err(|e| AppError::Internal(format!("failed to store checkout token: {e}")))?;

    Ok(CheckoutTemplate {
        cart: CartView::from(&cart),
        checkout_token,
        error,
    })
}

/// Display the checkout form.
#[instrument(skip(state, session))]
pub async fn show(State(state): State<AppState>, session: Session) -> Result<CheckoutTemplate> {
    checkout_page(&state, &session, None).await
}

/// Place the order.
///
/// The one-time token is consumed from the session before anything else
/// happens, so a rapid second submission of the same form cannot create a
/// second order. The cart is read live here; the summary the customer saw is
/// display-only.
#[instrument(skip(state, session, form), fields(payment_method = ?form.payment_method))]
pub async fn place_order(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<PlaceOrderForm>,
) -> Result<Response> {
    // Consume the token first: this single session mutation is the
    // double-submission guard.
    let stored_token: Option<String> = session
        .remove(session_keys::CHECKOUT_TOKEN)
        .await
        .map_err(|e| AppError::Internal(format!("failed to read checkout token: {e}")))?;

    if stored_token.as_deref() != Some(form.checkout_token.as_str()) {
        tracing::warn!("Rejected checkout submission with missing or reused token");
        let page =
            checkout_page(&state, &session, Some(DUPLICATE_SUBMISSION_MESSAGE.to_string())).await?;
        return Ok(page.into_response());
    }

    let cart = current_cart(&state, &session).await;
    let details = form.into_customer_details();

    match submit_order(state.sanity(), details, cart.items()).await {
        Ok(OrderReceipt::CashOnDelivery { order_id }) => Ok(OrderConfirmedTemplate {
            order_id: order_id.into_string(),
        }
        .into_response()),
        Ok(OrderReceipt::CardPayment { amount, .. }) => {
            let location = format!(
                "/checkout/payment?amount={}",
                urlencoding::encode(&format!("{amount:.2}"))
            );
            Ok(Redirect::to(&location).into_response())
        }
        Err(SubmissionError::Validation(message)) => {
            let page = checkout_page(&state, &session, Some(message.to_string())).await?;
            Ok(page.into_response())
        }
        Err(SubmissionError::Persistence(e)) => {
            sentry::capture_error(&e);
            tracing::error!(error = %e, "Failed to persist order");
            let page =
                checkout_page(&state, &session, Some(ORDER_SAVE_FAILED_MESSAGE.to_string()))
                    .await?;
            Ok(page.into_response())
        }
    }
}
