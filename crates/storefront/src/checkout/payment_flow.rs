//! The card-payment confirmation attempt as an explicit state machine.
//!
//! One [`PaymentConfirmation`] models one attempt: mounted with an amount,
//! fed an intent (or an intent failure), submitted, and resolved. The route
//! handlers own the network calls; this type owns the transitions, so the
//! guards (no intent for non-positive amounts, no form without an intent, no
//! concurrent submission) live in exactly one place and are unit-testable
//! without a server.
//!
//! Reaching `Succeeded` only means the provider accepted the confirmation
//! call; settlement truth stays with the provider and backend.

use rust_decimal::Decimal;

use crate::stripe::PaymentIntent;

/// Shown when intent creation fails. The payment form is not rendered in
/// this state; the customer retries by re-entering the payment step.
pub const INIT_FAILED_MESSAGE: &str = "Failed to initialize payment.";

/// Shown when the form is submitted before the provider's browser elements
/// produced a payment-method token.
pub const NOT_READY_MESSAGE: &str = "The payment form has not finished loading. Please try again.";

/// Fallback message when confirmation fails without a provider message.
pub const CONFIRM_FAILED_MESSAGE: &str = "Payment failed. Please try again.";

/// Where a confirmation attempt currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationState {
    /// Mounted without a positive amount; no provider interaction happens.
    Uninitialized,
    /// Intent requested, response pending.
    AwaitingIntent,
    /// Intent in hand; the payment form can render.
    Ready,
    /// Confirmation request in flight; further submissions are rejected.
    Submitting,
    /// Provider accepted the confirmation.
    Succeeded,
    /// Intent creation or confirmation failed; see `error()`.
    Failed,
}

/// One card-payment confirmation attempt.
#[derive(Debug, Clone)]
pub struct PaymentConfirmation {
    state: ConfirmationState,
    amount: Decimal,
    intent: Option<PaymentIntent>,
    error: Option<String>,
}

impl PaymentConfirmation {
    /// Mount the payment step for an amount.
    ///
    /// Non-positive amounts stay `Uninitialized`: no intent request may be
    /// issued for them (navigating here with an empty cart is a degenerate
    /// state, not an error).
    #[must_use]
    pub fn mount(amount: Decimal) -> Self {
        let state = if amount > Decimal::ZERO {
            ConfirmationState::AwaitingIntent
        } else {
            ConfirmationState::Uninitialized
        };

        Self {
            state,
            amount,
            intent: None,
            error: None,
        }
    }

    /// Rebuild an attempt that already holds an intent (the confirm request
    /// carries the intent back from the rendered form).
    #[must_use]
    pub fn resume(amount: Decimal, intent: PaymentIntent) -> Self {
        Self {
            state: ConfirmationState::Ready,
            amount,
            intent: Some(intent),
            error: None,
        }
    }

    /// Whether the mount decided an intent should be requested.
    #[must_use]
    pub fn should_request_intent(&self) -> bool {
        self.state == ConfirmationState::AwaitingIntent
    }

    /// The intent arrived; the payment form may render.
    pub fn intent_obtained(&mut self, intent: PaymentIntent) {
        debug_assert_eq!(self.state, ConfirmationState::AwaitingIntent);
        self.state = ConfirmationState::Ready;
        self.intent = Some(intent);
    }

    /// Intent creation failed. No retry happens within this attempt; a fresh
    /// mount starts a new one.
    pub fn intent_failed(&mut self) {
        debug_assert_eq!(self.state, ConfirmationState::AwaitingIntent);
        self.state = ConfirmationState::Failed;
        self.error = Some(INIT_FAILED_MESSAGE.to_string());
    }

    /// Try to move into `Submitting`.
    ///
    /// `elements_ready` reports whether the provider's browser elements
    /// produced a payment-method token. Without it the attempt stays `Ready`
    /// with a not-ready message. A second submission while one is in flight
    /// is rejected by the state check itself - the transition is the guard.
    ///
    /// # Errors
    ///
    /// Returns the message to show the customer when submission cannot
    /// start.
    pub fn begin_submission(&mut self, elements_ready: bool) -> Result<(), String> {
        match self.state {
            ConfirmationState::Ready => {
                if elements_ready {
                    self.state = ConfirmationState::Submitting;
                    self.error = None;
                    Ok(())
                } else {
                    Err(NOT_READY_MESSAGE.to_string())
                }
            }
            ConfirmationState::Submitting => Err(CONFIRM_FAILED_MESSAGE.to_string()),
            _ => Err(NOT_READY_MESSAGE.to_string()),
        }
    }

    /// The provider accepted the confirmation.
    pub fn confirmed(&mut self) {
        debug_assert_eq!(self.state, ConfirmationState::Submitting);
        self.state = ConfirmationState::Succeeded;
    }

    /// Confirmation failed. The message (the provider's own wording, passed
    /// through verbatim) is kept alongside the intent: the attempt is
    /// retryable and does not discard the intent.
    pub fn confirmation_failed(&mut self, message: String) {
        debug_assert_eq!(self.state, ConfirmationState::Submitting);
        self.state = ConfirmationState::Failed;
        self.error = Some(message);
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> ConfirmationState {
        self.state
    }

    /// The amount this attempt charges.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.amount
    }

    /// The intent, when one was obtained and kept.
    #[must_use]
    pub const fn intent(&self) -> Option<&PaymentIntent> {
        self.intent.as_ref()
    }

    /// The user-facing error for this attempt, if any.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Whether the payment form should render: only with an intent in hand.
    /// An init failure therefore never shows a form; a confirmation failure
    /// (intent retained) does.
    #[must_use]
    pub const fn renders_payment_form(&self) -> bool {
        self.intent.is_some()
    }
}
