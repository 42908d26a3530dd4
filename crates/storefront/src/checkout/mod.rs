//! The checkout flow: order submission and payment confirmation.
//!
//! Two cooperating pieces:
//!
//! - [`submit`] turns a billing form plus the live session cart into one
//!   persisted order document, then tells the caller whether the customer is
//!   done (cash on delivery) or owes a card payment.
//! - [`payment_flow`] models the card-payment confirmation attempt as an
//!   explicit state machine driven by the payment route handlers.

pub mod payment_flow;
pub mod submit;

pub use payment_flow::{ConfirmationState, PaymentConfirmation};
pub use submit::{CustomerDetails, OrderReceipt, SubmissionError, submit_order};
