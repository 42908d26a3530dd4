//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                        - Product listing (landing page)
//! GET  /health                  - Health check
//!
//! # Products
//! GET  /products                - Product listing
//!
//! # Cart (HTMX fragments)
//! GET  /cart                    - Cart page
//! POST /cart/add                - Add to cart (fragment or redirect)
//! POST /cart/update             - Update quantity (returns cart_items fragment)
//! POST /cart/remove             - Remove item (returns cart_items fragment)
//! GET  /cart/count              - Cart count badge (fragment)
//!
//! # Checkout
//! GET  /checkout                - Billing form + order summary
//! POST /checkout/order          - Place the order (cash: confirmation page;
//!                                 card: redirect to the payment step)
//! GET  /checkout/payment        - Payment page (?amount=, creates an intent)
//! POST /checkout/payment/confirm - Confirm the payment with the provider
//! GET  /checkout/payment/success - Success display (?amount=, default "0")
//! ```

pub mod cart;
pub mod checkout;
pub mod payment;
pub mod products;

use axum::{
    Router,
    routing::{get, post},
};

use crate::middleware::{api_rate_limiter, checkout_rate_limiter};
use crate::state::AppState;

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
        .route("/count", get(cart::count))
        .layer(api_rate_limiter())
}

/// Create the checkout routes router.
///
/// The submission endpoints get the strict rate limiter; browsing the form
/// or the success page does not.
pub fn checkout_routes() -> Router<AppState> {
    let submissions = Router::new()
        .route("/order", post(checkout::place_order))
        .route("/payment/confirm", post(payment::confirm))
        .layer(checkout_rate_limiter());

    Router::new()
        .route("/", get(checkout::show))
        .route("/payment", get(payment::show))
        .route("/payment/success", get(payment::success))
        .merge(submissions)
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        // Landing page doubles as the product listing
        .route("/", get(products::index))
        .route("/products", get(products::index))
        // Cart routes
        .nest("/cart", cart_routes())
        // Checkout routes
        .nest("/checkout", checkout_routes())
}
