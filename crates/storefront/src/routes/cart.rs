//! Cart route handlers.
//!
//! Cart operations use HTMX for dynamic updates without full page reloads.
//! The cart ID is stored in the session and maps into the in-memory
//! [`crate::cart::CartStore`] owned by the application state.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    http::HeaderMap,
    response::{AppendHeaders, IntoResponse, Redirect, Response},
};
use rust_decimal::Decimal;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use driftwood_core::{CartId, ProductId};

use crate::cart::{Cart, CartItem, session_keys};
use crate::error::{AppError, Result};
use crate::filters;
use crate::pricing;
use crate::state::AppState;

/// Cart item display data for templates.
#[derive(Clone)]
pub struct CartItemView {
    pub product_id: String,
    pub name: String,
    pub quantity: u32,
    /// Unit price after discount.
    pub unit_price: Decimal,
    pub line_total: Decimal,
}

/// Cart display data for templates.
#[derive(Clone)]
pub struct CartView {
    pub items: Vec<CartItemView>,
    pub subtotal: Decimal,
    pub item_count: u32,
}

impl CartView {
    /// Create an empty cart view.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            subtotal: Decimal::ZERO,
            item_count: 0,
        }
    }

    /// Whether there is anything to check out.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl From<&Cart> for CartView {
    fn from(cart: &Cart) -> Self {
        // One pricing pass for the whole view; the same pass backs the
        // order document at submission time.
        let totals = pricing::price_cart(cart.items());

        Self {
            items: totals
                .lines
                .iter()
                .map(|line| CartItemView {
                    product_id: line.product_id.as_str().to_owned(),
                    name: line.name.clone(),
                    quantity: line.quantity,
                    unit_price: line.discounted_unit_price,
                    line_total: line.line_total,
                })
                .collect(),
            subtotal: totals.subtotal,
            item_count: cart.unit_count(),
        }
    }
}

// =============================================================================
// Session Helpers
// =============================================================================

/// Get the cart ID from the session.
pub(crate) async fn get_cart_id(session: &Session) -> Option<CartId> {
    session
        .get::<String>(session_keys::CART_ID)
        .await
        .ok()
        .flatten()
        .map(CartId::new)
}

/// Get the cart ID from the session, minting one if the session has none.
async fn ensure_cart_id(session: &Session) -> Result<CartId> {
    if let Some(cart_id) = get_cart_id(session).await {
        return Ok(cart_id);
    }

    let cart_id = CartId::random();
    session
        .insert(session_keys::CART_ID, cart_id.as_str())
        .await
        .map_err(|e| AppError::Internal(format!("failed to store cart id: {e}")))?;
    Ok(cart_id)
}

/// Load the current session cart, reading as empty when there is none.
pub(crate) async fn current_cart(state: &AppState, session: &Session) -> Cart {
    match get_cart_id(session).await {
        Some(cart_id) => state.carts().get(&cart_id).await,
        None => Cart::default(),
    }
}

// =============================================================================
// Forms and Templates
// =============================================================================

/// Add to cart form data.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub product_id: String,
    pub quantity: Option<u32>,
}

/// Update cart form data.
#[derive(Debug, Deserialize)]
pub struct UpdateCartForm {
    pub product_id: String,
    pub quantity: u32,
}

/// Remove from cart form data.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCartForm {
    pub product_id: String,
}

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartShowTemplate {
    pub cart: CartView,
}

/// Cart items fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_items.html")]
pub struct CartItemsTemplate {
    pub cart: CartView,
}

/// Cart count badge fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_count.html")]
pub struct CartCountTemplate {
    pub count: u32,
}

// =============================================================================
// Handlers
// =============================================================================

/// Display cart page.
#[instrument(skip(state, session))]
pub async fn show(State(state): State<AppState>, session: Session) -> impl IntoResponse {
    let cart = current_cart(&state, &session).await;

    CartShowTemplate {
        cart: CartView::from(&cart),
    }
}

/// Add item to cart.
///
/// Prices come from the content backend at add time, never from the client.
/// HTMX requests get the count badge fragment; plain form posts are
/// redirected to the cart page.
#[instrument(skip(state, session, headers))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    Form(form): Form<AddToCartForm>,
) -> Result<Response> {
    let product_id = ProductId::new(form.product_id);
    let product = state
        .sanity()
        .get_product(&product_id)
        .await
        .map_err(|e| match e {
            crate::sanity::SanityError::NotFound(message) => AppError::NotFound(message),
            other => AppError::Sanity(other),
        })?;

    let item = CartItem {
        product_id,
        name: product.name,
        unit_price: product.price,
        quantity: form.quantity.unwrap_or(1).max(1),
        discount_percentage: product.discount_percentage,
    };

    let cart_id = ensure_cart_id(&session).await?;
    let cart = state.carts().add_item(&cart_id, item).await;

    if headers.contains_key("hx-request") {
        Ok((
            AppendHeaders([("HX-Trigger", "cart-updated")]),
            CartCountTemplate {
                count: cart.unit_count(),
            },
        )
            .into_response())
    } else {
        Ok(Redirect::to("/cart").into_response())
    }
}

/// Update cart item quantity (HTMX).
#[instrument(skip(state, session))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<UpdateCartForm>,
) -> Response {
    let Some(cart_id) = get_cart_id(&session).await else {
        return CartItemsTemplate {
            cart: CartView::empty(),
        }
        .into_response();
    };

    let cart = state
        .carts()
        .set_quantity(&cart_id, &ProductId::new(form.product_id), form.quantity)
        .await;

    (
        AppendHeaders([("HX-Trigger", "cart-updated")]),
        CartItemsTemplate {
            cart: CartView::from(&cart),
        },
    )
        .into_response()
}

/// Remove item from cart (HTMX).
#[instrument(skip(state, session))]
pub async fn remove(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<RemoveFromCartForm>,
) -> Response {
    let Some(cart_id) = get_cart_id(&session).await else {
        return CartItemsTemplate {
            cart: CartView::empty(),
        }
        .into_response();
    };

    let cart = state
        .carts()
        .remove_item(&cart_id, &ProductId::new(form.product_id))
        .await;

    (
        AppendHeaders([("HX-Trigger", "cart-updated")]),
        CartItemsTemplate {
            cart: CartView::from(&cart),
        },
    )
        .into_response()
}

/// Get cart count badge (HTMX).
#[instrument(skip(state, session))]
pub async fn count(State(state): State<AppState>, session: Session) -> impl IntoResponse {
    let cart = current_cart(&state, &session).await;

    CartCountTemplate {
        count: cart.unit_count(),
    }
}
