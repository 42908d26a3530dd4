//! Product listing route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::State;
use rust_decimal::Decimal;
use tracing::instrument;

use crate::error::Result;
use crate::filters;
use crate::pricing;
use crate::sanity::types::Product;
use crate::state::AppState;

/// Product display data for templates.
#[derive(Clone)]
pub struct ProductView {
    pub id: String,
    pub name: String,
    pub price: Decimal,
    /// Present only when the product carries a discount.
    pub discounted_price: Option<Decimal>,
    pub discount_percentage: Decimal,
}

impl From<&Product> for ProductView {
    fn from(product: &Product) -> Self {
        let discounted_price = if product.discount_percentage > Decimal::ZERO {
            Some(pricing::discounted_unit_price(
                product.price,
                product.discount_percentage,
            ))
        } else {
            None
        };

        Self {
            id: product.id.as_str().to_owned(),
            name: product.name.clone(),
            price: product.price,
            discounted_price,
            discount_percentage: product.discount_percentage,
        }
    }
}

/// Product listing page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/index.html")]
pub struct ProductsTemplate {
    pub products: Vec<ProductView>,
}

/// Display the product listing.
#[instrument(skip(state))]
pub async fn index(State(state): State<AppState>) -> Result<ProductsTemplate> {
    let products = state.sanity().list_products().await?;

    Ok(ProductsTemplate {
        products: products.iter().map(ProductView::from).collect(),
    })
}
