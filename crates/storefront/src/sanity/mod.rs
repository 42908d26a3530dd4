//! Content backend (Sanity) API client.
//!
//! # Architecture
//!
//! - Plain HTTP + JSON via `reqwest`; queries use GROQ, writes use the
//!   mutation endpoint with `returnIds=true`
//! - The backend is the source of truth for products and the durable store
//!   for orders - no local database
//! - Product reads are cached in-memory via `moka` (5 minute TTL); order
//!   writes are never cached or retried
//!
//! # Example
//!
//! ```rust,ignore
//! use driftwood_storefront::sanity::SanityClient;
//!
//! let client = SanityClient::new(&config.sanity);
//! let products = client.list_products().await?;
//! let order_id = client.create_order(&order_document).await?;
//! ```

pub mod types;

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use tracing::{debug, instrument};

use driftwood_core::{OrderId, ProductId};

use crate::config::SanityConfig;
use types::{ErrorResponse, MutateResponse, OrderDocument, Product, QueryResponse};

/// GROQ projection shared by product reads.
const PRODUCT_QUERY: &str =
    r#"*[_type == "product"] | order(name asc) { "id": _id, name, price, discountPercentage }"#;

/// Cache key for the product list.
const PRODUCTS_CACHE_KEY: &str = "products";

/// Errors that can occur when interacting with the content backend.
#[derive(Debug, Error)]
pub enum SanityError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Failed to parse a response body.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limited by the backend.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),
}

/// Client for the content backend HTTP API.
///
/// Cheaply cloneable; all clones share the underlying connection pool and
/// product cache.
#[derive(Clone)]
pub struct SanityClient {
    inner: Arc<SanityClientInner>,
}

struct SanityClientInner {
    client: reqwest::Client,
    base_url: String,
    api_version: String,
    dataset: String,
    token: SecretString,
    products: Cache<String, Vec<Product>>,
}

impl SanityClient {
    /// Create a new content backend client.
    #[must_use]
    pub fn new(config: &SanityConfig) -> Self {
        let base_url = config.api_base.clone().unwrap_or_else(|| {
            format!("https://{}.api.sanity.io", config.project_id)
        });

        let products = Cache::builder()
            .max_capacity(16)
            .time_to_live(Duration::from_secs(300)) // 5 minutes
            .build();

        Self {
            inner: Arc::new(SanityClientInner {
                client: reqwest::Client::new(),
                base_url,
                api_version: config.api_version.clone(),
                dataset: config.dataset.clone(),
                token: config.api_token.clone(),
                products,
            }),
        }
    }

    fn query_url(&self, query: &str) -> String {
        format!(
            "{}/v{}/data/query/{}?query={}",
            self.inner.base_url,
            self.inner.api_version,
            self.inner.dataset,
            urlencoding::encode(query)
        )
    }

    fn mutate_url(&self) -> String {
        format!(
            "{}/v{}/data/mutate/{}?returnIds=true",
            self.inner.base_url, self.inner.api_version, self.inner.dataset
        )
    }

    /// Check a response status, converting failures into `SanityError`.
    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, SanityError> {
        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(SanityError::RateLimited(retry_after));
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(
                status = %status,
                body = %body.chars().take(500).collect::<String>(),
                "Content API returned non-success status"
            );
            // The API wraps failures in {"error": {"description": ...}}
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map_or_else(
                    |_| body.chars().take(200).collect::<String>(),
                    |e| e.error.description,
                );
            return Err(SanityError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response)
    }

    /// Persist an order document.
    ///
    /// This is the single side-effecting call in the checkout flow. It is
    /// never retried here: on failure the caller surfaces the error and the
    /// order is not assumed to exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the backend rejects the
    /// mutation.
    #[instrument(skip(self, order), fields(total = %order.total))]
    pub async fn create_order(&self, order: &OrderDocument) -> Result<OrderId, SanityError> {
        let body = serde_json::json!({
            "mutations": [ { "create": order } ]
        });

        let response = self
            .inner
            .client
            .post(self.mutate_url())
            .bearer_auth(self.inner.token.expose_secret())
            .json(&body)
            .send()
            .await?;

        let response = Self::check_status(response).await?;
        let text = response.text().await?;
        let mutate: MutateResponse = serde_json::from_str(&text).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %text.chars().take(500).collect::<String>(),
                "Failed to parse mutation response"
            );
            SanityError::Parse(e)
        })?;

        mutate
            .results
            .into_iter()
            .next()
            .map(|result| OrderId::new(result.id))
            .ok_or_else(|| SanityError::Api {
                status: 200,
                message: "mutation response contained no document id".to_string(),
            })
    }

    /// List all products, cached for a few minutes.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    #[instrument(skip(self))]
    pub async fn list_products(&self) -> Result<Vec<Product>, SanityError> {
        if let Some(products) = self.inner.products.get(PRODUCTS_CACHE_KEY).await {
            debug!("Cache hit for product list");
            return Ok(products);
        }

        let response = self
            .inner
            .client
            .get(self.query_url(PRODUCT_QUERY))
            .bearer_auth(self.inner.token.expose_secret())
            .send()
            .await?;

        let response = Self::check_status(response).await?;
        let text = response.text().await?;
        let query: QueryResponse<Vec<Product>> = serde_json::from_str(&text).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %text.chars().take(500).collect::<String>(),
                "Failed to parse product query response"
            );
            SanityError::Parse(e)
        })?;

        self.inner
            .products
            .insert(PRODUCTS_CACHE_KEY.to_string(), query.result.clone())
            .await;

        Ok(query.result)
    }

    /// Fetch a single product by ID.
    ///
    /// Served from the cached product list so add-to-cart does not hit the
    /// backend per click.
    ///
    /// # Errors
    ///
    /// Returns `SanityError::NotFound` if no product has the given ID.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn get_product(&self, product_id: &ProductId) -> Result<Product, SanityError> {
        self.list_products()
            .await?
            .into_iter()
            .find(|product| &product.id == product_id)
            .ok_or_else(|| SanityError::NotFound(format!("Product not found: {product_id}")))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use secrecy::SecretString;

    fn test_client(base: Option<&str>) -> SanityClient {
        SanityClient::new(&SanityConfig {
            project_id: "abc123xy".to_string(),
            dataset: "production".to_string(),
            api_version: "2021-06-07".to_string(),
            api_token: SecretString::from("token"),
            api_base: base.map(String::from),
        })
    }

    #[test]
    fn test_default_base_url_derived_from_project() {
        let client = test_client(None);
        assert_eq!(
            client.mutate_url(),
            "https://abc123xy.api.sanity.io/v2021-06-07/data/mutate/production?returnIds=true"
        );
    }

    #[test]
    fn test_base_url_override() {
        let client = test_client(Some("http://127.0.0.1:9999"));
        assert!(
            client
                .mutate_url()
                .starts_with("http://127.0.0.1:9999/v2021-06-07/data/mutate/production")
        );
    }

    #[test]
    fn test_query_url_is_percent_encoded() {
        let client = test_client(None);
        let url = client.query_url(r#"*[_type == "product"]"#);
        assert!(!url.contains(' '));
        assert!(url.contains("query=%2A%5B_type%20%3D%3D%20%22product%22%5D"));
    }

    #[test]
    fn test_sanity_error_display() {
        let err = SanityError::NotFound("product-123".to_string());
        assert_eq!(err.to_string(), "Not found: product-123");

        let err = SanityError::RateLimited(60);
        assert_eq!(err.to_string(), "Rate limited, retry after 60 seconds");
    }
}
