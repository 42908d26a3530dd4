//! Application state shared across handlers.

use std::sync::Arc;

use crate::cart::CartStore;
use crate::config::StorefrontConfig;
use crate::sanity::SanityClient;
use crate::stripe::StripeClient;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to the
/// collaborator clients, the cart store, and configuration. The cart store is
/// owned here and injected everywhere it is read - there is no ambient global
/// cart state.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    sanity: SanityClient,
    stripe: StripeClient,
    carts: CartStore,
}

impl AppState {
    /// Create a new application state from configuration.
    #[must_use]
    pub fn new(config: StorefrontConfig) -> Self {
        let sanity = SanityClient::new(&config.sanity);
        let stripe = StripeClient::new(&config.stripe);
        let carts = CartStore::new();

        Self {
            inner: Arc::new(AppStateInner {
                config,
                sanity,
                stripe,
                carts,
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the content backend client.
    #[must_use]
    pub fn sanity(&self) -> &SanityClient {
        &self.inner.sanity
    }

    /// Get a reference to the payment provider client.
    #[must_use]
    pub fn stripe(&self) -> &StripeClient {
        &self.inner.stripe
    }

    /// Get a reference to the cart store.
    #[must_use]
    pub fn carts(&self) -> &CartStore {
        &self.inner.carts
    }
}
