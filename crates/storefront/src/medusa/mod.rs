//! Medusa Store API client.
//!
//! # Architecture
//!
//! - [`CommerceBackend`] is the contract the session stores depend on
//! - [`MedusaClient`] implements it over the Medusa v2 REST Store API with `reqwest`
//! - Medusa is source of truth - NO local sync, direct API calls
//! - Regions and anonymous product listings are cached via `moka` (5 minute TTL)
//!
//! # APIs
//!
//! ## Store API
//! - Regions, products, carts, shipping options, payment collections
//! - Authenticated with the publishable API key (`x-publishable-api-key`)
//!
//! ## Auth API
//! - Email/password registration and login for customers
//! - Returns a bearer token used for `/store/customers/me` and `/store/orders`
//!
//! # Example
//!
//! ```rust,ignore
//! use ilyo_storefront::medusa::{CommerceBackend, MedusaClient};
//!
//! let client = MedusaClient::new(&config.medusa)?;
//!
//! let regions = client.list_regions().await?;
//! let cart = client.create_cart(regions.first().map(|r| &r.id)).await?;
//! let cart = client.add_line_item(&cart.id, &variant_id, 1).await?;
//! ```

mod backend;
mod cache;
mod client;
#[cfg(any(test, feature = "test-util"))]
pub mod fake;
pub mod types;

pub use backend::{CommerceBackend, ProductListParams};
pub use client::MedusaClient;
pub use types::*;

use serde::Deserialize;
use thiserror::Error;

/// Errors that can occur when interacting with the Medusa API.
#[derive(Debug, Error)]
pub enum MedusaError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Medusa rejected the request.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Medusa error type (e.g., `invalid_data`, `not_allowed`).
        kind: Option<String>,
        /// Human-readable message from Medusa.
        message: String,
    },

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Missing or rejected customer credentials.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Rate limited by Medusa.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Completion returned the cart instead of an order.
    #[error("Cart not completed: {0}")]
    CartNotCompleted(String),

    /// The response was well-formed JSON but not the expected shape.
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),
}

/// Error body returned by Medusa for non-2xx responses.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiErrorBody {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl MedusaError {
    /// Build an error from a non-success status and its response body.
    pub(crate) fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let parsed = serde_json::from_str::<ApiErrorBody>(body).ok();
        let message = parsed
            .as_ref()
            .and_then(|b| b.message.clone())
            .unwrap_or_else(|| body.chars().take(200).collect());

        match status {
            reqwest::StatusCode::NOT_FOUND => Self::NotFound(message),
            reqwest::StatusCode::UNAUTHORIZED => Self::Unauthorized(message),
            _ => Self::Api {
                status: status.as_u16(),
                kind: parsed.and_then(|b| b.kind),
                message,
            },
        }
    }
}
