//! Integration tests for the Ilyo storefront.
//!
//! Everything runs in-process against [`FakeBackend`]; no Medusa instance is
//! needed.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p ilyo-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `*_session` - Whole storefront sessions driven through their stores
//! - `storefront_router` - The axum router, called through `oneshot`

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{HeaderMap, Method, Request, StatusCode, header},
};
use http_body_util::BodyExt;
use ilyo_core::{CurrencyCode, ProductId, VariantId};
use ilyo_storefront::config::StorefrontConfig;
use ilyo_storefront::medusa::fake::FakeBackend;
use ilyo_storefront::medusa::{CalculatedPrice, Product, ProductVariant};
use ilyo_storefront::session::StorefrontSession;
use ilyo_storefront::slots::MemorySlots;
use ilyo_storefront::state::AppState;
use serde_json::Value;
use tower::ServiceExt;

/// Registered customer in [`boutique`].
pub const CUSTOMER_EMAIL: &str = "jane@example.com";
pub const CUSTOMER_PASSWORD: &str = "correct-horse-battery";

/// Variants priced in [`boutique`].
pub const ROSE_50ML: &str = "variant_rose_50";
pub const OUD_100ML: &str = "variant_oud_100";

/// A small boutique: two regions, two priced fragrances, one shipping
/// option and one registered customer.
#[must_use]
pub fn boutique() -> FakeBackend {
    FakeBackend::new()
        .with_region("reg_us", "usd")
        .with_region("reg_eu", "eur")
        .with_price(ROSE_50ML, 8500)
        .with_price(OUD_100ML, 12000)
        .with_shipping_option("so_standard", "Standard Shipping", 500)
        .with_account(CUSTOMER_EMAIL, CUSTOMER_PASSWORD)
        .with_product(fragrance("prod_rose", "Rose Noir", "rose-noir", ROSE_50ML, 8500))
        .with_product(fragrance("prod_oud", "Oud Royal", "oud-royal", OUD_100ML, 12000))
}

/// A single-variant fragrance product priced in USD.
#[must_use]
pub fn fragrance(id: &str, title: &str, handle: &str, variant_id: &str, amount: i64) -> Product {
    Product {
        id: ProductId::new(id),
        title: title.to_string(),
        handle: handle.to_string(),
        description: None,
        thumbnail: None,
        images: Vec::new(),
        variants: vec![ProductVariant {
            id: VariantId::new(variant_id),
            title: "50ml".to_string(),
            sku: None,
            inventory_quantity: Some(10),
            calculated_price: Some(CalculatedPrice {
                calculated_amount: Some(amount),
                original_amount: Some(amount),
                currency_code: Some(CurrencyCode::new("usd")),
            }),
        }],
        metadata: Some(serde_json::json!({
            "fragrance_family": "Floral",
            "top_notes": ["Bergamot"],
        })),
    }
}

/// A storefront session over `backend`, persisting into `slots`.
#[must_use]
pub fn session_with(backend: &Arc<FakeBackend>, slots: &Arc<MemorySlots>) -> StorefrontSession {
    StorefrontSession::new(backend.clone(), slots.clone(), "pp_system_default")
}

/// A storefront session with fresh slots.
#[must_use]
pub fn session(backend: &Arc<FakeBackend>) -> StorefrontSession {
    session_with(backend, &Arc::new(MemorySlots::new()))
}

/// The storefront router plus one visitor's session cookie.
pub struct TestApp {
    router: Router,
    cookie: Option<String>,
}

/// A decoded response.
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestApp {
    #[must_use]
    pub fn new(backend: &Arc<FakeBackend>) -> Self {
        let state = AppState::new(StorefrontConfig::default(), backend.clone());
        Self {
            router: ilyo_storefront::app(state),
            cookie: None,
        }
    }

    /// The same router seen by a visitor without a cookie.
    #[must_use]
    pub fn new_visitor(&self) -> Self {
        Self {
            router: self.router.clone(),
            cookie: None,
        }
    }

    pub async fn get(&mut self, uri: &str) -> TestResponse {
        self.send(Method::GET, uri, None).await
    }

    pub async fn post(&mut self, uri: &str, body: Value) -> TestResponse {
        self.send(Method::POST, uri, Some(body)).await
    }

    pub async fn delete(&mut self, uri: &str) -> TestResponse {
        self.send(Method::DELETE, uri, None).await
    }

    /// Send a request, keeping the session cookie the server hands out.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be built or the body cannot be read.
    #[allow(clippy::unwrap_used)]
    pub async fn send(&mut self, method: Method, uri: &str, body: Option<Value>) -> TestResponse {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(cookie) = &self.cookie {
            request = request.header(header::COOKIE, cookie);
        }
        let request = match body {
            Some(json) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => request.body(Body::empty()),
        }
        .unwrap();

        let response = self.router.clone().oneshot(request).await.unwrap();

        if let Some(set_cookie) = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            && let Some(pair) = set_cookie.split(';').next()
        {
            self.cookie = Some(pair.to_string());
        }

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };

        TestResponse {
            status,
            headers,
            body,
        }
    }
}
