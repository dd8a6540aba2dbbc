//! Medusa Store API client implementation.
//!
//! Plain JSON over `reqwest`. Caches regions and non-search product listings
//! using `moka` (5-minute TTL); carts, customers and orders are never cached.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use reqwest::{Method, RequestBuilder};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, instrument};

use ilyo_core::{CartId, Email, LineItemId, RegionId, ShippingOptionId, VariantId};

use crate::config::MedusaConfig;

use super::MedusaError;
use super::backend::{CommerceBackend, ProductListParams};
use super::cache::{CacheValue, REGIONS_KEY};
use super::types::{
    Cart, CartResponse, CartUpdate, CompleteCartResponse, Customer, CustomerResponse,
    CustomerUpdate, LineItemDeleteResponse, Order, OrdersResponse, PaymentCollection,
    PaymentCollectionResponse, ProductPage, Region, RegionsResponse, ShippingOption,
    ShippingOptionsResponse, TokenResponse,
};

/// Header carrying the publishable API key on every Store API request.
const PUBLISHABLE_KEY_HEADER: &str = "x-publishable-api-key";

// =============================================================================
// MedusaClient
// =============================================================================

/// Client for the Medusa Store API.
///
/// Cheap to clone; all clones share one connection pool and cache.
#[derive(Clone)]
pub struct MedusaClient {
    inner: Arc<MedusaClientInner>,
}

struct MedusaClientInner {
    client: reqwest::Client,
    base_url: String,
    publishable_key: Option<SecretString>,
    cache: Cache<String, CacheValue>,
}

impl MedusaClient {
    /// Create a new Medusa client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: &MedusaConfig) -> Result<Self, MedusaError> {
        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(Duration::from_secs(300)) // 5 minutes
            .build();

        let client = reqwest::Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            inner: Arc::new(MedusaClientInner {
                client,
                base_url: config.url.trim_end_matches('/').to_string(),
                publishable_key: config.publishable_key.clone(),
                cache,
            }),
        })
    }

    /// Start a request to `path` with the publishable key attached.
    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self
            .inner
            .client
            .request(method, format!("{}{path}", self.inner.base_url));

        match &self.inner.publishable_key {
            Some(key) => builder.header(PUBLISHABLE_KEY_HEADER, key.expose_secret()),
            None => builder,
        }
    }

    /// Start a request authenticated as a customer.
    fn authed(&self, method: Method, path: &str, token: &SecretString) -> RequestBuilder {
        self.request(method, path).bearer_auth(token.expose_secret())
    }

    /// Send a request and decode the JSON response body.
    async fn execute<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, MedusaError> {
        let response = request.send().await?;
        let status = response.status();

        // Check for rate limiting
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(MedusaError::RateLimited(retry_after));
        }

        // Get response body as text first for better error diagnostics
        let response_text = response.text().await?;

        if !status.is_success() {
            tracing::warn!(
                status = %status,
                body = %response_text.chars().take(500).collect::<String>(),
                "Medusa API returned non-success status"
            );
            return Err(MedusaError::from_status(status, &response_text));
        }

        serde_json::from_str(&response_text).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %response_text.chars().take(500).collect::<String>(),
                "Failed to parse Medusa response"
            );
            MedusaError::Parse(e)
        })
    }
}

#[async_trait]
impl CommerceBackend for MedusaClient {
    // =========================================================================
    // Region Methods
    // =========================================================================

    #[instrument(skip(self))]
    async fn list_regions(&self) -> Result<Vec<Region>, MedusaError> {
        if let Some(CacheValue::Regions(regions)) = self.inner.cache.get(REGIONS_KEY).await {
            debug!("Cache hit for regions");
            return Ok(regions);
        }

        let data: RegionsResponse = self
            .execute(self.request(Method::GET, "/store/regions"))
            .await?;

        self.inner
            .cache
            .insert(
                REGIONS_KEY.to_string(),
                CacheValue::Regions(data.regions.clone()),
            )
            .await;

        Ok(data.regions)
    }

    // =========================================================================
    // Cart Methods (not cached - mutable state)
    // =========================================================================

    #[instrument(skip(self))]
    async fn create_cart(&self, region_id: Option<&RegionId>) -> Result<Cart, MedusaError> {
        let body = region_id.map_or_else(|| json!({}), |id| json!({ "region_id": id }));

        let data: CartResponse = self
            .execute(self.request(Method::POST, "/store/carts").json(&body))
            .await?;
        Ok(data.cart)
    }

    #[instrument(skip(self), fields(cart_id = %cart_id))]
    async fn retrieve_cart(&self, cart_id: &CartId) -> Result<Cart, MedusaError> {
        let data: CartResponse = self
            .execute(self.request(Method::GET, &format!("/store/carts/{cart_id}")))
            .await?;
        Ok(data.cart)
    }

    #[instrument(skip(self, update), fields(cart_id = %cart_id))]
    async fn update_cart(
        &self,
        cart_id: &CartId,
        update: &CartUpdate,
    ) -> Result<Cart, MedusaError> {
        let data: CartResponse = self
            .execute(
                self.request(Method::POST, &format!("/store/carts/{cart_id}"))
                    .json(update),
            )
            .await?;
        Ok(data.cart)
    }

    #[instrument(skip(self), fields(cart_id = %cart_id, variant_id = %variant_id))]
    async fn add_line_item(
        &self,
        cart_id: &CartId,
        variant_id: &VariantId,
        quantity: u32,
    ) -> Result<Cart, MedusaError> {
        let data: CartResponse = self
            .execute(
                self.request(Method::POST, &format!("/store/carts/{cart_id}/line-items"))
                    .json(&json!({ "variant_id": variant_id, "quantity": quantity })),
            )
            .await?;
        Ok(data.cart)
    }

    #[instrument(skip(self), fields(cart_id = %cart_id, line_item_id = %line_item_id))]
    async fn update_line_item(
        &self,
        cart_id: &CartId,
        line_item_id: &LineItemId,
        quantity: u32,
    ) -> Result<Cart, MedusaError> {
        let data: CartResponse = self
            .execute(
                self.request(
                    Method::POST,
                    &format!("/store/carts/{cart_id}/line-items/{line_item_id}"),
                )
                .json(&json!({ "quantity": quantity })),
            )
            .await?;
        Ok(data.cart)
    }

    #[instrument(skip(self), fields(cart_id = %cart_id, line_item_id = %line_item_id))]
    async fn delete_line_item(
        &self,
        cart_id: &CartId,
        line_item_id: &LineItemId,
    ) -> Result<Cart, MedusaError> {
        let data: LineItemDeleteResponse = self
            .execute(self.request(
                Method::DELETE,
                &format!("/store/carts/{cart_id}/line-items/{line_item_id}"),
            ))
            .await?;
        data.into_cart()
    }

    #[instrument(skip(self), fields(cart_id = %cart_id, option_id = %option_id))]
    async fn add_shipping_method(
        &self,
        cart_id: &CartId,
        option_id: &ShippingOptionId,
    ) -> Result<Cart, MedusaError> {
        let data: CartResponse = self
            .execute(
                self.request(
                    Method::POST,
                    &format!("/store/carts/{cart_id}/shipping-methods"),
                )
                .json(&json!({ "option_id": option_id })),
            )
            .await?;
        Ok(data.cart)
    }

    #[instrument(skip(self), fields(cart_id = %cart_id))]
    async fn list_shipping_options(
        &self,
        cart_id: &CartId,
    ) -> Result<Vec<ShippingOption>, MedusaError> {
        let data: ShippingOptionsResponse = self
            .execute(
                self.request(Method::GET, "/store/shipping-options")
                    .query(&[("cart_id", cart_id.as_str())]),
            )
            .await?;
        Ok(data.shipping_options)
    }

    #[instrument(skip(self, cart), fields(cart_id = %cart.id))]
    async fn initiate_payment_session(
        &self,
        cart: &Cart,
        provider_id: &str,
    ) -> Result<PaymentCollection, MedusaError> {
        let collection_id = match &cart.payment_collection {
            Some(collection) => collection.id.clone(),
            None => {
                let created: PaymentCollectionResponse = self
                    .execute(
                        self.request(Method::POST, "/store/payment-collections")
                            .json(&json!({ "cart_id": cart.id })),
                    )
                    .await?;
                created.payment_collection.id
            }
        };

        let data: PaymentCollectionResponse = self
            .execute(
                self.request(
                    Method::POST,
                    &format!("/store/payment-collections/{collection_id}/payment-sessions"),
                )
                .json(&json!({ "provider_id": provider_id })),
            )
            .await?;
        Ok(data.payment_collection)
    }

    #[instrument(skip(self), fields(cart_id = %cart_id))]
    async fn complete_cart(&self, cart_id: &CartId) -> Result<Order, MedusaError> {
        let data: CompleteCartResponse = self
            .execute(self.request(Method::POST, &format!("/store/carts/{cart_id}/complete")))
            .await?;

        match data {
            CompleteCartResponse::Order { order } => Ok(order),
            CompleteCartResponse::Cart { error, .. } => Err(MedusaError::CartNotCompleted(
                error
                    .and_then(|e| e.message)
                    .unwrap_or_else(|| "cart could not be completed".to_string()),
            )),
        }
    }

    // =========================================================================
    // Customer Methods
    // =========================================================================

    #[instrument(skip(self, password), fields(email = %email))]
    async fn register(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<SecretString, MedusaError> {
        let data: TokenResponse = self
            .execute(
                self.request(Method::POST, "/auth/customer/emailpass/register")
                    .json(&json!({ "email": email, "password": password.expose_secret() })),
            )
            .await?;
        Ok(SecretString::from(data.token))
    }

    #[instrument(skip(self, password), fields(email = %email))]
    async fn login(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<SecretString, MedusaError> {
        let data: TokenResponse = self
            .execute(
                self.request(Method::POST, "/auth/customer/emailpass")
                    .json(&json!({ "email": email, "password": password.expose_secret() })),
            )
            .await?;
        Ok(SecretString::from(data.token))
    }

    #[instrument(skip(self, token))]
    async fn logout(&self, token: &SecretString) -> Result<(), MedusaError> {
        let _: serde_json::Value = self
            .execute(self.authed(Method::DELETE, "/auth/session", token))
            .await?;
        Ok(())
    }

    #[instrument(skip(self, token))]
    async fn retrieve_customer(&self, token: &SecretString) -> Result<Customer, MedusaError> {
        let data: CustomerResponse = self
            .execute(self.authed(Method::GET, "/store/customers/me", token))
            .await?;
        Ok(data.customer)
    }

    #[instrument(skip(self, token, update))]
    async fn update_customer(
        &self,
        token: &SecretString,
        update: &CustomerUpdate,
    ) -> Result<Customer, MedusaError> {
        let data: CustomerResponse = self
            .execute(
                self.authed(Method::POST, "/store/customers/me", token)
                    .json(update),
            )
            .await?;
        Ok(data.customer)
    }

    #[instrument(skip(self, token))]
    async fn list_orders(&self, token: &SecretString) -> Result<Vec<Order>, MedusaError> {
        let data: OrdersResponse = self
            .execute(self.authed(Method::GET, "/store/orders", token))
            .await?;
        Ok(data.orders)
    }

    // =========================================================================
    // Product Methods
    // =========================================================================

    #[instrument(skip(self))]
    async fn list_products(&self, params: &ProductListParams) -> Result<ProductPage, MedusaError> {
        let cache_key = params.cache_key();

        // Check cache (only for queries without search)
        if params.is_cacheable()
            && let Some(CacheValue::Products(page)) = self.inner.cache.get(&cache_key).await
        {
            debug!("Cache hit for products");
            return Ok(page);
        }

        let page: ProductPage = self
            .execute(self.request(Method::GET, "/store/products").query(&params.to_query()))
            .await?;

        if params.is_cacheable() {
            self.inner
                .cache
                .insert(cache_key, CacheValue::Products(page.clone()))
                .await;
        }

        Ok(page)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use axum::Json;
    use axum::body::Bytes;
    use axum::extract::State;
    use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode, Uri};
    use axum::response::{IntoResponse, Response};
    use serde_json::Value;

    use super::*;

    /// One request as the stub Medusa received it.
    #[derive(Debug, Clone)]
    struct Seen {
        method: String,
        path: String,
        query: Option<String>,
        publishable_key: Option<String>,
        authorization: Option<String>,
        body: Value,
    }

    #[derive(Clone)]
    struct Reply {
        status: u16,
        headers: Vec<(&'static str, &'static str)>,
        body: Value,
    }

    /// A scripted Medusa: canned replies keyed by `"METHOD /path"`.
    #[derive(Default)]
    struct StubMedusa {
        replies: Mutex<HashMap<String, Reply>>,
        seen: Mutex<Vec<Seen>>,
    }

    impl StubMedusa {
        fn reply(&self, route: &str, status: u16, body: Value) {
            self.reply_with_headers(route, status, Vec::new(), body);
        }

        fn reply_with_headers(
            &self,
            route: &str,
            status: u16,
            headers: Vec<(&'static str, &'static str)>,
            body: Value,
        ) {
            self.replies.lock().unwrap().insert(
                route.to_string(),
                Reply {
                    status,
                    headers,
                    body,
                },
            );
        }

        fn seen(&self) -> Vec<Seen> {
            self.seen.lock().unwrap().clone()
        }

        fn routes_seen(&self) -> Vec<String> {
            self.seen()
                .into_iter()
                .map(|s| format!("{} {}", s.method, s.path))
                .collect()
        }
    }

    async fn handle(
        State(stub): State<Arc<StubMedusa>>,
        method: Method,
        uri: Uri,
        headers: HeaderMap,
        body: Bytes,
    ) -> Response {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(String::from)
        };
        stub.seen.lock().unwrap().push(Seen {
            method: method.to_string(),
            path: uri.path().to_string(),
            query: uri.query().map(String::from),
            publishable_key: header(PUBLISHABLE_KEY_HEADER),
            authorization: header("authorization"),
            body: serde_json::from_slice(&body).unwrap_or(Value::Null),
        });

        let route = format!("{method} {}", uri.path());
        let Some(reply) = stub.replies.lock().unwrap().get(&route).cloned() else {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"type": "unexpected_state", "message": format!("unscripted {route}")})),
            )
                .into_response();
        };

        let mut response = (
            StatusCode::from_u16(reply.status).unwrap(),
            Json(reply.body),
        )
            .into_response();
        for (name, value) in reply.headers {
            response.headers_mut().insert(
                HeaderName::from_static(name),
                HeaderValue::from_static(value),
            );
        }
        response
    }

    /// Start the stub on an ephemeral port and point a client at it.
    async fn stub_medusa() -> (Arc<StubMedusa>, MedusaClient) {
        let stub = Arc::new(StubMedusa::default());
        let app = axum::Router::new()
            .fallback(handle)
            .with_state(Arc::clone(&stub));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let client = MedusaClient::new(&MedusaConfig {
            url: format!("http://{addr}/"),
            publishable_key: Some(SecretString::from("pk_test_boutique")),
            ..MedusaConfig::default()
        })
        .unwrap();

        (stub, client)
    }

    fn cart_json(id: &str) -> Value {
        json!({
            "id": id,
            "region_id": "reg_us",
            "currency_code": "usd",
            "items": [
                {"id": "cali_1", "variant_id": "variant_rose_50", "quantity": 1, "unit_price": 8500}
            ],
            "subtotal": 8500,
            "total": 8500
        })
    }

    fn cart(id: &str) -> Cart {
        serde_json::from_value(cart_json(id)).unwrap()
    }

    // =========================================================================
    // Headers
    // =========================================================================

    #[tokio::test]
    async fn test_store_requests_carry_publishable_key_only() {
        let (stub, client) = stub_medusa().await;
        stub.reply(
            "GET /store/regions",
            200,
            json!({"regions": [{"id": "reg_us", "currency_code": "usd"}]}),
        );

        let regions = client.list_regions().await.unwrap();

        assert_eq!(regions.len(), 1);
        let seen = stub.seen();
        assert_eq!(seen[0].publishable_key.as_deref(), Some("pk_test_boutique"));
        assert_eq!(seen[0].authorization, None);
    }

    #[tokio::test]
    async fn test_customer_requests_carry_bearer_token() {
        let (stub, client) = stub_medusa().await;
        stub.reply(
            "GET /store/customers/me",
            200,
            json!({"customer": {"id": "cus_1", "email": "jane@example.com"}}),
        );

        let customer = client
            .retrieve_customer(&SecretString::from("tok_jane"))
            .await
            .unwrap();

        assert_eq!(customer.email, "jane@example.com");
        let seen = stub.seen();
        assert_eq!(seen[0].authorization.as_deref(), Some("Bearer tok_jane"));
        assert_eq!(seen[0].publishable_key.as_deref(), Some("pk_test_boutique"));
    }

    // =========================================================================
    // Error Mapping
    // =========================================================================

    #[tokio::test]
    async fn test_rate_limit_reads_retry_after() {
        let (stub, client) = stub_medusa().await;
        stub.reply_with_headers(
            "GET /store/carts/cart_1",
            429,
            vec![("retry-after", "7")],
            json!({"type": "too_many_requests", "message": "Slow down"}),
        );

        let err = client
            .retrieve_cart(&CartId::new("cart_1"))
            .await
            .unwrap_err();

        assert!(matches!(err, MedusaError::RateLimited(7)));
    }

    #[tokio::test]
    async fn test_rate_limit_without_retry_after_defaults_to_one_second() {
        let (stub, client) = stub_medusa().await;
        stub.reply("GET /store/carts/cart_1", 429, json!({}));

        let err = client
            .retrieve_cart(&CartId::new("cart_1"))
            .await
            .unwrap_err();

        assert!(matches!(err, MedusaError::RateLimited(1)));
    }

    #[tokio::test]
    async fn test_error_bodies_map_to_typed_errors() {
        let (stub, client) = stub_medusa().await;
        stub.reply(
            "GET /store/carts/cart_gone",
            404,
            json!({"type": "not_found", "message": "Cart with id: cart_gone was not found"}),
        );
        stub.reply(
            "POST /store/carts/cart_1/line-items",
            400,
            json!({"type": "invalid_data", "message": "Variant is out of stock"}),
        );

        let err = client
            .retrieve_cart(&CartId::new("cart_gone"))
            .await
            .unwrap_err();
        assert!(matches!(err, MedusaError::NotFound(m) if m.contains("cart_gone")));

        let err = client
            .add_line_item(&CartId::new("cart_1"), &VariantId::new("variant_rose_50"), 1)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            MedusaError::Api { status: 400, kind: Some(kind), message }
                if kind == "invalid_data" && message == "Variant is out of stock"
        ));
    }

    // =========================================================================
    // Carts
    // =========================================================================

    #[tokio::test]
    async fn test_create_cart_sends_region_and_line_item_body() {
        let (stub, client) = stub_medusa().await;
        stub.reply("POST /store/carts", 200, json!({"cart": cart_json("cart_1")}));
        stub.reply(
            "POST /store/carts/cart_1/line-items",
            200,
            json!({"cart": cart_json("cart_1")}),
        );

        let created = client
            .create_cart(Some(&RegionId::new("reg_us")))
            .await
            .unwrap();
        client
            .add_line_item(&created.id, &VariantId::new("variant_rose_50"), 2)
            .await
            .unwrap();

        let seen = stub.seen();
        assert_eq!(seen[0].body, json!({"region_id": "reg_us"}));
        assert_eq!(
            seen[1].body,
            json!({"variant_id": "variant_rose_50", "quantity": 2})
        );
    }

    #[tokio::test]
    async fn test_update_cart_sends_only_set_fields() {
        let (stub, client) = stub_medusa().await;
        stub.reply("POST /store/carts/cart_1", 200, json!({"cart": cart_json("cart_1")}));

        client
            .update_cart(&CartId::new("cart_1"), &CartUpdate::email("jane@example.com"))
            .await
            .unwrap();

        assert_eq!(stub.seen()[0].body, json!({"email": "jane@example.com"}));
    }

    #[tokio::test]
    async fn test_delete_line_item_returns_parent_cart() {
        let (stub, client) = stub_medusa().await;
        let mut parent = cart_json("cart_1");
        parent["items"] = json!([]);
        parent["subtotal"] = json!(0);
        parent["total"] = json!(0);
        stub.reply(
            "DELETE /store/carts/cart_1/line-items/cali_1",
            200,
            json!({"id": "cali_1", "object": "line-item", "deleted": true, "parent": parent}),
        );

        let cart = client
            .delete_line_item(&CartId::new("cart_1"), &LineItemId::new("cali_1"))
            .await
            .unwrap();

        assert_eq!(cart.id, CartId::new("cart_1"));
        assert!(cart.items.is_empty());
    }

    #[tokio::test]
    async fn test_shipping_options_are_scoped_to_cart() {
        let (stub, client) = stub_medusa().await;
        stub.reply(
            "GET /store/shipping-options",
            200,
            json!({"shipping_options": [{"id": "so_standard", "name": "Standard", "amount": 500}]}),
        );

        let options = client
            .list_shipping_options(&CartId::new("cart_1"))
            .await
            .unwrap();

        assert_eq!(options.len(), 1);
        assert_eq!(stub.seen()[0].query.as_deref(), Some("cart_id=cart_1"));
    }

    // =========================================================================
    // Payment & Completion
    // =========================================================================

    fn collection_json() -> Value {
        json!({
            "payment_collection": {
                "id": "pay_col_1",
                "amount": 8500,
                "currency_code": "usd",
                "payment_sessions": [
                    {"id": "payses_1", "provider_id": "pp_system_default", "amount": 8500}
                ]
            }
        })
    }

    #[tokio::test]
    async fn test_payment_creates_collection_when_cart_has_none() {
        let (stub, client) = stub_medusa().await;
        stub.reply("POST /store/payment-collections", 200, collection_json());
        stub.reply(
            "POST /store/payment-collections/pay_col_1/payment-sessions",
            200,
            collection_json(),
        );

        let collection = client
            .initiate_payment_session(&cart("cart_1"), "pp_system_default")
            .await
            .unwrap();

        assert_eq!(collection.payment_sessions.len(), 1);
        assert_eq!(
            stub.routes_seen(),
            vec![
                "POST /store/payment-collections",
                "POST /store/payment-collections/pay_col_1/payment-sessions",
            ]
        );
        let seen = stub.seen();
        assert_eq!(seen[0].body, json!({"cart_id": "cart_1"}));
        assert_eq!(seen[1].body, json!({"provider_id": "pp_system_default"}));
    }

    #[tokio::test]
    async fn test_payment_reuses_existing_collection() {
        let (stub, client) = stub_medusa().await;
        stub.reply(
            "POST /store/payment-collections/pay_col_1/payment-sessions",
            200,
            collection_json(),
        );
        let mut with_collection = cart_json("cart_1");
        with_collection["payment_collection"] = collection_json()["payment_collection"].clone();
        let cart: Cart = serde_json::from_value(with_collection).unwrap();

        client
            .initiate_payment_session(&cart, "pp_system_default")
            .await
            .unwrap();

        assert_eq!(
            stub.routes_seen(),
            vec!["POST /store/payment-collections/pay_col_1/payment-sessions"]
        );
    }

    #[tokio::test]
    async fn test_complete_returns_order() {
        let (stub, client) = stub_medusa().await;
        stub.reply(
            "POST /store/carts/cart_1/complete",
            200,
            json!({"type": "order", "order": {"id": "order_1", "display_id": 1001, "total": 9201.25}}),
        );

        let order = client.complete_cart(&CartId::new("cart_1")).await.unwrap();

        assert_eq!(order.display_id, Some(1001));
        assert_eq!(order.total, 9201);
    }

    #[tokio::test]
    async fn test_complete_returning_cart_is_not_completed() {
        let (stub, client) = stub_medusa().await;
        stub.reply(
            "POST /store/carts/cart_1/complete",
            200,
            json!({
                "type": "cart",
                "cart": cart_json("cart_1"),
                "error": {"message": "Payment authorization failed", "name": "Error"}
            }),
        );

        let err = client
            .complete_cart(&CartId::new("cart_1"))
            .await
            .unwrap_err();

        assert!(matches!(err, MedusaError::CartNotCompleted(m) if m == "Payment authorization failed"));
    }

    // =========================================================================
    // Auth
    // =========================================================================

    #[tokio::test]
    async fn test_login_posts_credentials_and_returns_token() {
        let (stub, client) = stub_medusa().await;
        stub.reply("POST /auth/customer/emailpass", 200, json!({"token": "tok_jane"}));

        let token = client
            .login(
                &Email::parse("jane@example.com").unwrap(),
                &SecretString::from("correct-horse-battery"),
            )
            .await
            .unwrap();

        assert_eq!(token.expose_secret(), "tok_jane");
        assert_eq!(
            stub.seen()[0].body,
            json!({"email": "jane@example.com", "password": "correct-horse-battery"})
        );
    }

    // =========================================================================
    // Caching
    // =========================================================================

    #[tokio::test]
    async fn test_regions_are_cached() {
        let (stub, client) = stub_medusa().await;
        stub.reply(
            "GET /store/regions",
            200,
            json!({"regions": [{"id": "reg_us", "currency_code": "usd"}]}),
        );

        client.list_regions().await.unwrap();
        client.list_regions().await.unwrap();

        assert_eq!(stub.seen().len(), 1);
    }

    #[tokio::test]
    async fn test_listing_cache_hits_skip_search_and_vary_by_region() {
        let (stub, client) = stub_medusa().await;
        stub.reply("GET /store/products", 200, json!({"products": [], "count": 0}));

        let us = ProductListParams {
            limit: Some(12),
            region_id: Some(RegionId::new("reg_us")),
            ..ProductListParams::default()
        };
        let eu = ProductListParams {
            region_id: Some(RegionId::new("reg_eu")),
            ..us.clone()
        };
        let search = ProductListParams {
            q: Some("oud".to_string()),
            ..us.clone()
        };

        client.list_products(&us).await.unwrap();
        client.list_products(&us).await.unwrap();
        assert_eq!(stub.seen().len(), 1);

        client.list_products(&eu).await.unwrap();
        assert_eq!(stub.seen().len(), 2);

        client.list_products(&search).await.unwrap();
        client.list_products(&search).await.unwrap();
        assert_eq!(stub.seen().len(), 4);

        let query = stub.seen()[0].query.clone().unwrap();
        assert!(query.contains("limit=12"));
        assert!(query.contains("region_id=reg_us"));
    }
}
