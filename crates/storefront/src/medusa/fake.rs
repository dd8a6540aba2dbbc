//! In-memory commerce backend for tests.
//!
//! Behaves like a tiny Medusa: carts merge line items by variant, totals are
//! recomputed on every mutation, tokens map to customers. Every operation is
//! counted, and any operation can be made to fail on demand.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use ilyo_core::{
    CartId, CurrencyCode, CustomerId, Email, LineItemId, OrderId, PaymentCollectionId,
    PaymentSessionId, RegionId, ShippingOptionId, VariantId,
};

use super::MedusaError;
use super::backend::{CommerceBackend, ProductListParams};
use super::types::{
    Cart, CartUpdate, Customer, CustomerUpdate, LineItem, Order, PaymentCollection,
    PaymentSession, Product, ProductPage, Region, ShippingMethod, ShippingOption,
};

/// Operation names used for call counting and failure injection.
pub mod ops {
    pub const LIST_REGIONS: &str = "list_regions";
    pub const CREATE_CART: &str = "create_cart";
    pub const RETRIEVE_CART: &str = "retrieve_cart";
    pub const UPDATE_CART: &str = "update_cart";
    pub const ADD_LINE_ITEM: &str = "add_line_item";
    pub const UPDATE_LINE_ITEM: &str = "update_line_item";
    pub const DELETE_LINE_ITEM: &str = "delete_line_item";
    pub const ADD_SHIPPING_METHOD: &str = "add_shipping_method";
    pub const LIST_SHIPPING_OPTIONS: &str = "list_shipping_options";
    pub const INITIATE_PAYMENT_SESSION: &str = "initiate_payment_session";
    pub const COMPLETE_CART: &str = "complete_cart";
    pub const REGISTER: &str = "register";
    pub const LOGIN: &str = "login";
    pub const LOGOUT: &str = "logout";
    pub const RETRIEVE_CUSTOMER: &str = "retrieve_customer";
    pub const UPDATE_CUSTOMER: &str = "update_customer";
    pub const LIST_ORDERS: &str = "list_orders";
    pub const LIST_PRODUCTS: &str = "list_products";
}

/// Unit price used for variants without an explicit price.
const DEFAULT_UNIT_PRICE: i64 = 1000;

#[derive(Default)]
struct FakeState {
    next_id: u64,
    regions: Vec<Region>,
    carts: HashMap<CartId, Cart>,
    completed: HashSet<CartId>,
    prices: HashMap<VariantId, i64>,
    shipping_options: Vec<ShippingOption>,
    sessions_per_payment: usize,
    accounts: HashMap<String, (String, CustomerId)>,
    customers: HashMap<CustomerId, Customer>,
    tokens: HashMap<String, CustomerId>,
    orders: Vec<Order>,
    products: Vec<Product>,
    last_product_params: Option<ProductListParams>,
    calls: HashMap<&'static str, usize>,
    failing: HashSet<&'static str>,
}

impl FakeState {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}_{:04}", self.next_id)
    }

    fn recompute(&mut self, cart_id: &CartId) {
        let prices = &self.prices;
        if let Some(cart) = self.carts.get_mut(cart_id) {
            for item in &mut cart.items {
                item.unit_price = prices
                    .get(&item.variant_id)
                    .copied()
                    .unwrap_or(DEFAULT_UNIT_PRICE);
            }
            cart.subtotal = cart
                .items
                .iter()
                .map(|i| i.unit_price * i64::from(i.quantity))
                .sum();
            cart.total = cart.subtotal + cart.shipping_methods.iter().map(|m| m.amount).sum::<i64>();
        }
    }

    fn open_cart(&self, cart_id: &CartId) -> Result<Cart, MedusaError> {
        if self.completed.contains(cart_id) {
            return Err(MedusaError::Api {
                status: 400,
                kind: Some("invalid_data".to_string()),
                message: format!("Cart {cart_id} is already completed"),
            });
        }
        self.carts
            .get(cart_id)
            .cloned()
            .ok_or_else(|| MedusaError::NotFound(format!("Cart with id: {cart_id} was not found")))
    }

    fn customer_for(&self, token: &SecretString) -> Result<CustomerId, MedusaError> {
        self.tokens
            .get(token.expose_secret())
            .cloned()
            .ok_or_else(|| MedusaError::Unauthorized("Unauthorized".to_string()))
    }
}

/// In-memory [`CommerceBackend`].
pub struct FakeBackend {
    state: Mutex<FakeState>,
    latency: Mutex<Option<Duration>>,
}

impl Default for FakeBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeBackend {
    /// An empty backend with no regions, products or accounts.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FakeState {
                sessions_per_payment: 1,
                ..FakeState::default()
            }),
            latency: Mutex::new(None),
        }
    }

    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Count the call, apply latency, and fail if the operation is failing.
    async fn enter(&self, op: &'static str) -> Result<(), MedusaError> {
        let latency = *self.latency.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(delay) = latency {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state();
        *state.calls.entry(op).or_default() += 1;
        if state.failing.contains(op) {
            return Err(MedusaError::Api {
                status: 500,
                kind: Some("unexpected_state".to_string()),
                message: format!("{op} failed"),
            });
        }
        Ok(())
    }

    // =========================================================================
    // Setup
    // =========================================================================

    /// Add a region.
    #[must_use]
    pub fn with_region(self, id: &str, currency_code: &str) -> Self {
        self.state().regions.push(Region {
            id: RegionId::new(id),
            name: id.to_string(),
            currency_code: CurrencyCode::new(currency_code),
            countries: Vec::new(),
        });
        self
    }

    /// Set the unit price of a variant.
    #[must_use]
    pub fn with_price(self, variant_id: &str, unit_price: i64) -> Self {
        self.state()
            .prices
            .insert(VariantId::new(variant_id), unit_price);
        self
    }

    /// Add a shipping option offered for every cart.
    #[must_use]
    pub fn with_shipping_option(self, id: &str, name: &str, amount: i64) -> Self {
        self.state().shipping_options.push(ShippingOption {
            id: ShippingOptionId::new(id),
            name: name.to_string(),
            amount,
            provider_id: Some("manual_manual".to_string()),
        });
        self
    }

    /// Number of payment sessions each initiation adds to the collection.
    #[must_use]
    pub fn with_payment_sessions_per_init(self, count: usize) -> Self {
        self.state().sessions_per_payment = count;
        self
    }

    /// Register an account directly, bypassing the API.
    #[must_use]
    pub fn with_account(self, email: &str, password: &str) -> Self {
        {
            let mut state = self.state();
            let id = CustomerId::new(state.next_id("cus"));
            state
                .accounts
                .insert(email.to_string(), (password.to_string(), id.clone()));
            state.customers.insert(
                id.clone(),
                Customer {
                    id,
                    email: email.to_string(),
                    first_name: None,
                    last_name: None,
                    phone: None,
                },
            );
        }
        self
    }

    #[must_use]
    pub fn with_product(self, product: Product) -> Self {
        self.state().products.push(product);
        self
    }

    /// Insert an existing cart, e.g. to simulate a resumed session.
    pub fn insert_cart(&self, cart: Cart) {
        let id = cart.id.clone();
        self.state().carts.insert(id.clone(), cart);
        self.state().recompute(&id);
    }

    /// Delay every call by `latency`.
    pub fn set_latency(&self, latency: Option<Duration>) {
        *self.latency.lock().unwrap_or_else(PoisonError::into_inner) = latency;
    }

    // =========================================================================
    // Failure Injection & Inspection
    // =========================================================================

    /// Make every subsequent call to `op` fail.
    pub fn fail(&self, op: &'static str) {
        self.state().failing.insert(op);
    }

    /// Undo [`FakeBackend::fail`].
    pub fn recover(&self, op: &'static str) {
        self.state().failing.remove(op);
    }

    /// Number of calls made to `op`.
    #[must_use]
    pub fn calls(&self, op: &'static str) -> usize {
        self.state().calls.get(op).copied().unwrap_or(0)
    }

    /// Total number of calls across all operations.
    #[must_use]
    pub fn total_calls(&self) -> usize {
        self.state().calls.values().sum()
    }

    /// The server's current copy of a cart.
    #[must_use]
    pub fn cart(&self, cart_id: &CartId) -> Option<Cart> {
        self.state().carts.get(cart_id).cloned()
    }

    /// Whether the token is currently accepted.
    #[must_use]
    pub fn token_is_valid(&self, token: &str) -> bool {
        self.state().tokens.contains_key(token)
    }

    /// Revoke every issued token.
    pub fn revoke_tokens(&self) {
        self.state().tokens.clear();
    }

    /// The parameters of the most recent product listing.
    #[must_use]
    pub fn last_product_params(&self) -> Option<ProductListParams> {
        self.state().last_product_params.clone()
    }
}

#[async_trait]
impl CommerceBackend for FakeBackend {
    async fn list_regions(&self) -> Result<Vec<Region>, MedusaError> {
        self.enter(ops::LIST_REGIONS).await?;
        Ok(self.state().regions.clone())
    }

    async fn create_cart(&self, region_id: Option<&RegionId>) -> Result<Cart, MedusaError> {
        self.enter(ops::CREATE_CART).await?;
        let mut state = self.state();

        let region = match region_id {
            Some(id) => Some(
                state
                    .regions
                    .iter()
                    .find(|r| &r.id == id)
                    .cloned()
                    .ok_or_else(|| MedusaError::NotFound(format!("Region {id} not found")))?,
            ),
            // Unscoped carts fall into the default (first) region
            None => state.regions.first().cloned(),
        };

        let cart = Cart {
            id: CartId::new(state.next_id("cart")),
            region_id: region.as_ref().map(|r| r.id.clone()),
            currency_code: region.map(|r| r.currency_code),
            items: Vec::new(),
            subtotal: 0,
            total: 0,
            email: None,
            shipping_address: None,
            billing_address: None,
            shipping_methods: Vec::new(),
            payment_collection: None,
        };
        state.carts.insert(cart.id.clone(), cart.clone());
        Ok(cart)
    }

    async fn retrieve_cart(&self, cart_id: &CartId) -> Result<Cart, MedusaError> {
        self.enter(ops::RETRIEVE_CART).await?;
        self.state()
            .carts
            .get(cart_id)
            .cloned()
            .ok_or_else(|| MedusaError::NotFound(format!("Cart with id: {cart_id} was not found")))
    }

    async fn update_cart(
        &self,
        cart_id: &CartId,
        update: &CartUpdate,
    ) -> Result<Cart, MedusaError> {
        self.enter(ops::UPDATE_CART).await?;
        let mut state = self.state();
        let mut cart = state.open_cart(cart_id)?;

        if let Some(email) = &update.email {
            cart.email = Some(email.trim().to_lowercase());
        }
        if let Some(address) = &update.shipping_address {
            let mut normalized = address.clone();
            normalized.country_code = normalized.country_code.map(|c| c.to_lowercase());
            cart.shipping_address = Some(normalized);
        }
        if let Some(address) = &update.billing_address {
            cart.billing_address = Some(address.clone());
        }

        state.carts.insert(cart_id.clone(), cart.clone());
        Ok(cart)
    }

    async fn add_line_item(
        &self,
        cart_id: &CartId,
        variant_id: &VariantId,
        quantity: u32,
    ) -> Result<Cart, MedusaError> {
        self.enter(ops::ADD_LINE_ITEM).await?;
        let mut state = self.state();
        let mut cart = state.open_cart(cart_id)?;

        if let Some(item) = cart.items.iter_mut().find(|i| &i.variant_id == variant_id) {
            item.quantity += quantity;
        } else {
            cart.items.push(LineItem {
                id: LineItemId::new(state.next_id("cali")),
                variant_id: variant_id.clone(),
                quantity,
                title: None,
                thumbnail: None,
                unit_price: 0,
            });
        }

        state.carts.insert(cart_id.clone(), cart);
        state.recompute(cart_id);
        state.open_cart(cart_id)
    }

    async fn update_line_item(
        &self,
        cart_id: &CartId,
        line_item_id: &LineItemId,
        quantity: u32,
    ) -> Result<Cart, MedusaError> {
        self.enter(ops::UPDATE_LINE_ITEM).await?;
        let mut state = self.state();
        let mut cart = state.open_cart(cart_id)?;

        let item = cart
            .items
            .iter_mut()
            .find(|i| &i.id == line_item_id)
            .ok_or_else(|| MedusaError::NotFound(format!("Line item {line_item_id} not found")))?;
        item.quantity = quantity;

        state.carts.insert(cart_id.clone(), cart);
        state.recompute(cart_id);
        state.open_cart(cart_id)
    }

    async fn delete_line_item(
        &self,
        cart_id: &CartId,
        line_item_id: &LineItemId,
    ) -> Result<Cart, MedusaError> {
        self.enter(ops::DELETE_LINE_ITEM).await?;
        let mut state = self.state();
        let mut cart = state.open_cart(cart_id)?;

        let before = cart.items.len();
        cart.items.retain(|i| &i.id != line_item_id);
        if cart.items.len() == before {
            return Err(MedusaError::NotFound(format!(
                "Line item {line_item_id} not found"
            )));
        }

        state.carts.insert(cart_id.clone(), cart);
        state.recompute(cart_id);
        state.open_cart(cart_id)
    }

    async fn add_shipping_method(
        &self,
        cart_id: &CartId,
        option_id: &ShippingOptionId,
    ) -> Result<Cart, MedusaError> {
        self.enter(ops::ADD_SHIPPING_METHOD).await?;
        let mut state = self.state();
        let mut cart = state.open_cart(cart_id)?;

        let option = state
            .shipping_options
            .iter()
            .find(|o| &o.id == option_id)
            .cloned()
            .ok_or_else(|| MedusaError::Api {
                status: 400,
                kind: Some("invalid_data".to_string()),
                message: format!("Shipping option {option_id} is not available"),
            })?;

        cart.shipping_methods = vec![ShippingMethod {
            id: state.next_id("casm"),
            shipping_option_id: Some(option.id),
            name: option.name,
            amount: option.amount,
        }];

        state.carts.insert(cart_id.clone(), cart);
        state.recompute(cart_id);
        state.open_cart(cart_id)
    }

    async fn list_shipping_options(
        &self,
        cart_id: &CartId,
    ) -> Result<Vec<ShippingOption>, MedusaError> {
        self.enter(ops::LIST_SHIPPING_OPTIONS).await?;
        let state = self.state();
        state.open_cart(cart_id)?;
        Ok(state.shipping_options.clone())
    }

    async fn initiate_payment_session(
        &self,
        cart: &Cart,
        provider_id: &str,
    ) -> Result<PaymentCollection, MedusaError> {
        self.enter(ops::INITIATE_PAYMENT_SESSION).await?;
        let mut state = self.state();
        let mut server_cart = state.open_cart(&cart.id)?;

        let mut collection = match server_cart.payment_collection.take() {
            Some(collection) => collection,
            None => PaymentCollection {
                id: PaymentCollectionId::new(state.next_id("pay_col")),
                amount: server_cart.total,
                currency_code: server_cart.currency_code.clone(),
                payment_sessions: Vec::new(),
            },
        };

        for _ in 0..state.sessions_per_payment {
            collection.payment_sessions.push(PaymentSession {
                id: PaymentSessionId::new(state.next_id("payses")),
                provider_id: provider_id.to_string(),
                amount: server_cart.total,
                status: Some("pending".to_string()),
                data: serde_json::Value::Null,
            });
        }

        server_cart.payment_collection = Some(collection.clone());
        state.carts.insert(cart.id.clone(), server_cart);
        Ok(collection)
    }

    async fn complete_cart(&self, cart_id: &CartId) -> Result<Order, MedusaError> {
        self.enter(ops::COMPLETE_CART).await?;
        let mut state = self.state();
        let cart = state.open_cart(cart_id)?;

        if cart.payment_collection.is_none() {
            return Err(MedusaError::CartNotCompleted(
                "Payment collection has not been initiated for cart".to_string(),
            ));
        }

        let display_id = i64::try_from(state.orders.len()).unwrap_or(i64::MAX) + 1;
        let order = Order {
            id: OrderId::new(state.next_id("order")),
            display_id: Some(display_id),
            email: cart.email.clone(),
            currency_code: cart.currency_code.clone(),
            total: cart.total,
            items: cart.items.clone(),
            created_at: Some(chrono::Utc::now()),
        };

        state.completed.insert(cart_id.clone());
        state.orders.push(order.clone());
        Ok(order)
    }

    async fn register(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<SecretString, MedusaError> {
        self.enter(ops::REGISTER).await?;
        let mut state = self.state();

        if state.accounts.contains_key(email.as_str()) {
            return Err(MedusaError::Unauthorized(
                "Identity with email already exists".to_string(),
            ));
        }

        let id = CustomerId::new(state.next_id("cus"));
        state.accounts.insert(
            email.to_string(),
            (password.expose_secret().to_string(), id.clone()),
        );
        state.customers.insert(
            id.clone(),
            Customer {
                id: id.clone(),
                email: email.to_string(),
                first_name: None,
                last_name: None,
                phone: None,
            },
        );

        let token = state.next_id("tok");
        state.tokens.insert(token.clone(), id);
        Ok(SecretString::from(token))
    }

    async fn login(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<SecretString, MedusaError> {
        self.enter(ops::LOGIN).await?;
        let mut state = self.state();

        let id = match state.accounts.get(email.as_str()) {
            Some((stored, id)) if stored == password.expose_secret() => id.clone(),
            _ => {
                return Err(MedusaError::Unauthorized(
                    "Invalid email or password".to_string(),
                ));
            }
        };

        let token = state.next_id("tok");
        state.tokens.insert(token.clone(), id);
        Ok(SecretString::from(token))
    }

    async fn logout(&self, token: &SecretString) -> Result<(), MedusaError> {
        self.enter(ops::LOGOUT).await?;
        self.state().tokens.remove(token.expose_secret());
        Ok(())
    }

    async fn retrieve_customer(&self, token: &SecretString) -> Result<Customer, MedusaError> {
        self.enter(ops::RETRIEVE_CUSTOMER).await?;
        let state = self.state();
        let id = state.customer_for(token)?;
        state
            .customers
            .get(&id)
            .cloned()
            .ok_or_else(|| MedusaError::NotFound(format!("Customer {id} not found")))
    }

    async fn update_customer(
        &self,
        token: &SecretString,
        update: &CustomerUpdate,
    ) -> Result<Customer, MedusaError> {
        self.enter(ops::UPDATE_CUSTOMER).await?;
        let mut state = self.state();
        let id = state.customer_for(token)?;
        let customer = state
            .customers
            .get_mut(&id)
            .ok_or_else(|| MedusaError::NotFound(format!("Customer {id} not found")))?;

        if let Some(first_name) = &update.first_name {
            customer.first_name = Some(first_name.clone());
        }
        if let Some(last_name) = &update.last_name {
            customer.last_name = Some(last_name.clone());
        }
        if let Some(phone) = &update.phone {
            customer.phone = Some(phone.clone());
        }
        Ok(customer.clone())
    }

    async fn list_orders(&self, token: &SecretString) -> Result<Vec<Order>, MedusaError> {
        self.enter(ops::LIST_ORDERS).await?;
        let state = self.state();
        let id = state.customer_for(token)?;
        let email = state
            .customers
            .get(&id)
            .map(|c| c.email.clone())
            .unwrap_or_default();

        Ok(state
            .orders
            .iter()
            .filter(|o| o.email.as_deref() == Some(email.as_str()))
            .cloned()
            .collect())
    }

    async fn list_products(&self, params: &ProductListParams) -> Result<ProductPage, MedusaError> {
        self.enter(ops::LIST_PRODUCTS).await?;
        let mut state = self.state();
        state.last_product_params = Some(params.clone());

        let matching: Vec<Product> = state
            .products
            .iter()
            .filter(|p| params.handle.as_ref().is_none_or(|h| &p.handle == h))
            .filter(|p| {
                params
                    .q
                    .as_ref()
                    .is_none_or(|q| p.title.to_lowercase().contains(&q.to_lowercase()))
            })
            .cloned()
            .collect();

        let count = u64::try_from(matching.len()).unwrap_or(u64::MAX);
        let offset = usize::try_from(params.offset.unwrap_or(0)).unwrap_or(usize::MAX);
        let limit = params
            .limit
            .map_or(usize::MAX, |l| usize::try_from(l).unwrap_or(usize::MAX));

        Ok(ProductPage {
            products: matching.into_iter().skip(offset).take(limit).collect(),
            count,
        })
    }
}
