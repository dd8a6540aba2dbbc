//! HTTP route handlers for storefront.
//!
//! Every handler speaks JSON and resolves the caller's storefront session
//! through the [`Visitor`](crate::middleware::Visitor) extractor.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                          - Health check (registered in main)
//!
//! # Regions
//! GET  /regions                         - Region list and active region
//! POST /regions/select                  - Switch the active region
//!
//! # Cart
//! GET    /cart                          - Current cart
//! POST   /cart/items                    - Add a variant
//! POST   /cart/items/{line_id}          - Set a line item quantity
//! DELETE /cart/items/{line_id}          - Remove a line item
//!
//! # Checkout
//! GET  /checkout                        - Checkout state
//! POST /checkout/step                   - Jump to a step
//! POST /checkout/next                   - Advance one step
//! POST /checkout/prev                   - Go back one step
//! POST /checkout/email                  - Contact email
//! POST /checkout/shipping-address       - Shipping address
//! POST /checkout/billing-address        - Billing address
//! POST /checkout/shipping-options       - Load shipping options
//! POST /checkout/shipping-method        - Choose a shipping option
//! POST /checkout/payment                - Initialize payment
//! POST /checkout/payment/select         - Choose a payment session
//! POST /checkout/complete               - Place the order
//! POST /checkout/reset                  - Start over
//!
//! # Auth (guest only, except logout)
//! POST /auth/register                   - Create an account
//! POST /auth/login                      - Log in
//! POST /auth/logout                     - Log out
//!
//! # Account (requires auth)
//! GET  /account                         - Customer profile
//! POST /account                         - Update profile
//! GET  /account/orders                  - Order history
//!
//! # Products
//! GET  /products                        - Product listing
//! GET  /products/{handle}               - Product detail
//! ```

pub mod account;
pub mod auth;
pub mod cart;
pub mod checkout;
pub mod products;
pub mod regions;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

/// Create the region routes router.
pub fn region_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(regions::index))
        .route("/select", post(regions::select))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/items", post(cart::add))
        .route("/items/{line_id}", post(cart::update).delete(cart::remove))
}

/// Create the checkout routes router.
pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(checkout::show))
        .route("/step", post(checkout::set_step))
        .route("/next", post(checkout::next_step))
        .route("/prev", post(checkout::prev_step))
        .route("/email", post(checkout::update_email))
        .route("/shipping-address", post(checkout::update_shipping_address))
        .route("/billing-address", post(checkout::update_billing_address))
        .route("/shipping-options", post(checkout::shipping_options))
        .route("/shipping-method", post(checkout::select_shipping_method))
        .route("/payment", post(checkout::initialize_payment))
        .route("/payment/select", post(checkout::select_payment_session))
        .route("/complete", post(checkout::complete))
        .route("/reset", post(checkout::reset))
}

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
}

/// Create the account routes router.
pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(account::index).post(account::update))
        .route("/orders", get(account::orders))
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index))
        .route("/{handle}", get(products::show))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/regions", region_routes())
        .nest("/cart", cart_routes())
        .nest("/checkout", checkout_routes())
        .nest("/auth", auth_routes())
        .nest("/account", account_routes())
        .nest("/products", product_routes())
}
