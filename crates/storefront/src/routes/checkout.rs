//! Checkout route handlers.
//!
//! Step movement is local to the session; the address, shipping and payment
//! routes write through to the cart.

use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use ilyo_core::{CheckoutStep, Email, PaymentSessionId, ShippingOptionId, format_price};

use crate::error::{AppError, Result, add_breadcrumb};
use crate::medusa::{Address, Cart, Order, PaymentSession, ShippingOption};
use crate::middleware::Visitor;
use crate::session::{CheckoutState, StorefrontSession};

/// Checkout state alongside the cart it applies to.
#[derive(Debug, Serialize)]
pub struct CheckoutView {
    pub checkout: CheckoutState,
    pub payment_session: Option<PaymentSession>,
    pub cart: Option<Cart>,
}

impl CheckoutView {
    #[must_use]
    pub fn of(session: &StorefrontSession) -> Self {
        let checkout = session.checkout().state();
        Self {
            payment_session: checkout.payment_session().cloned(),
            checkout,
            cart: session.cart().cart(),
        }
    }
}

/// A placed order.
#[derive(Debug, Serialize)]
pub struct OrderView {
    pub order: Order,
    pub formatted_total: String,
}

impl From<Order> for OrderView {
    fn from(order: Order) -> Self {
        let currency = order.currency_code.clone().unwrap_or_default();
        Self {
            formatted_total: format_price(order.total, &currency),
            order,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct StepRequest {
    pub step: CheckoutStep,
}

#[derive(Debug, Deserialize)]
pub struct EmailRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct AddressRequest {
    pub address: Address,
}

#[derive(Debug, Deserialize)]
pub struct ShippingMethodRequest {
    pub option_id: ShippingOptionId,
}

#[derive(Debug, Deserialize)]
pub struct PaymentSessionRequest {
    pub session_id: PaymentSessionId,
}

/// Show the checkout state.
pub async fn show(Visitor(session): Visitor) -> Json<CheckoutView> {
    Json(CheckoutView::of(&session))
}

pub async fn set_step(
    Visitor(session): Visitor,
    Json(req): Json<StepRequest>,
) -> Json<CheckoutView> {
    session.checkout().set_step(req.step);
    Json(CheckoutView::of(&session))
}

pub async fn next_step(Visitor(session): Visitor) -> Json<CheckoutView> {
    session.checkout().next_step();
    Json(CheckoutView::of(&session))
}

pub async fn prev_step(Visitor(session): Visitor) -> Json<CheckoutView> {
    session.checkout().prev_step();
    Json(CheckoutView::of(&session))
}

/// Set the contact email.
#[instrument(skip_all)]
pub async fn update_email(
    Visitor(session): Visitor,
    Json(req): Json<EmailRequest>,
) -> Result<Json<CheckoutView>> {
    let email = Email::parse(&req.email).map_err(|e| AppError::BadRequest(e.to_string()))?;
    session.checkout().update_email(&email).await?;
    Ok(Json(CheckoutView::of(&session)))
}

#[instrument(skip_all)]
pub async fn update_shipping_address(
    Visitor(session): Visitor,
    Json(req): Json<AddressRequest>,
) -> Result<Json<CheckoutView>> {
    session
        .checkout()
        .update_shipping_address(&req.address)
        .await?;
    Ok(Json(CheckoutView::of(&session)))
}

#[instrument(skip_all)]
pub async fn update_billing_address(
    Visitor(session): Visitor,
    Json(req): Json<AddressRequest>,
) -> Result<Json<CheckoutView>> {
    session
        .checkout()
        .update_billing_address(&req.address)
        .await?;
    Ok(Json(CheckoutView::of(&session)))
}

/// Load the shipping options for the cart.
#[instrument(skip_all)]
pub async fn shipping_options(Visitor(session): Visitor) -> Result<Json<Vec<ShippingOption>>> {
    let options = session.checkout().fetch_shipping_options().await?;
    Ok(Json(options))
}

#[instrument(skip_all, fields(option_id = %req.option_id))]
pub async fn select_shipping_method(
    Visitor(session): Visitor,
    Json(req): Json<ShippingMethodRequest>,
) -> Result<Json<CheckoutView>> {
    session
        .checkout()
        .select_shipping_option(&req.option_id)
        .await?;
    Ok(Json(CheckoutView::of(&session)))
}

/// Start a payment session with the configured provider.
#[instrument(skip_all)]
pub async fn initialize_payment(Visitor(session): Visitor) -> Result<Json<CheckoutView>> {
    session.checkout().initialize_payment().await?;
    Ok(Json(CheckoutView::of(&session)))
}

#[instrument(skip_all, fields(session_id = %req.session_id))]
pub async fn select_payment_session(
    Visitor(session): Visitor,
    Json(req): Json<PaymentSessionRequest>,
) -> Result<Json<CheckoutView>> {
    if !session.checkout().select_payment_session(&req.session_id) {
        return Err(AppError::NotFound(format!(
            "payment session {}",
            req.session_id
        )));
    }
    Ok(Json(CheckoutView::of(&session)))
}

/// Place the order and forget the cart.
#[instrument(skip_all)]
pub async fn complete(Visitor(session): Visitor) -> Result<Json<OrderView>> {
    let order = session.confirm_order().await?;
    add_breadcrumb("checkout", "Order placed", Some(&[("order_id", order.id.as_str())]));
    Ok(Json(OrderView::from(order)))
}

pub async fn reset(Visitor(session): Visitor) -> Json<CheckoutView> {
    session.checkout().reset_checkout();
    Json(CheckoutView::of(&session))
}
