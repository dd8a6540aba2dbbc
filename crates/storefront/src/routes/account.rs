//! Account route handlers.
//!
//! These routes require a logged-in customer. Anonymous visitors get 401
//! with a `redirect` to the login page.

use axum::{Json, extract::OriginalUri, http::Uri};
use serde::Serialize;
use tracing::instrument;

use ilyo_core::format_price;

use crate::error::{AppError, Result};
use crate::medusa::{Customer, CustomerUpdate, Order};
use crate::middleware::Visitor;
use crate::session::StorefrontSession;

/// One order in the history.
#[derive(Debug, Serialize)]
pub struct OrderSummary {
    #[serde(flatten)]
    pub order: Order,
    pub formatted_total: String,
}

impl From<Order> for OrderSummary {
    fn from(order: Order) -> Self {
        let currency = order.currency_code.clone().unwrap_or_default();
        Self {
            formatted_total: format_price(order.total, &currency),
            order,
        }
    }
}

async fn require_customer(session: &StorefrontSession, uri: &Uri) -> Result<Customer> {
    session
        .auth()
        .require_customer(uri.path())
        .await
        .map_err(AppError::login_required)
}

/// Show the customer profile.
#[instrument(skip_all)]
pub async fn index(
    Visitor(session): Visitor,
    OriginalUri(uri): OriginalUri,
) -> Result<Json<Customer>> {
    let customer = require_customer(&session, &uri).await?;
    Ok(Json(customer))
}

/// Update the customer profile.
#[instrument(skip_all)]
pub async fn update(
    Visitor(session): Visitor,
    OriginalUri(uri): OriginalUri,
    Json(update): Json<CustomerUpdate>,
) -> Result<Json<Customer>> {
    require_customer(&session, &uri).await?;
    let customer = session.auth().update_customer(&update).await?;
    Ok(Json(customer))
}

/// List the customer's orders.
#[instrument(skip_all)]
pub async fn orders(
    Visitor(session): Visitor,
    OriginalUri(uri): OriginalUri,
) -> Result<Json<Vec<OrderSummary>>> {
    require_customer(&session, &uri).await?;
    let orders = session.auth().orders().await;
    Ok(Json(orders.into_iter().map(OrderSummary::from).collect()))
}
