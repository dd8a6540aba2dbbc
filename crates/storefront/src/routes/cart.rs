//! Cart route handlers.
//!
//! The cart id lives in the visitor's session slots; responses always carry
//! the server's copy of the cart.

use axum::{Json, extract::Path};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use ilyo_core::{LineItemId, VariantId, format_price};

use crate::error::{AppError, Result, add_breadcrumb};
use crate::medusa::Cart;
use crate::middleware::Visitor;
use crate::session::{StoreError, StorefrontSession};

/// Cart with its display totals.
#[derive(Debug, Serialize)]
pub struct CartView {
    pub cart: Option<Cart>,
    pub item_count: u32,
    pub subtotal: i64,
    pub total: i64,
    pub formatted_subtotal: String,
    pub formatted_total: String,
}

impl CartView {
    /// Snapshot the visitor's cart, formatted in the cart's currency.
    #[must_use]
    pub fn of(session: &StorefrontSession) -> Self {
        let store = session.cart();
        let cart = store.cart();
        let currency = cart
            .as_ref()
            .and_then(|c| c.currency_code.clone())
            .unwrap_or_else(|| session.regions().currency_code());
        let (subtotal, total) = (store.subtotal(), store.total());

        Self {
            item_count: store.cart_count(),
            subtotal,
            total,
            formatted_subtotal: format_price(subtotal, &currency),
            formatted_total: format_price(total, &currency),
            cart,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    pub variant_id: VariantId,
    pub quantity: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateItemRequest {
    pub quantity: u32,
}

/// Show the cart, resuming the persisted one if needed.
///
/// A persisted cart that no longer exists reads as an empty cart.
#[instrument(skip_all)]
pub async fn show(Visitor(session): Visitor) -> Result<Json<CartView>> {
    match session.cart().fetch_cart().await {
        Ok(_) => {}
        Err(StoreError::StaleReference(id)) => {
            tracing::warn!(cart_id = %id, "Dropped stale cart reference");
        }
        Err(e) => return Err(e.into()),
    }
    Ok(Json(CartView::of(&session)))
}

/// Add a variant to the cart, creating the cart first if needed.
#[instrument(skip_all, fields(variant_id = %req.variant_id))]
pub async fn add(
    Visitor(session): Visitor,
    Json(req): Json<AddItemRequest>,
) -> Result<Json<CartView>> {
    let quantity = req.quantity.unwrap_or(1);
    if quantity == 0 {
        return Err(AppError::BadRequest("quantity must be at least 1".to_string()));
    }

    session.cart().add_item(&req.variant_id, quantity).await?;
    add_breadcrumb(
        "cart",
        "Added item",
        Some(&[("variant_id", req.variant_id.as_str())]),
    );

    Ok(Json(CartView::of(&session)))
}

/// Set a line item's quantity.
#[instrument(skip_all, fields(line_id = %line_id))]
pub async fn update(
    Visitor(session): Visitor,
    Path(line_id): Path<LineItemId>,
    Json(req): Json<UpdateItemRequest>,
) -> Result<Json<CartView>> {
    session.cart().update_item(&line_id, req.quantity).await?;
    Ok(Json(CartView::of(&session)))
}

/// Remove a line item.
#[instrument(skip_all, fields(line_id = %line_id))]
pub async fn remove(
    Visitor(session): Visitor,
    Path(line_id): Path<LineItemId>,
) -> Result<Json<CartView>> {
    session.cart().remove_item(&line_id).await?;
    Ok(Json(CartView::of(&session)))
}
