//! The visitor's active cart.
//!
//! The commerce backend owns the cart; this store keeps the last cart the
//! server returned and the identifier needed to resume it. Mutations never
//! touch line items locally, they replace the cached cart wholesale.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};

use tracing::{error, info, instrument, warn};

use ilyo_core::{CartId, LineItemId, VariantId};

use super::{ErrorRecord, OperationQueue, RegionStore, StoreError, StoreStatus, Turn};
use crate::medusa::{Cart, CommerceBackend, LineItem};
use crate::slots::{SlotKey, SlotStore};

const NO_CART: &str = "no active cart";

/// Cart state machine over `{no cart, cart resolved}`.
pub struct CartStore {
    backend: Arc<dyn CommerceBackend>,
    slots: Arc<dyn SlotStore>,
    queue: OperationQueue,
    regions: Arc<RegionStore>,
    cart: RwLock<Option<Cart>>,
    status: StoreStatus,
}

impl CartStore {
    pub(crate) fn new(
        backend: Arc<dyn CommerceBackend>,
        slots: Arc<dyn SlotStore>,
        queue: OperationQueue,
        regions: Arc<RegionStore>,
    ) -> Self {
        Self {
            backend,
            slots,
            queue,
            regions,
            cart: RwLock::new(None),
            status: StoreStatus::default(),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Option<Cart>> {
        self.cart.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the cached cart with the server's copy.
    pub(crate) fn replace(&self, cart: Cart) {
        *self.cart.write().unwrap_or_else(PoisonError::into_inner) = Some(cart);
    }

    /// Apply `f` to the cached cart, if any.
    pub(crate) fn update_cached(&self, f: impl FnOnce(&mut Cart)) {
        if let Some(cart) = self
            .cart
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .as_mut()
        {
            f(cart);
        }
    }

    fn fail(&self, err: impl Into<StoreError>) -> StoreError {
        self.status.fail(err.into())
    }

    // =========================================================================
    // Resolution
    // =========================================================================

    /// Return the cached cart, resume the persisted one, or create a new one.
    ///
    /// Creation is scoped to the active region when one is selected.
    ///
    /// # Errors
    ///
    /// Returns a remote failure if no cart could be created.
    pub async fn get_or_create_cart(&self) -> Result<Cart, StoreError> {
        let turn = self.queue.enter().await;
        self.get_or_create_cart_queued(&turn).await
    }

    #[instrument(skip_all)]
    pub(crate) async fn get_or_create_cart_queued(
        &self,
        _turn: &Turn<'_>,
    ) -> Result<Cart, StoreError> {
        if let Some(cart) = self.cart() {
            return Ok(cart);
        }

        let _loading = self.status.begin();

        if let Some(cart_id) = self.slots.get(SlotKey::CartId).await {
            match self.backend.retrieve_cart(&CartId::new(cart_id.clone())).await {
                Ok(cart) => {
                    self.replace(cart.clone());
                    return Ok(cart);
                }
                Err(e) => {
                    // Never retried; a fresh cart replaces it below
                    warn!(cart_id = %cart_id, error = %e, "Persisted cart could not be resumed");
                    self.slots.remove(SlotKey::CartId).await;
                }
            }
        }

        let region_id = self.regions.selected_region_id();
        let cart = self
            .backend
            .create_cart(region_id.as_ref())
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to create cart");
                self.fail(e)
            })?;

        info!(cart_id = %cart.id, "Created cart");
        self.slots.set(SlotKey::CartId, cart.id.to_string()).await;
        self.replace(cart.clone());
        Ok(cart)
    }

    /// Re-read the persisted cart from the backend.
    ///
    /// Returns `Ok(None)` when no cart id is persisted.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::StaleReference`] if the persisted cart can no
    /// longer be read; the identifier and cached cart are dropped.
    pub async fn fetch_cart(&self) -> Result<Option<Cart>, StoreError> {
        let _turn = self.queue.enter().await;

        let Some(cart_id) = self.slots.get(SlotKey::CartId).await else {
            return Ok(None);
        };

        let _loading = self.status.begin();
        match self.backend.retrieve_cart(&CartId::new(cart_id.clone())).await {
            Ok(cart) => {
                self.replace(cart.clone());
                Ok(Some(cart))
            }
            Err(e) => {
                error!(cart_id = %cart_id, error = %e, "Failed to fetch cart");
                self.slots.remove(SlotKey::CartId).await;
                *self.cart.write().unwrap_or_else(PoisonError::into_inner) = None;
                Err(self.fail(StoreError::StaleReference(format!("cart {cart_id}: {e}"))))
            }
        }
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Add `quantity` of a variant, creating the cart first if needed.
    ///
    /// # Errors
    ///
    /// Returns a remote failure if no cart could be obtained or the backend
    /// rejected the line item.
    #[instrument(skip_all, fields(variant_id = %variant_id, quantity = quantity))]
    pub async fn add_item(&self, variant_id: &VariantId, quantity: u32) -> Result<Cart, StoreError> {
        let turn = self.queue.enter().await;
        let _loading = self.status.begin();

        let cart = self.get_or_create_cart_queued(&turn).await?;
        let cart = self
            .backend
            .add_line_item(&cart.id, variant_id, quantity)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to add item to cart");
                self.fail(e)
            })?;

        self.replace(cart.clone());
        Ok(cart)
    }

    /// Set the quantity of a line item.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::MissingPrecondition`] without a cached cart, or
    /// the remote failure.
    #[instrument(skip_all, fields(line_item_id = %line_item_id, quantity = quantity))]
    pub async fn update_item(
        &self,
        line_item_id: &LineItemId,
        quantity: u32,
    ) -> Result<Cart, StoreError> {
        let _turn = self.queue.enter().await;
        let cart_id = self.cart_id().ok_or(StoreError::MissingPrecondition(NO_CART))?;

        let _loading = self.status.begin();
        let cart = self
            .backend
            .update_line_item(&cart_id, line_item_id, quantity)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to update item");
                self.fail(e)
            })?;

        self.replace(cart.clone());
        Ok(cart)
    }

    /// Remove a line item.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::MissingPrecondition`] without a cached cart, or
    /// the remote failure.
    #[instrument(skip_all, fields(line_item_id = %line_item_id))]
    pub async fn remove_item(&self, line_item_id: &LineItemId) -> Result<Cart, StoreError> {
        let _turn = self.queue.enter().await;
        let cart_id = self.cart_id().ok_or(StoreError::MissingPrecondition(NO_CART))?;

        let _loading = self.status.begin();
        let cart = self
            .backend
            .delete_line_item(&cart_id, line_item_id)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to remove item");
                self.fail(e)
            })?;

        self.replace(cart.clone());
        Ok(cart)
    }

    /// Forget the cart locally and drop the persisted identifier.
    pub async fn clear(&self) {
        let turn = self.queue.enter().await;
        self.clear_queued(&turn).await;
    }

    pub(crate) async fn clear_queued(&self, _turn: &Turn<'_>) {
        *self.cart.write().unwrap_or_else(PoisonError::into_inner) = None;
        self.slots.remove(SlotKey::CartId).await;
        self.status.clear_error();
    }

    // =========================================================================
    // Snapshots
    // =========================================================================

    #[must_use]
    pub fn cart(&self) -> Option<Cart> {
        self.read().clone()
    }

    #[must_use]
    pub fn cart_id(&self) -> Option<CartId> {
        self.read().as_ref().map(|c| c.id.clone())
    }

    #[must_use]
    pub fn items(&self) -> Vec<LineItem> {
        self.read()
            .as_ref()
            .map(|c| c.items.clone())
            .unwrap_or_default()
    }

    /// Sum of line item quantities.
    #[must_use]
    pub fn cart_count(&self) -> u32 {
        self.read().as_ref().map_or(0, Cart::item_count)
    }

    #[must_use]
    pub fn subtotal(&self) -> i64 {
        self.read().as_ref().map_or(0, |c| c.subtotal)
    }

    #[must_use]
    pub fn total(&self) -> i64 {
        self.read().as_ref().map_or(0, |c| c.total)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read().as_ref().is_none_or(|c| c.items.is_empty())
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.status.is_loading()
    }

    #[must_use]
    pub fn error(&self) -> Option<ErrorRecord> {
        self.status.error()
    }
}
