//! Multi-step checkout layered on the cart store.
//!
//! `information → shipping → payment → confirmation`. Step movement is local
//! and unvalidated; only a successful completion moves to `confirmation` on
//! its own. Completion does not clear the cart, see
//! [`StorefrontSession::confirm_order`](super::StorefrontSession::confirm_order).

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::Serialize;
use tracing::{error, info, instrument};

use ilyo_core::{CheckoutStep, Email, PaymentSessionId, ShippingOptionId};

use super::{CartStore, ErrorRecord, OperationQueue, StoreError, StoreStatus, Turn};
use crate::medusa::{
    Address, Cart, CartUpdate, CommerceBackend, Order, PaymentCollection, PaymentSession,
    ShippingOption,
};

const NO_CART: &str = "no active cart";

/// Everything collected so far in the checkout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CheckoutState {
    pub step: CheckoutStep,
    pub email: String,
    pub shipping_address: Option<Address>,
    pub billing_address: Option<Address>,
    pub shipping_method_id: Option<ShippingOptionId>,
    pub shipping_options: Vec<ShippingOption>,
    pub payment_collection: Option<PaymentCollection>,
    pub payment_session_id: Option<PaymentSessionId>,
}

impl CheckoutState {
    /// The chosen payment session, defaulting to the collection's first.
    #[must_use]
    pub fn payment_session(&self) -> Option<&PaymentSession> {
        let sessions = &self.payment_collection.as_ref()?.payment_sessions;
        self.payment_session_id
            .as_ref()
            .and_then(|id| sessions.iter().find(|s| &s.id == id))
            .or_else(|| sessions.first())
    }
}

/// The visitor's checkout session.
pub struct CheckoutStore {
    backend: Arc<dyn CommerceBackend>,
    cart: Arc<CartStore>,
    queue: OperationQueue,
    payment_provider: String,
    state: RwLock<CheckoutState>,
    status: StoreStatus,
}

impl CheckoutStore {
    pub(crate) fn new(
        backend: Arc<dyn CommerceBackend>,
        cart: Arc<CartStore>,
        queue: OperationQueue,
        payment_provider: String,
    ) -> Self {
        Self {
            backend,
            cart,
            queue,
            payment_provider,
            state: RwLock::new(CheckoutState::default()),
            status: StoreStatus::default(),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, CheckoutState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, CheckoutState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn fail(&self, err: impl Into<StoreError>) -> StoreError {
        self.status.fail(err.into())
    }

    fn resolved_cart(&self) -> Result<Cart, StoreError> {
        self.cart
            .cart()
            .ok_or(StoreError::MissingPrecondition(NO_CART))
    }

    // =========================================================================
    // Steps
    // =========================================================================

    #[must_use]
    pub fn step(&self) -> CheckoutStep {
        self.read().step
    }

    /// Jump directly to `step`.
    pub fn set_step(&self, step: CheckoutStep) {
        self.write().step = step;
    }

    /// Advance one step, staying put at `confirmation`.
    pub fn next_step(&self) -> CheckoutStep {
        let mut state = self.write();
        state.step = state.step.next().unwrap_or(state.step);
        state.step
    }

    /// Go back one step, staying put at `information`.
    pub fn prev_step(&self) -> CheckoutStep {
        let mut state = self.write();
        state.step = state.step.prev().unwrap_or(state.step);
        state.step
    }

    // =========================================================================
    // Contact & Addresses
    // =========================================================================

    /// Set the contact email on the cart, creating the cart if needed.
    ///
    /// # Errors
    ///
    /// Returns the cart resolution or remote update failure.
    #[instrument(skip_all)]
    pub async fn update_email(&self, email: &Email) -> Result<(), StoreError> {
        self.update_cart(CartUpdate::email(email.as_str()), "email")
            .await?;
        self.write().email = email.to_string();
        Ok(())
    }

    /// # Errors
    ///
    /// Returns the cart resolution or remote update failure.
    #[instrument(skip_all)]
    pub async fn update_shipping_address(&self, address: &Address) -> Result<(), StoreError> {
        self.update_cart(
            CartUpdate::shipping_address(address.clone()),
            "shipping address",
        )
        .await?;
        self.write().shipping_address = Some(address.clone());
        Ok(())
    }

    /// # Errors
    ///
    /// Returns the cart resolution or remote update failure.
    #[instrument(skip_all)]
    pub async fn update_billing_address(&self, address: &Address) -> Result<(), StoreError> {
        self.update_cart(
            CartUpdate::billing_address(address.clone()),
            "billing address",
        )
        .await?;
        self.write().billing_address = Some(address.clone());
        Ok(())
    }

    async fn update_cart(&self, update: CartUpdate, what: &str) -> Result<(), StoreError> {
        let turn = self.queue.enter().await;
        let _loading = self.status.begin();
        let cart = self
            .cart
            .get_or_create_cart_queued(&turn)
            .await
            .map_err(|e| self.fail(e))?;

        let cart = self
            .backend
            .update_cart(&cart.id, &update)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to update {what}");
                self.fail(e)
            })?;

        self.cart.replace(cart);
        Ok(())
    }

    // =========================================================================
    // Shipping
    // =========================================================================

    /// Load the shipping options for the cart, replacing the previous list.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::MissingPrecondition`] without a cart, or the
    /// remote failure (the previous list is kept).
    #[instrument(skip_all)]
    pub async fn fetch_shipping_options(&self) -> Result<Vec<ShippingOption>, StoreError> {
        let _turn = self.queue.enter().await;
        let cart = self.resolved_cart()?;

        let _loading = self.status.begin();
        let options = self
            .backend
            .list_shipping_options(&cart.id)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to fetch shipping options");
                self.fail(e)
            })?;

        self.write().shipping_options.clone_from(&options);
        Ok(options)
    }

    /// Register `option_id` as the cart's shipping method.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::MissingPrecondition`] without a cart, or the
    /// remote failure.
    #[instrument(skip_all, fields(option_id = %option_id))]
    pub async fn select_shipping_option(
        &self,
        option_id: &ShippingOptionId,
    ) -> Result<(), StoreError> {
        let _turn = self.queue.enter().await;
        let cart = self.resolved_cart()?;

        let _loading = self.status.begin();
        let cart = self
            .backend
            .add_shipping_method(&cart.id, option_id)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to select shipping option");
                self.fail(e)
            })?;

        self.cart.replace(cart);
        self.write().shipping_method_id = Some(option_id.clone());
        Ok(())
    }

    // =========================================================================
    // Payment
    // =========================================================================

    /// Initiate a payment session with the configured provider.
    ///
    /// The whole payment collection is kept; the first session becomes the
    /// default selection.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::MissingPrecondition`] without a cart, or the
    /// remote failure.
    #[instrument(skip_all, fields(provider_id = %self.payment_provider))]
    pub async fn initialize_payment(&self) -> Result<PaymentCollection, StoreError> {
        let _turn = self.queue.enter().await;
        let cart = self.resolved_cart()?;

        let _loading = self.status.begin();
        let collection = self
            .backend
            .initiate_payment_session(&cart, &self.payment_provider)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to initialize payment");
                self.fail(e)
            })?;

        let cached = collection.clone();
        self.cart
            .update_cached(|cart| cart.payment_collection = Some(cached));

        let mut state = self.write();
        state.payment_collection = Some(collection.clone());
        state.payment_session_id = None;
        Ok(collection)
    }

    /// The selected payment session.
    #[must_use]
    pub fn payment_session(&self) -> Option<PaymentSession> {
        self.read().payment_session().cloned()
    }

    /// Select another session of the current payment collection.
    ///
    /// Returns `false` if the collection has no session with that id.
    pub fn select_payment_session(&self, session_id: &PaymentSessionId) -> bool {
        let mut state = self.write();
        let known = state
            .payment_collection
            .as_ref()
            .is_some_and(|c| c.payment_sessions.iter().any(|s| &s.id == session_id));
        if known {
            state.payment_session_id = Some(session_id.clone());
        }
        known
    }

    // =========================================================================
    // Completion
    // =========================================================================

    /// Complete the cart and move to `confirmation`.
    ///
    /// The cart store is left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::MissingPrecondition`] without a cart, or the
    /// remote failure (the step is unchanged).
    pub async fn complete_checkout(&self) -> Result<Order, StoreError> {
        let turn = self.queue.enter().await;
        self.complete_checkout_queued(&turn).await
    }

    #[instrument(skip_all)]
    pub(crate) async fn complete_checkout_queued(
        &self,
        _turn: &Turn<'_>,
    ) -> Result<Order, StoreError> {
        let cart = self.resolved_cart()?;

        let _loading = self.status.begin();
        let order = self.backend.complete_cart(&cart.id).await.map_err(|e| {
            error!(cart_id = %cart.id, error = %e, "Failed to complete checkout");
            self.fail(e)
        })?;

        info!(order_id = %order.id, cart_id = %cart.id, "Checkout completed");
        self.write().step = CheckoutStep::Confirmation;
        Ok(order)
    }

    /// Return every checkout field to its initial value.
    pub fn reset_checkout(&self) {
        *self.write() = CheckoutState::default();
        self.status.clear_error();
    }

    // =========================================================================
    // Snapshots
    // =========================================================================

    #[must_use]
    pub fn state(&self) -> CheckoutState {
        self.read().clone()
    }

    #[must_use]
    pub fn shipping_options(&self) -> Vec<ShippingOption> {
        self.read().shipping_options.clone()
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
