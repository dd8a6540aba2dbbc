//! Per-visitor storefront session state.
//!
//! # Architecture
//!
//! - [`StorefrontSession`] owns one of each store and is the single access point
//! - [`RegionStore`] → [`CartStore`] → [`CheckoutStore`] layer on each other;
//!   [`AuthStore`] and [`Catalog`] stand alone
//! - Every remote-touching mutation runs inside the session's [`OperationQueue`],
//!   so concurrent requests from the same visitor are applied in arrival order
//! - Snapshot reads take a short `RwLock` read and never wait on the queue
//!
//! # Example
//!
//! ```rust,ignore
//! use ilyo_storefront::session::StorefrontSession;
//!
//! let session = StorefrontSession::new(backend, slots, "pp_system_default");
//!
//! session.regions().fetch_regions().await?;
//! session.cart().add_item(&variant_id, 1).await?;
//! let order = session.confirm_order().await?;
//! ```

mod auth;
mod cart;
mod catalog;
mod checkout;
mod error;
mod region;

pub use auth::{AuthRedirect, AuthStore};
pub use cart::CartStore;
pub use catalog::{
    Catalog, DEFAULT_PAGE_SIZE, ProductDetail, ProductFilters, ProductListing, ProductQuery,
    ProductSort, SortDirection, SortField, VariantPrice,
};
pub use checkout::{CheckoutState, CheckoutStore};
pub use error::{ErrorKind, ErrorRecord, StoreError};
pub use region::RegionStore;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::{Mutex, MutexGuard};

use crate::medusa::{CommerceBackend, Order};
use crate::slots::SlotStore;

// =============================================================================
// Operation Queue
// =============================================================================

/// FIFO lock shared by every store of one session.
///
/// `tokio::sync::Mutex` grants the lock in request order, so queued
/// operations run one at a time in the order they were issued.
#[derive(Debug, Clone, Default)]
pub struct OperationQueue {
    lock: Arc<Mutex<()>>,
}

impl OperationQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for this operation's turn.
    pub async fn enter(&self) -> Turn<'_> {
        Turn {
            _guard: self.lock.lock().await,
        }
    }
}

/// Proof that the holder owns the session's operation queue.
///
/// Crate-private entry points take `&Turn` so composed operations (checkout
/// creating a cart, logout clearing it) run under the caller's turn instead
/// of queueing behind themselves.
pub struct Turn<'a> {
    _guard: MutexGuard<'a, ()>,
}

// =============================================================================
// Loading & Error Status
// =============================================================================

/// Loading flag and last error of one store.
#[derive(Debug, Default)]
pub(crate) struct StoreStatus {
    in_flight: AtomicUsize,
    error: RwLock<Option<ErrorRecord>>,
}

impl StoreStatus {
    /// Mark an operation in flight and clear the previous error.
    pub fn begin(&self) -> LoadingGuard<'_> {
        self.clear_error();
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        LoadingGuard {
            in_flight: &self.in_flight,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst) > 0
    }

    pub fn error(&self) -> Option<ErrorRecord> {
        self.error
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Record `err` in the error slot (unless benign) and hand it back.
    pub fn fail(&self, err: StoreError) -> StoreError {
        if let Some(record) = err.record() {
            *self.error.write().unwrap_or_else(PoisonError::into_inner) = Some(record);
        }
        err
    }

    pub fn clear_error(&self) {
        *self.error.write().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

/// Clears the loading mark when dropped, on every exit path.
pub(crate) struct LoadingGuard<'a> {
    in_flight: &'a AtomicUsize,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

// =============================================================================
// Storefront Session
// =============================================================================

/// All session state of one visitor.
pub struct StorefrontSession {
    queue: OperationQueue,
    regions: Arc<RegionStore>,
    cart: Arc<CartStore>,
    checkout: CheckoutStore,
    auth: AuthStore,
    catalog: Catalog,
}

impl StorefrontSession {
    /// Build a session over `backend`, persisting identifiers in `slots`.
    ///
    /// `payment_provider` is the provider used by
    /// [`CheckoutStore::initialize_payment`].
    pub fn new(
        backend: Arc<dyn CommerceBackend>,
        slots: Arc<dyn SlotStore>,
        payment_provider: impl Into<String>,
    ) -> Self {
        let queue = OperationQueue::new();
        let regions = Arc::new(RegionStore::new(
            Arc::clone(&backend),
            Arc::clone(&slots),
            queue.clone(),
        ));
        let cart = Arc::new(CartStore::new(
            Arc::clone(&backend),
            Arc::clone(&slots),
            queue.clone(),
            Arc::clone(&regions),
        ));
        let checkout = CheckoutStore::new(
            Arc::clone(&backend),
            Arc::clone(&cart),
            queue.clone(),
            payment_provider.into(),
        );
        let auth = AuthStore::new(Arc::clone(&backend), slots, queue.clone());
        let catalog = Catalog::new(backend, Arc::clone(&regions));

        Self {
            queue,
            regions,
            cart,
            checkout,
            auth,
            catalog,
        }
    }

    #[must_use]
    pub fn regions(&self) -> &RegionStore {
        &self.regions
    }

    #[must_use]
    pub fn cart(&self) -> &CartStore {
        &self.cart
    }

    #[must_use]
    pub const fn checkout(&self) -> &CheckoutStore {
        &self.checkout
    }

    #[must_use]
    pub const fn auth(&self) -> &AuthStore {
        &self.auth
    }

    #[must_use]
    pub const fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Log the customer out and forget their cart.
    pub async fn logout(&self) {
        let turn = self.queue.enter().await;
        self.auth.logout_queued(&turn).await;
        self.cart.clear_queued(&turn).await;
    }

    /// Complete checkout and, once the order exists, forget the cart.
    ///
    /// # Errors
    ///
    /// Returns the completion failure; the cart is kept in that case.
    pub async fn confirm_order(&self) -> Result<Order, StoreError> {
        let turn = self.queue.enter().await;
        let order = self.checkout.complete_checkout_queued(&turn).await?;
        self.cart.clear_queued(&turn).await;
        Ok(order)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::medusa::MedusaError;

    #[test]
    fn test_loading_guard_resets_on_drop() {
        let status = StoreStatus::default();
        {
            let _outer = status.begin();
            {
                let _inner = status.begin();
                assert!(status.is_loading());
            }
            // Nested guards keep the flag until the outermost one drops
            assert!(status.is_loading());
        }
        assert!(!status.is_loading());
    }

    #[test]
    fn test_begin_clears_previous_error() {
        let status = StoreStatus::default();
        let _ = status.fail(StoreError::from(MedusaError::NotFound("x".to_string())));
        assert!(status.error().is_some());

        let _guard = status.begin();
        assert!(status.error().is_none());
    }

    #[test]
    fn test_fail_skips_benign_errors() {
        let status = StoreStatus::default();
        let err = status.fail(StoreError::MissingPrecondition("no cart"));
        assert!(err.is_benign());
        assert!(status.error().is_none());
    }

    #[tokio::test]
    async fn test_queue_serializes_turns() {
        let queue = OperationQueue::new();
        let first = queue.enter().await;

        let waiting = queue.clone();
        let handle = tokio::spawn(async move {
            let _turn = waiting.enter().await;
        });

        tokio::task::yield_now().await;
        assert!(!handle.is_finished());

        drop(first);
        handle.await.unwrap();
    }
}
