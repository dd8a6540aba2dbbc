//! Customer authentication and account route guards.
//!
//! The bearer token lives in the `auth_token` slot; the customer record is
//! cached here once resolved. A customer counts as logged in only while a
//! customer record is cached.

use std::sync::{Arc, PoisonError, RwLock};

use secrecy::{ExposeSecret, SecretString};
use tracing::{error, info, instrument, warn};

use ilyo_core::Email;

use super::{ErrorRecord, OperationQueue, StoreError, StoreStatus, Turn};
use crate::medusa::{CommerceBackend, Customer, CustomerUpdate, Order};
use crate::slots::{SlotKey, SlotStore};

const NO_CUSTOMER: &str = "no customer logged in";

/// Where a guarded route sends the visitor instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthRedirect {
    pub location: String,
}

impl AuthRedirect {
    /// Send an anonymous visitor to the login page, returning to `path` afterwards.
    #[must_use]
    pub fn to_login(path: &str) -> Self {
        Self {
            location: format!("/login?redirect={}", urlencoding::encode(path)),
        }
    }

    #[must_use]
    pub fn to_account() -> Self {
        Self {
            location: "/account".to_string(),
        }
    }
}

/// The visitor's customer identity.
pub struct AuthStore {
    backend: Arc<dyn CommerceBackend>,
    slots: Arc<dyn SlotStore>,
    queue: OperationQueue,
    customer: RwLock<Option<Customer>>,
    status: StoreStatus,
}

impl AuthStore {
    pub(crate) fn new(
        backend: Arc<dyn CommerceBackend>,
        slots: Arc<dyn SlotStore>,
        queue: OperationQueue,
    ) -> Self {
        Self {
            backend,
            slots,
            queue,
            customer: RwLock::new(None),
            status: StoreStatus::default(),
        }
    }

    fn set_customer(&self, customer: Option<Customer>) {
        *self.customer.write().unwrap_or_else(PoisonError::into_inner) = customer;
    }

    fn fail(&self, err: impl Into<StoreError>) -> StoreError {
        self.status.fail(err.into())
    }

    async fn token(&self) -> Option<SecretString> {
        self.slots
            .get(SlotKey::AuthToken)
            .await
            .map(SecretString::from)
    }

    /// Forget the customer and the token.
    async fn forget(&self) {
        self.set_customer(None);
        self.slots.remove(SlotKey::AuthToken).await;
    }

    /// Retrieve and cache the customer behind `token`.
    ///
    /// A rejected token is dropped together with any cached customer.
    async fn load_customer(&self, token: &SecretString) -> Result<Customer, StoreError> {
        match self.backend.retrieve_customer(token).await {
            Ok(customer) => {
                self.set_customer(Some(customer.clone()));
                Ok(customer)
            }
            Err(e) => {
                self.forget().await;
                Err(self.fail(e))
            }
        }
    }

    // =========================================================================
    // Session
    // =========================================================================

    /// Resolve the customer behind the stored token.
    ///
    /// Without a token no request is made. A failed lookup clears both the
    /// customer and the token and yields `None`.
    pub async fn current_customer(&self) -> Option<Customer> {
        let turn = self.queue.enter().await;
        self.current_customer_queued(&turn).await
    }

    #[instrument(skip_all)]
    async fn current_customer_queued(&self, _turn: &Turn<'_>) -> Option<Customer> {
        let Some(token) = self.token().await else {
            self.set_customer(None);
            return None;
        };

        let _loading = self.status.begin();
        match self.load_customer(&token).await {
            Ok(customer) => Some(customer),
            Err(e) => {
                warn!(error = %e, "Failed to get customer");
                None
            }
        }
    }

    /// Create an account, log it in and set the profile names.
    ///
    /// # Errors
    ///
    /// Returns the first remote failure.
    #[instrument(skip_all, fields(email = %email))]
    pub async fn register(
        &self,
        email: &Email,
        password: &SecretString,
        first_name: &str,
        last_name: &str,
    ) -> Result<Customer, StoreError> {
        let _turn = self.queue.enter().await;
        let _loading = self.status.begin();

        let token = self.backend.register(email, password).await.map_err(|e| {
            error!(error = %e, "Failed to register");
            self.fail(e)
        })?;
        self.store_token(&token).await;

        let names = CustomerUpdate {
            first_name: Some(first_name.to_string()),
            last_name: Some(last_name.to_string()),
            phone: None,
        };
        self.backend
            .update_customer(&token, &names)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to set customer name after registration");
                self.fail(e)
            })?;

        let customer = self.load_customer(&token).await?;
        info!(customer_id = %customer.id, "Customer registered");
        Ok(customer)
    }

    /// Exchange credentials for a token and load the customer.
    ///
    /// # Errors
    ///
    /// Returns the remote failure, e.g. `Unauthorized` for bad credentials.
    #[instrument(skip_all, fields(email = %email))]
    pub async fn login(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<Customer, StoreError> {
        let _turn = self.queue.enter().await;
        let _loading = self.status.begin();

        let token = self.backend.login(email, password).await.map_err(|e| {
            warn!(error = %e, "Failed to login");
            self.fail(e)
        })?;
        self.store_token(&token).await;

        let customer = self.load_customer(&token).await?;
        info!(customer_id = %customer.id, "Customer logged in");
        Ok(customer)
    }

    async fn store_token(&self, token: &SecretString) {
        self.slots
            .set(SlotKey::AuthToken, token.expose_secret().to_string())
            .await;
    }

    /// End the remote session and forget the customer locally.
    ///
    /// The local state is cleared even if the remote call fails; the failure
    /// is only recorded.
    pub async fn logout(&self) {
        let turn = self.queue.enter().await;
        self.logout_queued(&turn).await;
    }

    #[instrument(skip_all)]
    pub(crate) async fn logout_queued(&self, _turn: &Turn<'_>) {
        let _loading = self.status.begin();

        if let Some(token) = self.token().await
            && let Err(e) = self.backend.logout(&token).await
        {
            warn!(error = %e, "Failed to logout");
            let _ = self.fail(e);
        }

        self.forget().await;
    }

    // =========================================================================
    // Account
    // =========================================================================

    /// Update the logged-in customer's profile.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::MissingPrecondition`] when nobody is logged in,
    /// or the remote failure.
    #[instrument(skip_all)]
    pub async fn update_customer(&self, update: &CustomerUpdate) -> Result<Customer, StoreError> {
        let _turn = self.queue.enter().await;
        if !self.is_authenticated() {
            return Err(StoreError::MissingPrecondition(NO_CUSTOMER));
        }
        let token = self
            .token()
            .await
            .ok_or(StoreError::MissingPrecondition(NO_CUSTOMER))?;

        let _loading = self.status.begin();
        let customer = self
            .backend
            .update_customer(&token, update)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to update customer");
                self.fail(e)
            })?;

        self.set_customer(Some(customer.clone()));
        Ok(customer)
    }

    /// Orders of the logged-in customer.
    ///
    /// Empty when nobody is logged in or the lookup fails.
    pub async fn orders(&self) -> Vec<Order> {
        if !self.is_authenticated() {
            return Vec::new();
        }
        let Some(token) = self.token().await else {
            return Vec::new();
        };

        match self.backend.list_orders(&token).await {
            Ok(orders) => orders,
            Err(e) => {
                warn!(error = %e, "Failed to get orders");
                Vec::new()
            }
        }
    }

    // =========================================================================
    // Route Guards
    // =========================================================================

    /// Allow only logged-in customers onto `path`.
    ///
    /// # Errors
    ///
    /// Returns a redirect to the login page carrying `path` back.
    pub async fn require_customer(&self, path: &str) -> Result<Customer, AuthRedirect> {
        if let Some(customer) = self.customer() {
            return Ok(customer);
        }
        self.current_customer()
            .await
            .ok_or_else(|| AuthRedirect::to_login(path))
    }

    /// Allow only anonymous visitors (login and registration pages).
    ///
    /// # Errors
    ///
    /// Returns a redirect to the account page for logged-in customers.
    pub async fn guest_only(&self) -> Result<(), AuthRedirect> {
        if !self.is_authenticated() {
            self.current_customer().await;
        }
        if self.is_authenticated() {
            return Err(AuthRedirect::to_account());
        }
        Ok(())
    }

    // =========================================================================
    // Snapshots
    // =========================================================================

    #[must_use]
    pub fn customer(&self) -> Option<Customer> {
        self.customer
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.customer
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
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
