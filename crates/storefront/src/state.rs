//! Application state shared across handlers.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use uuid::Uuid;

use crate::config::StorefrontConfig;
use crate::medusa::CommerceBackend;
use crate::session::StorefrontSession;
use crate::slots::MemorySlots;

/// Idle visitor sessions are dropped after the cart/auth slot lifetime.
const SESSION_IDLE: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Upper bound on live visitor sessions held in memory.
const MAX_SESSIONS: u64 = 100_000;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// the commerce backend, configuration and the per-visitor sessions.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    backend: Arc<dyn CommerceBackend>,
    sessions: SessionRegistry,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Storefront configuration
    /// * `backend` - Commerce backend shared by every visitor session
    #[must_use]
    pub fn new(config: StorefrontConfig, backend: Arc<dyn CommerceBackend>) -> Self {
        let sessions = SessionRegistry::new(
            Arc::clone(&backend),
            config.medusa.payment_provider.clone(),
        );

        Self {
            inner: Arc::new(AppStateInner {
                config,
                backend,
                sessions,
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the commerce backend.
    #[must_use]
    pub fn backend(&self) -> &Arc<dyn CommerceBackend> {
        &self.inner.backend
    }

    /// Get the per-visitor session registry.
    #[must_use]
    pub fn sessions(&self) -> &SessionRegistry {
        &self.inner.sessions
    }
}

/// Live storefront sessions keyed by visitor id.
///
/// Each visitor gets its own stores and operation queue. The durable slots
/// live in memory alongside the session.
#[derive(Clone)]
pub struct SessionRegistry {
    sessions: Cache<Uuid, Arc<StorefrontSession>>,
    backend: Arc<dyn CommerceBackend>,
    payment_provider: String,
}

impl SessionRegistry {
    fn new(backend: Arc<dyn CommerceBackend>, payment_provider: String) -> Self {
        let sessions = Cache::builder()
            .max_capacity(MAX_SESSIONS)
            .time_to_idle(SESSION_IDLE)
            .build();

        Self {
            sessions,
            backend,
            payment_provider,
        }
    }

    /// The session for `visitor`, created on first use.
    pub async fn get_or_create(&self, visitor: Uuid) -> Arc<StorefrontSession> {
        self.sessions
            .get_with(visitor, async {
                tracing::debug!(%visitor, "Creating storefront session");
                Arc::new(StorefrontSession::new(
                    Arc::clone(&self.backend),
                    Arc::new(MemorySlots::new()),
                    self.payment_provider.clone(),
                ))
            })
            .await
    }
}
