//! Durable per-visitor key/value slots with optional expiry.
//!
//! Slots hold the few identifiers that must survive between visits: the
//! active cart, the customer token and the chosen region. An expired slot
//! reads as absent.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Lifetime of the cart and auth token slots.
pub const SEVEN_DAYS: Duration = Duration::from_secs(60 * 60 * 24 * 7);

/// The slots the storefront persists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotKey {
    CartId,
    AuthToken,
    RegionId,
}

impl SlotKey {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CartId => "cart_id",
            Self::AuthToken => "auth_token",
            Self::RegionId => "region_id",
        }
    }

    /// How long a value written to this slot stays readable.
    #[must_use]
    pub const fn max_age(self) -> Option<Duration> {
        match self {
            Self::CartId | Self::AuthToken => Some(SEVEN_DAYS),
            Self::RegionId => None,
        }
    }
}

impl std::fmt::Display for SlotKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Storage for durable slots.
#[async_trait]
pub trait SlotStore: Send + Sync {
    /// Read a slot. Expired values read as `None`.
    async fn get(&self, key: SlotKey) -> Option<String>;

    /// Write a slot with an explicit lifetime (`None` never expires).
    async fn set_with_max_age(&self, key: SlotKey, value: String, max_age: Option<Duration>);

    async fn remove(&self, key: SlotKey);

    /// Write a slot with its standard lifetime.
    async fn set(&self, key: SlotKey, value: String) {
        self.set_with_max_age(key, value, key.max_age()).await;
    }
}

#[derive(Debug, Clone)]
struct Slot {
    value: String,
    expires_at: Option<DateTime<Utc>>,
}

impl Slot {
    fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_none_or(|at| at > now)
    }
}

/// In-process [`SlotStore`].
#[derive(Debug, Default)]
pub struct MemorySlots {
    slots: RwLock<HashMap<SlotKey, Slot>>,
}

impl MemorySlots {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SlotStore for MemorySlots {
    async fn get(&self, key: SlotKey) -> Option<String> {
        let now = Utc::now();
        let slots = self.slots.read().unwrap_or_else(PoisonError::into_inner);
        slots
            .get(&key)
            .filter(|slot| slot.is_live(now))
            .map(|slot| slot.value.clone())
    }

    async fn set_with_max_age(&self, key: SlotKey, value: String, max_age: Option<Duration>) {
        let expires_at = max_age
            .and_then(|age| chrono::Duration::from_std(age).ok())
            .map(|age| Utc::now() + age);
        self.slots
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, Slot { value, expires_at });
    }

    async fn remove(&self, key: SlotKey) {
        self.slots
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_then_get() {
        let slots = MemorySlots::new();
        slots.set(SlotKey::CartId, "cart_1".to_string()).await;

        assert_eq!(slots.get(SlotKey::CartId).await.as_deref(), Some("cart_1"));
        assert_eq!(slots.get(SlotKey::AuthToken).await, None);
    }

    #[tokio::test]
    async fn test_expired_slot_reads_as_absent() {
        let slots = MemorySlots::new();
        slots
            .set_with_max_age(SlotKey::AuthToken, "tok".to_string(), Some(Duration::ZERO))
            .await;

        assert_eq!(slots.get(SlotKey::AuthToken).await, None);
    }

    #[tokio::test]
    async fn test_remove_clears_slot() {
        let slots = MemorySlots::new();
        slots.set(SlotKey::RegionId, "reg_eu".to_string()).await;
        slots.remove(SlotKey::RegionId).await;

        assert_eq!(slots.get(SlotKey::RegionId).await, None);
    }

    #[test]
    fn test_standard_lifetimes() {
        assert_eq!(SlotKey::CartId.max_age(), Some(SEVEN_DAYS));
        assert_eq!(SlotKey::AuthToken.max_age(), Some(SEVEN_DAYS));
        assert_eq!(SlotKey::RegionId.max_age(), None);
        assert_eq!(SlotKey::CartId.to_string(), "cart_id");
    }
}
