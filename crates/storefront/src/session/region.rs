//! Region list and the active region.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{error, instrument};

use ilyo_core::{CurrencyCode, RegionId, format_price, format_price_range};

use super::{ErrorRecord, OperationQueue, StoreError, StoreStatus, Turn};
use crate::medusa::{CommerceBackend, Region};
use crate::slots::{SlotKey, SlotStore};

#[derive(Debug, Default)]
struct RegionState {
    regions: Vec<Region>,
    selected: Option<Region>,
}

/// The region list and the visitor's active region.
///
/// Exactly one region is selected whenever the list is non-empty.
pub struct RegionStore {
    backend: Arc<dyn CommerceBackend>,
    slots: Arc<dyn SlotStore>,
    queue: OperationQueue,
    state: RwLock<RegionState>,
    status: StoreStatus,
}

impl RegionStore {
    pub(crate) fn new(
        backend: Arc<dyn CommerceBackend>,
        slots: Arc<dyn SlotStore>,
        queue: OperationQueue,
    ) -> Self {
        Self {
            backend,
            slots,
            queue,
            state: RwLock::new(RegionState::default()),
            status: StoreStatus::default(),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, RegionState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, RegionState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Load the region list once and pick the active region.
    ///
    /// The persisted region wins if it is still offered, else the first one.
    ///
    /// # Errors
    ///
    /// Returns a remote failure; the previous state is kept.
    pub async fn fetch_regions(&self) -> Result<(), StoreError> {
        let turn = self.queue.enter().await;
        self.fetch_regions_queued(&turn).await
    }

    #[instrument(skip_all)]
    pub(crate) async fn fetch_regions_queued(&self, _turn: &Turn<'_>) -> Result<(), StoreError> {
        let (loaded, has_selection) = {
            let state = self.read();
            (!state.regions.is_empty(), state.selected.is_some())
        };
        if loaded {
            return Ok(());
        }

        let _loading = self.status.begin();
        let regions = self.backend.list_regions().await.map_err(|e| {
            error!(error = %e, "Failed to fetch regions");
            self.status.fail(e.into())
        })?;

        let saved = if has_selection {
            None
        } else {
            self.slots.get(SlotKey::RegionId).await
        };

        let mut state = self.write();
        if state.selected.is_none() {
            state.selected = saved
                .and_then(|id| regions.iter().find(|r| r.id.as_str() == id))
                .or_else(|| regions.first())
                .cloned();
        }
        state.regions = regions;
        Ok(())
    }

    /// Make `region_id` the active region and persist the choice.
    ///
    /// Returns `false` (and changes nothing) if the region is not in the list.
    pub async fn select_region(&self, region_id: &RegionId) -> bool {
        let _turn = self.queue.enter().await;

        let region = self
            .read()
            .regions
            .iter()
            .find(|r| &r.id == region_id)
            .cloned();
        let Some(region) = region else {
            return false;
        };

        self.write().selected = Some(region);
        self.slots
            .set(SlotKey::RegionId, region_id.to_string())
            .await;
        true
    }

    // =========================================================================
    // Snapshots
    // =========================================================================

    #[must_use]
    pub fn regions(&self) -> Vec<Region> {
        self.read().regions.clone()
    }

    #[must_use]
    pub fn selected_region(&self) -> Option<Region> {
        self.read().selected.clone()
    }

    #[must_use]
    pub fn selected_region_id(&self) -> Option<RegionId> {
        self.read().selected.as_ref().map(|r| r.id.clone())
    }

    /// The active currency, or USD with no region selected.
    #[must_use]
    pub fn currency_code(&self) -> CurrencyCode {
        self.read()
            .selected
            .as_ref()
            .map(|r| r.currency_code.clone())
            .unwrap_or_default()
    }

    /// Format minor units in the active currency (`8500` → `"$85.00"`).
    #[must_use]
    pub fn format_price(&self, amount: i64) -> String {
        format_price(amount, &self.currency_code())
    }

    #[must_use]
    pub fn format_price_range(&self, min: i64, max: i64) -> String {
        format_price_range(min, max, &self.currency_code())
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

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::medusa::fake::{FakeBackend, ops};
    use crate::slots::MemorySlots;

    fn store(backend: &Arc<FakeBackend>, slots: &Arc<MemorySlots>) -> RegionStore {
        RegionStore::new(backend.clone(), slots.clone(), OperationQueue::new())
    }

    fn backend() -> Arc<FakeBackend> {
        Arc::new(
            FakeBackend::new()
                .with_region("reg_us", "usd")
                .with_region("reg_eu", "eur"),
        )
    }

    #[tokio::test]
    async fn test_fetch_regions_selects_first() {
        let backend = backend();
        let regions = store(&backend, &Arc::new(MemorySlots::new()));

        regions.fetch_regions().await.unwrap();

        assert_eq!(regions.regions().len(), 2);
        assert_eq!(regions.selected_region_id(), Some(RegionId::new("reg_us")));
        assert_eq!(regions.currency_code().as_str(), "USD");
    }

    #[tokio::test]
    async fn test_fetch_regions_is_idempotent() {
        let backend = backend();
        let regions = store(&backend, &Arc::new(MemorySlots::new()));

        regions.fetch_regions().await.unwrap();
        regions.fetch_regions().await.unwrap();

        assert_eq!(backend.calls(ops::LIST_REGIONS), 1);
    }

    #[tokio::test]
    async fn test_fetch_regions_restores_persisted_region() {
        let backend = backend();
        let slots = Arc::new(MemorySlots::new());
        slots.set(SlotKey::RegionId, "reg_eu".to_string()).await;
        let regions = store(&backend, &slots);

        regions.fetch_regions().await.unwrap();

        assert_eq!(regions.selected_region_id(), Some(RegionId::new("reg_eu")));
        assert_eq!(regions.format_price(8500), "€85.00");
    }

    #[tokio::test]
    async fn test_fetch_regions_ignores_unknown_persisted_region() {
        let backend = backend();
        let slots = Arc::new(MemorySlots::new());
        slots.set(SlotKey::RegionId, "reg_gone".to_string()).await;
        let regions = store(&backend, &slots);

        regions.fetch_regions().await.unwrap();

        assert_eq!(regions.selected_region_id(), Some(RegionId::new("reg_us")));
    }

    #[tokio::test]
    async fn test_fetch_regions_failure_records_error() {
        let backend = backend();
        backend.fail(ops::LIST_REGIONS);
        let regions = store(&backend, &Arc::new(MemorySlots::new()));

        let err = regions.fetch_regions().await.unwrap_err();

        assert_eq!(err.kind(), super::super::ErrorKind::Remote);
        assert!(regions.error().is_some());
        assert!(regions.regions().is_empty());
        assert!(!regions.is_loading());
    }

    #[tokio::test]
    async fn test_select_region_persists_choice() {
        let backend = backend();
        let slots = Arc::new(MemorySlots::new());
        let regions = store(&backend, &slots);
        regions.fetch_regions().await.unwrap();

        assert!(regions.select_region(&RegionId::new("reg_eu")).await);

        assert_eq!(regions.currency_code().as_str(), "EUR");
        assert_eq!(slots.get(SlotKey::RegionId).await.as_deref(), Some("reg_eu"));
    }

    #[tokio::test]
    async fn test_select_unknown_region_is_a_no_op() {
        let backend = backend();
        let slots = Arc::new(MemorySlots::new());
        let regions = store(&backend, &slots);
        regions.fetch_regions().await.unwrap();

        assert!(!regions.select_region(&RegionId::new("reg_mars")).await);

        assert_eq!(regions.selected_region_id(), Some(RegionId::new("reg_us")));
        assert_eq!(slots.get(SlotKey::RegionId).await, None);
    }

    #[test]
    fn test_currency_defaults_to_usd() {
        let regions = store(&backend(), &Arc::new(MemorySlots::new()));
        assert_eq!(regions.currency_code().as_str(), "USD");
        assert_eq!(regions.format_price(8500), "$85.00");
        assert_eq!(regions.format_price_range(8500, 12000), "$85.00 - $120.00");
    }
}
