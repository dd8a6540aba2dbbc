//! Region route handlers.

use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use ilyo_core::{CurrencyCode, RegionId};

use crate::error::{AppError, Result};
use crate::medusa::Region;
use crate::middleware::Visitor;
use crate::session::RegionStore;

/// Region list with the active selection.
#[derive(Debug, Serialize)]
pub struct RegionsView {
    pub regions: Vec<Region>,
    pub selected_region_id: Option<RegionId>,
    pub currency_code: CurrencyCode,
}

impl From<&RegionStore> for RegionsView {
    fn from(store: &RegionStore) -> Self {
        Self {
            regions: store.regions(),
            selected_region_id: store.selected_region_id(),
            currency_code: store.currency_code(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SelectRegionRequest {
    pub region_id: RegionId,
}

/// List the regions, loading them on first use.
#[instrument(skip_all)]
pub async fn index(Visitor(session): Visitor) -> Result<Json<RegionsView>> {
    session.regions().fetch_regions().await?;
    Ok(Json(RegionsView::from(session.regions())))
}

/// Switch the active region.
#[instrument(skip_all, fields(region_id = %req.region_id))]
pub async fn select(
    Visitor(session): Visitor,
    Json(req): Json<SelectRegionRequest>,
) -> Result<Json<RegionsView>> {
    let regions = session.regions();
    regions.fetch_regions().await?;

    if !regions.select_region(&req.region_id).await {
        return Err(AppError::NotFound(format!("region {}", req.region_id)));
    }

    Ok(Json(RegionsView::from(regions)))
}
