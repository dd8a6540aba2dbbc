//! Product route handlers.

use axum::{
    Json,
    extract::{Path, Query},
};
use serde::{Deserialize, Serialize};
use tracing::{instrument, warn};

use ilyo_core::{FragranceMetadata, VariantId, format_price};

use crate::error::{AppError, Result};
use crate::medusa::Product;
use crate::middleware::Visitor;
use crate::session::{
    DEFAULT_PAGE_SIZE, ProductDetail, ProductFilters, ProductListing, ProductQuery, ProductSort,
    SortDirection, SortField, StorefrontSession, VariantPrice,
};

/// Largest page a client may request.
const MAX_PAGE_SIZE: u32 = 100;

/// Listing query string. List filters are comma-separated.
#[derive(Debug, Default, Deserialize)]
pub struct ListingParams {
    pub q: Option<String>,
    pub category_id: Option<String>,
    pub collection_id: Option<String>,
    pub tags: Option<String>,
    pub sort: Option<SortField>,
    pub direction: Option<SortDirection>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl ListingParams {
    fn into_query(self) -> Result<ProductQuery> {
        let limit = self.limit.unwrap_or(DEFAULT_PAGE_SIZE);
        if limit == 0 || limit > MAX_PAGE_SIZE {
            return Err(AppError::BadRequest(format!(
                "limit must be between 1 and {MAX_PAGE_SIZE}"
            )));
        }

        let mut query = ProductQuery {
            limit,
            ..ProductQuery::default()
        };
        query.set_filters(ProductFilters {
            q: self.q,
            category_id: self.category_id.as_deref().map(split_ids),
            collection_id: self.collection_id.as_deref().map(split_ids),
            tags: self.tags.as_deref().map(split_ids),
        });
        query.set_sort(ProductSort {
            field: self.sort.unwrap_or_default(),
            direction: self.direction.unwrap_or_default(),
        });
        query.set_page(self.page.unwrap_or(1).max(1));
        Ok(query)
    }
}

fn split_ids(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(String::from)
        .collect()
}

#[derive(Debug, Deserialize)]
pub struct DetailParams {
    pub variant_id: Option<VariantId>,
}

/// A product with its selected variant resolved.
#[derive(Debug, Serialize)]
pub struct ProductView {
    pub product: Product,
    pub selected_variant_id: Option<VariantId>,
    pub price: Option<VariantPrice>,
    pub formatted_price: Option<String>,
    pub in_stock: bool,
    pub fragrance: Option<FragranceMetadata>,
}

impl From<ProductDetail> for ProductView {
    fn from(detail: ProductDetail) -> Self {
        let price = detail.price();
        Self {
            selected_variant_id: detail.selected_variant_id().cloned(),
            formatted_price: price
                .as_ref()
                .map(|p| format_price(p.amount, &p.currency_code)),
            in_stock: detail.in_stock(),
            fragrance: detail.product.fragrance(),
            price,
            product: detail.product,
        }
    }
}

/// Product prices depend on the region; load it before browsing.
async fn ensure_region(session: &StorefrontSession) {
    if let Err(e) = session.regions().fetch_regions().await {
        warn!(error = %e, "Browsing without a region");
    }
}

/// List products.
#[instrument(skip_all)]
pub async fn index(
    Visitor(session): Visitor,
    Query(params): Query<ListingParams>,
) -> Result<Json<ProductListing>> {
    let query = params.into_query()?;
    ensure_region(&session).await;

    let listing = session.catalog().list_products(&query).await?;
    Ok(Json(listing))
}

/// Show one product, optionally with a chosen variant.
#[instrument(skip(session, params))]
pub async fn show(
    Visitor(session): Visitor,
    Path(handle): Path<String>,
    Query(params): Query<DetailParams>,
) -> Result<Json<ProductView>> {
    ensure_region(&session).await;

    let mut detail = session.catalog().product(&handle).await?;
    if let Some(variant_id) = params.variant_id {
        detail.select_variant(variant_id);
    }

    Ok(Json(ProductView::from(detail)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_ids_trims_and_drops_empty() {
        assert_eq!(split_ids("pcat_1, pcat_2,,"), vec!["pcat_1", "pcat_2"]);
    }

    #[test]
    fn test_listing_params_defaults() {
        let query = ListingParams::default().into_query().unwrap_or_default();
        assert_eq!(query.page, 1);
        assert_eq!(query.limit, DEFAULT_PAGE_SIZE);
        assert_eq!(query.filters, ProductFilters::default());
    }

    #[test]
    fn test_listing_params_rejects_oversized_limit() {
        let params = ListingParams {
            limit: Some(500),
            ..ListingParams::default()
        };
        assert!(params.into_query().is_err());
    }

    #[test]
    fn test_listing_params_maps_filters_and_sort() {
        let params = ListingParams {
            q: Some("rose".to_string()),
            collection_id: Some("pcol_1".to_string()),
            sort: Some(SortField::Title),
            direction: Some(SortDirection::Asc),
            page: Some(3),
            ..ListingParams::default()
        };
        let query = params.into_query().unwrap_or_default();

        assert_eq!(query.filters.q.as_deref(), Some("rose"));
        assert_eq!(query.filters.collection_id, Some(vec!["pcol_1".to_string()]));
        assert_eq!(query.sort.order_param().as_deref(), Some("title"));
        assert_eq!(query.page, 3);
    }
}
