//! Product listing and product detail.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{error, instrument};

use ilyo_core::{CurrencyCode, RegionId, VariantId};

use super::{ErrorRecord, RegionStore, StoreError, StoreStatus};
use crate::medusa::{
    CommerceBackend, MedusaError, Product, ProductImage, ProductListParams, ProductVariant,
};

/// Products per listing page unless the caller asks otherwise.
pub const DEFAULT_PAGE_SIZE: u32 = 12;

const LISTING_FIELDS: &str = "+variants.calculated_price";
const DETAIL_FIELDS: &str = "+variants.calculated_price,+variants.inventory_quantity";

// =============================================================================
// Query
// =============================================================================

/// Listing filters. `None` means "not filtered".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductFilters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub q: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection_id: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

impl ProductFilters {
    /// Overlay every filter set in `other`.
    fn merge(&mut self, other: Self) {
        if other.q.is_some() {
            self.q = other.q;
        }
        if other.category_id.is_some() {
            self.category_id = other.category_id;
        }
        if other.collection_id.is_some() {
            self.collection_id = other.collection_id;
        }
        if other.tags.is_some() {
            self.tags = other.tags;
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    #[default]
    CreatedAt,
    Title,
    Price,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

/// Listing order; newest first by default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSort {
    pub field: SortField,
    pub direction: SortDirection,
}

impl ProductSort {
    /// The `order` query parameter.
    ///
    /// `None` for price: Medusa cannot order by calculated price.
    #[must_use]
    pub fn order_param(self) -> Option<String> {
        let key = match self.field {
            SortField::CreatedAt => "created_at",
            SortField::Title => "title",
            SortField::Price => return None,
        };
        Some(match self.direction {
            SortDirection::Asc => key.to_string(),
            SortDirection::Desc => format!("-{key}"),
        })
    }
}

/// Filters, sort and pagination of a product listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductQuery {
    pub filters: ProductFilters,
    pub sort: ProductSort,
    /// 1-based page number.
    pub page: u32,
    pub limit: u32,
}

impl Default for ProductQuery {
    fn default() -> Self {
        Self {
            filters: ProductFilters::default(),
            sort: ProductSort::default(),
            page: 1,
            limit: DEFAULT_PAGE_SIZE,
        }
    }
}

impl ProductQuery {
    /// Merge `filters` into the current ones and go back to page 1.
    pub fn set_filters(&mut self, filters: ProductFilters) {
        self.filters.merge(filters);
        self.page = 1;
    }

    pub fn clear_filters(&mut self) {
        self.filters = ProductFilters::default();
        self.page = 1;
    }

    pub fn set_sort(&mut self, sort: ProductSort) {
        self.sort = sort;
        self.page = 1;
    }

    pub const fn set_page(&mut self, page: u32) {
        self.page = page;
    }

    #[must_use]
    pub const fn offset(&self) -> u32 {
        self.page.saturating_sub(1).saturating_mul(self.limit)
    }

    /// Request parameters for this query in `region_id`.
    #[must_use]
    pub fn to_params(&self, region_id: Option<RegionId>) -> ProductListParams {
        ProductListParams {
            limit: Some(self.limit),
            offset: Some(self.offset()),
            fields: Some(LISTING_FIELDS.to_string()),
            region_id,
            handle: None,
            q: self.filters.q.clone().filter(|q| !q.is_empty()),
            category_id: self.filters.category_id.clone().unwrap_or_default(),
            collection_id: self.filters.collection_id.clone().unwrap_or_default(),
            tag_id: self.filters.tags.clone().unwrap_or_default(),
            order: self.sort.order_param(),
        }
    }
}

// =============================================================================
// Results
// =============================================================================

/// One page of products with its pagination state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductListing {
    pub products: Vec<Product>,
    pub count: u64,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u64,
    pub has_next_page: bool,
    pub has_prev_page: bool,
}

impl ProductListing {
    #[must_use]
    pub fn new(products: Vec<Product>, count: u64, page: u32, limit: u32) -> Self {
        let total_pages = if limit == 0 {
            0
        } else {
            count.div_ceil(u64::from(limit))
        };
        Self {
            products,
            count,
            page,
            limit,
            total_pages,
            has_next_page: u64::from(page) < total_pages,
            has_prev_page: page > 1,
        }
    }
}

/// Price of the selected variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VariantPrice {
    pub amount: i64,
    pub original_amount: Option<i64>,
    pub currency_code: CurrencyCode,
}

/// A single product with a selected variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductDetail {
    pub product: Product,
    selected_variant_id: Option<VariantId>,
}

impl ProductDetail {
    /// Wrap `product`, selecting its first variant.
    #[must_use]
    pub fn new(product: Product) -> Self {
        let selected_variant_id = product.variants.first().map(|v| v.id.clone());
        Self {
            product,
            selected_variant_id,
        }
    }

    pub fn select_variant(&mut self, variant_id: VariantId) {
        self.selected_variant_id = Some(variant_id);
    }

    #[must_use]
    pub const fn selected_variant_id(&self) -> Option<&VariantId> {
        self.selected_variant_id.as_ref()
    }

    /// The selected variant, if it belongs to the product.
    #[must_use]
    pub fn selected_variant(&self) -> Option<&ProductVariant> {
        let id = self.selected_variant_id.as_ref()?;
        self.product.variants.iter().find(|v| &v.id == id)
    }

    #[must_use]
    pub fn price(&self) -> Option<VariantPrice> {
        let calculated = self.selected_variant()?.calculated_price.as_ref()?;
        Some(VariantPrice {
            amount: calculated.calculated_amount.unwrap_or(0),
            original_amount: calculated.original_amount,
            currency_code: calculated.currency_code.clone().unwrap_or_default(),
        })
    }

    /// Unknown inventory counts as in stock.
    #[must_use]
    pub fn in_stock(&self) -> bool {
        self.selected_variant()
            .is_some_and(|v| v.inventory_quantity.is_none_or(|qty| qty > 0))
    }

    #[must_use]
    pub fn images(&self) -> &[ProductImage] {
        &self.product.images
    }
}

// =============================================================================
// Catalog
// =============================================================================

/// Product browsing scoped to the active region.
pub struct Catalog {
    backend: Arc<dyn CommerceBackend>,
    regions: Arc<RegionStore>,
    status: StoreStatus,
}

impl Catalog {
    pub(crate) fn new(backend: Arc<dyn CommerceBackend>, regions: Arc<RegionStore>) -> Self {
        Self {
            backend,
            regions,
            status: StoreStatus::default(),
        }
    }

    /// Fetch one page of products.
    ///
    /// # Errors
    ///
    /// Returns the remote failure.
    #[instrument(skip_all, fields(page = query.page, limit = query.limit))]
    pub async fn list_products(&self, query: &ProductQuery) -> Result<ProductListing, StoreError> {
        let _loading = self.status.begin();
        let params = query.to_params(self.regions.selected_region_id());

        let page = self.backend.list_products(&params).await.map_err(|e| {
            error!(error = %e, "Failed to fetch products");
            self.status.fail(e.into())
        })?;

        Ok(ProductListing::new(
            page.products,
            page.count,
            query.page,
            query.limit,
        ))
    }

    /// Fetch a product by handle.
    ///
    /// # Errors
    ///
    /// Returns a `NotFound` remote error if no product has that handle.
    #[instrument(skip(self))]
    pub async fn product(&self, handle: &str) -> Result<ProductDetail, StoreError> {
        let _loading = self.status.begin();
        let params = ProductListParams {
            fields: Some(DETAIL_FIELDS.to_string()),
            region_id: self.regions.selected_region_id(),
            handle: Some(handle.to_string()),
            ..ProductListParams::default()
        };

        let page = self.backend.list_products(&params).await.map_err(|e| {
            error!(error = %e, "Failed to fetch product");
            self.status.fail(e.into())
        })?;

        page.products
            .into_iter()
            .next()
            .map(ProductDetail::new)
            .ok_or_else(|| {
                self.status.fail(
                    MedusaError::NotFound(format!("Product not found: {handle}")).into(),
                )
            })
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
