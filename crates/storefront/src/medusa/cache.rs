//! Cache types for Medusa API responses.

use super::types::{ProductPage, Region};

/// Cache key for the region list.
pub const REGIONS_KEY: &str = "regions";

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Regions(Vec<Region>),
    Products(ProductPage),
}
