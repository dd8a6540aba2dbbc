//! The commerce backend contract consumed by the session stores.

use async_trait::async_trait;
use secrecy::SecretString;

use ilyo_core::{CartId, Email, LineItemId, RegionId, ShippingOptionId, VariantId};

use super::MedusaError;
use super::types::{
    Cart, CartUpdate, Customer, CustomerUpdate, Order, PaymentCollection, ProductPage, Region,
    ShippingOption,
};

/// Operations the storefront needs from the commerce platform.
///
/// The platform owns persistence, pricing and inventory; every cart mutation
/// returns the server's view of the whole cart.
#[async_trait]
pub trait CommerceBackend: Send + Sync {
    /// List purchasable regions in the platform's order.
    async fn list_regions(&self) -> Result<Vec<Region>, MedusaError>;

    /// Create a cart, optionally scoped to a region.
    async fn create_cart(&self, region_id: Option<&RegionId>) -> Result<Cart, MedusaError>;

    async fn retrieve_cart(&self, cart_id: &CartId) -> Result<Cart, MedusaError>;

    /// Update email and/or addresses on a cart.
    async fn update_cart(&self, cart_id: &CartId, update: &CartUpdate)
    -> Result<Cart, MedusaError>;

    async fn add_line_item(
        &self,
        cart_id: &CartId,
        variant_id: &VariantId,
        quantity: u32,
    ) -> Result<Cart, MedusaError>;

    async fn update_line_item(
        &self,
        cart_id: &CartId,
        line_item_id: &LineItemId,
        quantity: u32,
    ) -> Result<Cart, MedusaError>;

    /// Delete a line item and return the parent cart.
    async fn delete_line_item(
        &self,
        cart_id: &CartId,
        line_item_id: &LineItemId,
    ) -> Result<Cart, MedusaError>;

    async fn add_shipping_method(
        &self,
        cart_id: &CartId,
        option_id: &ShippingOptionId,
    ) -> Result<Cart, MedusaError>;

    async fn list_shipping_options(
        &self,
        cart_id: &CartId,
    ) -> Result<Vec<ShippingOption>, MedusaError>;

    /// Initiate a payment session with `provider_id`, creating the cart's
    /// payment collection first if it has none.
    async fn initiate_payment_session(
        &self,
        cart: &Cart,
        provider_id: &str,
    ) -> Result<PaymentCollection, MedusaError>;

    /// Complete the cart, producing an order.
    async fn complete_cart(&self, cart_id: &CartId) -> Result<Order, MedusaError>;

    /// Register email/password credentials and return a bearer token.
    async fn register(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<SecretString, MedusaError>;

    /// Exchange email/password for a bearer token.
    async fn login(&self, email: &Email, password: &SecretString)
    -> Result<SecretString, MedusaError>;

    async fn logout(&self, token: &SecretString) -> Result<(), MedusaError>;

    async fn retrieve_customer(&self, token: &SecretString) -> Result<Customer, MedusaError>;

    async fn update_customer(
        &self,
        token: &SecretString,
        update: &CustomerUpdate,
    ) -> Result<Customer, MedusaError>;

    /// Orders placed by the authenticated customer.
    async fn list_orders(&self, token: &SecretString) -> Result<Vec<Order>, MedusaError>;

    async fn list_products(&self, params: &ProductListParams) -> Result<ProductPage, MedusaError>;
}

/// Query parameters for `GET /store/products`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductListParams {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    /// Extra fields to expand (e.g., `+variants.calculated_price`).
    pub fields: Option<String>,
    pub region_id: Option<RegionId>,
    pub handle: Option<String>,
    /// Free-text search.
    pub q: Option<String>,
    pub category_id: Vec<String>,
    pub collection_id: Vec<String>,
    pub tag_id: Vec<String>,
    /// Sort key, prefixed with `-` for descending.
    pub order: Option<String>,
}

impl ProductListParams {
    /// Flatten into query pairs; list filters use the `key[]` form.
    #[must_use]
    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();

        if let Some(limit) = self.limit {
            query.push(("limit", limit.to_string()));
        }
        if let Some(offset) = self.offset {
            query.push(("offset", offset.to_string()));
        }
        if let Some(fields) = &self.fields {
            query.push(("fields", fields.clone()));
        }
        if let Some(region_id) = &self.region_id {
            query.push(("region_id", region_id.to_string()));
        }
        if let Some(handle) = &self.handle {
            query.push(("handle", handle.clone()));
        }
        if let Some(q) = &self.q {
            query.push(("q", q.clone()));
        }
        query.extend(self.category_id.iter().map(|id| ("category_id[]", id.clone())));
        query.extend(
            self.collection_id
                .iter()
                .map(|id| ("collection_id[]", id.clone())),
        );
        query.extend(self.tag_id.iter().map(|id| ("tag_id[]", id.clone())));
        if let Some(order) = &self.order {
            query.push(("order", order.clone()));
        }

        query
    }

    /// Whether the listing may be served from cache.
    ///
    /// Search results are never cached.
    #[must_use]
    pub const fn is_cacheable(&self) -> bool {
        self.q.is_none()
    }

    /// Stable cache key for this query.
    #[must_use]
    pub fn cache_key(&self) -> String {
        let pairs = self
            .to_query()
            .into_iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");
        format!("products:{pairs}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_query_includes_list_filters() {
        let params = ProductListParams {
            limit: Some(12),
            offset: Some(24),
            region_id: Some(RegionId::new("reg_1")),
            category_id: vec!["pcat_1".to_string(), "pcat_2".to_string()],
            order: Some("-created_at".to_string()),
            ..ProductListParams::default()
        };

        assert_eq!(
            params.to_query(),
            vec![
                ("limit", "12".to_string()),
                ("offset", "24".to_string()),
                ("region_id", "reg_1".to_string()),
                ("category_id[]", "pcat_1".to_string()),
                ("category_id[]", "pcat_2".to_string()),
                ("order", "-created_at".to_string()),
            ]
        );
    }

    #[test]
    fn test_search_queries_are_not_cacheable() {
        let params = ProductListParams {
            q: Some("oud".to_string()),
            ..ProductListParams::default()
        };
        assert!(!params.is_cacheable());
        assert!(ProductListParams::default().is_cacheable());
    }

    #[test]
    fn test_cache_key_depends_on_region() {
        let a = ProductListParams {
            region_id: Some(RegionId::new("reg_eu")),
            ..ProductListParams::default()
        };
        let b = ProductListParams {
            region_id: Some(RegionId::new("reg_us")),
            ..ProductListParams::default()
        };
        assert_ne!(a.cache_key(), b.cache_key());
    }
}
