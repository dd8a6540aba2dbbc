//! Domain types for the Medusa Store API.
//!
//! These mirror the JSON shapes Medusa returns, keeping only the fields the
//! storefront reads. Medusa sends `null` for empty collections in some
//! responses, so list and amount fields tolerate both `null` and absence.

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Deserializer, Serialize};

use ilyo_core::{
    CartId, CurrencyCode, CustomerId, FragranceMetadata, LineItemId, OrderId,
    PaymentCollectionId, PaymentSessionId, ProductId, RegionId, ShippingOptionId, VariantId,
};

/// Deserialize `null` as the type's default value.
fn null_to_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// An amount as Medusa sends it. Totals turn fractional once percentage
/// promotions or tax rates apply.
#[derive(Deserialize)]
#[serde(untagged)]
enum WireAmount {
    Whole(i64),
    Fractional(f64),
}

impl WireAmount {
    /// Whole minor units, half-way values rounded away from zero.
    fn into_minor_units<E: serde::de::Error>(self) -> Result<i64, E> {
        match self {
            Self::Whole(amount) => Ok(amount),
            Self::Fractional(amount) => Decimal::try_from(amount)
                .ok()
                .map(|d| d.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero))
                .and_then(|d| d.to_i64())
                .ok_or_else(|| E::custom(format!("amount {amount} is out of range"))),
        }
    }
}

/// Deserialize a minor-unit amount; `null` reads as zero.
fn minor_units<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<WireAmount>::deserialize(deserializer)?
        .map_or(Ok(0), WireAmount::into_minor_units)
}

fn optional_minor_units<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<WireAmount>::deserialize(deserializer)?
        .map(WireAmount::into_minor_units)
        .transpose()
}

// =============================================================================
// Region Types
// =============================================================================

/// A market context scoping currency and pricing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub id: RegionId,
    #[serde(default, deserialize_with = "null_to_default")]
    pub name: String,
    pub currency_code: CurrencyCode,
    #[serde(default, deserialize_with = "null_to_default")]
    pub countries: Vec<RegionCountry>,
}

/// A country allowed in a region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionCountry {
    /// ISO 3166-1 alpha-2 code, lower case.
    pub iso_2: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

// =============================================================================
// Cart Types
// =============================================================================

/// Postal address attached to a cart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address_1: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address_2: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub province: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// One variant/quantity pairing within a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub id: LineItemId,
    pub variant_id: VariantId,
    pub quantity: u32,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    /// Unit price in minor units.
    #[serde(default, deserialize_with = "minor_units")]
    pub unit_price: i64,
}

/// A shipping method registered on a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingMethod {
    pub id: String,
    #[serde(default)]
    pub shipping_option_id: Option<ShippingOptionId>,
    #[serde(default, deserialize_with = "null_to_default")]
    pub name: String,
    #[serde(default, deserialize_with = "minor_units")]
    pub amount: i64,
}

/// A server-authoritative cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    pub id: CartId,
    #[serde(default)]
    pub region_id: Option<RegionId>,
    #[serde(default)]
    pub currency_code: Option<CurrencyCode>,
    #[serde(default, deserialize_with = "null_to_default")]
    pub items: Vec<LineItem>,
    /// Subtotal in minor units.
    #[serde(default, deserialize_with = "minor_units")]
    pub subtotal: i64,
    /// Total in minor units.
    #[serde(default, deserialize_with = "minor_units")]
    pub total: i64,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub shipping_address: Option<Address>,
    #[serde(default)]
    pub billing_address: Option<Address>,
    #[serde(default, deserialize_with = "null_to_default")]
    pub shipping_methods: Vec<ShippingMethod>,
    #[serde(default)]
    pub payment_collection: Option<PaymentCollection>,
}

impl Cart {
    /// Sum of all line item quantities.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|item| item.quantity).sum()
    }
}

/// Partial cart update. Only the fields that are set are sent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CartUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipping_address: Option<Address>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub billing_address: Option<Address>,
}

impl CartUpdate {
    #[must_use]
    pub fn email(email: impl Into<String>) -> Self {
        Self {
            email: Some(email.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn shipping_address(address: Address) -> Self {
        Self {
            shipping_address: Some(address),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn billing_address(address: Address) -> Self {
        Self {
            billing_address: Some(address),
            ..Self::default()
        }
    }
}

// =============================================================================
// Fulfillment & Payment Types
// =============================================================================

/// A shipping option available for a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingOption {
    pub id: ShippingOptionId,
    #[serde(default, deserialize_with = "null_to_default")]
    pub name: String,
    /// Price in minor units.
    #[serde(default, deserialize_with = "minor_units")]
    pub amount: i64,
    #[serde(default)]
    pub provider_id: Option<String>,
}

/// A provider-specific handle used to authorize payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentSession {
    pub id: PaymentSessionId,
    pub provider_id: String,
    #[serde(default, deserialize_with = "minor_units")]
    pub amount: i64,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "null_to_default")]
    pub data: serde_json::Value,
}

/// The payment collection of a cart, holding its payment sessions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentCollection {
    pub id: PaymentCollectionId,
    #[serde(default, deserialize_with = "minor_units")]
    pub amount: i64,
    #[serde(default)]
    pub currency_code: Option<CurrencyCode>,
    #[serde(default, deserialize_with = "null_to_default")]
    pub payment_sessions: Vec<PaymentSession>,
}

// =============================================================================
// Order & Customer Types
// =============================================================================

/// An order produced by completing a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    #[serde(default)]
    pub display_id: Option<i64>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub currency_code: Option<CurrencyCode>,
    #[serde(default, deserialize_with = "minor_units")]
    pub total: i64,
    #[serde(default, deserialize_with = "null_to_default")]
    pub items: Vec<LineItem>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// A registered customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub email: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

/// Partial customer profile update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

// =============================================================================
// Product Types
// =============================================================================

/// Region-specific price computed by Medusa for a variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalculatedPrice {
    #[serde(default, deserialize_with = "optional_minor_units")]
    pub calculated_amount: Option<i64>,
    #[serde(default, deserialize_with = "optional_minor_units")]
    pub original_amount: Option<i64>,
    #[serde(default)]
    pub currency_code: Option<CurrencyCode>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductVariant {
    pub id: VariantId,
    #[serde(default, deserialize_with = "null_to_default")]
    pub title: String,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub inventory_quantity: Option<i64>,
    #[serde(default)]
    pub calculated_price: Option<CalculatedPrice>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductImage {
    pub id: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub title: String,
    pub handle: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default, deserialize_with = "null_to_default")]
    pub images: Vec<ProductImage>,
    #[serde(default, deserialize_with = "null_to_default")]
    pub variants: Vec<ProductVariant>,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

impl Product {
    /// Fragrance attributes stored in the product metadata, if any.
    #[must_use]
    pub fn fragrance(&self) -> Option<FragranceMetadata> {
        self.metadata.as_ref().and_then(FragranceMetadata::from_value)
    }
}

/// One page of a product listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductPage {
    #[serde(default, deserialize_with = "null_to_default")]
    pub products: Vec<Product>,
    #[serde(default, deserialize_with = "null_to_default")]
    pub count: u64,
}

// =============================================================================
// Response Envelopes
// =============================================================================

#[derive(Debug, Deserialize)]
pub(crate) struct RegionsResponse {
    #[serde(default, deserialize_with = "null_to_default")]
    pub regions: Vec<Region>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CartResponse {
    pub cart: Cart,
}

/// Line item deletion returns the parent cart under `parent`.
#[derive(Debug, Deserialize)]
pub(crate) struct LineItemDeleteResponse {
    pub id: LineItemId,
    #[serde(default)]
    pub deleted: bool,
    #[serde(default)]
    pub parent: Option<Cart>,
}

impl LineItemDeleteResponse {
    /// Normalize to the cart shape every other cart mutation returns.
    pub fn into_cart(self) -> Result<Cart, super::MedusaError> {
        if !self.deleted {
            return Err(super::MedusaError::UnexpectedResponse(format!(
                "line item {} was not deleted",
                self.id
            )));
        }
        self.parent.ok_or_else(|| {
            super::MedusaError::UnexpectedResponse(format!(
                "delete of line item {} returned no parent cart",
                self.id
            ))
        })
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ShippingOptionsResponse {
    #[serde(default, deserialize_with = "null_to_default")]
    pub shipping_options: Vec<ShippingOption>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PaymentCollectionResponse {
    pub payment_collection: PaymentCollection,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CompletionError {
    #[serde(default)]
    pub message: Option<String>,
}

/// Cart completion yields either an order or the cart with an error.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum CompleteCartResponse {
    Order {
        order: Order,
    },
    Cart {
        #[allow(dead_code)]
        cart: Cart,
        #[serde(default)]
        error: Option<CompletionError>,
    },
}

#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CustomerResponse {
    pub customer: Customer,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OrdersResponse {
    #[serde(default, deserialize_with = "null_to_default")]
    pub orders: Vec<Order>,
}
