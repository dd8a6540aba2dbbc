//! Core types for Ilyo.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod fragrance;
pub mod id;
pub mod price;
pub mod status;

pub use email::{Email, EmailError};
pub use fragrance::{
    FragranceConcentration, FragranceFamily, FragranceMetadata, Gender, Occasion, Season,
    format_notes,
};
pub use id::*;
pub use price::{CurrencyCode, format_price, format_price_range};
pub use status::CheckoutStep;
