//! Ilyo Core - Shared types library.
//!
//! This crate provides common types used across the Ilyo storefront:
//! - `storefront` - Session stores, Medusa client and the JSON storefront API
//! - `integration-tests` - End-to-end session and router tests
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no HTTP
//! clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, money, emails, checkout
//!   steps, and fragrance metadata

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
