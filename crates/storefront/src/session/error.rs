//! Unified error type for the session stores.

use serde::Serialize;
use thiserror::Error;

use crate::medusa::MedusaError;

/// Errors returned by every store operation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The commerce backend call failed.
    #[error(transparent)]
    Remote(#[from] MedusaError),

    /// A persisted identifier no longer resolves remotely.
    #[error("Stale reference: {0}")]
    StaleReference(String),

    /// The operation needs state the session does not have (no cart, no customer).
    #[error("Missing precondition: {0}")]
    MissingPrecondition(&'static str),
}

/// Coarse classification of a [`StoreError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Remote,
    StaleReference,
    MissingPrecondition,
}

impl StoreError {
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Remote(_) => ErrorKind::Remote,
            Self::StaleReference(_) => ErrorKind::StaleReference,
            Self::MissingPrecondition(_) => ErrorKind::MissingPrecondition,
        }
    }

    /// Whether callers may treat the error as a no-op.
    #[must_use]
    pub const fn is_benign(&self) -> bool {
        matches!(self, Self::MissingPrecondition(_))
    }

    /// The record kept in a store's error slot, if this error is recorded at all.
    #[must_use]
    pub fn record(&self) -> Option<ErrorRecord> {
        if self.is_benign() {
            return None;
        }
        Some(ErrorRecord {
            kind: self.kind(),
            message: self.to_string(),
        })
    }
}

/// The last failure observed by a store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorRecord {
    pub kind: ErrorKind,
    pub message: String,
}
