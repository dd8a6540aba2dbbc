//! Checkout step state.

use core::fmt;

use serde::{Deserialize, Serialize};

/// A stage of the checkout flow.
///
/// Steps are strictly ordered: `Information < Shipping < Payment < Confirmation`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutStep {
    /// Contact email and addresses.
    #[default]
    Information,
    /// Shipping method selection.
    Shipping,
    /// Payment session setup.
    Payment,
    /// Order placed.
    Confirmation,
}

impl CheckoutStep {
    /// All steps in order.
    pub const ALL: [Self; 4] = [
        Self::Information,
        Self::Shipping,
        Self::Payment,
        Self::Confirmation,
    ];

    /// The following step, or `None` at `Confirmation`.
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Information => Some(Self::Shipping),
            Self::Shipping => Some(Self::Payment),
            Self::Payment => Some(Self::Confirmation),
            Self::Confirmation => None,
        }
    }

    /// The preceding step, or `None` at `Information`.
    #[must_use]
    pub const fn prev(self) -> Option<Self> {
        match self {
            Self::Information => None,
            Self::Shipping => Some(Self::Information),
            Self::Payment => Some(Self::Shipping),
            Self::Confirmation => Some(Self::Payment),
        }
    }

    /// The wire name of the step.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Information => "information",
            Self::Shipping => "shipping",
            Self::Payment => "payment",
            Self::Confirmation => "confirmation",
        }
    }
}

impl fmt::Display for CheckoutStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
