//! Currency codes and en-US formatting of minor-unit amounts.
//!
//! Medusa reports every amount as an integer in the currency's minor unit
//! (cents for USD). Display formatting divides by 100 and renders the result
//! the way an en-US `Intl.NumberFormat` with `style: "currency"` would:
//! `8500` in USD becomes `$85.00`, `123456` in EUR becomes `€1,234.56`.

use core::fmt;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// ISO 4217 currency code, normalized to upper case.
///
/// Medusa stores currency codes in lower case (`"usd"`); the storefront
/// always works with the upper-case form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct CurrencyCode(String);

impl CurrencyCode {
    /// Fallback currency when no region is selected.
    pub const DEFAULT: &'static str = "USD";

    /// Create a currency code, normalizing to upper case.
    #[must_use]
    pub fn new(code: &str) -> Self {
        Self(code.trim().to_ascii_uppercase())
    }

    /// The upper-case code.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Prefix used by en-US currency formatting, if the currency has one.
    ///
    /// Currencies without a known symbol are rendered as `"XYZ 1.00"`.
    #[must_use]
    pub fn symbol(&self) -> Option<&'static str> {
        match self.0.as_str() {
            "USD" => Some("$"),
            "EUR" => Some("€"),
            "GBP" => Some("£"),
            "JPY" => Some("¥"),
            "CAD" => Some("CA$"),
            "AUD" => Some("A$"),
            "NZD" => Some("NZ$"),
            "HKD" => Some("HK$"),
            "MXN" => Some("MX$"),
            "BRL" => Some("R$"),
            "CNY" => Some("CN¥"),
            "INR" => Some("₹"),
            "KRW" => Some("₩"),
            "ILS" => Some("₪"),
            "VND" => Some("₫"),
            "PHP" => Some("₱"),
            _ => None,
        }
    }

    /// Number of fraction digits shown by en-US formatting.
    #[must_use]
    pub fn fraction_digits(&self) -> u32 {
        match self.0.as_str() {
            "JPY" | "KRW" | "VND" | "CLP" | "ISK" | "HUF" | "TWD" | "UGX" => 0,
            _ => 2,
        }
    }
}

impl Default for CurrencyCode {
    fn default() -> Self {
        Self(Self::DEFAULT.to_owned())
    }
}

impl From<String> for CurrencyCode {
    fn from(code: String) -> Self {
        Self::new(&code)
    }
}

impl From<&str> for CurrencyCode {
    fn from(code: &str) -> Self {
        Self::new(code)
    }
}

impl From<CurrencyCode> for String {
    fn from(code: CurrencyCode) -> Self {
        code.0
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Format a minor-unit amount as an en-US currency string.
///
/// ```
/// use ilyo_core::{CurrencyCode, format_price};
///
/// assert_eq!(format_price(8500, &CurrencyCode::new("usd")), "$85.00");
/// assert_eq!(format_price(123_456, &CurrencyCode::new("eur")), "€1,234.56");
/// assert_eq!(format_price(-250, &CurrencyCode::new("usd")), "-$2.50");
/// ```
#[must_use]
pub fn format_price(amount: i64, currency: &CurrencyCode) -> String {
    let digits = currency.fraction_digits();
    let value = Decimal::new(amount, 2)
        .round_dp_with_strategy(digits, RoundingStrategy::MidpointAwayFromZero);

    let sign = if value.is_sign_negative() && !value.is_zero() {
        "-"
    } else {
        ""
    };
    let number = group_thousands(&format!("{:.*}", digits as usize, value.abs()));

    match currency.symbol() {
        Some(symbol) => format!("{sign}{symbol}{number}"),
        // Intl separates unknown codes from the number with a no-break space
        None => format!("{sign}{}\u{a0}{number}", currency.as_str()),
    }
}

/// Format a price range, collapsing to a single price when both ends match.
#[must_use]
pub fn format_price_range(min_amount: i64, max_amount: i64, currency: &CurrencyCode) -> String {
    if min_amount == max_amount {
        return format_price(min_amount, currency);
    }

    format!(
        "{} - {}",
        format_price(min_amount, currency),
        format_price(max_amount, currency)
    )
}

/// Insert `,` separators into the integer part of a plain decimal string.
fn group_thousands(plain: &str) -> String {
    let (int_part, frac_part) = plain
        .split_once('.')
        .map_or((plain, None), |(i, f)| (i, Some(f)));

    let len = int_part.len();
    let mut grouped = String::with_capacity(len + len / 3 + 4);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    if let Some(frac) = frac_part {
        grouped.push('.');
        grouped.push_str(frac);
    }
    grouped
}
