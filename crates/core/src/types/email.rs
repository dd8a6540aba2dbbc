//! Shopper email addresses.
//!
//! The same address is used as the Medusa login identity and as the checkout
//! contact email, so it is normalized once at the edge: surrounding whitespace
//! is dropped and the domain is lower-cased. The local part is left as typed.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Why an address was rejected.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EmailError {
    #[error("email cannot be empty")]
    Empty,
    #[error("email must be at most {max} characters")]
    TooLong { max: usize },
    #[error("email must contain exactly one @")]
    BadAtCount,
    #[error("email cannot contain whitespace")]
    Whitespace,
    #[error("email is missing the part before @")]
    EmptyLocalPart,
    #[error("email domain must look like example.com")]
    InvalidDomain,
}

/// A normalized shopper email address.
///
/// Validation is structural; Medusa stays the authority on whether an address
/// is accepted.
///
/// ```
/// use ilyo_core::Email;
///
/// let email = Email::parse("  Jane.Doe@Example.COM ").unwrap();
/// assert_eq!(email.as_str(), "Jane.Doe@example.com");
///
/// assert!(Email::parse("jane@localhost").is_err());
/// assert!(Email::parse("jane@@example.com").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct Email(String);

impl Email {
    /// Longest address a mail server must accept (RFC 5321).
    pub const MAX_LENGTH: usize = 254;

    /// Validate and normalize raw form input.
    ///
    /// # Errors
    ///
    /// Returns an [`EmailError`] naming the first rule the input breaks.
    pub fn parse(raw: &str) -> Result<Self, EmailError> {
        let s = raw.trim();
        if s.is_empty() {
            return Err(EmailError::Empty);
        }
        if s.len() > Self::MAX_LENGTH {
            return Err(EmailError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }
        if s.chars().any(char::is_whitespace) {
            return Err(EmailError::Whitespace);
        }

        let (local, domain) = s.split_once('@').ok_or(EmailError::BadAtCount)?;
        if domain.contains('@') {
            return Err(EmailError::BadAtCount);
        }
        if local.is_empty() {
            return Err(EmailError::EmptyLocalPart);
        }
        if !is_dotted_domain(domain) {
            return Err(EmailError::InvalidDomain);
        }

        Ok(Self(format!("{local}@{}", domain.to_ascii_lowercase())))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The part before the `@`.
    #[must_use]
    pub fn local_part(&self) -> &str {
        self.0.split_once('@').map_or("", |(local, _)| local)
    }

    /// The lower-cased part after the `@`.
    #[must_use]
    pub fn domain(&self) -> &str {
        self.0.split_once('@').map_or("", |(_, domain)| domain)
    }
}

/// At least two non-empty labels, e.g. `example.com`.
fn is_dotted_domain(domain: &str) -> bool {
    domain.contains('.') && domain.split('.').all(|label| !label.is_empty())
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Email {
    type Error = EmailError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Email> for String {
    fn from(email: Email) -> Self {
        email.0
    }
}

impl AsRef<str> for Email {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    // =========================================================================
    // Normalization
    // =========================================================================

    #[test]
    fn test_trims_form_input() {
        let email = Email::parse("  jane@example.com\n").unwrap();
        assert_eq!(email.as_str(), "jane@example.com");
    }

    #[test]
    fn test_lowercases_domain_only() {
        let email = Email::parse("Jane.Doe@Boutique.Example.COM").unwrap();
        assert_eq!(email.local_part(), "Jane.Doe");
        assert_eq!(email.domain(), "boutique.example.com");
    }

    #[test]
    fn test_plus_addressing_kept() {
        let email = Email::parse("jane+ilyo@example.co.uk").unwrap();
        assert_eq!(email.to_string(), "jane+ilyo@example.co.uk");
    }

    // =========================================================================
    // Rejections
    // =========================================================================

    #[test]
    fn test_rejects_blank() {
        assert_eq!(Email::parse("   "), Err(EmailError::Empty));
    }

    #[test]
    fn test_rejects_overlong() {
        let long = format!("{}@example.com", "a".repeat(250));
        assert_eq!(
            Email::parse(&long),
            Err(EmailError::TooLong {
                max: Email::MAX_LENGTH
            })
        );
    }

    #[test]
    fn test_rejects_at_count() {
        assert_eq!(Email::parse("jane.example.com"), Err(EmailError::BadAtCount));
        assert_eq!(
            Email::parse("jane@shop@example.com"),
            Err(EmailError::BadAtCount)
        );
    }

    #[test]
    fn test_rejects_inner_whitespace() {
        assert_eq!(
            Email::parse("jane doe@example.com"),
            Err(EmailError::Whitespace)
        );
    }

    #[test]
    fn test_rejects_missing_local_part() {
        assert_eq!(Email::parse("@example.com"), Err(EmailError::EmptyLocalPart));
    }

    #[test]
    fn test_rejects_undotted_or_broken_domain() {
        for raw in ["jane@", "jane@localhost", "jane@.com", "jane@example.", "jane@a..b"] {
            assert_eq!(Email::parse(raw), Err(EmailError::InvalidDomain), "{raw}");
        }
    }

    // =========================================================================
    // Serde
    // =========================================================================

    #[test]
    fn test_deserialize_normalizes() {
        let email: Email = serde_json::from_str("\" jane@EXAMPLE.com \"").unwrap();
        assert_eq!(email.as_str(), "jane@example.com");
        assert_eq!(serde_json::to_string(&email).unwrap(), "\"jane@example.com\"");
    }

    #[test]
    fn test_deserialize_rejects_invalid() {
        assert!(serde_json::from_str::<Email>("\"not-an-email\"").is_err());
    }
}
