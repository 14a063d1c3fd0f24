//! Customer e-mail address type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing an [`Email`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EmailError {
    /// The input is empty after trimming.
    #[error("e-mail address cannot be empty")]
    Empty,
    /// The input is too long.
    #[error("e-mail address must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// The input has no `@`, or more than one.
    #[error("e-mail address must contain exactly one @ symbol")]
    AtSymbol,
    /// The mailbox part (before @) is empty.
    #[error("e-mail mailbox cannot be empty")]
    EmptyMailbox,
    /// The domain part (after @) is empty.
    #[error("e-mail domain cannot be empty")]
    EmptyDomain,
    /// The input contains whitespace inside the address.
    #[error("e-mail address cannot contain whitespace")]
    Whitespace,
}

/// A customer's contact e-mail address.
///
/// Surrounding whitespace is trimmed and the domain is stored lower-cased, so
/// two addresses typed with a different domain case compare equal. The
/// mailbox part is kept as entered.
///
/// ```
/// use storekeep_core::Email;
///
/// let email = Email::parse("  Customer@Example.COM ").unwrap();
/// assert_eq!(email.as_str(), "Customer@example.com");
///
/// assert!(Email::parse("two@@signs.com").is_err());
/// assert!(Email::parse("spaced out@example.com").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(try_from = "String", into = "String")]
pub struct Email(String);

impl Email {
    /// Maximum length of an e-mail address (RFC 5321).
    pub const MAX_LENGTH: usize = 254;

    /// Parse an `Email` from user input.
    ///
    /// # Errors
    ///
    /// Returns an error if the trimmed input is empty, longer than 254
    /// characters, contains whitespace, does not contain exactly one `@`, or
    /// has an empty mailbox or domain.
    pub fn parse(s: &str) -> Result<Self, EmailError> {
        let s = s.trim();
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

        let mut parts = s.split('@');
        let (Some(mailbox), Some(domain), None) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(EmailError::AtSymbol);
        };

        if mailbox.is_empty() {
            return Err(EmailError::EmptyMailbox);
        }
        if domain.is_empty() {
            return Err(EmailError::EmptyDomain);
        }

        Ok(Self(format!("{mailbox}@{}", domain.to_lowercase())))
    }

    /// Returns the address as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the mailbox part (before the @).
    #[must_use]
    pub fn mailbox(&self) -> &str {
        self.0.split_once('@').map_or("", |(mailbox, _)| mailbox)
    }

    /// Returns the lower-cased domain part (after the @).
    #[must_use]
    pub fn domain(&self) -> &str {
        self.0.split_once('@').map_or("", |(_, domain)| domain)
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Email {
    type Err = EmailError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
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

    #[test]
    fn test_parse_valid() {
        assert!(Email::parse("customer@example.com").is_ok());
        assert!(Email::parse("first.last+orders@shop.example.co.uk").is_ok());
        assert!(Email::parse("a@b").is_ok());
    }

    #[test]
    fn test_parse_trims_and_lowercases_domain() {
        let email = Email::parse("  Buyer@Store.Example  ").unwrap();
        assert_eq!(email.as_str(), "Buyer@store.example");
        assert_eq!(email.mailbox(), "Buyer");
        assert_eq!(email.domain(), "store.example");
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(Email::parse("   "), Err(EmailError::Empty));
        assert_eq!(Email::parse("no-at"), Err(EmailError::AtSymbol));
        assert_eq!(Email::parse("a@b@c"), Err(EmailError::AtSymbol));
        assert_eq!(Email::parse("@b.com"), Err(EmailError::EmptyMailbox));
        assert_eq!(Email::parse("a@"), Err(EmailError::EmptyDomain));
        assert_eq!(Email::parse("a b@c.com"), Err(EmailError::Whitespace));

        let long = format!("{}@example.com", "x".repeat(250));
        assert!(matches!(Email::parse(&long), Err(EmailError::TooLong { max: 254 })));
    }

    #[test]
    fn test_serde_validates() {
        let email: Email = serde_json::from_str("\"shopper@EXAMPLE.com\"").unwrap();
        assert_eq!(email.as_str(), "shopper@example.com");
        assert!(serde_json::from_str::<Email>("\"not an email\"").is_err());
    }
}
