//! Email address types.

use crate::encoding::encode_rfc2047;
use crate::error::{Error, Result};

/// Bare email address (`local@domain`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Address(String);

impl Address {
    /// Creates a new address from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is invalid.
    pub fn new(addr: impl Into<String>) -> Result<Self> {
        let addr = addr.into();
        Self::validate(&addr)?;
        Ok(Self(addr))
    }

    /// Returns the address as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Validates an email address (basic validation).
    fn validate(addr: &str) -> Result<()> {
        if addr.is_empty() {
            return Err(Error::InvalidAddress("Address cannot be empty".into()));
        }

        if addr
            .chars()
            .any(|c| c.is_whitespace() || c.is_control() || matches!(c, '<' | '>' | ',' | '"'))
        {
            return Err(Error::InvalidAddress(format!(
                "'{addr}' contains characters not allowed in an address"
            )));
        }

        let Some((local, domain)) = addr.split_once('@') else {
            return Err(Error::InvalidAddress(format!("'{addr}' must contain @")));
        };

        if domain.contains('@') {
            return Err(Error::InvalidAddress(format!(
                "'{addr}' must have exactly one @"
            )));
        }

        if local.is_empty() || domain.is_empty() {
            return Err(Error::InvalidAddress(format!(
                "'{addr}': local and domain parts cannot be empty"
            )));
        }

        Ok(())
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Mailbox (optional display name + address).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mailbox {
    /// Display name (optional).
    pub name: Option<String>,
    /// Email address.
    pub address: Address,
    /// Character set used when the display name needs RFC 2047 encoding.
    pub name_charset: String,
}

impl Mailbox {
    /// Creates a new mailbox with just an address.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is invalid.
    pub fn new(address: impl Into<String>) -> Result<Self> {
        Ok(Self {
            name: None,
            address: Address::new(address)?,
            name_charset: "utf-8".to_string(),
        })
    }

    /// Creates a new mailbox with a display name and address.
    ///
    /// An empty display name is treated as absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is invalid.
    pub fn with_name(name: impl Into<String>, address: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let mut mailbox = Self::new(address)?;
        mailbox.name = (!name.trim().is_empty()).then_some(name);
        Ok(mailbox)
    }

    /// Sets the character set for the display name.
    #[must_use]
    pub fn with_name_charset(mut self, charset: impl Into<String>) -> Self {
        self.name_charset = charset.into();
        self
    }

    /// Formats the mailbox for a header line, encoding the name if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the name charset is unknown.
    pub fn to_header_value(&self) -> Result<String> {
        match &self.name {
            None => Ok(self.address.to_string()),
            Some(name) => {
                let encoded = encode_rfc2047(name, &self.name_charset)?;
                if encoded == *name {
                    let escaped = name.replace('\\', "\\\\").replace('"', "\\\"");
                    Ok(format!("\"{escaped}\" <{}>", self.address))
                } else {
                    Ok(format!("{encoded} <{}>", self.address))
                }
            }
        }
    }
}

impl std::fmt::Display for Mailbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{name} <{}>", self.address),
            None => write!(f, "{}", self.address),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_address() {
        let addr = Address::new("user@example.com").unwrap();
        assert_eq!(addr.as_str(), "user@example.com");
    }

    #[test]
    fn test_invalid_address_no_at() {
        assert!(Address::new("userexample.com").is_err());
    }

    #[test]
    fn test_invalid_address_empty() {
        assert!(Address::new("").is_err());
    }

    #[test]
    fn test_invalid_address_parts() {
        assert!(Address::new("@example.com").is_err());
        assert!(Address::new("user@").is_err());
        assert!(Address::new("a@b@c").is_err());
        assert!(Address::new("john doe@example.com").is_err());
    }

    #[test]
    fn test_mailbox_with_name() {
        let mailbox = Mailbox::with_name("John Doe", "john@example.com").unwrap();
        assert_eq!(mailbox.name.as_deref(), Some("John Doe"));
        assert_eq!(
            mailbox.to_header_value().unwrap(),
            "\"John Doe\" <john@example.com>"
        );
    }

    #[test]
    fn test_mailbox_blank_name_is_absent() {
        let mailbox = Mailbox::with_name("  ", "john@example.com").unwrap();
        assert!(mailbox.name.is_none());
        assert_eq!(mailbox.to_header_value().unwrap(), "john@example.com");
    }

    #[test]
    fn test_mailbox_encodes_non_ascii_name() {
        let mailbox = Mailbox::with_name("Zoë", "zoe@example.com")
            .unwrap()
            .with_name_charset("iso-8859-1");
        let value = mailbox.to_header_value().unwrap();
        assert!(value.starts_with("=?iso-8859-1?B?"));
        assert!(value.ends_with(" <zoe@example.com>"));
    }
}
