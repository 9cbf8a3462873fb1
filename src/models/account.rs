//! Account model
//!
//! Represents an account registered with the host application together with
//! its opaque credential blob.

use std::collections::BTreeMap;
use std::fmt;

use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::ids::AccountId;

/// Opaque credential bytes (token, password, key material)
///
/// Serialized as base64 and zeroed on drop.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Credential(Vec<u8>);

impl Credential {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Encode as standard base64
    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.0)
    }

    /// Decode from standard base64
    pub fn from_base64(encoded: &str) -> Result<Self, base64::DecodeError> {
        Ok(Self(STANDARD.decode(encoded)?))
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Credential([REDACTED; {} bytes])", self.0.len())
    }
}

impl Serialize for Credential {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_base64())
    }
}

impl<'de> Deserialize<'de> for Credential {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        Self::from_base64(&encoded).map_err(serde::de::Error::custom)
    }
}

/// An account known to the host application
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Unique identifier
    pub id: AccountId,

    /// Display name, usually the login (e.g., "alice@example.com")
    pub name: String,

    /// Provider type (e.g., "imap", "com.example.sync")
    #[serde(rename = "type")]
    pub account_type: String,

    /// Credential blob
    pub credential: Credential,

    /// Free-form provider data
    #[serde(default)]
    pub user_data: BTreeMap<String, String>,

    /// When the account was added
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// Create a new account
    pub fn new(
        name: impl Into<String>,
        account_type: impl Into<String>,
        credential: Credential,
    ) -> Self {
        Self {
            id: AccountId::new(),
            name: name.into(),
            account_type: account_type.into(),
            credential,
            user_data: BTreeMap::new(),
            created_at: Utc::now(),
        }
    }

    /// Attach a user data entry
    pub fn with_user_data(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.user_data.insert(key.into(), value.into());
        self
    }

    /// Validate the account
    pub fn validate(&self) -> Result<(), AccountValidationError> {
        if self.name.trim().is_empty() {
            return Err(AccountValidationError::EmptyName);
        }

        if self.account_type.trim().is_empty() {
            return Err(AccountValidationError::EmptyType);
        }

        Ok(())
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.account_type)
    }
}

/// Validation errors for accounts
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountValidationError {
    EmptyName,
    EmptyType,
}

impl fmt::Display for AccountValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyName => write!(f, "Account name cannot be empty"),
            Self::EmptyType => write!(f, "Account type cannot be empty"),
        }
    }
}

impl std::error::Error for AccountValidationError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_account() {
        let account = Account::new("alice@example.com", "imap", Credential::new("s3cret"));
        assert_eq!(account.name, "alice@example.com");
        assert_eq!(account.credential.as_bytes(), b"s3cret");
        assert!(account.validate().is_ok());
    }

    #[test]
    fn test_validation() {
        let account = Account::new("  ", "imap", Credential::new(""));
        assert_eq!(account.validate(), Err(AccountValidationError::EmptyName));

        let account = Account::new("bob", "", Credential::new(""));
        assert_eq!(account.validate(), Err(AccountValidationError::EmptyType));
    }

    #[test]
    fn test_credential_is_base64_in_json() {
        let account = Account::new("alice", "imap", Credential::new(vec![0xff, 0x00, 0x10]));
        let value = serde_json::to_value(&account).unwrap();
        assert_eq!(value["credential"], serde_json::json!("/wAQ"));
        assert_eq!(value["type"], serde_json::json!("imap"));
    }

    #[test]
    fn test_serde_round_trip() {
        let account = Account::new("alice", "imap", Credential::new("token"))
            .with_user_data("server", "mail.example.com");

        let json = serde_json::to_string(&account).unwrap();
        let deserialized: Account = serde_json::from_str(&json).unwrap();
        assert_eq!(account, deserialized);
    }

    #[test]
    fn test_credential_debug_is_redacted() {
        let credential = Credential::new("hunter2");
        let debug = format!("{:?}", credential);
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("7 bytes"));
    }
}
