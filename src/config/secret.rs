//! Credential wrappers for the marketplace app secret, access tokens and the
//! PostgreSQL connection string
//!
//! Values are zeroed on drop and redacted in `Debug`. Signing and request code reads them
//! through `expose_secret()`; anything printed for an operator goes through
//! [`SecretValue::hint`].
//!
//! # Example
//!
//! ```rust
//! use bazaar::config::secret_string;
//! use secrecy::ExposeSecret;
//!
//! let app_secret = secret_string("Xk9mQ2pLw7Rt".to_string());
//! assert_eq!(app_secret.expose_secret().hint(), "****w7Rt");
//! assert!(!format!("{app_secret:?}").contains("Xk9mQ2pLw7Rt"));
//! ```

use secrecy::{CloneableSecret, DebugSecret, Secret, SerializableSecret};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use zeroize::Zeroize;

/// Credential text held inside a [`SecretString`]
#[derive(Clone, Debug, Zeroize)]
#[zeroize(drop)]
pub struct SecretValue(String);

impl CloneableSecret for SecretValue {}
impl DebugSecret for SecretValue {}
impl SerializableSecret for SecretValue {}

impl From<String> for SecretValue {
    fn from(s: String) -> Self {
        SecretValue(s)
    }
}

impl PartialEq<str> for SecretValue {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl AsRef<str> for SecretValue {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl SecretValue {
    /// Borrow the secret as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check if the secret value is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Check if the secret value starts with a prefix
    pub fn starts_with(&self, prefix: &str) -> bool {
        self.0.starts_with(prefix)
    }

    /// Masked form safe to print: the last four characters of credentials long enough
    /// to keep eight hidden, otherwise only the mask
    pub fn hint(&self) -> String {
        const SHOWN: usize = 4;
        let chars: Vec<char> = self.0.chars().collect();
        if chars.is_empty() {
            return "(empty)".to_string();
        }
        if chars.len() < SHOWN * 3 {
            return "****".to_string();
        }
        let tail: String = chars[chars.len() - SHOWN..].iter().collect();
        format!("****{tail}")
    }
}

impl Serialize for SecretValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for SecretValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        String::deserialize(deserializer).map(SecretValue)
    }
}

/// Secret credential string
pub type SecretString = Secret<SecretValue>;

/// Wrap a credential read from configuration or the environment
#[inline]
pub fn secret_string(value: String) -> SecretString {
    Secret::new(SecretValue::from(value))
}
