//! Inference endpoint credentials
//!
//! Recognizer API tokens are held in [`SecretString`], which zeroes its
//! buffer on drop and prints `Secret([REDACTED ...])` under `{:?}`. Code that
//! needs the token calls `expose_secret()` right where it builds a request.
//!
//! ```rust
//! use phiscrub::config::secret_string;
//! use secrecy::ExposeSecret;
//!
//! let token = secret_string("hf_token".to_string());
//! assert_eq!(token.expose_secret().as_str(), "hf_token");
//! assert!(!format!("{token:?}").contains("hf_token"));
//! ```

use secrecy::{CloneableSecret, DebugSecret, Secret, SerializableSecret};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use zeroize::Zeroize;

/// Token text, zeroed on drop
#[derive(Clone, Zeroize)]
#[zeroize(drop)]
pub struct SecretValue(String);

impl CloneableSecret for SecretValue {}
impl DebugSecret for SecretValue {}
impl SerializableSecret for SecretValue {}

impl SecretValue {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl From<String> for SecretValue {
    fn from(s: String) -> Self {
        SecretValue(s)
    }
}

// reqwest's bearer_auth takes any Display
impl std::fmt::Display for SecretValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for SecretValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for SecretValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(SecretValue)
    }
}

/// A recognizer API token
pub type SecretString = Secret<SecretValue>;

#[inline]
pub fn secret_string(value: String) -> SecretString {
    Secret::new(SecretValue::from(value))
}

/// Wraps a token read from the environment or a CLI flag, dropping blanks
///
/// ```rust
/// use phiscrub::config::secret_string_opt;
///
/// assert!(secret_string_opt(Some("hf_token".to_string())).is_some());
/// assert!(secret_string_opt(Some("  ".to_string())).is_none());
/// assert!(secret_string_opt(None).is_none());
/// ```
pub fn secret_string_opt(value: Option<String>) -> Option<SecretString> {
    value
        .filter(|s| !s.trim().is_empty())
        .map(secret_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_token_is_redacted_in_debug() {
        let token = secret_string("hf_live_abc123".to_string());
        let debug_output = format!("{token:?}");

        assert!(!debug_output.contains("hf_live_abc123"));
        assert!(debug_output.contains("REDACTED"));
    }

    #[test]
    fn test_token_display_feeds_bearer_header() {
        let token = secret_string("hf_live_abc123".to_string());
        assert_eq!(
            format!("Bearer {}", token.expose_secret()),
            "Bearer hf_live_abc123"
        );
    }

    #[test]
    fn test_blank_token_is_empty() {
        assert!(secret_string(" ".to_string()).expose_secret().is_empty());
        assert!(!secret_string("x".to_string()).expose_secret().is_empty());
    }

    #[test]
    fn test_token_from_toml() {
        #[derive(Deserialize)]
        struct Recognizer {
            api_token: SecretString,
        }

        let parsed: Recognizer = toml::from_str("api_token = \"hf_from_file\"").unwrap();
        assert_eq!(parsed.api_token.expose_secret().as_str(), "hf_from_file");
    }
}
