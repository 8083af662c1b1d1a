//! Domain identifier types with validation
//!
//! Newtype wrappers keep session and run identifiers from being mixed up
//! with entry names and file names, which are all plain strings otherwise.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Session identifier newtype wrapper
///
/// A session (a "data row" in the research store) groups the entries of one
/// imaging study. Session ids are used as directory names by the filesystem
/// store, so path separators and parent references are rejected.
///
/// # Examples
///
/// ```
/// use phiscrub::domain::ids::SessionId;
/// use std::str::FromStr;
///
/// let session = SessionId::from_str("MR-2024-0042").unwrap();
/// assert_eq!(session.as_str(), "MR-2024-0042");
/// assert!(SessionId::new("../etc").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    /// Creates a new SessionId from a string
    pub fn new(id: impl Into<String>) -> Result<Self, String> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err("Session ID cannot be empty".to_string());
        }
        if id.contains('/') || id.contains('\\') || id == "." || id == ".." {
            return Err(format!(
                "Session ID must not contain path separators or be a relative path: {id}"
            ));
        }
        Ok(Self(id))
    }

    /// Returns the session ID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes self and returns the inner String
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SessionId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for SessionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Identifier of a single `deidentify` invocation
///
/// Shared by the summary and every audit line written during the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(Uuid);

impl RunId {
    /// Generates a fresh random run id
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
