use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of an external test-management system, e.g. `zephyr` or `qtest`.
///
/// Names are compared case-insensitively, so the identifier is lower-cased
/// and trimmed on construction.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct SystemId(String);

impl SystemId {
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(name.as_ref().trim().to_ascii_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for SystemId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for SystemId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<SystemId> for String {
    fn from(value: SystemId) -> Self {
        value.0
    }
}

impl fmt::Display for SystemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<str> for SystemId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for SystemId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}
