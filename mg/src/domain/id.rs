//! Run identifiers
//!
//! Every pipeline run is keyed by a UUIDv7 so checkpoints sort by creation
//! time and concurrent runs never collide.

use serde::{Deserialize, Serialize};

/// Identifier of a single pipeline run
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(String);

impl RunId {
    /// Generate a fresh run id
    pub fn generate() -> Self {
        Self(uuid::Uuid::now_v7().to_string())
    }

    /// Create from an existing id string
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the full id string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 8 characters, for display
    pub fn short(&self) -> &str {
        let end = self.0.char_indices().nth(8).map(|(i, _)| i).unwrap_or(self.0.len());
        &self.0[..end]
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for RunId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_unique() {
        let a = RunId::generate();
        let b = RunId::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn test_short() {
        let id = RunId::from_string("0193a1b2-c3d4-7000-8000-000000000000");
        assert_eq!(id.short(), "0193a1b2");

        let tiny = RunId::from_string("abc");
        assert_eq!(tiny.short(), "abc");
    }

    #[test]
    fn test_serde_transparent() {
        let id = RunId::from("run-1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"run-1\"");
    }
}
