//! Render job identifier.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for one render request.
///
/// All per-render state (work directory, storage keys, upload sessions)
/// is scoped under this id, which keeps concurrent renders disjoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct RenderId(String);

impl RenderId {
    /// Generate a new random render id.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Wrap an existing identifier.
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RenderId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RenderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_ids_are_unique() {
        assert_ne!(RenderId::new(), RenderId::new());
    }

    #[test]
    fn test_render_id_serde_transparent() {
        let id = RenderId::from_string("render-42");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"render-42\"");
    }
}
