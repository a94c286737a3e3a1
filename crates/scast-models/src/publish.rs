//! Platform publication types.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Privacy decision supplied by the external compliance checker.
///
/// The pipeline consumes this as an input; it never computes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum PrivacyDecision {
    Public,
    #[default]
    Unlisted,
    Private,
    /// Do not deliver to the platform at all
    Blocked,
}

impl PrivacyDecision {
    /// Whether platform delivery should happen at all.
    pub fn allows_upload(&self) -> bool {
        !matches!(self, PrivacyDecision::Blocked)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PrivacyDecision::Public => "public",
            PrivacyDecision::Unlisted => "unlisted",
            PrivacyDecision::Private => "private",
            PrivacyDecision::Blocked => "blocked",
        }
    }
}

/// Metadata sent when creating a platform upload session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Validate)]
pub struct PublishMetadata {
    /// Video title (platform rejects empty or over-long titles)
    #[validate(length(min = 1, max = 100))]
    pub title: String,
    /// Video description
    #[serde(default)]
    #[validate(length(max = 5000))]
    pub description: String,
    /// Tags attached to the video
    #[serde(default)]
    pub tags: Vec<String>,
    /// Privacy level for the published video
    #[serde(default)]
    pub privacy: PrivacyDecision,
}
