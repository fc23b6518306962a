//! Analysis request and caller context.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Optional caller context forwarded to providers and the persistence sink.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UserContext {
    /// The user the analysis is performed for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// What the user wants to learn about the image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goal: Option<String>,
    /// Intended audience of the image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audience: Option<String>,
    /// Additional free-form hints.
    #[serde(default)]
    pub hints: BTreeMap<String, String>,
}

impl UserContext {
    /// Creates an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the user ID.
    #[must_use]
    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Sets the goal.
    #[must_use]
    pub fn with_goal(mut self, goal: impl Into<String>) -> Self {
        self.goal = Some(goal.into());
        self
    }

    /// Adds a hint.
    #[must_use]
    pub fn with_hint(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.hints.insert(key.into(), value.into());
        self
    }
}

/// Input of one pipeline invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    /// Reference to the image (URL or storage key) understood by the providers.
    pub asset_ref: String,
    /// Human-readable asset name.
    pub asset_name: String,
    /// Caller-side asset identifier, used for persistence.
    pub asset_id: String,
    /// Optional caller context.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_context: Option<UserContext>,
}

impl AnalysisRequest {
    /// Creates a request without user context.
    #[must_use]
    pub fn new(
        asset_ref: impl Into<String>,
        asset_name: impl Into<String>,
        asset_id: impl Into<String>,
    ) -> Self {
        Self {
            asset_ref: asset_ref.into(),
            asset_name: asset_name.into(),
            asset_id: asset_id.into(),
            user_context: None,
        }
    }

    /// Attaches user context.
    #[must_use]
    pub fn with_user_context(mut self, context: UserContext) -> Self {
        self.user_context = Some(context);
        self
    }
}
