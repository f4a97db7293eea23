use serde::Deserialize;

use crate::error::ApiError;
use crate::suggestions::repo::SuggestionStatus;

/// Request body for resolving a suggestion.
#[derive(Debug, Deserialize)]
pub struct ResolveRequest {
    #[serde(default)]
    pub status: String,
}

impl ResolveRequest {
    /// Users may only move a suggestion to accepted or rejected; expiry is
    /// time-based and never requested by a client.
    pub fn target_status(&self) -> Result<SuggestionStatus, ApiError> {
        match self.status.as_str() {
            "accepted" => Ok(SuggestionStatus::Accepted),
            "rejected" => Ok(SuggestionStatus::Rejected),
            _ => Err(ApiError::Validation(
                "status must be \"accepted\" or \"rejected\"".into(),
            )),
        }
    }
}
