//! Request types

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Body of `POST /ask`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskRequest {
    /// The question to answer
    #[serde(default)]
    pub query: String,
}

impl AskRequest {
    /// Create a new request
    pub fn new(query: impl Into<String>) -> Self {
        Self { query: query.into() }
    }

    /// Return the trimmed query, rejecting empty or blank input
    pub fn validated_query(&self) -> Result<&str> {
        let query = self.query.trim();
        if query.is_empty() {
            return Err(Error::InvalidRequest(
                "'query' must be a non-empty string".to_string(),
            ));
        }
        Ok(query)
    }
}
