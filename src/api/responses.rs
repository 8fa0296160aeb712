//! Shared API response types

use serde::{Deserialize, Serialize};

/// Human-readable confirmation returned by mutating endpoints
#[derive(Debug, Serialize, Deserialize)]
pub struct Confirmation {
    pub message: String,
}

impl Confirmation {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
