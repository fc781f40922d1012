use serde::{Deserialize, Deserializer, Serialize};
use validator::Validate;

use crate::error::ContactError;

pub const SUCCESS_MESSAGE: &str = "Valid email. WhatsApp message sent!";

/// Inbound contact-form payload.
///
/// Absent and `null` fields both deserialize to the empty string so that a
/// missing field and a blank one are rejected the same way.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct ContactSubmission {
    #[serde(default, deserialize_with = "null_as_empty")]
    #[validate(length(min = 1))]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    #[validate(length(min = 1))]
    pub email: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    #[validate(length(min = 1))]
    pub service: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    #[validate(length(min = 1))]
    pub message: String,
}

impl ContactSubmission {
    /// All four fields must be non-empty.
    pub fn ensure_complete(&self) -> Result<(), ContactError> {
        self.validate().map_err(|errors| {
            tracing::debug!(errors = %errors, "Incomplete submission");
            ContactError::MissingFields
        })
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Serialize)]
pub struct SubmitContactResponse {
    pub success: bool,
    pub message: String,
    pub sid: String,
}

impl SubmitContactResponse {
    pub fn delivered(sid: String) -> Self {
        Self {
            success: true,
            message: SUCCESS_MESSAGE.to_string(),
            sid,
        }
    }
}
