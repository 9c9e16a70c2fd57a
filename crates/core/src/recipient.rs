use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A registered email subscriber for action-status notifications.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct EmailRecipient {
    pub id: Uuid,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl EmailRecipient {
    /// Create a recipient with a lower-cased, trimmed email address.
    #[must_use]
    pub fn new(email: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: normalize_email(email),
            created_at: Utc::now(),
        }
    }
}

#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_case_and_whitespace() {
        assert_eq!(normalize_email("  Ops@Example.com "), "ops@example.com");
    }
}
