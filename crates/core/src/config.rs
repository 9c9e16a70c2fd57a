use serde::{Deserialize, Serialize};

/// Metrics-source configuration, mutated through `/metrics/save`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct MetricsSettings {
    pub url: String,
    pub http_query: String,
    pub http_threshold: f64,
    pub cpu_query: String,
    pub cpu_threshold: f64,
}

impl MetricsSettings {
    #[must_use]
    pub fn is_configured(&self) -> bool {
        !self.url.is_empty() && !self.http_query.is_empty() && !self.cpu_query.is_empty()
    }
}

/// Chat-platform configuration, mutated through `/chat/save`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ChatSettings {
    pub token: String,
    pub channel: String,
    pub workspace: String,
}

impl ChatSettings {
    #[must_use]
    pub fn is_configured(&self) -> bool {
        !self.token.is_empty() && !self.channel.is_empty()
    }
}

/// LLM provider configuration, mutated through `/ai/save`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct AiSettings {
    pub api_key: String,
}

impl AiSettings {
    #[must_use]
    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }
}

/// Toggleable notification sinks, mutated through `/notifications/preferences`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct NotificationPreferences {
    pub chat_enabled: bool,
}

impl Default for NotificationPreferences {
    fn default() -> Self {
        Self { chat_enabled: true }
    }
}
