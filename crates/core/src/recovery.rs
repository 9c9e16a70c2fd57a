use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum RecoveryStatus {
    Pending,
    Recovered,
}

/// Tracks whether the metrics window cleared after an [`ActionExecution`]
/// was executed. One recovery check is opened per executed plan and it
/// transitions `Pending -> Recovered` monotonically.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct RecoveryCheck {
    pub execution_id: Uuid,
    pub scenario_code: String,
    pub scenario_title: String,
    pub started_at: DateTime<Utc>,
    pub status: RecoveryStatus,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl RecoveryCheck {
    #[must_use]
    pub fn open(
        execution_id: Uuid,
        scenario_code: impl Into<String>,
        scenario_title: impl Into<String>,
    ) -> Self {
        Self {
            execution_id,
            scenario_code: scenario_code.into(),
            scenario_title: scenario_title.into(),
            started_at: Utc::now(),
            status: RecoveryStatus::Pending,
            resolved_at: None,
        }
    }

    pub fn resolve(&mut self, at: DateTime<Utc>) {
        self.status = RecoveryStatus::Recovered;
        self.resolved_at = Some(at);
    }
}
