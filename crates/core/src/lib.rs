//! Shared domain types for the incident response console backend.
//!
//! Every other crate in the workspace depends on this one for the error
//! taxonomy, the domain model (scenarios, samples, reports, actions,
//! recovery checks, knowledge documents) and the single mutex-guarded
//! state store the HTTP layer and background tasks share.

pub mod action;
pub mod bounded;
pub mod config;
pub mod error;
pub mod knowledge;
pub mod recipient;
pub mod recovery;
pub mod report;
pub mod sample;
pub mod scenario;
pub mod state;

pub use action::{ActionExecution, ActionExecutionResult, ActionStatus};
pub use bounded::Bounded;
pub use config::{AiSettings, ChatSettings, MetricsSettings, NotificationPreferences};
pub use error::{CoreError, CoreResult};
pub use knowledge::{DocumentMetadata, DocumentStatus, DocumentType, KnowledgeDocument, RecoveryState};
pub use recipient::{normalize_email, EmailRecipient};
pub use recovery::{RecoveryCheck, RecoveryStatus};
pub use report::{render_report_body, IncidentReport};
pub use sample::{MetricSample, SampleWindow};
pub use scenario::{default_scenarios, AlertScenario, CPU_SPIKE_CORE, HTTP_5XX_SURGE};
pub use state::{AppState, StateSnapshot, StateStore};
