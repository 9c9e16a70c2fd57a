use thiserror::Error;

/// The error taxonomy shared across the incident console backend.
///
/// Every fallible boundary in the system returns one of these variants.
/// `NotConfigured` is never propagated to a caller as a hard failure — it is
/// always caught at the point of use and recorded as a delivery `missing`
/// reason (see `incident-pipeline`).
#[derive(Debug, Error)]
pub enum CoreError {
    /// Caller-visible precondition failure: unknown id, invalid input,
    /// unconfigured dependency the caller asked to use directly.
    #[error("{0}")]
    BadRequest(String),

    /// An external dependency (metrics source, chat platform, action
    /// simulator, LLM provider, SMTP relay) failed.
    #[error("{0}")]
    UpstreamError(String),

    /// A dependency is intentionally disabled or incomplete. Callers that
    /// receive this must translate it into a recorded "missing" reason
    /// rather than surfacing it as an error.
    #[error("{0}")]
    NotConfigured(String),

    /// Unexpected internal failure.
    #[error("internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn upstream(msg: impl Into<String>) -> Self {
        Self::UpstreamError(msg.into())
    }

    pub fn not_configured(msg: impl Into<String>) -> Self {
        Self::NotConfigured(msg.into())
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
