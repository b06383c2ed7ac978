use thiserror::Error;

/// Rejection produced by the authorization pipeline.
///
/// Both kinds are terminal and fail-closed. Infrastructure faults from the
/// key source or the registry are folded into one of them before they get here.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
}

impl AuthError {
    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self::Unauthenticated(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }
}
