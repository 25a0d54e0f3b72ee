//! Router error taxonomy
//!
//! Whether a failure may be retried is a property of the error value itself,
//! see [`RouterError::is_retryable`].

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RouterError {
    /// Transient condition (network hiccup, rate limit, dependency briefly down)
    #[error("transient failure: {0}")]
    Retryable(String),

    /// The classification call failed or returned a malformed structure
    #[error("classification failed: {0}")]
    Classification(String),

    /// No handler is registered for a category
    #[error("no handler registered for category '{0}'")]
    UnknownCategory(String),

    /// A tenant resource failed to build
    #[error("failed to construct {kind} for tenant '{tenant}': {source}")]
    Construction {
        kind: &'static str,
        tenant: String,
        #[source]
        source: Box<RouterError>,
    },

    /// A handler reported `success=false` or failed outright
    #[error("handler for '{category}' failed: {reason}")]
    HandlerFailure { category: String, reason: String },

    #[error("invalid tenant id: {0}")]
    InvalidTenant(String),

    /// Non-transient failure from an external service (4xx, unparseable body)
    #[error("upstream error: {0}")]
    Upstream(String),

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

impl RouterError {
    pub fn retryable(msg: impl Into<String>) -> Self {
        Self::Retryable(msg.into())
    }

    pub fn classification(msg: impl Into<String>) -> Self {
        Self::Classification(msg.into())
    }

    pub fn upstream(msg: impl Into<String>) -> Self {
        Self::Upstream(msg.into())
    }

    pub fn handler_failure(category: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::HandlerFailure {
            category: category.into(),
            reason: reason.into(),
        }
    }

    /// Whether the retry combinator may attempt the operation again.
    ///
    /// A construction failure inherits the verdict of its cause.
    pub fn is_retryable(&self) -> bool {
        match self {
            RouterError::Retryable(_) | RouterError::Classification(_) => true,
            RouterError::Construction { source, .. } => source.is_retryable(),
            RouterError::UnknownCategory(_)
            | RouterError::HandlerFailure { .. }
            | RouterError::InvalidTenant(_)
            | RouterError::Upstream(_)
            | RouterError::Storage(_)
            | RouterError::Config(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_kinds() {
        assert!(RouterError::retryable("rate limited").is_retryable());
        assert!(RouterError::classification("bad json").is_retryable());
        assert!(!RouterError::UnknownCategory("image".into()).is_retryable());
        assert!(!RouterError::handler_failure("document", "boom").is_retryable());
        assert!(!RouterError::upstream("401 Unauthorized").is_retryable());
    }

    #[test]
    fn test_construction_follows_cause() {
        let transient = RouterError::Construction {
            kind: "document_index",
            tenant: "proj42".into(),
            source: Box::new(RouterError::retryable("503")),
        };
        assert!(transient.is_retryable());

        let terminal = RouterError::Construction {
            kind: "tenant_database",
            tenant: "proj42".into(),
            source: Box::new(RouterError::Config("missing dir".into())),
        };
        assert!(!terminal.is_retryable());
        assert!(terminal.to_string().contains("tenant_database"));
    }
}
