use thiserror::Error;

#[derive(Debug, Error)]
pub enum BessFinanceError {
    #[error("Invalid configuration: {field} — {reason}")]
    InvalidConfiguration { field: String, reason: String },

    #[error("Dependency unavailable: {service} — {reason}")]
    DependencyUnavailable { service: String, reason: String },

    #[error("Numerical degeneracy in {context}")]
    NumericalDegeneracy { context: String },

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl BessFinanceError {
    pub(crate) fn invalid(field: &str, reason: impl Into<String>) -> Self {
        BessFinanceError::InvalidConfiguration {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn degenerate(context: impl Into<String>) -> Self {
        BessFinanceError::NumericalDegeneracy {
            context: context.into(),
        }
    }
}

impl From<serde_json::Error> for BessFinanceError {
    fn from(e: serde_json::Error) -> Self {
        BessFinanceError::SerializationError(e.to_string())
    }
}
