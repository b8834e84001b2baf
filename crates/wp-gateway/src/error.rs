//! Error types for gateway calls
//!
//! The provisioner needs to tell a rejected write (retrying changes nothing)
//! from a transport failure (a retry may succeed); see
//! [`GatewayError::is_retryable`].

use wp_model::EntityKind;

/// Gateway call failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    /// Backend refused the record (validation, constraint, permission)
    #[error("{entity} rejected: {reason}")]
    Rejected { entity: EntityKind, reason: String },

    /// Addressed record does not exist
    #[error("{entity} {id} not found")]
    NotFound { entity: EntityKind, id: String },

    /// Transport or availability failure
    #[error("gateway unavailable: {reason}")]
    Unavailable { reason: String },

    /// Response could not be decoded
    #[error("malformed gateway response: {reason}")]
    Decode { reason: String },
}

impl GatewayError {
    /// Create a rejection
    #[inline]
    pub fn rejected(entity: EntityKind, reason: impl Into<String>) -> Self {
        Self::Rejected {
            entity,
            reason: reason.into(),
        }
    }

    /// Create a not-found error
    #[inline]
    pub fn not_found(entity: EntityKind, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Create an availability failure
    #[inline]
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }

    /// Check if a retry of the same call could succeed
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }
}
