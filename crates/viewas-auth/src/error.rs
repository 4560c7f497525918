//! Unified error type for view operations.
//!
//! [`ViewAsError`] unifies the layers a view-change request can fail in:
//!
//! ```text
//! request ──► Gate(nonce) ──► Validation(shape) ──► Guard(rank) ──► Store
//!                │                 │                   │              │
//!          Authentication      Validation         Authorization    Storage
//! ```
//!
//! Callers match on the variant for the layer; the precise reason is
//! available through [`ErrorCode`] for logging. Authorization denials
//! deliberately render a uniform message so the hierarchy is not leaked
//! to the end user.

use crate::guard::GuardDenial;
use crate::platform::StorageError;
use crate::view::ValidationError;
use thiserror::Error;
use viewas_types::ErrorCode;

/// Unified error for view operations across all layers.
#[derive(Debug, Error)]
pub enum ViewAsError {
    /// Missing or invalid nonce; rejected before the controller.
    #[error("authentication failed")]
    Authentication,

    /// Malformed or unrecognized view payload.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Superiority guard rejection. Renders uniformly; the reason is
    /// carried for logging only.
    #[error("not permitted")]
    Authorization(#[source] GuardDenial),

    /// The persisted-storage seam failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ViewAsError {
    /// Returns the layer that produced the error.
    #[must_use]
    pub fn layer(&self) -> &'static str {
        match self {
            Self::Authentication => "gate",
            Self::Validation(_) => "validation",
            Self::Authorization(_) => "guard",
            Self::Storage(_) => "storage",
        }
    }

    /// The message shown to the end user.
    ///
    /// Validation errors surface their specific message; everything
    /// else is generic by design.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(e) => e.to_string(),
            Self::Authentication => "could not verify the request".to_string(),
            Self::Authorization(_) => "you are not permitted to do this".to_string(),
            Self::Storage(_) => "could not save your view".to_string(),
        }
    }
}

impl From<GuardDenial> for ViewAsError {
    fn from(denial: GuardDenial) -> Self {
        Self::Authorization(denial)
    }
}

impl ErrorCode for ViewAsError {
    fn code(&self) -> &'static str {
        match self {
            Self::Authentication => "GATE_BAD_NONCE",
            Self::Validation(e) => e.code(),
            Self::Authorization(denial) => denial.code(),
            Self::Storage(e) => e.code(),
        }
    }

    fn is_recoverable(&self) -> bool {
        match self {
            // A fresh nonce can be obtained.
            Self::Authentication => true,
            Self::Validation(e) => e.is_recoverable(),
            Self::Authorization(denial) => denial.is_recoverable(),
            Self::Storage(e) => e.is_recoverable(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authorization_message_is_uniform() {
        let insufficient = ViewAsError::from(GuardDenial::InsufficientRank);
        let superior = ViewAsError::from(GuardDenial::TargetIsSuperior);

        // Same user-facing text, different codes underneath.
        assert_eq!(insufficient.user_message(), superior.user_message());
        assert_ne!(insufficient.code(), superior.code());
        assert_eq!(insufficient.layer(), "guard");
    }

    #[test]
    fn validation_message_is_specific() {
        let err = ViewAsError::from(ValidationError::UnknownViewType("ghost".to_string()));
        assert!(err.user_message().contains("ghost"));
        assert_eq!(err.layer(), "validation");
        assert_eq!(err.code(), "VIEW_UNKNOWN_TYPE");
    }

    #[test]
    fn authentication_is_generic() {
        let err = ViewAsError::Authentication;
        assert_eq!(err.code(), "GATE_BAD_NONCE");
        assert!(err.is_recoverable());
        assert!(!err.user_message().contains("nonce"));
    }

    #[test]
    fn storage_passthrough() {
        let err = ViewAsError::from(StorageError::Backend("down".to_string()));
        assert_eq!(err.layer(), "storage");
        assert_eq!(err.code(), "STORAGE_BACKEND");
    }
}
