//! Unified error interface.
//!
//! This module provides the [`ErrorCode`] trait for standardized error
//! handling across the viewas crates.
//!
//! # Design
//!
//! Every error type in the workspace implements [`ErrorCode`] to provide:
//!
//! - **Machine-readable codes**: for logging and programmatic handling
//! - **Recoverability info**: for retry logic and user feedback
//!
//! The user-facing message is deliberately decoupled from the code: the
//! gate surfaces a uniform "not permitted" notice for authorization
//! failures while the code still records the precise denial reason.
//!
//! # Example
//!
//! ```
//! use viewas_types::ErrorCode;
//!
//! #[derive(Debug)]
//! enum MyError {
//!     NotFound(String),
//!     Busy,
//! }
//!
//! impl ErrorCode for MyError {
//!     fn code(&self) -> &'static str {
//!         match self {
//!             Self::NotFound(_) => "NOT_FOUND",
//!             Self::Busy => "BUSY",
//!         }
//!     }
//!
//!     fn is_recoverable(&self) -> bool {
//!         matches!(self, Self::Busy)
//!     }
//! }
//!
//! let err = MyError::Busy;
//! assert_eq!(err.code(), "BUSY");
//! assert!(err.is_recoverable());
//! ```

/// Unified error code interface.
///
/// # Code Format
///
/// Error codes should be:
///
/// - **UPPER_SNAKE_CASE**: e.g., `"TARGET_NOT_FOUND"`
/// - **Namespace-prefixed for specificity**: e.g., `"GUARD_INSUFFICIENT_RANK"`
/// - **Stable**: codes do not change once defined (API contract)
///
/// # Recoverability
///
/// An error is recoverable if retrying may succeed or the user can take
/// corrective action (fix a payload, refresh a nonce). Denials and
/// malformed input are not recoverable by retry alone.
pub trait ErrorCode {
    /// Returns the machine-readable error code.
    fn code(&self) -> &'static str;

    /// Returns whether the error is recoverable.
    fn is_recoverable(&self) -> bool;
}

/// Validates that an error code follows workspace conventions.
///
/// # Checks
///
/// 1. Code is not empty
/// 2. Code starts with the expected prefix
/// 3. Code is UPPER_SNAKE_CASE
///
/// # Panics
///
/// Panics with a descriptive message if validation fails. Intended for
/// use in tests.
pub fn assert_error_code<E: ErrorCode>(err: &E, expected_prefix: &str) {
    let code = err.code();

    assert!(!code.is_empty(), "error code must not be empty");
    assert!(
        code.starts_with(expected_prefix),
        "error code '{code}' must start with prefix '{expected_prefix}'"
    );
    assert!(
        is_upper_snake_case(code),
        "error code '{code}' must be UPPER_SNAKE_CASE"
    );
}

fn is_upper_snake_case(s: &str) -> bool {
    !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}
