//! Platform trait seams.
//!
//! The host platform owns users, roles, per-user storage, and nonce
//! verification. This module defines those seams as synchronous traits;
//! concrete implementations live in the runtime crate (and, in
//! production, in the host-platform adapter).
//!
//! # Architecture
//!
//! ```text
//! UserDirectory / RoleRegistry / SettingsStore / NonceService  (THIS MODULE)
//!          │
//!          └── InMemoryDirectory / InMemoryRoles / InMemorySettings /
//!              StaticNonce (viewas-runtime)   ← concrete impls
//! ```
//!
//! Everything is synchronous: the whole system runs inside a single
//! request/response lifecycle with no internal concurrency.

use crate::actor::UserRecord;
use crate::settings::StoredState;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use viewas_types::{CapabilityMap, ErrorCode, RoleSlug, UserId};

/// A role as the platform's role registry reports it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleRecord {
    /// Normalized slug the role is addressed by.
    pub slug: RoleSlug,
    /// Display name.
    pub name: String,
    /// Default capability map.
    pub capabilities: CapabilityMap,
}

impl RoleRecord {
    /// Creates a role record.
    #[must_use]
    pub fn new(
        slug: impl Into<RoleSlug>,
        name: impl Into<String>,
        capabilities: CapabilityMap,
    ) -> Self {
        Self {
            slug: slug.into(),
            name: name.into(),
            capabilities,
        }
    }
}

/// User lookup.
///
/// Reads trigger no I/O beyond the platform's own storage abstraction;
/// ordering of [`users`](Self::users) is the platform's listing order.
pub trait UserDirectory: Send + Sync {
    /// Looks up a user by identifier.
    fn user(&self, id: &UserId) -> Option<UserRecord>;

    /// Looks up a user by login name.
    fn user_by_login(&self, login: &str) -> Option<UserRecord>;

    /// Looks up a user by email address.
    fn user_by_email(&self, email: &str) -> Option<UserRecord>;

    /// Lists all users in the platform's order.
    fn users(&self) -> Vec<UserRecord>;
}

/// Role registry (name → default capability map).
pub trait RoleRegistry: Send + Sync {
    /// Looks up a role by slug.
    fn role(&self, slug: &RoleSlug) -> Option<RoleRecord>;

    /// Lists all roles in the platform's order.
    fn roles(&self) -> Vec<RoleRecord>;
}

/// Per-user persisted key/value storage for the view and settings.
pub trait SettingsStore: Send + Sync {
    /// Loads the stored state for a user. A user with nothing stored
    /// yields the default state, not an error.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] when the backend cannot be read.
    fn load(&self, user: &UserId) -> Result<StoredState, StorageError>;

    /// Saves the stored state for a user, overwriting any previous state.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] when the backend cannot be written.
    fn save(&self, user: &UserId, state: &StoredState) -> Result<(), StorageError>;

    /// Clears only the stored view for a user, preserving settings.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] when the backend cannot be written.
    fn clear_view(&self, user: &UserId) -> Result<(), StorageError>;

    /// Clears the stored view for every user.
    ///
    /// Per-user failures are collected into the report; remaining users
    /// are still processed. Only a backend-wide failure is an `Err`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] when the backend as a whole is
    /// inaccessible.
    fn clear_all_views(&self) -> Result<BulkClearReport, StorageError>;
}

/// Outcome of a bulk view clear.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BulkClearReport {
    /// Number of users whose stored view was cleared.
    pub cleared: usize,
    /// Users whose clear failed, with the backend's reason.
    pub failures: Vec<BulkClearFailure>,
}

impl BulkClearReport {
    /// Returns `true` if every user was cleared.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// A single per-user failure inside a bulk clear.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkClearFailure {
    /// The user whose stored view could not be cleared.
    pub user: UserId,
    /// Backend-reported reason.
    pub reason: String,
}

/// Request-token verification keyed to the acting user's session.
pub trait NonceService: Send + Sync {
    /// Returns `true` if `token` is a valid nonce for `user` and `action`.
    fn verify(&self, user: &UserId, action: &str, token: &str) -> bool;
}

/// Errors from the persisted-storage seam.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backend rejected or lost the write/read.
    #[error("storage backend error: {0}")]
    Backend(String),

    /// Stored state could not be decoded.
    #[error("stored state corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

impl ErrorCode for StorageError {
    fn code(&self) -> &'static str {
        match self {
            Self::Backend(_) => "STORAGE_BACKEND",
            Self::Corrupt(_) => "STORAGE_CORRUPT",
        }
    }

    fn is_recoverable(&self) -> bool {
        // Backend hiccups may clear; corrupt state needs intervention.
        matches!(self, Self::Backend(_))
    }
}
