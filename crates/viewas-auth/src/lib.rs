//! Permission model for the viewas workspace.
//!
//! This crate defines how a simulated identity (a [`View`]) is expressed,
//! gated, and turned into an effective capability set.
//!
//! # Three Questions
//!
//! ```text
//! Effective Capabilities = Engine(WHAT the view grants)
//!                        gated by Guard(WHO may assume it)
//!                        over Platform(WHERE identities live)
//! ```
//!
//! | Concern | Type | Answers |
//! |---------|------|---------|
//! | [`View`] + [`engine`] | Enum + pure fn | What capabilities apply while a view is active |
//! | [`SuperiorityGuard`] | Struct | Who may assume which view |
//! | [`platform`] | Traits | Where users, roles, settings, and nonces come from |
//!
//! # Crate Architecture
//!
//! ```text
//! viewas-types  (UserId, RoleSlug, CapabilityMap)
//!       ↑
//! viewas-auth   (View, ActingUser, SuperiorityGuard, engine,
//!                platform trait seams)  ◄── THIS CRATE
//!       ↑
//! viewas-runtime (ViewStore, ViewController, AccessGate,
//!                 in-memory platform impls)
//! ```
//!
//! # Design Principles
//!
//! - **Trait definitions here, implementations in consumers** — the
//!   runtime crate provides the concrete stores and directories
//! - **Pure resolution** — the override engine is a pure function of
//!   (real capabilities, view, registries); no ordering dependence
//!   across calls within a request
//! - **Deny wins** — a view can never widen the acting user's rank, and
//!   no one impersonates upward

pub mod actor;
pub mod engine;
pub mod error;
pub mod guard;
pub mod platform;
pub mod rank;
pub mod settings;
pub mod view;

pub use actor::{ActingUser, UserRecord};
pub use engine::{resolve, Resolution};
pub use error::ViewAsError;
pub use guard::{Admission, GuardDenial, SuperiorityGuard};
pub use platform::{
    BulkClearFailure, BulkClearReport, NonceService, RoleRecord, RoleRegistry, SettingsStore,
    StorageError, UserDirectory,
};
pub use rank::SuperiorityRank;
pub use settings::{StoredState, UserSettings, ViewMode};
pub use view::{CapsView, ValidationError, View};
