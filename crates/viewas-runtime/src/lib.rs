//! Request-scoped machinery for the viewas workspace.
//!
//! This crate hosts the concrete moving parts the auth crate only
//! defines seams for:
//!
//! ```text
//! incoming request
//!       │
//!       ▼
//! AccessGate        nonce + payload shape, nothing else
//!       │
//!       ▼
//! ViewController    validate → guard → store → notify
//!       │
//!       ▼
//! ViewStore         persisted view + per-request caches + memoized
//!       │           effective capabilities
//!       ▼
//! platform seams    UserDirectory / RoleRegistry / SettingsStore /
//!                   NonceService (in-memory impls in [`memory`])
//! ```
//!
//! # Concurrency Model
//!
//! One request at a time, synchronous. All interior mutability is
//! request-scoped caching (`parking_lot::RwLock`); durable state is the
//! per-user stored view and settings, read once at request start and
//! written at most once per mutating action. Two tabs racing on the
//! stored view is last-write-wins, accepted.

pub mod controller;
pub mod event;
pub mod gate;
pub mod memory;
pub mod store;

pub use controller::{BulkOutcome, Outcome, ViewController};
pub use event::{EventRegistry, ViewEvent, ViewEventKind};
pub use gate::{AccessGate, AjaxData, AjaxRequest, AjaxResponse, NoticeKind, Redirect};
pub use memory::{InMemoryDirectory, InMemoryRoles, InMemorySettings, StaticNonce};
pub use store::ViewStore;
