//! Core types for the viewas workspace.
//!
//! This crate provides the foundational types shared by every layer of the
//! view-simulation system: identifier newtypes and the capability map.
//!
//! # Crate Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  viewas-types   : UserId, SiteId, RoleSlug, CapabilityMap   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  viewas-auth    : View, SuperiorityGuard, override engine,  │
//! │                   platform trait seams                      │
//! ├─────────────────────────────────────────────────────────────┤
//! │  viewas-runtime : ViewStore, ViewController, AccessGate,    │
//! │                   event registry, in-memory platform        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Identifier Design
//!
//! User and site identifiers are UUID-based:
//!
//! - **Network compatibility**: Safe to transmit across processes/machines
//! - **Deterministic fixtures**: Well-known test identities via UUID v5
//! - **Serialization**: First-class serde support
//!
//! Role identifiers are plain normalized slugs (`"editor"`, `"author"`)
//! because roles are named by humans and referenced in wire payloads.
//!
//! # Capability Values
//!
//! Wire payloads carry capability values in several shapes (`true`, `1`,
//! `"1"`). [`CapabilityMap`] normalizes every value to `bool` at the
//! boundary so all downstream comparisons are plain boolean equality.

pub mod caps;
pub mod error;
pub mod id;

pub use caps::CapabilityMap;
pub use error::{assert_error_code, ErrorCode};
pub use id::{RoleSlug, SiteId, UserId};
