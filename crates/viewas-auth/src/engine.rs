//! Capability override engine.
//!
//! For every capability query issued during a request, the engine
//! decides what the *effective* capability map is under the active view.
//! Resolution is a pure function of (real capabilities, view, registry
//! contents) — no ordering dependence across calls within a request,
//! which is what lets the store memoize the result.
//!
//! # Resolution Rules
//!
//! | View | Effective map |
//! |------|---------------|
//! | none | the real account's map, untouched |
//! | `Visitor` | empty (every capability denied) |
//! | `Role` | the role's default map; unknown capability ⇒ denied |
//! | `User` | the target's full own map (roles ∪ explicit grants) |
//! | `Caps` | base (own map, or anchored role's defaults) + overrides |
//!
//! A view whose role/user/base-role no longer exists resolves to
//! [`Resolution::Stale`]: the caller passes through unmodified and
//! resets the stored view so the dangling reference does not repeatedly
//! fail.

use crate::platform::{RoleRegistry, UserDirectory};
use crate::view::View;
use viewas_types::CapabilityMap;

/// Outcome of resolving a view into an effective capability map.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// The view produced this effective map.
    Resolved(CapabilityMap),
    /// No view is active; use the real map unmodified.
    PassThrough,
    /// The view references a role/user that no longer exists; the
    /// caller should reset the view and pass through.
    Stale,
}

impl Resolution {
    /// Collapses to the map the request should consult, given the real
    /// capability map.
    #[must_use]
    pub fn into_effective(self, real: &CapabilityMap) -> CapabilityMap {
        match self {
            Self::Resolved(map) => map,
            Self::PassThrough | Self::Stale => real.clone(),
        }
    }
}

/// Resolves the active view against the platform registries.
///
/// Pure: the same inputs always produce the same resolution.
///
/// # Example
///
/// Visitor simulation denies everything regardless of the real map:
///
/// ```
/// use viewas_auth::{resolve, Resolution, View};
/// use viewas_auth::platform::{RoleRecord, RoleRegistry, UserDirectory};
/// use viewas_auth::actor::UserRecord;
/// use viewas_types::{CapabilityMap, RoleSlug, UserId};
///
/// struct Empty;
/// impl RoleRegistry for Empty {
///     fn role(&self, _: &RoleSlug) -> Option<RoleRecord> { None }
///     fn roles(&self) -> Vec<RoleRecord> { vec![] }
/// }
/// impl UserDirectory for Empty {
///     fn user(&self, _: &UserId) -> Option<UserRecord> { None }
///     fn user_by_login(&self, _: &str) -> Option<UserRecord> { None }
///     fn user_by_email(&self, _: &str) -> Option<UserRecord> { None }
///     fn users(&self) -> Vec<UserRecord> { vec![] }
/// }
///
/// let real: CapabilityMap = [("manage_options", true)].into_iter().collect();
/// let resolution = resolve(Some(&View::Visitor), &real, &Empty, &Empty);
/// assert_eq!(resolution, Resolution::Resolved(CapabilityMap::new()));
/// ```
#[must_use]
pub fn resolve(
    view: Option<&View>,
    real: &CapabilityMap,
    roles: &dyn RoleRegistry,
    users: &dyn UserDirectory,
) -> Resolution {
    let Some(view) = view else {
        return Resolution::PassThrough;
    };

    match view {
        View::Visitor => Resolution::Resolved(CapabilityMap::new()),

        View::Role(slug) => match roles.role(slug) {
            Some(role) => Resolution::Resolved(role.capabilities),
            None => {
                tracing::debug!(%slug, "view role missing from registry");
                Resolution::Stale
            }
        },

        View::User(id) => match users.user(id) {
            Some(target) => Resolution::Resolved(target.capabilities(roles)),
            None => {
                tracing::debug!(user = %id, "view target missing from directory");
                Resolution::Stale
            }
        },

        View::Caps(caps) => {
            let base = match &caps.base_role {
                Some(slug) => match roles.role(slug) {
                    Some(role) => role.capabilities,
                    None => {
                        tracing::debug!(%slug, "caps base role missing from registry");
                        return Resolution::Stale;
                    }
                },
                None => real.clone(),
            };
            Resolution::Resolved(base.overlay(&caps.overrides))
        }
    }
}
