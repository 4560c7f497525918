//! Account records and the resolved acting user.
//!
//! [`UserRecord`] is pure identity data as the platform's user directory
//! reports it. [`ActingUser`] is the resolved security context for the
//! request: record plus real capability map plus superiority rank.
//! Keeping the two separate mirrors the split between "who is acting"
//! and "what they are allowed to do".

use crate::guard::SuperiorityGuard;
use crate::platform::RoleRegistry;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use viewas_types::{CapabilityMap, RoleSlug, SiteId, UserId};

/// A user account as the platform directory reports it.
///
/// The record carries identity and raw grants only; the *effective* own
/// capability map is derived through [`capabilities`](Self::capabilities)
/// because role defaults live in the role registry, not on the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    /// Account identifier.
    pub id: UserId,
    /// Login name (unique).
    pub login: String,
    /// Email address (unique).
    pub email: String,
    /// Name shown in admin listings.
    pub display_name: String,
    /// Assigned roles, in assignment order.
    pub roles: Vec<RoleSlug>,
    /// Explicit per-user capability overrides on top of role defaults.
    #[serde(default)]
    pub extra_caps: CapabilityMap,
    /// Network-wide administrator flag (multi-tenant installs).
    #[serde(default)]
    pub super_admin: bool,
    /// Sites the account is a member of.
    #[serde(default)]
    pub sites: BTreeSet<SiteId>,
}

impl UserRecord {
    /// Creates a record with the given identity on the primary site.
    #[must_use]
    pub fn new(id: UserId, login: impl Into<String>) -> Self {
        let login = login.into();
        Self {
            id,
            email: format!("{login}@example.invalid"),
            display_name: login.clone(),
            login,
            roles: Vec::new(),
            extra_caps: CapabilityMap::new(),
            super_admin: false,
            sites: BTreeSet::from([SiteId::primary()]),
        }
    }

    /// Adds a role (builder style).
    #[must_use]
    pub fn with_role(mut self, slug: impl Into<RoleSlug>) -> Self {
        self.roles.push(slug.into());
        self
    }

    /// Sets the super-admin flag (builder style).
    #[must_use]
    pub fn with_super_admin(mut self, super_admin: bool) -> Self {
        self.super_admin = super_admin;
        self
    }

    /// Adds an explicit capability override (builder style).
    #[must_use]
    pub fn with_cap(mut self, cap: impl Into<String>, granted: bool) -> Self {
        self.extra_caps.set(cap, granted);
        self
    }

    /// Replaces the site memberships (builder style).
    #[must_use]
    pub fn with_sites(mut self, sites: impl IntoIterator<Item = SiteId>) -> Self {
        self.sites = sites.into_iter().collect();
        self
    }

    /// Returns `true` if the account holds the given role.
    #[must_use]
    pub fn has_role(&self, slug: &RoleSlug) -> bool {
        self.roles.iter().any(|r| r == slug)
    }

    /// Returns `true` if the two accounts share at least one site.
    #[must_use]
    pub fn shares_site_with(&self, other: &UserRecord) -> bool {
        self.sites.iter().any(|s| other.sites.contains(s))
    }

    /// Derives the account's own capability map.
    ///
    /// Role default maps are merged in assignment order, then the
    /// explicit per-user overrides are layered on top (explicit wins).
    /// Roles missing from the registry contribute nothing.
    #[must_use]
    pub fn capabilities(&self, roles: &dyn RoleRegistry) -> CapabilityMap {
        let mut caps = CapabilityMap::new();
        for slug in &self.roles {
            if let Some(role) = roles.role(slug) {
                caps = caps.overlay(&role.capabilities);
            }
        }
        caps.overlay(&self.extra_caps)
    }
}

/// The authenticated account making the request, fully resolved.
///
/// Immutable for the duration of a request: the real capability map and
/// rank are computed once at construction and never change, even while
/// a view is active. Views only affect the *effective* map the override
/// engine produces.
#[derive(Debug, Clone)]
pub struct ActingUser {
    record: UserRecord,
    caps: CapabilityMap,
    rank: crate::rank::SuperiorityRank,
}

impl ActingUser {
    /// Resolves a directory record into an acting user.
    #[must_use]
    pub fn resolve(record: UserRecord, guard: &SuperiorityGuard, roles: &dyn RoleRegistry) -> Self {
        let caps = record.capabilities(roles);
        let rank = guard.rank_of(&record);
        Self { record, caps, rank }
    }

    /// The account identifier.
    #[must_use]
    pub fn id(&self) -> UserId {
        self.record.id
    }

    /// The underlying directory record.
    #[must_use]
    pub fn record(&self) -> &UserRecord {
        &self.record
    }

    /// The real (unmodified) capability map.
    #[must_use]
    pub fn caps(&self) -> &CapabilityMap {
        &self.caps
    }

    /// The resolved superiority rank.
    #[must_use]
    pub fn rank(&self) -> crate::rank::SuperiorityRank {
        self.rank
    }
}

impl std::fmt::Display for ActingUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.record.login, self.rank)
    }
}
