//! Superiority guard — who may assume which view.
//!
//! The guard gates every apply-view request. Rules, checked in order
//! (first failing rule rejects):
//!
//! 1. The acting user must already hold the real-world equivalent of the
//!    requested capabilities/role — unless they are a super admin or
//!    configured superior admin, who may assume any non-superior view.
//! 2. A user-type view targeting another account is rejected when the
//!    target's rank is greater than or *equal to* the actor's own; an
//!    account may always target itself (a no-op).
//! 3. Superior admins are configured by a fixed allow-list and are never
//!    impersonable by anyone else — the top of the hierarchy.
//! 4. Impersonation across disjoint site memberships additionally
//!    requires network-level (super admin) rank.
//!
//! The denial reason is recorded for logging; callers surface a uniform
//! "not permitted" message so the hierarchy is not leaked.

use crate::actor::{ActingUser, UserRecord};
use crate::engine::{resolve, Resolution};
use crate::platform::{RoleRegistry, UserDirectory};
use crate::rank::SuperiorityRank;
use crate::view::View;
use std::collections::BTreeSet;
use thiserror::Error;
use viewas_types::{ErrorCode, RoleSlug, UserId};

/// An accepted apply-view request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// The view may be applied.
    Granted,
    /// The actor targeted itself: trivially allowed, nothing to apply.
    SelfNoOp,
}

/// A rejected apply-view request, with the reason kept for logging.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GuardDenial {
    /// The actor does not hold the capabilities the view would grant.
    #[error("acting user lacks the capabilities the view would grant")]
    InsufficientRank,

    /// The referenced role/user does not exist.
    #[error("view target does not exist: {what}")]
    TargetNotFound {
        /// What the view referenced (role slug or user id).
        what: String,
    },

    /// The target account's rank is greater than or equal to the actor's.
    #[error("view target is of equal or superior rank")]
    TargetIsSuperior,
}

impl ErrorCode for GuardDenial {
    fn code(&self) -> &'static str {
        match self {
            Self::InsufficientRank => "GUARD_INSUFFICIENT_RANK",
            Self::TargetNotFound { .. } => "GUARD_TARGET_NOT_FOUND",
            Self::TargetIsSuperior => "GUARD_TARGET_IS_SUPERIOR",
        }
    }

    fn is_recoverable(&self) -> bool {
        // A stale target can be re-selected; rank never changes by retry.
        matches!(self, Self::TargetNotFound { .. })
    }
}

/// Rank policy over a configured superior-admin allow-list.
///
/// # Example
///
/// ```
/// use viewas_auth::SuperiorityGuard;
/// use viewas_auth::actor::UserRecord;
/// use viewas_types::UserId;
///
/// let root = UserId::well_known("root");
/// let guard = SuperiorityGuard::new([root]);
///
/// let record = UserRecord::new(root, "root");
/// assert_eq!(guard.rank_of(&record), viewas_auth::SuperiorityRank::SuperiorAdmin);
/// ```
#[derive(Debug, Clone, Default)]
pub struct SuperiorityGuard {
    superior_admins: BTreeSet<UserId>,
}

impl SuperiorityGuard {
    /// Creates a guard with the configured superior-admin allow-list.
    #[must_use]
    pub fn new(superior_admins: impl IntoIterator<Item = UserId>) -> Self {
        Self {
            superior_admins: superior_admins.into_iter().collect(),
        }
    }

    /// Returns `true` if the account is on the superior allow-list.
    #[must_use]
    pub fn is_superior(&self, id: &UserId) -> bool {
        self.superior_admins.contains(id)
    }

    /// Derives an account's superiority rank.
    #[must_use]
    pub fn rank_of(&self, record: &UserRecord) -> SuperiorityRank {
        if self.is_superior(&record.id) {
            SuperiorityRank::SuperiorAdmin
        } else if record.super_admin {
            SuperiorityRank::SuperAdmin
        } else if record.has_role(&RoleSlug::administrator()) {
            SuperiorityRank::Admin
        } else {
            SuperiorityRank::Other
        }
    }

    /// Returns `true` if the actor sits in the hierarchy's top tier.
    ///
    /// The top tier is the superior allow-list when one is configured,
    /// otherwise the super admins. Gates the bulk reset-all operation.
    #[must_use]
    pub fn is_top_tier(&self, actor: &ActingUser) -> bool {
        if self.superior_admins.is_empty() {
            actor.rank() >= SuperiorityRank::SuperAdmin
        } else {
            self.is_superior(&actor.id())
        }
    }

    /// Gates an apply-view request.
    ///
    /// # Errors
    ///
    /// Returns the [`GuardDenial`] of the first failing rule.
    pub fn admit(
        &self,
        actor: &ActingUser,
        view: &View,
        users: &dyn UserDirectory,
        roles: &dyn RoleRegistry,
    ) -> Result<Admission, GuardDenial> {
        match view {
            // Dropping privileges is always allowed.
            View::Visitor => Ok(Admission::Granted),

            View::Role(slug) => {
                let role = roles.role(slug).ok_or_else(|| GuardDenial::TargetNotFound {
                    what: format!("role:{slug}"),
                })?;
                if actor.rank().bypasses_capability_check()
                    || actor.caps().covers(&role.capabilities)
                {
                    Ok(Admission::Granted)
                } else {
                    Err(GuardDenial::InsufficientRank)
                }
            }

            View::Caps(_) => {
                // Resolve the prospective map; a missing base role is a
                // stale target, not a rank problem.
                let prospective = match resolve(Some(view), actor.caps(), roles, users) {
                    Resolution::Resolved(map) => map,
                    Resolution::Stale => {
                        return Err(GuardDenial::TargetNotFound {
                            what: format!("{view}"),
                        })
                    }
                    Resolution::PassThrough => return Ok(Admission::Granted),
                };
                if actor.rank().bypasses_capability_check() || actor.caps().covers(&prospective) {
                    Ok(Admission::Granted)
                } else {
                    Err(GuardDenial::InsufficientRank)
                }
            }

            View::User(target_id) => {
                let target =
                    users
                        .user(target_id)
                        .ok_or_else(|| GuardDenial::TargetNotFound {
                            what: format!("user:{target_id}"),
                        })?;

                if target.id == actor.id() {
                    return Ok(Admission::SelfNoOp);
                }

                // Rules 2 and 3: never lateral, never upward, and the
                // superior tier is impersonable by no one.
                if self.rank_of(&target) >= actor.rank() {
                    return Err(GuardDenial::TargetIsSuperior);
                }

                // Rule 4: cross-tenant impersonation needs network rank.
                if !actor.record().shares_site_with(&target)
                    && actor.rank() < SuperiorityRank::SuperAdmin
                {
                    return Err(GuardDenial::InsufficientRank);
                }

                Ok(Admission::Granted)
            }
        }
    }
}
