//! Superiority rank — the impersonation hierarchy.

use serde::{Deserialize, Serialize};

/// Derived ordering over users for impersonation decisions.
///
/// ```text
/// SuperiorAdmin > SuperAdmin > Admin > Other
/// ```
///
/// # Invariants
///
/// - A user may only select a view that does not grant effective
///   capabilities exceeding their own rank.
/// - A user may never impersonate an account whose rank is greater than
///   or equal to their own (no lateral or upward impersonation).
/// - Superior admins sit at the top: configured by allow-list, never
///   impersonable by anyone else.
///
/// # Example
///
/// ```
/// use viewas_auth::SuperiorityRank;
///
/// assert!(SuperiorityRank::SuperiorAdmin > SuperiorityRank::SuperAdmin);
/// assert!(SuperiorityRank::SuperAdmin > SuperiorityRank::Admin);
/// assert!(SuperiorityRank::Admin > SuperiorityRank::Other);
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum SuperiorityRank {
    /// Any account below administrator (editors, authors, subscribers, ...).
    #[default]
    Other,
    /// Holds the administrator role on at least one site.
    Admin,
    /// Network-wide administrator in a multi-tenant install.
    SuperAdmin,
    /// Configured top-tier account; cannot be impersonated by anyone.
    SuperiorAdmin,
}

impl SuperiorityRank {
    /// Returns `true` for the two ranks that bypass the "must already
    /// hold the requested capabilities" rule.
    #[must_use]
    pub fn bypasses_capability_check(self) -> bool {
        self >= Self::SuperAdmin
    }

    /// Human-readable label.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Other => "other",
            Self::Admin => "admin",
            Self::SuperAdmin => "super admin",
            Self::SuperiorAdmin => "superior admin",
        }
    }
}

impl std::fmt::Display for SuperiorityRank {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_is_total() {
        let ladder = [
            SuperiorityRank::Other,
            SuperiorityRank::Admin,
            SuperiorityRank::SuperAdmin,
            SuperiorityRank::SuperiorAdmin,
        ];
        for pair in ladder.windows(2) {
            assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn bypass_threshold() {
        assert!(!SuperiorityRank::Other.bypasses_capability_check());
        assert!(!SuperiorityRank::Admin.bypasses_capability_check());
        assert!(SuperiorityRank::SuperAdmin.bypasses_capability_check());
        assert!(SuperiorityRank::SuperiorAdmin.bypasses_capability_check());
    }

    #[test]
    fn serde_snake_case() {
        let json = serde_json::to_string(&SuperiorityRank::SuperAdmin).expect("serialize");
        assert_eq!(json, "\"super_admin\"");
    }
}
