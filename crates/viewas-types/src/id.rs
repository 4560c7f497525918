//! Identifier types.
//!
//! User and site identifiers are UUID-based. Role identifiers are
//! normalized string slugs, since roles are addressed by name in both
//! the wire payload and the platform's role registry.

use serde::{Deserialize, Serialize};
use uuid::{uuid, Uuid};

/// Namespace UUID for deterministic UUID v5 generation.
///
/// Used to derive stable identifiers for well-known accounts (test
/// fixtures, seeded admin users) so they are consistent across
/// processes and machines.
const VIEWAS_NAMESPACE: Uuid = uuid!("7f1c6e0a-55d4-4c38-9a27-3b1f08c5e9d2");

/// Identifier for a user account.
///
/// # UUID Strategy
///
/// - [`UserId::new`] — random UUID v4 for ordinary accounts
/// - [`UserId::well_known`] — deterministic UUID v5 from a name, for
///   accounts that must be stable across processes (seeded fixtures,
///   configured superior admins)
///
/// # Example
///
/// ```
/// use viewas_types::UserId;
///
/// let a = UserId::well_known("root-admin");
/// let b = UserId::well_known("root-admin");
/// assert_eq!(a, b); // Same name = same id
///
/// let c = UserId::new();
/// let d = UserId::new();
/// assert_ne!(c, d); // Random ids are unique
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(Uuid);

impl UserId {
    /// Creates a new random user id (UUID v4).
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Derives a deterministic user id from a name (UUID v5).
    #[must_use]
    pub fn well_known(name: &str) -> Self {
        Self(Uuid::new_v5(&VIEWAS_NAMESPACE, name.as_bytes()))
    }

    /// Wraps an existing UUID.
    #[must_use]
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Parses a user id from its string form.
    ///
    /// # Errors
    ///
    /// Returns the underlying [`uuid::Error`] if the string is not a
    /// valid UUID.
    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        Uuid::parse_str(s).map(Self)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub fn uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier for a site in a multi-tenant (network) install.
///
/// Single-site installs use [`SiteId::primary`] everywhere; the
/// superiority guard only consults site membership when actor and
/// target belong to disjoint sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SiteId(Uuid);

impl SiteId {
    /// Creates a new random site id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// The primary (default) site. Deterministic across processes.
    #[must_use]
    pub fn primary() -> Self {
        Self(Uuid::new_v5(&VIEWAS_NAMESPACE, b"site:primary"))
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub fn uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for SiteId {
    fn default() -> Self {
        Self::primary()
    }
}

impl std::fmt::Display for SiteId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A normalized role slug (`"editor"`, `"author"`, ...).
///
/// Slugs are trimmed and lowercased on construction so that lookups and
/// equality checks are consistent regardless of how the wire payload
/// spelled the role.
///
/// # Example
///
/// ```
/// use viewas_types::RoleSlug;
///
/// let a = RoleSlug::new("Editor");
/// let b = RoleSlug::new("  editor ");
/// assert_eq!(a, b);
/// assert_eq!(a.as_str(), "editor");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleSlug(String);

impl RoleSlug {
    /// Creates a slug, trimming and lowercasing the input.
    #[must_use]
    pub fn new(slug: impl AsRef<str>) -> Self {
        Self(slug.as_ref().trim().to_lowercase())
    }

    /// The platform's administrator role.
    #[must_use]
    pub fn administrator() -> Self {
        Self("administrator".to_string())
    }

    /// Returns the slug as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if the slug is empty after normalization.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for RoleSlug {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RoleSlug {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}
