//! In-memory platform seam implementations.
//!
//! Reference adapters for the traits in `viewas-auth`: good enough for
//! tests, demos, and embedding the library without a real platform
//! behind it. All of them are `Send + Sync` behind `parking_lot` locks
//! and preserve insertion order where the seam promises "the platform's
//! order".

use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet};
use viewas_auth::{
    BulkClearFailure, BulkClearReport, NonceService, RoleRecord, RoleRegistry, SettingsStore,
    StorageError, StoredState, UserDirectory, UserRecord,
};
use viewas_types::{CapabilityMap, RoleSlug, UserId};

/// Insertion-ordered user directory.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    users: RwLock<Vec<UserRecord>>,
}

impl InMemoryDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a user, keyed by id.
    pub fn insert(&self, record: UserRecord) {
        let mut users = self.users.write();
        if let Some(existing) = users.iter_mut().find(|u| u.id == record.id) {
            *existing = record;
        } else {
            users.push(record);
        }
    }
}

impl UserDirectory for InMemoryDirectory {
    fn user(&self, id: &UserId) -> Option<UserRecord> {
        self.users.read().iter().find(|u| u.id == *id).cloned()
    }

    fn user_by_login(&self, login: &str) -> Option<UserRecord> {
        self.users.read().iter().find(|u| u.login == login).cloned()
    }

    fn user_by_email(&self, email: &str) -> Option<UserRecord> {
        self.users.read().iter().find(|u| u.email == email).cloned()
    }

    fn users(&self) -> Vec<UserRecord> {
        self.users.read().clone()
    }
}

/// Insertion-ordered role registry.
#[derive(Debug, Default)]
pub struct InMemoryRoles {
    roles: RwLock<Vec<RoleRecord>>,
}

impl InMemoryRoles {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a role, keyed by slug.
    pub fn insert(&self, record: RoleRecord) {
        let mut roles = self.roles.write();
        if let Some(existing) = roles.iter_mut().find(|r| r.slug == record.slug) {
            *existing = record;
        } else {
            roles.push(record);
        }
    }

    /// Removes a role. Returns `true` if it existed.
    pub fn remove(&self, slug: &RoleSlug) -> bool {
        let mut roles = self.roles.write();
        let before = roles.len();
        roles.retain(|r| r.slug != *slug);
        roles.len() != before
    }
}

impl RoleRegistry for InMemoryRoles {
    fn role(&self, slug: &RoleSlug) -> Option<RoleRecord> {
        self.roles.read().iter().find(|r| r.slug == *slug).cloned()
    }

    fn roles(&self) -> Vec<RoleRecord> {
        self.roles.read().clone()
    }
}

/// A registry preloaded with the four stock roles.
#[must_use]
pub fn standard_roles() -> InMemoryRoles {
    let registry = InMemoryRoles::new();
    let role = |slug: &str, name: &str, caps: &[&str]| {
        RoleRecord::new(
            slug,
            name,
            caps.iter().map(|c| (*c, true)).collect::<CapabilityMap>(),
        )
    };
    registry.insert(role(
        "administrator",
        "Administrator",
        &["read", "edit_posts", "edit_others_posts", "manage_options"],
    ));
    registry.insert(role(
        "editor",
        "Editor",
        &["read", "edit_posts", "edit_others_posts"],
    ));
    registry.insert(role("author", "Author", &["read", "edit_posts"]));
    registry.insert(role("subscriber", "Subscriber", &["read"]));
    registry
}

/// In-memory settings store with per-user failure injection for the
/// bulk-clear path.
#[derive(Debug, Default)]
pub struct InMemorySettings {
    states: RwLock<BTreeMap<UserId, StoredState>>,
    failing: RwLock<BTreeSet<UserId>>,
}

impl InMemorySettings {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent view clear for `user` fail.
    pub fn fail_clears_for(&self, user: UserId) {
        self.failing.write().insert(user);
    }
}

impl SettingsStore for InMemorySettings {
    fn load(&self, user: &UserId) -> Result<StoredState, StorageError> {
        Ok(self.states.read().get(user).cloned().unwrap_or_default())
    }

    fn save(&self, user: &UserId, state: &StoredState) -> Result<(), StorageError> {
        self.states.write().insert(*user, state.clone());
        Ok(())
    }

    fn clear_view(&self, user: &UserId) -> Result<(), StorageError> {
        if self.failing.read().contains(user) {
            return Err(StorageError::Backend("injected clear failure".to_string()));
        }
        if let Some(state) = self.states.write().get_mut(user) {
            state.view = None;
        }
        Ok(())
    }

    fn clear_all_views(&self) -> Result<BulkClearReport, StorageError> {
        let failing = self.failing.read().clone();
        let mut states = self.states.write();

        let mut report = BulkClearReport::default();
        for (user, state) in states.iter_mut() {
            if state.view.is_none() {
                continue;
            }
            if failing.contains(user) {
                report.failures.push(BulkClearFailure {
                    user: *user,
                    reason: "injected clear failure".to_string(),
                });
                continue;
            }
            state.view = None;
            report.cleared += 1;
        }
        Ok(report)
    }
}

/// Nonce check by plain token equality. Test double only: a real
/// implementation must bind the token to the user's session and the
/// action.
#[derive(Debug, Clone)]
pub struct StaticNonce {
    token: String,
}

impl StaticNonce {
    /// Creates a verifier accepting exactly `token`.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl NonceService for StaticNonce {
    fn verify(&self, _user: &UserId, _action: &str, token: &str) -> bool {
        token == self.token
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use viewas_auth::View;

    #[test]
    fn directory_insert_replaces_by_id() {
        let directory = InMemoryDirectory::new();
        let id = UserId::well_known("pat");
        directory.insert(UserRecord::new(id, "pat"));
        directory.insert(UserRecord::new(id, "pat").with_role("editor"));

        assert_eq!(directory.users().len(), 1);
        let pat = directory.user(&id).expect("present");
        assert!(pat.has_role(&RoleSlug::new("editor")));
    }

    #[test]
    fn directory_lookup_by_login_and_email() {
        let directory = InMemoryDirectory::new();
        directory.insert(UserRecord::new(UserId::well_known("pat"), "pat"));

        assert!(directory.user_by_login("pat").is_some());
        assert!(directory.user_by_email("pat@example.invalid").is_some());
        assert!(directory.user_by_login("nobody").is_none());
    }

    #[test]
    fn standard_roles_capability_shape() {
        let roles = standard_roles();
        let admin = roles.role(&RoleSlug::administrator()).expect("present");
        assert!(admin.capabilities.has("manage_options"));

        let editor = roles.role(&RoleSlug::new("editor")).expect("present");
        assert!(editor.capabilities.has("edit_others_posts"));
        assert!(!editor.capabilities.has("manage_options"));

        assert_eq!(roles.roles().len(), 4);
    }

    #[test]
    fn roles_remove() {
        let roles = standard_roles();
        assert!(roles.remove(&RoleSlug::new("editor")));
        assert!(!roles.remove(&RoleSlug::new("editor")));
        assert!(roles.role(&RoleSlug::new("editor")).is_none());
    }

    #[test]
    fn settings_load_defaults_for_unknown_user() {
        let store = InMemorySettings::new();
        let state = store.load(&UserId::well_known("pat")).expect("load");
        assert_eq!(state, StoredState::default());
    }

    #[test]
    fn clear_view_keeps_settings() {
        let store = InMemorySettings::new();
        let user = UserId::well_known("pat");
        let mut state = StoredState {
            view: Some(View::Visitor),
            ..StoredState::default()
        };
        state.settings.hide_front = true;
        store.save(&user, &state).expect("save");

        store.clear_view(&user).expect("clear");
        let reloaded = store.load(&user).expect("load");
        assert_eq!(reloaded.view, None);
        assert!(reloaded.settings.hide_front);
    }

    #[test]
    fn bulk_clear_skips_viewless_users_and_reports_failures() {
        let store = InMemorySettings::new();
        let viewing = UserId::well_known("viewing");
        let idle = UserId::well_known("idle");
        let broken = UserId::well_known("broken");

        store
            .save(
                &viewing,
                &StoredState {
                    view: Some(View::Visitor),
                    ..StoredState::default()
                },
            )
            .expect("save");
        store.save(&idle, &StoredState::default()).expect("save");
        store
            .save(
                &broken,
                &StoredState {
                    view: Some(View::Visitor),
                    ..StoredState::default()
                },
            )
            .expect("save");
        store.fail_clears_for(broken);

        let report = store.clear_all_views().expect("bulk clear");
        assert_eq!(report.cleared, 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].user, broken);
    }

    #[test]
    fn static_nonce_is_pure_equality() {
        let nonce = StaticNonce::new("tok");
        let user = UserId::well_known("pat");
        assert!(nonce.verify(&user, "any_action", "tok"));
        assert!(!nonce.verify(&user, "any_action", "other"));
    }
}
