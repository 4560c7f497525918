//! Request-scoped view state.
//!
//! A [`ViewStore`] is built once per request for the acting user. It
//! loads the persisted view and settings, checks the view still points
//! at something that exists, and then serves every capability query for
//! the remainder of the request from a memoized effective map.
//!
//! # Caching
//!
//! | State | Scope | Invalidation |
//! |-------|-------|--------------|
//! | effective capability map | request | explicit view change |
//! | role / user / capability listings | request | [`refresh_caps`](ViewStore::refresh_caps) |
//! | view + settings | durable (per user) | mutating actions |
//!
//! # Persistence
//!
//! With `view_mode: Browse` an applied view is written through to the
//! settings store; with `Single` it stays request-local. A reset always
//! clears durable state, so a leftover `Browse` view cannot survive a
//! reset issued from a `Single` session.

use parking_lot::RwLock;
use std::collections::BTreeSet;
use std::sync::Arc;
use viewas_auth::{
    resolve, ActingUser, Resolution, RoleRecord, RoleRegistry, SettingsStore, StorageError,
    StoredState, UserDirectory, UserRecord, UserSettings, View, ViewMode,
};
use viewas_types::CapabilityMap;

/// Per-request, per-user state holder.
pub struct ViewStore {
    actor: ActingUser,
    storage: Arc<dyn SettingsStore>,
    users: Arc<dyn UserDirectory>,
    roles: Arc<dyn RoleRegistry>,

    view: RwLock<Option<View>>,
    settings: RwLock<UserSettings>,
    effective: RwLock<Option<CapabilityMap>>,
    role_cache: RwLock<Option<Vec<RoleRecord>>>,
    user_cache: RwLock<Option<Vec<UserRecord>>>,
    cap_cache: RwLock<Option<Vec<String>>>,
}

impl ViewStore {
    /// Builds the store for a request, loading persisted state.
    ///
    /// A stored view whose role/user no longer exists is dropped to
    /// "no view" and cleared durably — expected drift, not an error.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] only when the backend itself cannot be
    /// read.
    pub fn new(
        actor: ActingUser,
        storage: Arc<dyn SettingsStore>,
        users: Arc<dyn UserDirectory>,
        roles: Arc<dyn RoleRegistry>,
    ) -> Result<Self, StorageError> {
        let state = storage.load(&actor.id())?;

        let view = match state.view {
            // Single mode never persists a view; a leftover one (written
            // before the mode switch) is dropped and cleared.
            Some(view) if state.settings.view_mode == ViewMode::Single => {
                tracing::warn!(user = %actor.id(), %view, "dropping view stored in single mode");
                if let Err(e) = storage.clear_view(&actor.id()) {
                    tracing::error!(user = %actor.id(), error = %e, "failed to clear stored view");
                }
                None
            }
            Some(view) => {
                let resolution = resolve(Some(&view), actor.caps(), roles.as_ref(), users.as_ref());
                if resolution == Resolution::Stale {
                    tracing::warn!(user = %actor.id(), %view, "stored view is stale, resetting");
                    if let Err(e) = storage.clear_view(&actor.id()) {
                        tracing::error!(user = %actor.id(), error = %e, "failed to clear stale view");
                    }
                    None
                } else {
                    Some(view)
                }
            }
            None => None,
        };

        Ok(Self {
            actor,
            storage,
            users,
            roles,
            view: RwLock::new(view),
            settings: RwLock::new(state.settings),
            effective: RwLock::new(None),
            role_cache: RwLock::new(None),
            user_cache: RwLock::new(None),
            cap_cache: RwLock::new(None),
        })
    }

    /// The acting user this store was built for.
    #[must_use]
    pub fn actor(&self) -> &ActingUser {
        &self.actor
    }

    /// The active view, if any.
    #[must_use]
    pub fn view(&self) -> Option<View> {
        self.view.read().clone()
    }

    /// Applies or clears the view, invalidating the memoized effective
    /// map and persisting according to `view_mode`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] when the write-through fails; in that
    /// case no in-memory change is kept either (the request sees the
    /// old state).
    pub fn set_view(&self, view: Option<View>) -> Result<(), StorageError> {
        match &view {
            Some(v) => {
                if self.settings.read().view_mode == ViewMode::Browse {
                    let state = StoredState {
                        view: Some(v.clone()),
                        settings: self.settings.read().clone(),
                    };
                    self.storage.save(&self.actor.id(), &state)?;
                }
            }
            None => {
                self.storage.clear_view(&self.actor.id())?;
            }
        }

        *self.view.write() = view;
        *self.effective.write() = None;
        Ok(())
    }

    /// The effective capability map for this request, memoized.
    ///
    /// A view that turns stale mid-request (role deleted after load) is
    /// reset softly: the request passes through to the real map and the
    /// dangling reference is cleared so it cannot repeatedly fail.
    #[must_use]
    pub fn effective_capabilities(&self) -> CapabilityMap {
        if let Some(cached) = self.effective.read().as_ref() {
            return cached.clone();
        }

        let view = self.view();
        let resolution = resolve(
            view.as_ref(),
            self.actor.caps(),
            self.roles.as_ref(),
            self.users.as_ref(),
        );

        let effective = match resolution {
            Resolution::Resolved(map) => map,
            Resolution::PassThrough => self.actor.caps().clone(),
            Resolution::Stale => {
                tracing::warn!(user = %self.actor.id(), "view went stale mid-request, resetting");
                *self.view.write() = None;
                if let Err(e) = self.storage.clear_view(&self.actor.id()) {
                    tracing::error!(user = %self.actor.id(), error = %e, "failed to clear stale view");
                }
                self.actor.caps().clone()
            }
        };

        *self.effective.write() = Some(effective.clone());
        effective
    }

    /// All roles, loaded lazily once per request.
    #[must_use]
    pub fn roles(&self) -> Vec<RoleRecord> {
        if let Some(cached) = self.role_cache.read().as_ref() {
            return cached.clone();
        }
        let roles = self.roles.roles();
        tracing::debug!(count = roles.len(), "populated role cache");
        *self.role_cache.write() = Some(roles.clone());
        roles
    }

    /// All users, loaded lazily once per request.
    #[must_use]
    pub fn users(&self) -> Vec<UserRecord> {
        if let Some(cached) = self.user_cache.read().as_ref() {
            return cached.clone();
        }
        let users = self.users.users();
        tracing::debug!(count = users.len(), "populated user cache");
        *self.user_cache.write() = Some(users.clone());
        users
    }

    /// All known capability names: the union of every role's defaults
    /// and the acting user's own entries, name-ordered.
    #[must_use]
    pub fn caps(&self) -> Vec<String> {
        if let Some(cached) = self.cap_cache.read().as_ref() {
            return cached.clone();
        }

        let mut names = BTreeSet::new();
        for role in self.roles() {
            for (cap, _) in role.capabilities.iter() {
                names.insert(cap.to_string());
            }
        }
        for (cap, _) in self.actor.caps().iter() {
            names.insert(cap.to_string());
        }

        let caps: Vec<String> = names.into_iter().collect();
        *self.cap_cache.write() = Some(caps.clone());
        caps
    }

    /// Drops the role and capability caches so the next read re-fetches.
    ///
    /// Call after role data may have changed mid-request.
    pub fn refresh_caps(&self) {
        *self.role_cache.write() = None;
        *self.cap_cache.write() = None;
        tracing::debug!("role/capability caches invalidated");
    }

    /// The acting user's settings.
    #[must_use]
    pub fn settings(&self) -> UserSettings {
        self.settings.read().clone()
    }

    /// Replaces the settings and persists them.
    ///
    /// In `Browse` mode the current view is persisted alongside; in
    /// `Single` mode the stored view is written as `None`, so switching
    /// modes cannot leave a durable view behind.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] when the write fails; in-memory
    /// settings are left unchanged in that case.
    pub fn update_settings(&self, settings: UserSettings) -> Result<(), StorageError> {
        let stored_view = if settings.view_mode == ViewMode::Browse {
            self.view()
        } else {
            None
        };

        let state = StoredState {
            view: stored_view,
            settings: settings.clone(),
        };
        self.storage.save(&self.actor.id(), &state)?;
        *self.settings.write() = settings;
        Ok(())
    }
}

impl std::fmt::Debug for ViewStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewStore")
            .field("actor", &self.actor.id())
            .field("view", &self.view.read())
            .finish_non_exhaustive()
    }
}
