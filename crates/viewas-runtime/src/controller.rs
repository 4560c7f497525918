//! View controller — the state machine over one session-scoped view.
//!
//! ```text
//! NoView ──apply──► ViewActive ──reset──► NoView
//! ```
//!
//! Every mutation runs validate → guard → store → notify, in that
//! order; a rejection at any step leaves no partial state behind (the
//! request is single-threaded, so set-view plus notification is
//! atomic from the caller's point of view).

use crate::event::{EventRegistry, ViewEvent};
use crate::store::ViewStore;
use parking_lot::RwLock;
use std::sync::Arc;
use viewas_auth::{
    Admission, BulkClearReport, GuardDenial, RoleRegistry, SettingsStore, SuperiorityGuard,
    UserDirectory, View, ViewAsError,
};
use viewas_types::ErrorCode;

/// Result of a single-user apply/reset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    /// Whether any state actually changed (self-targets and redundant
    /// resets succeed without changing anything).
    pub changed: bool,
    /// Human-readable confirmation for the caller.
    pub message: String,
}

/// Result of the administrative bulk clear.
#[derive(Debug, Clone, PartialEq)]
pub struct BulkOutcome {
    /// Per-user clear report from the storage seam.
    pub report: BulkClearReport,
    /// Human-readable summary.
    pub message: String,
}

/// Validates and applies view-change requests against the store,
/// enforcing the superiority guard and emitting lifecycle
/// notifications.
///
/// Explicitly constructed and dependency-injected; there is no ambient
/// global instance.
pub struct ViewController {
    store: ViewStore,
    guard: SuperiorityGuard,
    users: Arc<dyn UserDirectory>,
    roles: Arc<dyn RoleRegistry>,
    storage: Arc<dyn SettingsStore>,
    events: RwLock<EventRegistry>,
}

impl ViewController {
    /// Creates a controller over an already-built store.
    #[must_use]
    pub fn new(
        store: ViewStore,
        guard: SuperiorityGuard,
        users: Arc<dyn UserDirectory>,
        roles: Arc<dyn RoleRegistry>,
        storage: Arc<dyn SettingsStore>,
    ) -> Self {
        Self {
            store,
            guard,
            users,
            roles,
            storage,
            events: RwLock::new(EventRegistry::new()),
        }
    }

    /// The underlying request-scoped store (read access for renderers).
    #[must_use]
    pub fn store(&self) -> &ViewStore {
        &self.store
    }

    /// Registers a lifecycle listener.
    pub fn register_listener(
        &self,
        id: impl Into<String>,
        priority: i32,
        listener: impl Fn(&ViewEvent) + Send + Sync + 'static,
    ) {
        self.events.write().register(id, priority, listener);
    }

    /// Removes a lifecycle listener. Returns `true` if one was removed.
    pub fn unregister_listener(&self, id: &str) -> bool {
        self.events.write().unregister(id)
    }

    /// Dispatches outside the registry lock so a listener may register
    /// or unregister listeners re-entrantly.
    fn emit(&self, event: &ViewEvent) {
        let listeners = self.events.read().snapshot();
        tracing::debug!(listeners = listeners.len(), "dispatching {:?}", event.kind);
        for listener in &listeners {
            listener(event);
        }
    }

    /// Validates and applies a view.
    ///
    /// # Errors
    ///
    /// [`ViewAsError::Validation`] for a malformed candidate,
    /// [`ViewAsError::Authorization`] when the guard rejects,
    /// [`ViewAsError::Storage`] when persisting fails. On error no
    /// state changes and no notification is emitted.
    pub fn apply(&self, view: View) -> Result<Outcome, ViewAsError> {
        view.validate()?;

        let actor = self.store.actor();
        let admission = self
            .guard
            .admit(actor, &view, self.users.as_ref(), self.roles.as_ref())
            .map_err(|denial| {
                tracing::warn!(
                    user = %actor.id(),
                    %view,
                    code = denial.code(),
                    "view request denied"
                );
                ViewAsError::from(denial)
            })?;

        if admission == Admission::SelfNoOp {
            return Ok(Outcome {
                changed: false,
                message: "you are already viewing as yourself".to_string(),
            });
        }

        self.store.set_view(Some(view.clone()))?;
        self.emit(&ViewEvent::applied(actor.id(), view.clone()));
        tracing::info!(user = %actor.id(), %view, "view applied");

        Ok(Outcome {
            changed: true,
            message: format!("now viewing as {view}"),
        })
    }

    /// Resets the view to none. Idempotent: resetting with no active
    /// view is a no-op success and emits nothing.
    ///
    /// # Errors
    ///
    /// [`ViewAsError::Storage`] when clearing durable state fails.
    pub fn reset(&self) -> Result<Outcome, ViewAsError> {
        let had_view = self.store.view().is_some();
        self.store.set_view(None)?;

        if had_view {
            let user = self.store.actor().id();
            self.emit(&ViewEvent::reset(user));
            tracing::info!(%user, "view reset");
        }

        Ok(Outcome {
            changed: had_view,
            message: if had_view {
                "view reset".to_string()
            } else {
                "no view was active".to_string()
            },
        })
    }

    /// Clears every user's stored view. Top tier only.
    ///
    /// Per-user storage failures are reported in the outcome but do not
    /// abort the remaining users.
    ///
    /// # Errors
    ///
    /// [`ViewAsError::Authorization`] when the caller is not in the
    /// hierarchy's top tier, [`ViewAsError::Storage`] when the backend
    /// as a whole is inaccessible.
    pub fn reset_all(&self) -> Result<BulkOutcome, ViewAsError> {
        let actor = self.store.actor();
        if !self.guard.is_top_tier(actor) {
            tracing::warn!(user = %actor.id(), "reset-all denied: not top tier");
            return Err(GuardDenial::InsufficientRank.into());
        }

        let report = self.storage.clear_all_views()?;
        for failure in &report.failures {
            tracing::error!(
                user = %failure.user,
                reason = %failure.reason,
                "bulk clear failed for user"
            );
        }

        // The caller's own request-local view goes too.
        self.store.set_view(None)?;

        self.emit(&ViewEvent::reset_all(actor.id()));
        tracing::info!(
            by = %actor.id(),
            cleared = report.cleared,
            failed = report.failures.len(),
            "all views reset"
        );

        let message = if report.is_complete() {
            format!("cleared {} stored views", report.cleared)
        } else {
            format!(
                "cleared {} stored views, {} failed",
                report.cleared,
                report.failures.len()
            )
        };
        Ok(BulkOutcome { report, message })
    }
}

impl std::fmt::Debug for ViewController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewController")
            .field("actor", &self.store.actor().id())
            .field("view", &self.store.view())
            .finish_non_exhaustive()
    }
}
