//! View lifecycle notifications.
//!
//! Instead of ambient "action" hooks, lifecycle notifications go through
//! an explicit registry: listeners are registered with an id and a
//! priority, and dispatched synchronously in ascending priority order,
//! FIFO-stable within a priority. The renderer and any extension point
//! subscribe here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use viewas_auth::View;
use viewas_types::UserId;

/// What happened to a stored view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ViewEventKind {
    /// A view was applied for a user.
    Applied {
        /// The acting user.
        user: UserId,
        /// The view now active.
        view: View,
    },
    /// A user's view was reset to none.
    Reset {
        /// The acting user.
        user: UserId,
    },
    /// Every user's stored view was cleared.
    ResetAll {
        /// The administrator who triggered the bulk clear.
        by: UserId,
    },
}

/// A lifecycle notification with its emission time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewEvent {
    /// What happened.
    #[serde(flatten)]
    pub kind: ViewEventKind,
    /// When it was emitted.
    pub at: DateTime<Utc>,
}

impl ViewEvent {
    /// An applied-view event stamped now.
    #[must_use]
    pub fn applied(user: UserId, view: View) -> Self {
        Self {
            kind: ViewEventKind::Applied { user, view },
            at: Utc::now(),
        }
    }

    /// A reset event stamped now.
    #[must_use]
    pub fn reset(user: UserId) -> Self {
        Self {
            kind: ViewEventKind::Reset { user },
            at: Utc::now(),
        }
    }

    /// A bulk reset event stamped now.
    #[must_use]
    pub fn reset_all(by: UserId) -> Self {
        Self {
            kind: ViewEventKind::ResetAll { by },
            at: Utc::now(),
        }
    }
}

pub(crate) type Listener = Arc<dyn Fn(&ViewEvent) + Send + Sync>;

struct Registered {
    id: String,
    priority: i32,
    listener: Listener,
}

/// Priority-ordered listener registry.
///
/// # Ordering
///
/// Listeners run in ascending priority; listeners sharing a priority run
/// in registration order.
///
/// # Example
///
/// ```
/// use viewas_runtime::{EventRegistry, ViewEvent};
/// use viewas_types::UserId;
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
///
/// let mut registry = EventRegistry::new();
/// let seen = Arc::new(AtomicUsize::new(0));
/// let counter = Arc::clone(&seen);
/// registry.register("counter", 10, move |_event| {
///     counter.fetch_add(1, Ordering::SeqCst);
/// });
///
/// registry.dispatch(&ViewEvent::reset(UserId::new()));
/// assert_eq!(seen.load(Ordering::SeqCst), 1);
/// ```
#[derive(Default)]
pub struct EventRegistry {
    listeners: Vec<Registered>,
}

impl EventRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a listener under an id.
    ///
    /// The listener is inserted in priority order (stable: FIFO for the
    /// same priority). Re-registering an id adds a second listener; use
    /// [`unregister`](Self::unregister) first to replace.
    pub fn register(
        &mut self,
        id: impl Into<String>,
        priority: i32,
        listener: impl Fn(&ViewEvent) + Send + Sync + 'static,
    ) {
        let entry = Registered {
            id: id.into(),
            priority,
            listener: Arc::new(listener),
        };
        // Insert after every listener with priority <= ours.
        let pos = self
            .listeners
            .partition_point(|r| r.priority <= priority);
        self.listeners.insert(pos, entry);
    }

    /// Removes every listener registered under `id`.
    ///
    /// Returns `true` if anything was removed.
    pub fn unregister(&mut self, id: &str) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|r| r.id != id);
        self.listeners.len() != before
    }

    /// Number of registered listeners.
    #[must_use]
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    /// Returns `true` if no listeners are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// The listeners in dispatch order.
    ///
    /// A caller keeping the registry behind a lock can take this
    /// snapshot and release the lock before invoking, so listeners may
    /// re-enter [`register`](Self::register) and
    /// [`unregister`](Self::unregister).
    pub(crate) fn snapshot(&self) -> Vec<Listener> {
        self.listeners
            .iter()
            .map(|r| Arc::clone(&r.listener))
            .collect()
    }

    /// Dispatches an event to every listener, in order.
    pub fn dispatch(&self, event: &ViewEvent) {
        tracing::debug!(listeners = self.listeners.len(), "dispatching {:?}", event.kind);
        for registered in &self.listeners {
            (registered.listener)(event);
        }
    }
}

impl std::fmt::Debug for EventRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventRegistry")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
