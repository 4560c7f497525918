//! End-to-end view lifecycle tests.
//!
//! Drives the full stack — gate, controller, store, in-memory platform
//! seams — through the scenarios a real admin session produces.

use parking_lot::Mutex;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use viewas_auth::{
    ActingUser, CapsView, SuperiorityGuard, UserRecord, View, ViewAsError,
};
use viewas_runtime::{
    AccessGate, AjaxRequest, InMemoryDirectory, InMemoryRoles, InMemorySettings, StaticNonce,
    ViewController, ViewStore,
};
use viewas_types::{CapabilityMap, RoleSlug, SiteId, UserId};

const NONCE: &str = "lifecycle-nonce";

/// Shared platform the whole "install" runs against.
struct Install {
    storage: Arc<InMemorySettings>,
    users: Arc<InMemoryDirectory>,
    roles: Arc<InMemoryRoles>,
    guard: SuperiorityGuard,
}

impl Install {
    fn new() -> Self {
        Self {
            storage: Arc::new(InMemorySettings::new()),
            users: Arc::new(InMemoryDirectory::new()),
            roles: Arc::new(viewas_runtime::memory::standard_roles()),
            guard: SuperiorityGuard::default(),
        }
    }

    fn with_superiors(ids: impl IntoIterator<Item = UserId>) -> Self {
        let mut install = Self::new();
        install.guard = SuperiorityGuard::new(ids);
        install
    }

    /// One request for `record`: everything loads fresh from storage.
    fn session(&self, record: UserRecord) -> ViewController {
        self.users.insert(record.clone());
        let actor = ActingUser::resolve(record, &self.guard, self.roles.as_ref());
        let store = ViewStore::new(
            actor,
            self.storage.clone(),
            self.users.clone(),
            self.roles.clone(),
        )
        .expect("in-memory load cannot fail");
        ViewController::new(
            store,
            self.guard.clone(),
            self.users.clone(),
            self.roles.clone(),
            self.storage.clone(),
        )
    }

    fn admin(&self, login: &str) -> ViewController {
        self.session(
            UserRecord::new(UserId::well_known(login), login).with_role("administrator"),
        )
    }

    fn gate(&self, record: UserRecord) -> AccessGate {
        AccessGate::new(Arc::new(StaticNonce::new(NONCE)), self.session(record))
    }
}

mod view_resolution {
    use super::*;

    #[test]
    fn no_view_passes_real_caps_through_exactly() {
        let install = Install::new();
        let controller = install.admin("alice");

        let effective = controller.store().effective_capabilities();
        assert_eq!(&effective, controller.store().actor().caps());
    }

    #[test]
    fn visitor_view_yields_empty_map() {
        let install = Install::new();
        let controller = install.admin("alice");

        controller.apply(View::Visitor).expect("apply visitor");
        let effective = controller.store().effective_capabilities();
        assert!(effective.is_empty());
        assert!(!effective.has("read"));
    }

    #[test]
    fn role_view_uses_role_defaults_only() {
        let install = Install::new();
        let controller = install.admin("alice");

        controller
            .apply(View::Role(RoleSlug::new("editor")))
            .expect("apply editor view");

        let effective = controller.store().effective_capabilities();
        assert!(effective.has("edit_others_posts"));
        assert!(!effective.has("manage_options"));
        // The real map is untouched underneath.
        assert!(controller.store().actor().caps().has("manage_options"));
    }

    #[test]
    fn caps_view_overlays_on_anchored_role() {
        let install = Install::new();
        // The guard only admits caps the actor really holds.
        let controller = install.session(
            UserRecord::new(UserId::well_known("alice"), "alice")
                .with_role("administrator")
                .with_cap("moderate_comments", true),
        );

        let overrides: CapabilityMap =
            [("edit_others_posts", false), ("moderate_comments", true)]
                .into_iter()
                .collect();
        controller
            .apply(View::Caps(CapsView::anchored(
                RoleSlug::new("editor"),
                overrides,
            )))
            .expect("apply caps view");

        let effective = controller.store().effective_capabilities();
        assert!(effective.has("edit_posts")); // from the base role
        assert!(!effective.has("edit_others_posts")); // overridden off
        assert!(effective.has("moderate_comments")); // overridden on
    }

    #[test]
    fn caps_view_can_demote_below_own_caps() {
        let install = Install::new();
        let controller = install.session(
            UserRecord::new(UserId::well_known("net"), "net")
                .with_role("administrator")
                .with_super_admin(true),
        );

        let overrides: CapabilityMap = [("manage_options", false)].into_iter().collect();
        controller
            .apply(View::Caps(CapsView::overrides(overrides)))
            .expect("super admin may shape own caps");

        // The effective map denies even though the real map grants.
        assert!(!controller.store().effective_capabilities().has("manage_options"));
        assert!(controller.store().actor().caps().has("manage_options"));
    }

    #[test]
    fn user_view_adopts_target_caps() {
        let install = Install::new();
        let target = UserRecord::new(UserId::well_known("sub"), "sub").with_role("subscriber");
        install.users.insert(target.clone());
        let controller = install.admin("alice");

        controller.apply(View::User(target.id)).expect("apply user view");

        let effective = controller.store().effective_capabilities();
        assert!(effective.has("read"));
        assert!(!effective.has("edit_posts"));
    }
}

mod guard_rules {
    use super::*;

    #[test]
    fn editor_cannot_view_as_administrator() {
        let install = Install::new();
        let controller = install
            .session(UserRecord::new(UserId::well_known("ed"), "ed").with_role("editor"));

        let err = controller
            .apply(View::Role(RoleSlug::administrator()))
            .expect_err("role exceeds own caps");
        assert!(matches!(err, ViewAsError::Authorization(_)));
        assert_eq!(controller.store().view(), None);
    }

    #[test]
    fn admin_cannot_target_equal_or_higher_user() {
        let install = Install::new();
        let bob = UserRecord::new(UserId::well_known("bob"), "bob").with_role("administrator");
        install.users.insert(bob.clone());
        let alice = install.admin("alice");

        let err = alice
            .apply(View::User(bob.id))
            .expect_err("equal rank is protected");
        assert!(matches!(err, ViewAsError::Authorization(_)));
    }

    #[test]
    fn self_target_succeeds_without_state_change() {
        let install = Install::new();
        let controller = install.admin("alice");

        let outcome = controller
            .apply(View::User(UserId::well_known("alice")))
            .expect("self target is trivially fine");
        assert!(!outcome.changed);
        assert_eq!(controller.store().view(), None);
    }

    #[test]
    fn cross_site_target_denied_below_super_admin() {
        let install = Install::new();
        let elsewhere = SiteId::new();
        let remote = UserRecord::new(UserId::well_known("remote"), "remote")
            .with_role("subscriber")
            .with_sites([elsewhere]);
        install.users.insert(remote.clone());

        let admin = install.admin("alice");
        let err = admin
            .apply(View::User(remote.id))
            .expect_err("no shared site");
        assert!(matches!(err, ViewAsError::Authorization(_)));

        // A network-wide admin crosses site boundaries.
        let net = install.session(
            UserRecord::new(UserId::well_known("net"), "net")
                .with_role("administrator")
                .with_super_admin(true),
        );
        assert!(net.apply(View::User(remote.id)).is_ok());
    }
}

mod lifecycle {
    use super::*;

    #[test]
    fn apply_reset_roundtrip_emits_one_event_each() {
        let install = Install::new();
        let controller = install.admin("alice");
        let log: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&log);
        controller.register_listener("log", 10, move |event| {
            let label = match &event.kind {
                viewas_runtime::ViewEventKind::Applied { .. } => "applied",
                viewas_runtime::ViewEventKind::Reset { .. } => "reset",
                viewas_runtime::ViewEventKind::ResetAll { .. } => "reset_all",
            };
            sink.lock().push(label);
        });

        controller
            .apply(View::Role(RoleSlug::new("editor")))
            .expect("apply");
        let first = controller.reset().expect("reset");
        let second = controller.reset().expect("reset again");

        assert!(first.changed);
        assert!(!second.changed); // idempotent
        assert_eq!(log.lock().len(), 2); // applied + one reset, no event for the no-op
    }

    #[test]
    fn view_survives_across_sessions_in_browse_mode() {
        let install = Install::new();
        install
            .admin("alice")
            .apply(View::Role(RoleSlug::new("editor")))
            .expect("apply");

        let next_session = install.admin("alice");
        assert_eq!(
            next_session.store().view(),
            Some(View::Role(RoleSlug::new("editor")))
        );
        assert!(!next_session.store().effective_capabilities().has("manage_options"));
    }

    #[test]
    fn stale_stored_role_drops_to_no_view() {
        let install = Install::new();
        install
            .admin("alice")
            .apply(View::Role(RoleSlug::new("editor")))
            .expect("apply");

        install.roles.remove(&RoleSlug::new("editor"));

        let session = install.admin("alice");
        assert_eq!(session.store().view(), None);
        assert_eq!(
            &session.store().effective_capabilities(),
            session.store().actor().caps()
        );
    }

    #[test]
    fn reset_all_clears_everyone_and_reports_failures() {
        let install = Install::new();
        for login in ["alice", "bob", "carol"] {
            install
                .admin(login)
                .apply(View::Role(RoleSlug::new("editor")))
                .expect("apply");
        }
        install.storage.fail_clears_for(UserId::well_known("carol"));

        let root = install.session(
            UserRecord::new(UserId::well_known("net"), "net")
                .with_role("administrator")
                .with_super_admin(true),
        );
        let outcome = root.reset_all().expect("bulk clear proceeds past failures");

        assert_eq!(outcome.report.cleared, 2);
        assert_eq!(outcome.report.failures.len(), 1);
        assert_eq!(install.admin("alice").store().view(), None);
        assert_eq!(install.admin("bob").store().view(), None);
        // The failed user's view is still there.
        assert!(install.admin("carol").store().view().is_some());
    }

    #[test]
    fn superior_admin_list_overrides_super_admin_tier() {
        let root_id = UserId::well_known("root");
        let install = Install::with_superiors([root_id]);

        let net = install.session(
            UserRecord::new(UserId::well_known("net"), "net")
                .with_role("administrator")
                .with_super_admin(true),
        );
        assert!(matches!(
            net.reset_all(),
            Err(ViewAsError::Authorization(_))
        ));

        let root = install.session(UserRecord::new(root_id, "root"));
        assert!(root.reset_all().is_ok());
    }
}

mod gate_front_door {
    use super::*;

    fn admin_record(login: &str) -> UserRecord {
        UserRecord::new(UserId::well_known(login), login).with_role("administrator")
    }

    fn request(payload: serde_json::Value) -> AjaxRequest {
        AjaxRequest {
            action: viewas_runtime::gate::VIEW_ACTION.to_string(),
            nonce: NONCE.to_string(),
            payload: payload.to_string(),
        }
    }

    #[test]
    fn full_ajax_roundtrip() {
        let install = Install::new();
        let gate = install.gate(admin_record("alice"));

        let applied = gate.handle_ajax(&request(json!({"role": "editor"})));
        assert!(applied.success);

        let reset = gate.handle_ajax(&request(json!({"reset": true})));
        assert!(reset.success);
        assert_eq!(gate.controller().store().view(), None);
    }

    #[test]
    fn forged_nonce_never_reaches_the_controller() {
        let install = Install::new();
        let gate = install.gate(admin_record("alice"));

        let mut req = request(json!({"role": "editor"}));
        req.nonce = "forged".to_string();
        assert!(!gate.handle_ajax(&req).success);
        assert_eq!(gate.controller().store().view(), None);
    }

    #[test]
    fn malformed_payload_is_reported_not_applied() {
        let install = Install::new();
        let gate = install.gate(admin_record("alice"));

        for bad in [
            json!(["role", "editor"]),                // not an object
            json!({"ghost": true}),                   // unknown view type
            json!({"role": "editor", "visitor": true}), // ambiguous
        ] {
            assert!(!gate.handle_ajax(&request(bad)).success);
        }
        assert_eq!(gate.controller().store().view(), None);
    }

    #[test]
    fn direct_link_applies_and_strips_params() {
        let install = Install::new();
        let gate = install.gate(admin_record("alice"));

        let params = BTreeMap::from([
            (
                viewas_runtime::gate::QUERY_PAYLOAD_PARAM.to_string(),
                json!({"visitor": true}).to_string(),
            ),
            (
                viewas_runtime::gate::QUERY_NONCE_PARAM.to_string(),
                NONCE.to_string(),
            ),
        ]);
        let redirect = gate
            .handle_link(
                &params,
                "https://example.test/wp-admin/?viewas=x&viewas_nonce=y",
            )
            .expect("valid direct link");

        assert_eq!(redirect.location, "https://example.test/wp-admin/");
        assert_eq!(gate.controller().store().view(), Some(View::Visitor));
    }
}
