//! The view type — a simulated identity selection.
//!
//! A [`View`] is a closed tagged union: exactly one of a role, a target
//! user, an ad-hoc capability override set, or the logged-out visitor.
//! An absent view means "no override, use the real account".
//!
//! # Wire Shape
//!
//! The AJAX and direct-link paths both carry a single-key JSON object:
//!
//! ```text
//! {"role": "editor"}
//! {"user": "d81843c2-..."}
//! {"caps": {"manage_options": false}}
//! {"caps": {"base_role": "editor", "overrides": {"edit_theme": true}}}
//! {"visitor": true}
//! ```
//!
//! [`View::from_payload`] decodes that shape, normalizing loosely-typed
//! capability values at the boundary. Storage uses the derived
//! externally-tagged serde form, which round-trips the same keys.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;
use viewas_types::{CapabilityMap, ErrorCode, RoleSlug, UserId};

/// The simulated identity active for a request.
///
/// # Invariant
///
/// At most one variant is active per acting user at a time; the store
/// holds `Option<View>` and `None` means pass-through.
///
/// # Example
///
/// ```
/// use viewas_auth::View;
/// use serde_json::json;
///
/// let view = View::from_payload(&json!({"role": "editor"})).expect("valid payload");
/// assert_eq!(view, View::Role("editor".into()));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum View {
    /// Simulate a role's default capability map.
    Role(RoleSlug),
    /// Impersonate another account's full capability map.
    User(UserId),
    /// Ad-hoc capability overrides, optionally anchored to a base role.
    Caps(CapsView),
    /// Simulate a logged-out guest (every capability denied).
    Visitor,
}

impl View {
    /// Decodes the single-key wire payload into a view.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] when the payload is not an object,
    /// names no recognized view type, names more than one, or carries a
    /// malformed value.
    pub fn from_payload(payload: &serde_json::Value) -> Result<Self, ValidationError> {
        let object = payload.as_object().ok_or(ValidationError::NotAnObject)?;

        let mut found: Option<View> = None;
        for (key, value) in object {
            let view = match key.as_str() {
                "role" => {
                    let slug = value.as_str().ok_or_else(|| ValidationError::MalformedField {
                        field: "role",
                        detail: "expected a role slug string".to_string(),
                    })?;
                    let slug = RoleSlug::new(slug);
                    if slug.is_empty() {
                        return Err(ValidationError::MalformedField {
                            field: "role",
                            detail: "role slug is empty".to_string(),
                        });
                    }
                    View::Role(slug)
                }
                "user" => {
                    let raw = value.as_str().ok_or_else(|| ValidationError::MalformedField {
                        field: "user",
                        detail: "expected a user id string".to_string(),
                    })?;
                    let id = UserId::parse(raw).map_err(|e| ValidationError::MalformedField {
                        field: "user",
                        detail: e.to_string(),
                    })?;
                    View::User(id)
                }
                "caps" => View::Caps(CapsView::from_value(value)?),
                "visitor" => View::Visitor,
                other => return Err(ValidationError::UnknownViewType(other.to_string())),
            };

            if found.is_some() {
                return Err(ValidationError::AmbiguousPayload);
            }
            found = Some(view);
        }

        let view = found.ok_or(ValidationError::AmbiguousPayload)?;
        view.validate()?;
        Ok(view)
    }

    /// Checks structural validity independent of any registry.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyCapabilityMap`] for a caps view
    /// that neither overrides anything nor anchors to a base role.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            Self::Caps(caps) if caps.overrides.is_empty() && caps.base_role.is_none() => {
                Err(ValidationError::EmptyCapabilityMap)
            }
            _ => Ok(()),
        }
    }

    /// Short label for logging (`"role"`, `"user"`, `"caps"`, `"visitor"`).
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Role(_) => "role",
            Self::User(_) => "user",
            Self::Caps(_) => "caps",
            Self::Visitor => "visitor",
        }
    }
}

impl std::fmt::Display for View {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Role(slug) => write!(f, "role:{slug}"),
            Self::User(id) => write!(f, "user:{id}"),
            Self::Caps(caps) => match &caps.base_role {
                Some(base) => write!(f, "caps:{} over {base}", caps.overrides.len()),
                None => write!(f, "caps:{}", caps.overrides.len()),
            },
            Self::Visitor => f.write_str("visitor"),
        }
    }
}

/// An ad-hoc capability override set.
///
/// Overrides are layered on a base: the named base role's defaults when
/// anchored, otherwise the acting user's own capabilities. Explicit
/// entries always win over the base; absent keys fall through.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CapsView {
    /// Base role the overrides are anchored to, if any.
    pub base_role: Option<RoleSlug>,
    /// Explicit per-capability overrides (`true` enables, `false` disables).
    pub overrides: CapabilityMap,
}

impl CapsView {
    /// Creates an override set on top of the acting user's own capabilities.
    #[must_use]
    pub fn overrides(overrides: CapabilityMap) -> Self {
        Self {
            base_role: None,
            overrides,
        }
    }

    /// Creates an override set anchored to a base role's defaults.
    #[must_use]
    pub fn anchored(base_role: RoleSlug, overrides: CapabilityMap) -> Self {
        Self {
            base_role: Some(base_role),
            overrides,
        }
    }

    /// Reads either wire form: a bare override map, or the structured
    /// `{base_role?, overrides}` object.
    pub(crate) fn from_value(value: &serde_json::Value) -> Result<Self, ValidationError> {
        let object = value.as_object().ok_or(ValidationError::MalformedField {
            field: "caps",
            detail: "expected an object".to_string(),
        })?;

        // Structured form is distinguished by its "overrides" key; a bare
        // capability named "overrides" would need the structured form.
        if let Some(raw_overrides) = object.get("overrides") {
            let base_role = match object.get("base_role") {
                None | Some(serde_json::Value::Null) => None,
                Some(serde_json::Value::String(s)) => {
                    let slug = RoleSlug::new(s);
                    if slug.is_empty() {
                        return Err(ValidationError::MalformedField {
                            field: "caps.base_role",
                            detail: "role slug is empty".to_string(),
                        });
                    }
                    Some(slug)
                }
                Some(_) => {
                    return Err(ValidationError::MalformedField {
                        field: "caps.base_role",
                        detail: "expected a role slug string".to_string(),
                    })
                }
            };
            let overrides = read_cap_map(raw_overrides, "caps.overrides")?;
            Ok(Self {
                base_role,
                overrides,
            })
        } else {
            Ok(Self::overrides(read_cap_map(value, "caps")?))
        }
    }
}

fn read_cap_map(
    value: &serde_json::Value,
    field: &'static str,
) -> Result<CapabilityMap, ValidationError> {
    let object = value.as_object().ok_or(ValidationError::MalformedField {
        field,
        detail: "expected a capability map".to_string(),
    })?;

    let mut map = CapabilityMap::new();
    for (cap, raw) in object {
        let granted =
            CapabilityMap::normalize_value(raw).ok_or(ValidationError::MalformedField {
                field,
                detail: format!("capability '{cap}' has a non-boolean value"),
            })?;
        map.set(cap.as_str(), granted);
    }
    Ok(map)
}

// Storage serde: always the structured form (skipping an absent base
// role), so round-trips are unambiguous.
impl Serialize for CapsView {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        use serde::ser::SerializeMap;
        let fields = 1 + usize::from(self.base_role.is_some());
        let mut map = serializer.serialize_map(Some(fields))?;
        if let Some(base) = &self.base_role {
            map.serialize_entry("base_role", base)?;
        }
        map.serialize_entry("overrides", &self.overrides)?;
        map.end()
    }
}

impl<'de> Deserialize<'de> for CapsView {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;
        Self::from_value(&value).map_err(serde::de::Error::custom)
    }
}

/// Rejection of a malformed or unrecognized view payload.
///
/// Validation errors are surfaced to the caller with their specific
/// message, unlike guard denials which are uniform.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    /// Payload was not a JSON object.
    #[error("view payload must be a JSON object")]
    NotAnObject,

    /// Payload named a view type outside the closed union.
    #[error("unrecognized view type: '{0}'")]
    UnknownViewType(String),

    /// Payload named zero or multiple view types.
    #[error("view payload must contain exactly one view key")]
    AmbiguousPayload,

    /// A field inside the payload had the wrong shape.
    #[error("malformed {field}: {detail}")]
    MalformedField {
        /// Which field was malformed.
        field: &'static str,
        /// What was wrong with it.
        detail: String,
    },

    /// A caps view with nothing to override and no base role.
    #[error("capability view contains no overrides")]
    EmptyCapabilityMap,

    /// An unknown key in a user-setting patch.
    #[error("unknown user setting: '{0}'")]
    UnknownSetting(String),
}

impl ErrorCode for ValidationError {
    fn code(&self) -> &'static str {
        match self {
            Self::NotAnObject => "VIEW_NOT_AN_OBJECT",
            Self::UnknownViewType(_) => "VIEW_UNKNOWN_TYPE",
            Self::AmbiguousPayload => "VIEW_AMBIGUOUS_PAYLOAD",
            Self::MalformedField { .. } => "VIEW_MALFORMED_FIELD",
            Self::EmptyCapabilityMap => "VIEW_EMPTY_CAPS",
            Self::UnknownSetting(_) => "VIEW_UNKNOWN_SETTING",
        }
    }

    fn is_recoverable(&self) -> bool {
        // The caller can always fix the payload and resubmit.
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use viewas_types::assert_error_code;

    #[test]
    fn payload_role() {
        let view = View::from_payload(&json!({"role": "Editor"})).expect("valid");
        assert_eq!(view, View::Role(RoleSlug::new("editor")));
        assert_eq!(view.kind(), "role");
    }

    #[test]
    fn payload_user() {
        let id = UserId::well_known("carol");
        let view = View::from_payload(&json!({"user": id.to_string()})).expect("valid");
        assert_eq!(view, View::User(id));
    }

    #[test]
    fn payload_visitor() {
        let view = View::from_payload(&json!({"visitor": true})).expect("valid");
        assert_eq!(view, View::Visitor);
    }

    #[test]
    fn payload_caps_bare_map() {
        let view =
            View::from_payload(&json!({"caps": {"manage_options": false, "edit_posts": 1}}))
                .expect("valid");
        let View::Caps(caps) = view else {
            panic!("expected caps view");
        };
        assert_eq!(caps.base_role, None);
        assert_eq!(caps.overrides.get("manage_options"), Some(false));
        assert_eq!(caps.overrides.get("edit_posts"), Some(true));
    }

    #[test]
    fn payload_caps_anchored() {
        let view = View::from_payload(&json!({
            "caps": {"base_role": "editor", "overrides": {"switch_themes": true}}
        }))
        .expect("valid");
        let View::Caps(caps) = view else {
            panic!("expected caps view");
        };
        assert_eq!(caps.base_role, Some(RoleSlug::new("editor")));
        assert!(caps.overrides.has("switch_themes"));
    }

    #[test]
    fn payload_rejects_unknown_type() {
        let err = View::from_payload(&json!({"ghost": true})).expect_err("must reject");
        assert_eq!(err, ValidationError::UnknownViewType("ghost".to_string()));
    }

    #[test]
    fn payload_rejects_two_keys() {
        let err = View::from_payload(&json!({"role": "editor", "visitor": true}))
            .expect_err("must reject");
        assert_eq!(err, ValidationError::AmbiguousPayload);
    }

    #[test]
    fn payload_rejects_empty_object() {
        let err = View::from_payload(&json!({})).expect_err("must reject");
        assert_eq!(err, ValidationError::AmbiguousPayload);
    }

    #[test]
    fn payload_rejects_non_object() {
        let err = View::from_payload(&json!("editor")).expect_err("must reject");
        assert_eq!(err, ValidationError::NotAnObject);
    }

    #[test]
    fn payload_rejects_empty_caps() {
        let err = View::from_payload(&json!({"caps": {}})).expect_err("must reject");
        assert_eq!(err, ValidationError::EmptyCapabilityMap);
    }

    #[test]
    fn payload_rejects_bad_user_id() {
        let err = View::from_payload(&json!({"user": "not-a-uuid"})).expect_err("must reject");
        assert!(matches!(
            err,
            ValidationError::MalformedField { field: "user", .. }
        ));
    }

    #[test]
    fn payload_rejects_unreadable_cap_value() {
        let err =
            View::from_payload(&json!({"caps": {"edit_posts": [1]}})).expect_err("must reject");
        assert!(matches!(
            err,
            ValidationError::MalformedField { field: "caps", .. }
        ));
    }

    #[test]
    fn storage_serde_roundtrip() {
        let views = [
            View::Role(RoleSlug::new("editor")),
            View::User(UserId::well_known("carol")),
            View::Caps(CapsView::anchored(
                RoleSlug::new("author"),
                [("edit_pages", true)].into_iter().collect(),
            )),
            View::Caps(CapsView::overrides(
                [("manage_options", false)].into_iter().collect(),
            )),
            View::Visitor,
        ];

        for view in views {
            let json = serde_json::to_string(&view).expect("serialize");
            let parsed: View = serde_json::from_str(&json).expect("deserialize");
            assert_eq!(parsed, view, "roundtrip failed for {json}");
        }
    }

    #[test]
    fn display_labels() {
        assert_eq!(View::Role(RoleSlug::new("editor")).to_string(), "role:editor");
        assert_eq!(View::Visitor.to_string(), "visitor");
        let caps = View::Caps(CapsView::anchored(
            RoleSlug::new("author"),
            [("a", true)].into_iter().collect(),
        ));
        assert_eq!(caps.to_string(), "caps:1 over author");
    }

    #[test]
    fn validation_error_codes() {
        assert_error_code(&ValidationError::NotAnObject, "VIEW_");
        assert_error_code(&ValidationError::AmbiguousPayload, "VIEW_");
        assert_error_code(&ValidationError::EmptyCapabilityMap, "VIEW_");
        assert!(ValidationError::NotAnObject.is_recoverable());
    }
}
