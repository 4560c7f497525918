//! Per-user persisted preferences and the stored state envelope.

use crate::view::{ValidationError, View};
use serde::{Deserialize, Serialize};
use viewas_types::CapabilityMap;

/// How long an applied view lives.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewMode {
    /// The view persists across requests until explicitly reset.
    #[default]
    Browse,
    /// The view applies to the current request only; nothing is persisted.
    Single,
}

/// Per-user preferences, loaded at request start and written through the
/// controller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserSettings {
    /// Persist the view across requests, or apply once.
    #[serde(default)]
    pub view_mode: ViewMode,
    /// Hide the front end of the site while a view is active.
    #[serde(default)]
    pub hide_front: bool,
    /// Keep the admin locale fixed while impersonating a user with a
    /// different locale preference.
    #[serde(default)]
    pub freeze_locale: bool,
}

impl UserSettings {
    /// Applies a partial update from a wire sub-payload.
    ///
    /// Only known keys are accepted; values are normalized the same way
    /// capability flags are.
    ///
    /// # Errors
    ///
    /// [`ValidationError::UnknownSetting`] for an unrecognized key,
    /// [`ValidationError::MalformedField`] for an unreadable value.
    pub fn apply_patch(&mut self, patch: &serde_json::Value) -> Result<(), ValidationError> {
        let object = patch.as_object().ok_or(ValidationError::MalformedField {
            field: "user_setting",
            detail: "expected an object".to_string(),
        })?;

        for (key, value) in object {
            match key.as_str() {
                "view_mode" => {
                    self.view_mode = match value.as_str() {
                        Some("browse") => ViewMode::Browse,
                        Some("single") => ViewMode::Single,
                        _ => {
                            return Err(ValidationError::MalformedField {
                                field: "user_setting",
                                detail: "view_mode must be 'browse' or 'single'".to_string(),
                            })
                        }
                    };
                }
                "hide_front" => {
                    self.hide_front = read_flag(value, "hide_front")?;
                }
                "freeze_locale" => {
                    self.freeze_locale = read_flag(value, "freeze_locale")?;
                }
                other => return Err(ValidationError::UnknownSetting(other.to_string())),
            }
        }
        Ok(())
    }
}

fn read_flag(value: &serde_json::Value, name: &str) -> Result<bool, ValidationError> {
    CapabilityMap::normalize_value(value).ok_or(ValidationError::MalformedField {
        field: "user_setting",
        detail: format!("{name} must be a boolean"),
    })
}

/// What the settings store persists per user.
///
/// The view and the settings travel together so a mutating request
/// writes storage at most once.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoredState {
    /// The persisted view selection, if any.
    #[serde(default)]
    pub view: Option<View>,
    /// The user's preferences.
    #[serde(default)]
    pub settings: UserSettings,
}
