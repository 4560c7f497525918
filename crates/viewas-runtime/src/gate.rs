//! Access gate — the front door for view-change requests.
//!
//! The gate is a boundary check, not logic: it verifies the request
//! nonce against the acting user's session, normalizes the wire payload
//! into the closed [`View`] union, and only then lets the controller
//! see anything. Both mutation paths pass through here:
//!
//! - **AJAX**: POST body with an action discriminator, the nonce, and a
//!   JSON-encoded payload; answered with a JSON envelope.
//! - **Direct link**: the same payload and nonce as query parameters
//!   (the user-row "view as" links); answered with a redirect, never
//!   JSON.
//!
//! # Payload Shape
//!
//! The payload is a single-command JSON object:
//!
//! ```text
//! {"role": "editor"}                 apply a view (any view key)
//! {"reset": true}                    reset the caller's view
//! {"reset_all": true}                bulk clear (top tier only)
//! ```
//!
//! plus an optional `user_setting` sub-object, applied only once the
//! command succeeds.

use crate::controller::ViewController;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use viewas_auth::{NonceService, ValidationError, View, ViewAsError};
use viewas_types::ErrorCode;

/// Action discriminator for the AJAX path.
pub const VIEW_ACTION: &str = "viewas_update";

/// Query parameter carrying the JSON payload on the direct-link path.
pub const QUERY_PAYLOAD_PARAM: &str = "viewas";

/// Query parameter carrying the nonce on the direct-link path.
pub const QUERY_NONCE_PARAM: &str = "viewas_nonce";

/// A decoded AJAX POST body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AjaxRequest {
    /// Action discriminator; must equal [`VIEW_ACTION`].
    pub action: String,
    /// Session-bound request token.
    pub nonce: String,
    /// JSON-encoded view payload.
    pub payload: String,
}

/// The JSON envelope returned on the AJAX path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AjaxResponse {
    /// Whether the request took effect.
    pub success: bool,
    /// Typed notice or plain message.
    pub data: AjaxData,
}

/// Response payload: a typed notice on success, a plain message on
/// failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum AjaxData {
    /// Structured notice for the front end to render.
    Notice {
        /// Notice text.
        content: String,
        /// Notice severity.
        #[serde(rename = "type")]
        kind: NoticeKind,
    },
    /// Bare failure message.
    Message(String),
}

/// Severity of a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    /// The request took effect.
    Success,
    /// The request was rejected.
    Error,
}

/// Where to send the browser after a successful direct-link request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    /// Target URL with the view parameters stripped.
    pub location: String,
}

/// Thin front door: nonce, payload shape, then the controller.
pub struct AccessGate {
    nonce: Arc<dyn NonceService>,
    controller: ViewController,
}

impl AccessGate {
    /// Creates a gate in front of a controller.
    #[must_use]
    pub fn new(nonce: Arc<dyn NonceService>, controller: ViewController) -> Self {
        Self { nonce, controller }
    }

    /// The guarded controller (read access for renderers).
    #[must_use]
    pub fn controller(&self) -> &ViewController {
        &self.controller
    }

    /// Handles an AJAX view-change request.
    ///
    /// Never returns an error: every failure is folded into the JSON
    /// envelope the front end renders.
    #[must_use]
    pub fn handle_ajax(&self, request: &AjaxRequest) -> AjaxResponse {
        match self.process_ajax(request) {
            Ok(message) => AjaxResponse {
                success: true,
                data: AjaxData::Notice {
                    content: message,
                    kind: NoticeKind::Success,
                },
            },
            Err(error) => {
                tracing::warn!(code = error.code(), layer = error.layer(), "request rejected");
                AjaxResponse {
                    success: false,
                    data: AjaxData::Message(error.user_message()),
                }
            }
        }
    }

    /// Handles a direct-link request carried in query parameters.
    ///
    /// # Errors
    ///
    /// Propagates the [`ViewAsError`]; the caller decides how to render
    /// it (typically an admin notice, never a redirect).
    pub fn handle_link(
        &self,
        params: &BTreeMap<String, String>,
        return_to: &str,
    ) -> Result<Redirect, ViewAsError> {
        let token = params
            .get(QUERY_NONCE_PARAM)
            .ok_or(ViewAsError::Authentication)?;
        self.verify_nonce(token)?;

        let raw = params
            .get(QUERY_PAYLOAD_PARAM)
            .ok_or(ViewAsError::Validation(ValidationError::MalformedField {
                field: "payload",
                detail: "missing view payload parameter".to_string(),
            }))?;
        let payload = decode_payload(raw)?;
        self.dispatch(&payload)?;

        Ok(Redirect {
            location: strip_params(return_to, &[QUERY_PAYLOAD_PARAM, QUERY_NONCE_PARAM]),
        })
    }

    fn process_ajax(&self, request: &AjaxRequest) -> Result<String, ViewAsError> {
        if request.action != VIEW_ACTION {
            return Err(ViewAsError::Validation(ValidationError::MalformedField {
                field: "action",
                detail: format!("unknown action '{}'", request.action),
            }));
        }
        self.verify_nonce(&request.nonce)?;

        let payload = decode_payload(&request.payload)?;
        self.dispatch(&payload)
    }

    fn verify_nonce(&self, token: &str) -> Result<(), ViewAsError> {
        let user = self.controller.store().actor().id();
        if self.nonce.verify(&user, VIEW_ACTION, token) {
            Ok(())
        } else {
            Err(ViewAsError::Authentication)
        }
    }

    /// Routes a normalized payload to the controller.
    fn dispatch(&self, payload: &serde_json::Value) -> Result<String, ViewAsError> {
        let object = payload
            .as_object()
            .ok_or(ViewAsError::Validation(ValidationError::NotAnObject))?;

        let mut command = object.clone();
        let patch = command.remove("user_setting");
        if command.is_empty() && patch.is_none() {
            return Err(ViewAsError::Validation(ValidationError::AmbiguousPayload));
        }

        // Command first: a rejected command must leave the settings
        // sub-payload unapplied, so the combined payload is
        // all-or-nothing.
        let message = if truthy(command.get("reset")) {
            Some(self.controller.reset()?.message)
        } else if truthy(command.get("reset_all")) {
            Some(self.controller.reset_all()?.message)
        } else if command.is_empty() {
            None
        } else {
            let view = View::from_payload(&serde_json::Value::Object(command))?;
            Some(self.controller.apply(view)?.message)
        };

        if let Some(patch) = patch {
            let mut settings = self.controller.store().settings();
            settings.apply_patch(&patch)?;
            self.controller.store().update_settings(settings)?;
        }

        Ok(message.unwrap_or_else(|| "settings saved".to_string()))
    }
}

fn truthy(value: Option<&serde_json::Value>) -> bool {
    value
        .and_then(viewas_types::CapabilityMap::normalize_value)
        .unwrap_or(false)
}

fn decode_payload(raw: &str) -> Result<serde_json::Value, ViewAsError> {
    serde_json::from_str(raw).map_err(|e| {
        ViewAsError::Validation(ValidationError::MalformedField {
            field: "payload",
            detail: e.to_string(),
        })
    })
}

/// Strips the named query parameters from a URL.
fn strip_params(url: &str, names: &[&str]) -> String {
    let Some((base, query)) = url.split_once('?') else {
        return url.to_string();
    };

    let kept: Vec<&str> = query
        .split('&')
        .filter(|pair| {
            let key = pair.split('=').next().unwrap_or(pair);
            !names.contains(&key)
        })
        .collect();

    if kept.is_empty() {
        base.to_string()
    } else {
        format!("{base}?{}", kept.join("&"))
    }
}
