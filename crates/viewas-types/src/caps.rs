//! Capability map type.
//!
//! A [`CapabilityMap`] is the unit every permission decision operates on:
//! an ordered mapping from capability name to a granted/denied flag.
//!
//! # Normalization
//!
//! Wire payloads carry capability values in several historical shapes
//! (`true`, `1`, `"1"`, `""`). Every value is normalized to `bool` when
//! the map is built, so all downstream comparisons are plain boolean
//! equality. A value that cannot be read as a boolean is rejected at the
//! boundary rather than guessed at.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Ordered mapping from capability name to granted/denied.
///
/// Absent keys are treated as denied by [`has`](Self::has); an explicit
/// `false` entry and a missing entry answer the same way but serialize
/// differently (explicit denials survive round-trips, which matters for
/// override maps layered on a base).
///
/// # Example
///
/// ```
/// use viewas_types::CapabilityMap;
///
/// let mut caps = CapabilityMap::new();
/// caps.set("edit_posts", true);
/// caps.set("manage_options", false);
///
/// assert!(caps.has("edit_posts"));
/// assert!(!caps.has("manage_options"));
/// assert!(!caps.has("never_mentioned"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CapabilityMap(BTreeMap<String, bool>);

impl CapabilityMap {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the named capability is explicitly granted.
    ///
    /// Unknown capabilities are denied.
    #[must_use]
    pub fn has(&self, cap: &str) -> bool {
        self.0.get(cap).copied().unwrap_or(false)
    }

    /// Returns the explicit entry for a capability, if present.
    #[must_use]
    pub fn get(&self, cap: &str) -> Option<bool> {
        self.0.get(cap).copied()
    }

    /// Sets an explicit entry.
    pub fn set(&mut self, cap: impl Into<String>, granted: bool) {
        self.0.insert(cap.into(), granted);
    }

    /// Removes an explicit entry.
    pub fn remove(&mut self, cap: &str) -> Option<bool> {
        self.0.remove(cap)
    }

    /// Number of explicit entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if there are no explicit entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over all explicit entries in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, bool)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Iterates over the granted capability names in name order.
    pub fn granted(&self) -> impl Iterator<Item = &str> {
        self.0
            .iter()
            .filter_map(|(k, v)| v.then_some(k.as_str()))
    }

    /// Returns a copy of `self` with `overrides` layered on top.
    ///
    /// Explicit override entries always win; keys absent from the
    /// overrides fall through to the base.
    ///
    /// # Example
    ///
    /// ```
    /// use viewas_types::CapabilityMap;
    ///
    /// let base: CapabilityMap =
    ///     [("edit_posts", true), ("manage_options", true)].into_iter().collect();
    /// let overrides: CapabilityMap = [("manage_options", false)].into_iter().collect();
    ///
    /// let layered = base.overlay(&overrides);
    /// assert!(layered.has("edit_posts"));       // Fell through
    /// assert!(!layered.has("manage_options"));  // Override won
    /// ```
    #[must_use]
    pub fn overlay(&self, overrides: &CapabilityMap) -> CapabilityMap {
        let mut out = self.clone();
        for (cap, granted) in overrides.iter() {
            out.set(cap, granted);
        }
        out
    }

    /// Returns `true` if every capability granted by `other` is also
    /// granted by `self`.
    ///
    /// This is the "you cannot grant yourself capabilities you don't
    /// already have" check: a requested set is coverable only when its
    /// granted entries are a subset of the actor's own.
    #[must_use]
    pub fn covers(&self, other: &CapabilityMap) -> bool {
        other.granted().all(|cap| self.has(cap))
    }

    /// Reads a loosely-typed JSON value as a capability flag.
    ///
    /// Accepts booleans, numbers (`0` = denied, non-zero = granted),
    /// the usual string spellings, and `null` (denied). Returns `None`
    /// for anything else.
    #[must_use]
    pub fn normalize_value(value: &serde_json::Value) -> Option<bool> {
        match value {
            serde_json::Value::Bool(b) => Some(*b),
            serde_json::Value::Null => Some(false),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(i != 0)
                } else {
                    n.as_f64().map(|f| f != 0.0)
                }
            }
            serde_json::Value::String(s) => match s.trim().to_lowercase().as_str() {
                "" | "0" | "false" | "no" => Some(false),
                "1" | "true" | "yes" => Some(true),
                _ => None,
            },
            _ => None,
        }
    }
}

impl FromIterator<(String, bool)> for CapabilityMap {
    fn from_iter<T: IntoIterator<Item = (String, bool)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> FromIterator<(&'a str, bool)> for CapabilityMap {
    fn from_iter<T: IntoIterator<Item = (&'a str, bool)>>(iter: T) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
    }
}

impl From<BTreeMap<String, bool>> for CapabilityMap {
    fn from(map: BTreeMap<String, bool>) -> Self {
        Self(map)
    }
}

// Deserialization accepts loosely-typed values and normalizes them;
// serialization is the plain `{name: bool}` map (derived above).
impl<'de> Deserialize<'de> for CapabilityMap {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = BTreeMap::<String, serde_json::Value>::deserialize(deserializer)?;
        let mut map = BTreeMap::new();
        for (cap, value) in raw {
            let granted = Self::normalize_value(&value).ok_or_else(|| {
                D::Error::custom(format!("capability '{cap}' has a non-boolean value"))
            })?;
            map.insert(cap, granted);
        }
        Ok(Self(map))
    }
}
