//! Outgoing synchronization messages.
//!
//! A [`RerunPayload`] is the structured delta the engine hands to the
//! transport: the set of `{id, value}` pairs that changed since the last
//! dispatch, plus an optional fragment tag asking the backend to re-execute
//! only that fragment. The engine never awaits a reply; payload delivery is
//! fire-and-forget from its point of view.

use crate::value::WidgetValue;
use serde::{Deserialize, Serialize};

/// One changed widget value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WidgetDelta {
    /// Widget id.
    pub id: String,
    /// The value as of this dispatch.
    pub value: WidgetValue,
}

impl WidgetDelta {
    /// Create a delta.
    #[must_use]
    pub fn new(id: impl Into<String>, value: WidgetValue) -> Self {
        Self {
            id: id.into(),
            value,
        }
    }
}

/// One outgoing synchronization message.
///
/// Deltas appear in first-write order; each id appears at most once.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RerunPayload {
    /// Changed widget values.
    pub deltas: Vec<WidgetDelta>,
    /// When present, the backend should re-execute only this fragment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fragment_id: Option<String>,
}

impl RerunPayload {
    /// Create a payload from deltas, unscoped.
    #[must_use]
    pub fn new(deltas: Vec<WidgetDelta>) -> Self {
        Self {
            deltas,
            fragment_id: None,
        }
    }

    /// Scope the payload to a fragment.
    #[must_use]
    pub fn scoped(deltas: Vec<WidgetDelta>, fragment_id: impl Into<String>) -> Self {
        Self {
            deltas,
            fragment_id: Some(fragment_id.into()),
        }
    }

    /// Look up a delta by widget id.
    #[must_use]
    pub fn delta(&self, id: &str) -> Option<&WidgetValue> {
        self.deltas.iter().find(|d| d.id == id).map(|d| &d.value)
    }

    /// Number of deltas carried.
    #[must_use]
    pub fn len(&self) -> usize {
        self.deltas.len()
    }

    /// Whether the payload carries no deltas.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.deltas.is_empty()
    }

    /// Serialize to the JSON wire form.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Parse from the JSON wire form.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delta_lookup() {
        let payload = RerunPayload::new(vec![
            WidgetDelta::new("count", WidgetValue::Int(2)),
            WidgetDelta::new("name", WidgetValue::Text("Ada".into())),
        ]);
        assert_eq!(payload.len(), 2);
        assert_eq!(payload.delta("count"), Some(&WidgetValue::Int(2)));
        assert!(payload.delta("missing").is_none());
    }

    #[test]
    fn scoped_payload_carries_fragment() {
        let payload = RerunPayload::scoped(
            vec![WidgetDelta::new("btn", WidgetValue::fired_trigger())],
            "sidebar",
        );
        assert_eq!(payload.fragment_id.as_deref(), Some("sidebar"));
    }

    #[test]
    fn json_round_trip() {
        let payload = RerunPayload::scoped(
            vec![
                WidgetDelta::new("count", WidgetValue::Int(2)),
                WidgetDelta::new("go", WidgetValue::fired_trigger()),
            ],
            "frag-1",
        );
        let json = payload.to_json().unwrap();
        let back = RerunPayload::from_json(&json).unwrap();
        assert_eq!(back, payload);
    }

    #[test]
    fn unscoped_payload_omits_fragment_field() {
        let payload = RerunPayload::new(vec![WidgetDelta::new("x", WidgetValue::Bool(true))]);
        let json = payload.to_json().unwrap();
        assert!(!json.contains("fragment_id"), "unexpected field in {json}");
    }

    #[test]
    fn empty_payload() {
        let payload = RerunPayload::default();
        assert!(payload.is_empty());
        assert_eq!(payload.len(), 0);
    }
}
