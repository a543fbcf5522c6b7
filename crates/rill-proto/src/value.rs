//! The widget value union and its tag mirror.
//!
//! Every widget value flowing through the engine is a [`WidgetValue`]: a
//! closed, tagged union handled exhaustively at each boundary (store, forms,
//! dispatcher). There is no untyped escape hatch; a value that does not fit
//! one of these arms does not exist as far as the engine is concerned.
//!
//! [`ValueKind`] is the tag-only mirror of the union. Two values are
//! type-compatible when their kinds are equal; the reconciler uses this to
//! decide between retaining a stored value and reseeding from a declaration
//! default.
//!
//! # Trigger values
//!
//! `Trigger(true)` means "fired"; `Trigger(false)` is the neutral state.
//! The engine guarantees a fired value is visible to at most one outgoing
//! message; see the trigger handler in `rill-sync`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A widget's current value.
///
/// Serialized adjacently tagged so the wire form is self-describing:
///
/// ```json
/// { "kind": "int", "value": 5 }
/// { "kind": "trigger", "value": true }
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum WidgetValue {
    /// Boolean state (checkbox, toggle).
    Bool(bool),
    /// Integral number.
    Int(i64),
    /// Floating-point number.
    Float(f64),
    /// Text content.
    Text(String),
    /// Ordered list of strings (multiselect).
    TextList(Vec<String>),
    /// Raw bytes (file contents, media).
    Bytes(Vec<u8>),
    /// Pre-serialized JSON for widgets with structured payloads.
    Json(String),
    /// One-shot signal. `true` = fired, `false` = neutral.
    Trigger(bool),
}

impl WidgetValue {
    /// The tag of this value.
    #[must_use]
    pub fn kind(&self) -> ValueKind {
        match self {
            WidgetValue::Bool(_) => ValueKind::Bool,
            WidgetValue::Int(_) => ValueKind::Int,
            WidgetValue::Float(_) => ValueKind::Float,
            WidgetValue::Text(_) => ValueKind::Text,
            WidgetValue::TextList(_) => ValueKind::TextList,
            WidgetValue::Bytes(_) => ValueKind::Bytes,
            WidgetValue::Json(_) => ValueKind::Json,
            WidgetValue::Trigger(_) => ValueKind::Trigger,
        }
    }

    /// Whether this is a trigger value, fired or not.
    #[must_use]
    pub fn is_trigger(&self) -> bool {
        matches!(self, WidgetValue::Trigger(_))
    }

    /// Whether this is a trigger at rest.
    #[must_use]
    pub fn is_neutral_trigger(&self) -> bool {
        matches!(self, WidgetValue::Trigger(false))
    }

    /// The neutral value for a trigger widget.
    #[must_use]
    pub fn neutral_trigger() -> Self {
        WidgetValue::Trigger(false)
    }

    /// A fired trigger.
    #[must_use]
    pub fn fired_trigger() -> Self {
        WidgetValue::Trigger(true)
    }
}

/// The tag-only mirror of [`WidgetValue`], used for type-match checks.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    Bool,
    Int,
    Float,
    Text,
    TextList,
    Bytes,
    Json,
    Trigger,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::Bool => "bool",
            ValueKind::Int => "int",
            ValueKind::Float => "float",
            ValueKind::Text => "text",
            ValueKind::TextList => "text_list",
            ValueKind::Bytes => "bytes",
            ValueKind::Json => "json",
            ValueKind::Trigger => "trigger",
        };
        f.write_str(name)
    }
}

/// Where a stored value came from.
///
/// UI-sourced values are candidates for the next outgoing message; backend
/// and default values never dispatch on their own.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueSource {
    /// Seeded from a declaration default.
    Default,
    /// Written by the backend as part of a run.
    Backend,
    /// Written by a rendering component on user interaction.
    Ui,
}

impl ValueSource {
    /// Whether this source marks the value as a dispatch candidate.
    #[must_use]
    pub fn is_ui(self) -> bool {
        matches!(self, ValueSource::Ui)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_matches_variant() {
        assert_eq!(WidgetValue::Bool(true).kind(), ValueKind::Bool);
        assert_eq!(WidgetValue::Int(3).kind(), ValueKind::Int);
        assert_eq!(WidgetValue::Float(0.5).kind(), ValueKind::Float);
        assert_eq!(WidgetValue::Text("x".into()).kind(), ValueKind::Text);
        assert_eq!(
            WidgetValue::TextList(vec!["a".into()]).kind(),
            ValueKind::TextList
        );
        assert_eq!(WidgetValue::Bytes(vec![1]).kind(), ValueKind::Bytes);
        assert_eq!(WidgetValue::Json("{}".into()).kind(), ValueKind::Json);
        assert_eq!(WidgetValue::Trigger(true).kind(), ValueKind::Trigger);
    }

    #[test]
    fn trigger_predicates() {
        assert!(WidgetValue::neutral_trigger().is_trigger());
        assert!(WidgetValue::neutral_trigger().is_neutral_trigger());
        assert!(WidgetValue::fired_trigger().is_trigger());
        assert!(!WidgetValue::fired_trigger().is_neutral_trigger());
        assert!(!WidgetValue::Bool(false).is_trigger());
    }

    #[test]
    fn same_kind_different_value_is_compatible() {
        assert_eq!(WidgetValue::Int(1).kind(), WidgetValue::Int(2).kind());
        assert_ne!(WidgetValue::Int(1).kind(), WidgetValue::Bool(true).kind());
    }

    #[test]
    fn wire_form_is_adjacently_tagged() {
        let json = serde_json::to_string(&WidgetValue::Int(5)).unwrap();
        assert_eq!(json, r#"{"kind":"int","value":5}"#);

        let json = serde_json::to_string(&WidgetValue::Trigger(true)).unwrap();
        assert_eq!(json, r#"{"kind":"trigger","value":true}"#);
    }

    #[test]
    fn wire_round_trip() {
        let values = vec![
            WidgetValue::Bool(true),
            WidgetValue::Int(-42),
            WidgetValue::Float(1.25),
            WidgetValue::Text("Ada".into()),
            WidgetValue::TextList(vec!["a".into(), "b".into()]),
            WidgetValue::Bytes(vec![0, 1, 2]),
            WidgetValue::Json(r#"{"foo":5}"#.into()),
            WidgetValue::Trigger(false),
        ];
        for value in values {
            let json = serde_json::to_string(&value).unwrap();
            let back: WidgetValue = serde_json::from_str(&json).unwrap();
            assert_eq!(back, value, "round trip failed for {json}");
        }
    }

    #[test]
    fn source_dispatch_candidacy() {
        assert!(ValueSource::Ui.is_ui());
        assert!(!ValueSource::Backend.is_ui());
        assert!(!ValueSource::Default.is_ui());
    }
}
