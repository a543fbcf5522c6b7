//! Widget declarations as handed over by the backend, one full set per run.
//!
//! A [`WidgetDeclaration`] is immutable: the backend re-declares the entire
//! UI from scratch on every run, and the engine reconciles its stored state
//! against the fresh set. The declared value kind is derived from the
//! default value's tag: a declaration cannot promise one type and default
//! to another.
//!
//! # Design Invariants
//!
//! 1. **Id uniqueness**: within one run, every declaration id is unique.
//!    [`DeclarationSet::new`] rejects duplicates; a backend that emits two
//!    widgets with one id has a bug the engine refuses to paper over.
//! 2. **At most one form**: a declaration names at most one `form_id`.
//! 3. **Immutability**: a set, once built, is read-only for the run.

use crate::value::{ValueKind, WidgetValue};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// One widget as declared by the backend for the current run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WidgetDeclaration {
    /// Stable identifier, unique within a run.
    pub id: String,
    /// Seed value when no retained state applies. Its tag is the declared kind.
    pub default: WidgetValue,
    /// Form this widget belongs to, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form_id: Option<String>,
    /// Fragment this widget is scoped to, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fragment_id: Option<String>,
    /// Whether the widget is currently interactive.
    #[serde(default)]
    pub disabled: bool,
    /// Character limit for text-like widgets.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_chars: Option<u32>,
}

impl WidgetDeclaration {
    /// Create a declaration with the given id and default value.
    #[must_use]
    pub fn new(id: impl Into<String>, default: WidgetValue) -> Self {
        Self {
            id: id.into(),
            default,
            form_id: None,
            fragment_id: None,
            disabled: false,
            max_chars: None,
        }
    }

    /// Attach a form membership.
    #[must_use]
    pub fn with_form(mut self, form_id: impl Into<String>) -> Self {
        self.form_id = Some(form_id.into());
        self
    }

    /// Scope the widget to a fragment.
    #[must_use]
    pub fn with_fragment(mut self, fragment_id: impl Into<String>) -> Self {
        self.fragment_id = Some(fragment_id.into());
        self
    }

    /// Mark the widget disabled.
    #[must_use]
    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }

    /// Set a character limit.
    #[must_use]
    pub fn with_max_chars(mut self, limit: u32) -> Self {
        self.max_chars = Some(limit);
        self
    }

    /// The declared value kind.
    #[must_use]
    pub fn kind(&self) -> ValueKind {
        self.default.kind()
    }

    /// Whether this declares a trigger widget.
    #[must_use]
    pub fn is_trigger(&self) -> bool {
        self.kind() == ValueKind::Trigger
    }
}

/// Error building a declaration set.
#[derive(Debug)]
pub enum DeclarationError {
    /// Two declarations in one run share an id.
    DuplicateId(String),
}

impl fmt::Display for DeclarationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeclarationError::DuplicateId(id) => {
                write!(f, "duplicate widget id in declaration set: {id}")
            }
        }
    }
}

impl std::error::Error for DeclarationError {}

/// The full widget declaration set for one run, keyed by id.
///
/// Iteration order is the backend's declaration order.
#[derive(Clone, Debug, Default)]
pub struct DeclarationSet {
    declarations: Vec<WidgetDeclaration>,
    index: HashMap<String, usize>,
}

impl DeclarationSet {
    /// Build a set, rejecting duplicate ids.
    pub fn new(declarations: Vec<WidgetDeclaration>) -> Result<Self, DeclarationError> {
        let mut index = HashMap::with_capacity(declarations.len());
        for (pos, decl) in declarations.iter().enumerate() {
            if index.insert(decl.id.clone(), pos).is_some() {
                return Err(DeclarationError::DuplicateId(decl.id.clone()));
            }
        }
        Ok(Self {
            declarations,
            index,
        })
    }

    /// An empty set (a run that declared no widgets).
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Look up a declaration by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&WidgetDeclaration> {
        self.index.get(id).map(|&pos| &self.declarations[pos])
    }

    /// Whether the set declares the given id.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Iterate declarations in backend order.
    pub fn iter(&self) -> impl Iterator<Item = &WidgetDeclaration> {
        self.declarations.iter()
    }

    /// Number of declarations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    /// Whether the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }
}

impl<'a> IntoIterator for &'a DeclarationSet {
    type Item = &'a WidgetDeclaration;
    type IntoIter = std::slice::Iter<'a, WidgetDeclaration>;

    fn into_iter(self) -> Self::IntoIter {
        self.declarations.iter()
    }
}
