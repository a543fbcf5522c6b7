//! The authoritative widget value store.
//!
//! [`WidgetStateStore`] owns the mapping from widget id to current value and
//! provenance for one session. Rendering components never hold a reference
//! into the store; they read and write exclusively through its contract (in
//! practice through the session context, which layers form routing and
//! dispatch scheduling on top).
//!
//! # Design Invariants
//!
//! 1. **Single owner**: all mutation passes through [`set`](WidgetStateStore::set) /
//!    [`clear`](WidgetStateStore::clear). No component keeps a private copy of
//!    a widget's value across a scheduling tick.
//! 2. **Absent is not an error**: [`get`](WidgetStateStore::get) never fails.
//!    An id with neither stored state nor a declaration yields `None`.
//! 3. **Speculative writes are kept**: a UI write for an id with no current
//!    declaration is stored as-is; the declaration may arrive with the next
//!    run. Reconciliation decides its fate.
//!
//! # Failure Modes
//!
//! | Condition | Behavior |
//! |-----------|----------|
//! | `get` on unknown id | `None` (absent marker) |
//! | `get` on declared-but-unset id | declared default |
//! | `set` on undeclared id | stored speculatively |
//! | `clear` on unknown id | no-op, returns `None` |

use rill_proto::{DeclarationSet, ValueSource, WidgetDeclaration, WidgetDelta, WidgetValue};

use std::collections::HashMap;

/// One stored entry: the value and where it came from.
#[derive(Clone, Debug, PartialEq)]
pub struct WidgetState {
    /// Current value.
    pub value: WidgetValue,
    /// Provenance of the value.
    pub source: ValueSource,
}

/// Diagnostic snapshot of the store.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StoreStats {
    /// Number of stored entries.
    pub entries: usize,
    /// Number of declarations in the current run.
    pub declared: usize,
    /// Entries written by the UI for ids the current run never declared.
    pub speculative: usize,
}

/// Authoritative mapping from widget id to current value and semantic type.
#[derive(Debug, Default)]
pub struct WidgetStateStore {
    entries: HashMap<String, WidgetState>,
    declarations: DeclarationSet,
}

impl WidgetStateStore {
    /// Create an empty store with no declarations.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The stored value, the declared default, or the absent marker.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&WidgetValue> {
        if let Some(entry) = self.entries.get(id) {
            return Some(&entry.value);
        }
        self.declarations.get(id).map(|decl| &decl.default)
    }

    /// The full stored entry, if one exists.
    ///
    /// Unlike [`get`](Self::get) this does not fall back to the declared
    /// default; it reports only materialized state.
    #[must_use]
    pub fn entry(&self, id: &str) -> Option<&WidgetState> {
        self.entries.get(id)
    }

    /// Overwrite the value for `id`.
    pub fn set(&mut self, id: impl Into<String>, value: WidgetValue, source: ValueSource) {
        let id = id.into();
        if source.is_ui() && !self.declarations.contains(&id) {
            tracing::trace!(widget_id = %id, "speculative write for undeclared widget");
        }
        self.entries.insert(id, WidgetState { value, source });
    }

    /// Remove the entry for `id`, returning it if present.
    pub fn clear(&mut self, id: &str) -> Option<WidgetState> {
        self.entries.remove(id)
    }

    /// Whether the current run declares `id`.
    #[must_use]
    pub fn is_declared(&self, id: &str) -> bool {
        self.declarations.contains(id)
    }

    /// The current run's declaration for `id`.
    #[must_use]
    pub fn declaration(&self, id: &str) -> Option<&WidgetDeclaration> {
        self.declarations.get(id)
    }

    /// The current run's full declaration set.
    #[must_use]
    pub fn declarations(&self) -> &DeclarationSet {
        &self.declarations
    }

    /// Replace the declaration set. Called by the reconciler once per run.
    pub(crate) fn install_declarations(&mut self, declarations: DeclarationSet) {
        self.declarations = declarations;
    }

    /// Ids of all stored entries, unordered.
    #[must_use]
    pub fn entry_ids(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    /// Whether `id` was written by the UI without a backing declaration.
    #[must_use]
    pub fn is_speculative(&self, id: &str) -> bool {
        !self.declarations.contains(id)
            && self
                .entries
                .get(id)
                .is_some_and(|entry| entry.source.is_ui())
    }

    /// Snapshot every materialized value as wire deltas, sorted by id.
    ///
    /// Triggers at rest are skipped: a neutral trigger carries no
    /// information the backend does not already have.
    #[must_use]
    pub fn widget_states(&self) -> Vec<WidgetDelta> {
        let mut ids: Vec<&String> = self.entries.keys().collect();
        ids.sort();
        ids.into_iter()
            .filter_map(|id| {
                let entry = &self.entries[id];
                if entry.value.is_neutral_trigger() {
                    return None;
                }
                Some(WidgetDelta::new(id.clone(), entry.value.clone()))
            })
            .collect()
    }

    /// Number of stored entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no entries are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Diagnostic snapshot.
    #[must_use]
    pub fn stats(&self) -> StoreStats {
        let speculative = self
            .entries
            .iter()
            .filter(|(id, entry)| entry.source.is_ui() && !self.declarations.contains(id))
            .count();
        StoreStats {
            entries: self.entries.len(),
            declared: self.declarations.len(),
            speculative,
        }
    }
}
