//! Merging a previous run's state with a new run's declarations.
//!
//! The backend re-declares the whole UI on every run; the engine keeps what
//! it can. Reconciliation walks the new declaration set against the stored
//! state from the previous run:
//!
//! 1. an id re-declared with a matching value kind **retains** its stored
//!    value, preserving in-flight user edits that have not round-tripped;
//! 2. a kind mismatch or a fresh id **reseeds** from the declaration
//!    default (mismatches are recoverable, never surfaced to the user);
//! 3. stored ids the new run no longer declares are **dropped**, except
//!    that a fragment run only evicts widgets scoped to one of its active
//!    fragments; everything outside the fragment keeps its state;
//! 4. pending (unflushed) value deltas for ids that are gone are
//!    discarded; captured trigger firings still deliver;
//! 5. form records are rebuilt, carrying dirtiness only for forms whose
//!    member set is unchanged.
//!
//! # Invariants
//!
//! - Reconciliation never dispatches. The only externally visible calls
//!   are `forms_data_changed` notifications for forms reset or destroyed
//!   while dirty.
//! - After reconciliation, every stored id is declared by the new run or
//!   survived an out-of-scope fragment exemption.

use crate::dispatch::RerunRequestDispatcher;
use crate::form::FormManager;
use crate::session::SessionSink;
use crate::store::WidgetStateStore;
use crate::trigger::TriggerValueHandler;
use rill_proto::{DeclarationSet, ValueSource};

use std::collections::HashSet;

/// What part of the UI a run re-executed.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum RunScope {
    /// The whole script ran; the declaration set is the whole UI.
    Full,
    /// Only the named fragments ran; widgets outside them are untouched.
    Fragments(HashSet<String>),
}

impl RunScope {
    /// Build a fragment scope from fragment ids.
    #[must_use]
    pub fn fragments<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        RunScope::Fragments(ids.into_iter().map(Into::into).collect())
    }

    /// Whether this is a full run.
    #[must_use]
    pub fn is_full(&self) -> bool {
        matches!(self, RunScope::Full)
    }
}

/// What one reconciliation did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReconcileOutcome {
    /// Ids whose stored value survived.
    pub retained: usize,
    /// Ids seeded from a declaration default (fresh or after a mismatch).
    pub reseeded: usize,
    /// Stored ids evicted.
    pub dropped: usize,
    /// Retained-id type conflicts resolved by reseeding.
    pub kind_mismatches: usize,
    /// Retained ids whose stored value differs from the new default,
    /// in declaration order.
    pub changed_ids: Vec<String>,
}

enum Seed {
    Retain { changed: bool },
    Reseed { mismatch: bool },
}

/// Rebuild the session's state for a new run. See the module docs for the
/// exact policy.
pub(crate) fn reconcile(
    store: &mut WidgetStateStore,
    forms: &mut FormManager,
    triggers: &mut TriggerValueHandler,
    dispatcher: &mut RerunRequestDispatcher,
    declarations: DeclarationSet,
    scope: RunScope,
    sink: &dyn SessionSink,
) -> ReconcileOutcome {
    let previous = store.declarations().clone();
    let mut outcome = ReconcileOutcome::default();

    // Retain matching values, reseed the rest.
    for decl in &declarations {
        let decision = match store.entry(&decl.id) {
            Some(entry) if entry.value.kind() == decl.kind() => Seed::Retain {
                changed: entry.value != decl.default,
            },
            Some(entry) => {
                tracing::debug!(
                    widget_id = %decl.id,
                    stored = %entry.value.kind(),
                    declared = %decl.kind(),
                    "kind mismatch, reseeding from declaration default"
                );
                Seed::Reseed { mismatch: true }
            }
            None => Seed::Reseed { mismatch: false },
        };
        match decision {
            Seed::Retain { changed } => {
                outcome.retained += 1;
                if changed {
                    outcome.changed_ids.push(decl.id.clone());
                }
            }
            Seed::Reseed { mismatch } => {
                outcome.reseeded += 1;
                if mismatch {
                    outcome.kind_mismatches += 1;
                }
                store.set(decl.id.clone(), decl.default.clone(), ValueSource::Default);
            }
        }
    }

    // Evict stale state, honoring fragment exemptions.
    let mut evicted: HashSet<String> = HashSet::new();
    for id in store.entry_ids() {
        if declarations.contains(&id) {
            continue;
        }
        let evict = match &scope {
            RunScope::Full => true,
            RunScope::Fragments(active) => previous
                .get(&id)
                .and_then(|decl| decl.fragment_id.as_deref())
                .is_some_and(|fragment| active.contains(fragment)),
        };
        if evict {
            store.clear(&id);
            evicted.insert(id);
            outcome.dropped += 1;
        }
    }

    // Cancel pending value deltas for ids that are gone. Captured trigger
    // firings survive the discard.
    for id in dispatcher.pending_ids() {
        if declarations.contains(&id) {
            continue;
        }
        let cancel = scope.is_full() || evicted.contains(&id);
        if cancel {
            dispatcher.discard(&id);
        }
    }

    // Rebuild forms: new declarations plus, in fragment runs, memberships
    // of out-of-scope widgets that kept their state.
    let mut memberships: Vec<(String, String)> = Vec::new();
    if let RunScope::Fragments(active) = &scope {
        for decl in &previous {
            if declarations.contains(&decl.id) {
                continue;
            }
            let in_active = decl
                .fragment_id
                .as_deref()
                .is_some_and(|fragment| active.contains(fragment));
            if in_active {
                continue;
            }
            if let Some(form_id) = &decl.form_id {
                memberships.push((form_id.clone(), decl.id.clone()));
            }
        }
    }
    for decl in &declarations {
        if let Some(form_id) = &decl.form_id {
            memberships.push((form_id.clone(), decl.id.clone()));
        }
    }
    forms.rebuild(memberships, sink);

    // A fragment run re-declares only its fragments; declarations of
    // surviving out-of-scope widgets carry over so defaults, form and
    // fragment tags stay known for later runs.
    let installed = match &scope {
        RunScope::Full => declarations,
        RunScope::Fragments(_) => {
            let mut merged: Vec<_> = declarations.iter().cloned().collect();
            merged.extend(
                previous
                    .iter()
                    .filter(|decl| !declarations.contains(&decl.id) && !evicted.contains(&decl.id))
                    .cloned(),
            );
            DeclarationSet::new(merged).expect("merged ids are disjoint by construction")
        }
    };

    // Phase bookkeeping for triggers no surviving declaration knows. Armed
    // entries survive; their firing is still queued.
    triggers.sweep(|id| installed.contains(id));

    store.install_declarations(installed);

    crate::debug_trace!(
        "reconcile: retained={} reseeded={} dropped={} mismatches={}",
        outcome.retained,
        outcome.reseeded,
        outcome.dropped,
        outcome.kind_mismatches
    );
    tracing::debug!(
        retained = outcome.retained,
        reseeded = outcome.reseeded,
        dropped = outcome.dropped,
        kind_mismatches = outcome.kind_mismatches,
        changed = outcome.changed_ids.len(),
        "run reconciled"
    );

    outcome
}
