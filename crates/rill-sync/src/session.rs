//! The session context: one object wiring store, forms, triggers, and
//! dispatch together.
//!
//! [`WidgetSession`] is the surface rendering components see. It is an
//! explicit context passed by reference wherever state access is needed,
//! deliberately not a module-level singleton, so every test (and every
//! concurrent session a host embeds) gets its own isolated instance.
//!
//! # Write routing
//!
//! ```text
//! set(id, v, Ui) ── form member? ──▶ FormManager (staged, no dispatch)
//!       │
//!       └─ otherwise ──▶ store + dispatcher (coalesced until flush)
//!
//! set_trigger_value(id, v) ──▶ store reset + dispatcher (own firing)
//! submit(form) ──▶ store + dispatcher (one message for the whole form)
//! ```
//!
//! A flush is expected once per processed batch of UI events; everything
//! between two flushes is one scheduling tick.

use crate::dispatch::{DispatchStats, FlushReport, RerunRequestDispatcher};
use crate::form::FormManager;
use crate::reconcile::{ReconcileOutcome, RunScope, reconcile};
use crate::store::{StoreStats, WidgetStateStore};
use crate::trigger::{TriggerPhase, TriggerValueHandler};
use rill_proto::{DeclarationSet, RerunPayload, ValueSource, WidgetDelta, WidgetValue};

use std::sync::{Arc, Mutex};

/// Collaborator contract consumed by the engine.
///
/// `send_rerun` hands an outgoing message to the transport; the engine
/// never awaits a result. `forms_data_changed` reports dirtiness
/// transitions so an enclosing control (e.g. a submit button) can react.
pub trait SessionSink: Send + Sync {
    /// Deliver one outgoing synchronization message. Fire-and-forget.
    fn send_rerun(&self, payload: RerunPayload);

    /// A form's dirtiness changed.
    fn forms_data_changed(&self, form_id: &str, dirty: bool);
}

/// A sink that drops everything. Useful for headless reconciliation.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl SessionSink for NullSink {
    fn send_rerun(&self, _payload: RerunPayload) {}
    fn forms_data_changed(&self, _form_id: &str, _dirty: bool) {}
}

/// A sink that records everything it receives, for tests.
#[derive(Debug, Default)]
pub struct RecordingSink {
    payloads: Mutex<Vec<RerunPayload>>,
    forms_events: Mutex<Vec<(String, bool)>>,
}

impl RecordingSink {
    /// Create an empty recording sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All payloads received so far, in order.
    #[must_use]
    pub fn payloads(&self) -> Vec<RerunPayload> {
        self.payloads.lock().expect("sink lock").clone()
    }

    /// All dirtiness notifications so far, in order.
    #[must_use]
    pub fn forms_events(&self) -> Vec<(String, bool)> {
        self.forms_events.lock().expect("sink lock").clone()
    }

    /// Drop recorded history.
    pub fn reset(&self) {
        self.payloads.lock().expect("sink lock").clear();
        self.forms_events.lock().expect("sink lock").clear();
    }
}

impl SessionSink for RecordingSink {
    fn send_rerun(&self, payload: RerunPayload) {
        self.payloads.lock().expect("sink lock").push(payload);
    }

    fn forms_data_changed(&self, form_id: &str, dirty: bool) {
        self.forms_events
            .lock()
            .expect("sink lock")
            .push((form_id.to_owned(), dirty));
    }
}

/// The widget state & rerun synchronization engine for one session.
pub struct WidgetSession {
    store: WidgetStateStore,
    forms: FormManager,
    triggers: TriggerValueHandler,
    dispatcher: RerunRequestDispatcher,
    sink: Arc<dyn SessionSink>,
}

impl WidgetSession {
    /// Create a session delivering to the given sink.
    #[must_use]
    pub fn new(sink: Arc<dyn SessionSink>) -> Self {
        Self {
            store: WidgetStateStore::new(),
            forms: FormManager::new(),
            triggers: TriggerValueHandler::new(),
            dispatcher: RerunRequestDispatcher::new(),
            sink,
        }
    }

    /// Create a session wired to a fresh [`RecordingSink`], returning both.
    #[must_use]
    pub fn recording() -> (Self, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::new());
        (Self::new(sink.clone()), sink)
    }

    /// The stored value, the declared default, or `None` for unknown ids.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&WidgetValue> {
        self.store.get(id)
    }

    /// Write a widget value.
    ///
    /// UI-sourced writes are dispatch candidates: form members stage in
    /// the form manager (withheld until submission), everything else lands
    /// in the store and the dispatch queue. Backend- and default-sourced
    /// writes only update the store. A UI-sourced trigger value is
    /// forwarded to [`set_trigger_value`](Self::set_trigger_value);
    /// triggers never participate in form withholding.
    pub fn set(&mut self, id: &str, value: WidgetValue, source: ValueSource) {
        if !source.is_ui() {
            self.store.set(id, value, source);
            return;
        }
        if value.is_trigger() {
            self.set_trigger_value(id, value, None);
            return;
        }
        if let Some(form_id) = self.forms.member_form(id).map(str::to_owned) {
            self.forms
                .record_change(&form_id, id, value, self.sink.as_ref());
            return;
        }
        self.store.set(id, value.clone(), ValueSource::Ui);
        self.dispatcher.enqueue_value(id, value);
    }

    /// Record a one-shot firing and schedule it for the next dispatch.
    ///
    /// The firing is captured into a pending batch and the stored value
    /// resets to neutral before this returns: one physical click, one
    /// delivered firing. `fragment_id` scopes the resulting rerun to a
    /// fragment. Ids without a declaration are tolerated (detached
    /// trigger) and still dispatch, since dropping them would lose user intent.
    pub fn set_trigger_value(&mut self, id: &str, value: WidgetValue, fragment_id: Option<&str>) {
        if !self.store.is_declared(id) {
            tracing::debug!(widget_id = %id, "detached trigger fired before declaration");
        }
        self.dispatcher.enqueue_trigger(id, value, fragment_id);
        self.triggers.arm(id);
        // Capture and reset are one step: the firing lives only in the
        // pending batch from here on.
        self.store
            .set(id, WidgetValue::neutral_trigger(), ValueSource::Ui);
        crate::debug_trace!("trigger fired: id={id} fragment={fragment_id:?}");
    }

    /// Add a widget to a form. Idempotent.
    pub fn register_member(&mut self, form_id: &str, widget_id: &str) {
        self.forms.register_member(form_id, widget_id);
    }

    /// Stage an unsubmitted value for a form member. No dispatch.
    pub fn record_change(&mut self, form_id: &str, widget_id: &str, value: WidgetValue) {
        self.forms
            .record_change(form_id, widget_id, value, self.sink.as_ref());
    }

    /// Submit a form: staged values land in the store as UI state and one
    /// dispatch batch carries the whole form, including the firings of its
    /// trigger members. Idempotent: a second submit with nothing staged
    /// dispatches only the triggers. Returns whether the form was known.
    pub fn submit(&mut self, form_id: &str) -> bool {
        let trigger_members: Vec<String> = self
            .forms
            .form(form_id)
            .map(|form| {
                form.member_ids()
                    .iter()
                    .filter(|id| {
                        self.store
                            .declaration(id)
                            .is_some_and(rill_proto::WidgetDeclaration::is_trigger)
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        let Some(staged) = self.forms.take_submission(form_id, self.sink.as_ref()) else {
            tracing::warn!(form_id = %form_id, "submit for unknown form ignored");
            return false;
        };

        for (id, value) in staged {
            self.store.set(id.clone(), value.clone(), ValueSource::Ui);
            self.dispatcher.enqueue_value(&id, value);
        }
        for id in trigger_members {
            self.dispatcher
                .enqueue_trigger(&id, WidgetValue::fired_trigger(), None);
            self.triggers.arm(&id);
            self.store
                .set(id, WidgetValue::neutral_trigger(), ValueSource::Ui);
        }
        true
    }

    /// Rebuild state for a new run from its full declaration set.
    pub fn begin_run(&mut self, declarations: DeclarationSet, scope: RunScope) -> ReconcileOutcome {
        reconcile(
            &mut self.store,
            &mut self.forms,
            &mut self.triggers,
            &mut self.dispatcher,
            declarations,
            scope,
            self.sink.as_ref(),
        )
    }

    /// Drain accumulated changes to the sink. Call once per processed
    /// batch of UI events.
    pub fn flush(&mut self) -> FlushReport {
        let report = self.dispatcher.flush(self.sink.as_ref());
        for id in &report.trigger_ids {
            self.triggers.mark_dispatched(id);
            self.triggers.settle(id);
        }
        report
    }

    /// Snapshot every materialized value as wire deltas, sorted by id.
    #[must_use]
    pub fn widget_states(&self) -> Vec<WidgetDelta> {
        self.store.widget_states()
    }

    /// The staged, unsubmitted value of a form member.
    #[must_use]
    pub fn pending_value(&self, form_id: &str, widget_id: &str) -> Option<&WidgetValue> {
        self.forms.pending_value(form_id, widget_id)
    }

    /// Whether a form has staged, unsubmitted changes.
    #[must_use]
    pub fn is_form_dirty(&self, form_id: &str) -> bool {
        self.forms.is_dirty(form_id)
    }

    /// Lifecycle phase of a trigger id.
    #[must_use]
    pub fn trigger_phase(&self, id: &str) -> TriggerPhase {
        self.triggers.phase(id)
    }

    /// Read-only access to the store.
    #[must_use]
    pub fn store(&self) -> &WidgetStateStore {
        &self.store
    }

    /// Store diagnostics.
    #[must_use]
    pub fn store_stats(&self) -> StoreStats {
        self.store.stats()
    }

    /// Dispatcher diagnostics.
    #[must_use]
    pub fn dispatch_stats(&self) -> DispatchStats {
        self.dispatcher.stats()
    }
}

impl std::fmt::Debug for WidgetSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WidgetSession")
            .field("store", &self.store.stats())
            .field("forms", &self.forms.len())
            .field("dispatch", &self.dispatcher.stats())
            .finish()
    }
}
