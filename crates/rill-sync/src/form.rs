//! Form batching: values withheld until explicit submission.
//!
//! A form groups widget ids whose UI writes are staged here instead of
//! dispatching. The enclosing app learns about staged-but-unsubmitted edits
//! through the `forms_data_changed` notification, which fires exactly once
//! per dirtiness transition (so a submit control can enable itself without
//! being spammed on every keystroke).
//!
//! Form records have an implicit lifecycle: the first membership
//! registration creates one, and the reconciler destroys records no
//! declaration references anymore.

use crate::session::SessionSink;
use rill_proto::WidgetValue;

use std::collections::{BTreeSet, HashMap};

/// One form: members, staged values, dirtiness.
#[derive(Debug, Default)]
pub struct FormRecord {
    member_ids: BTreeSet<String>,
    pending: HashMap<String, WidgetValue>,
    dirty: bool,
}

impl FormRecord {
    /// Widget ids belonging to this form.
    #[must_use]
    pub fn member_ids(&self) -> &BTreeSet<String> {
        &self.member_ids
    }

    /// Whether any member value is staged and unsubmitted.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }
}

/// Groups widgets under form ids and tracks per-form staging state.
#[derive(Debug, Default)]
pub struct FormManager {
    forms: HashMap<String, FormRecord>,
    membership: HashMap<String, String>,
}

impl FormManager {
    /// Create an empty manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `widget_id` to `form_id`, creating the form if needed. Idempotent.
    ///
    /// A widget belongs to at most one form; re-registering under a
    /// different form moves it.
    pub fn register_member(&mut self, form_id: impl Into<String>, widget_id: impl Into<String>) {
        let form_id = form_id.into();
        let widget_id = widget_id.into();

        if let Some(previous) = self.membership.get(&widget_id) {
            if *previous == form_id {
                return;
            }
            tracing::warn!(
                widget_id = %widget_id,
                from = %previous,
                to = %form_id,
                "widget moved between forms"
            );
            let previous = previous.clone();
            self.evict_member(&previous, &widget_id);
        }

        self.forms
            .entry(form_id.clone())
            .or_default()
            .member_ids
            .insert(widget_id.clone());
        self.membership.insert(widget_id, form_id);
    }

    /// The form `widget_id` belongs to, if any.
    #[must_use]
    pub fn member_form(&self, widget_id: &str) -> Option<&str> {
        self.membership.get(widget_id).map(String::as_str)
    }

    /// Stage an unsubmitted value for a member and mark the form dirty.
    ///
    /// Notifies the sink exactly once per false→true dirtiness transition.
    /// Never dispatches.
    pub fn record_change(
        &mut self,
        form_id: &str,
        widget_id: &str,
        value: WidgetValue,
        sink: &dyn SessionSink,
    ) {
        self.register_member(form_id, widget_id);
        let form = self.forms.get_mut(form_id).expect("registered above");
        form.pending.insert(widget_id.to_owned(), value);
        if !form.dirty {
            form.dirty = true;
            tracing::debug!(form_id = %form_id, "form became dirty");
            sink.forms_data_changed(form_id, true);
        }
    }

    /// Atomically take every staged value for submission, clearing
    /// dirtiness (with its true→false notification).
    ///
    /// Returns `None` for an unknown form. A known form with nothing
    /// staged returns an empty list: submission is idempotent, and the
    /// caller still fires the form's trigger.
    pub fn take_submission(
        &mut self,
        form_id: &str,
        sink: &dyn SessionSink,
    ) -> Option<Vec<(String, WidgetValue)>> {
        let form = self.forms.get_mut(form_id)?;
        let mut staged: Vec<(String, WidgetValue)> = form.pending.drain().collect();
        staged.sort_by(|a, b| a.0.cmp(&b.0));
        if form.dirty {
            form.dirty = false;
            tracing::debug!(form_id = %form_id, staged = staged.len(), "form submitted");
            sink.forms_data_changed(form_id, false);
        }
        Some(staged)
    }

    /// The staged, unsubmitted value of a member.
    #[must_use]
    pub fn pending_value(&self, form_id: &str, widget_id: &str) -> Option<&WidgetValue> {
        self.forms.get(form_id)?.pending.get(widget_id)
    }

    /// Whether the form exists.
    #[must_use]
    pub fn contains(&self, form_id: &str) -> bool {
        self.forms.contains_key(form_id)
    }

    /// Whether the form has staged, unsubmitted changes.
    #[must_use]
    pub fn is_dirty(&self, form_id: &str) -> bool {
        self.forms.get(form_id).is_some_and(FormRecord::is_dirty)
    }

    /// The record for a form.
    #[must_use]
    pub fn form(&self, form_id: &str) -> Option<&FormRecord> {
        self.forms.get(form_id)
    }

    /// Number of live forms.
    #[must_use]
    pub fn len(&self) -> usize {
        self.forms.len()
    }

    /// Whether no forms exist.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.forms.is_empty()
    }

    /// Remove a widget from a form; destroys the form if emptied.
    pub(crate) fn evict_member(&mut self, form_id: &str, widget_id: &str) {
        if let Some(form) = self.forms.get_mut(form_id) {
            form.member_ids.remove(widget_id);
            form.pending.remove(widget_id);
            if form.member_ids.is_empty() {
                self.forms.remove(form_id);
            }
        }
        self.membership.remove(widget_id);
    }

    /// Replace all form records from a fresh membership listing.
    ///
    /// A form whose member set is unchanged carries its dirtiness and
    /// staged values over; any membership change resets the form to clean
    /// (a deliberate policy: never risk submitting a half-staged form).
    /// Dirty forms that end up reset or destroyed notify the sink of the
    /// true→false transition.
    pub(crate) fn rebuild(
        &mut self,
        memberships: impl IntoIterator<Item = (String, String)>,
        sink: &dyn SessionSink,
    ) {
        let mut next_forms: HashMap<String, FormRecord> = HashMap::new();
        let mut next_membership: HashMap<String, String> = HashMap::new();
        for (form_id, widget_id) in memberships {
            next_forms
                .entry(form_id.clone())
                .or_default()
                .member_ids
                .insert(widget_id.clone());
            next_membership.insert(widget_id, form_id);
        }

        for (form_id, record) in std::mem::take(&mut self.forms) {
            match next_forms.get_mut(&form_id) {
                Some(next) if next.member_ids == record.member_ids => {
                    next.pending = record.pending;
                    next.dirty = record.dirty;
                }
                Some(_) => {
                    if record.dirty {
                        tracing::debug!(form_id = %form_id, "member set changed, form reset to clean");
                        sink.forms_data_changed(&form_id, false);
                    }
                }
                None => {
                    if record.dirty {
                        tracing::debug!(form_id = %form_id, "form destroyed while dirty");
                        sink.forms_data_changed(&form_id, false);
                    }
                }
            }
        }

        self.forms = next_forms;
        self.membership = next_membership;
    }
}
