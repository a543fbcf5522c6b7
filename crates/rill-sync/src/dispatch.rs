//! Outgoing message coalescing and flush.
//!
//! The dispatcher is an explicit scheduling queue, independent of any
//! concurrency primitive: writes accumulate into **batches**, and a single
//! [`flush`](RerunRequestDispatcher::flush), invoked once per processed
//! batch of UI events, drains every batch to the sink in order. The same
//! policy works under threads+channels, an actor mailbox, or a
//! single-threaded task queue.
//!
//! # Coalescing policy
//!
//! - **Latest-wins per id**: repeated value writes within one batch merge;
//!   the final value is never dropped, intermediates may be.
//! - **Firings never merge**: a second firing of an already-captured
//!   trigger seals the open batch and starts a new one, so each distinct
//!   firing reaches the backend as its own message.
//! - **One fragment per batch**: a batch is tagged with at most one
//!   fragment id, fixed at creation. A write carrying a different tag
//!   (including no tag) seals the open batch; only ids scoped to the
//!   batch's fragment ever share its message.
//!
//! # Failure Modes
//!
//! | Condition | Behavior |
//! |-----------|----------|
//! | Flush with nothing pending | no sink call |
//! | Discard of a captured firing | refused; firings always deliver |
//! | Sink panics or blocks | the sink's problem; dispatch is handoff only |

use crate::session::SessionSink;
use rill_proto::{RerunPayload, WidgetDelta, WidgetValue};

use std::collections::{HashMap, HashSet, VecDeque};

/// One pending outgoing message under construction.
#[derive(Debug, Default)]
struct Batch {
    /// First-write order of ids.
    order: Vec<String>,
    /// Latest value per id.
    deltas: HashMap<String, WidgetValue>,
    /// Ids whose delta is a captured trigger firing.
    trigger_ids: HashSet<String>,
    /// Fragment tag, fixed at batch creation.
    fragment_id: Option<String>,
}

impl Batch {
    fn with_fragment(fragment_id: Option<String>) -> Self {
        Self {
            fragment_id,
            ..Self::default()
        }
    }

    fn merge(&mut self, id: &str, value: WidgetValue) {
        if !self.deltas.contains_key(id) {
            self.order.push(id.to_owned());
        }
        self.deltas.insert(id.to_owned(), value);
    }

    fn remove(&mut self, id: &str) {
        if self.deltas.remove(id).is_some() {
            self.order.retain(|existing| existing != id);
        }
    }

    fn is_empty(&self) -> bool {
        self.deltas.is_empty()
    }

    fn into_payload(mut self) -> RerunPayload {
        let deltas = self
            .order
            .iter()
            .filter_map(|id| {
                self.deltas
                    .remove(id)
                    .map(|value| WidgetDelta::new(id.clone(), value))
            })
            .collect();
        RerunPayload {
            deltas,
            fragment_id: self.fragment_id,
        }
    }
}

/// Result of one flush.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FlushReport {
    /// Messages handed to the sink.
    pub messages: usize,
    /// Total deltas across those messages.
    pub deltas: usize,
    /// Trigger ids delivered, in dispatch order.
    pub trigger_ids: Vec<String>,
}

/// Diagnostic snapshot of the dispatcher.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DispatchStats {
    /// Batches queued, including the open one.
    pub queued_batches: usize,
    /// Deltas pending across all queued batches.
    pub pending_deltas: usize,
    /// Messages flushed over the dispatcher's lifetime.
    pub flushed_messages: u64,
    /// Deltas flushed over the dispatcher's lifetime.
    pub flushed_deltas: u64,
}

/// Coalesces state changes into outgoing messages and hands them to the sink.
#[derive(Debug, Default)]
pub struct RerunRequestDispatcher {
    queue: VecDeque<Batch>,
    flushed_messages: u64,
    flushed_deltas: u64,
}

impl RerunRequestDispatcher {
    /// Create an empty dispatcher.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a value change. Merges into the open untagged batch,
    /// last-write-wins per id.
    pub fn enqueue_value(&mut self, id: &str, value: WidgetValue) {
        self.open_batch(None, None).merge(id, value);
    }

    /// Queue a trigger firing, optionally scoping the message to a fragment.
    ///
    /// A firing never merges with a previously captured firing of the same
    /// id; that seals the open batch and starts a new one.
    pub fn enqueue_trigger(&mut self, id: &str, value: WidgetValue, fragment_id: Option<&str>) {
        let batch = self.open_batch(fragment_id, Some(id));
        batch.merge(id, value);
        batch.trigger_ids.insert(id.to_owned());
    }

    /// Drop pending value deltas for `id` from every queued batch.
    ///
    /// Captured firings are exempt: a trigger that fired represents user
    /// intent and always delivers, even for ids no longer declared.
    pub fn discard(&mut self, id: &str) {
        for batch in &mut self.queue {
            if !batch.trigger_ids.contains(id) {
                batch.remove(id);
            }
        }
        self.queue.retain(|batch| !batch.is_empty());
    }

    /// Ids with any pending delta.
    #[must_use]
    pub fn pending_ids(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut ids = Vec::new();
        for batch in &self.queue {
            for id in &batch.order {
                if seen.insert(id.clone()) {
                    ids.push(id.clone());
                }
            }
        }
        ids
    }

    /// Whether `id` has a pending delta.
    #[must_use]
    pub fn has_pending(&self, id: &str) -> bool {
        self.queue.iter().any(|batch| batch.deltas.contains_key(id))
    }

    /// Drain every batch to the sink, in order. Fire-and-forget: no retry,
    /// no blocking on the transport beyond the sink call itself.
    pub fn flush(&mut self, sink: &dyn SessionSink) -> FlushReport {
        let mut report = FlushReport::default();
        while let Some(batch) = self.queue.pop_front() {
            if batch.is_empty() {
                continue;
            }
            let mut trigger_ids: Vec<String> = batch
                .order
                .iter()
                .filter(|id| batch.trigger_ids.contains(id.as_str()))
                .cloned()
                .collect();
            let payload = batch.into_payload();

            crate::debug_trace!(
                "dispatch flush: deltas={} fragment={:?}",
                payload.len(),
                payload.fragment_id
            );
            tracing::debug!(
                deltas = payload.len(),
                fragment = ?payload.fragment_id,
                "sending rerun payload"
            );

            report.messages += 1;
            report.deltas += payload.len();
            report.trigger_ids.append(&mut trigger_ids);
            self.flushed_messages += 1;
            self.flushed_deltas += payload.len() as u64;
            sink.send_rerun(payload);
        }
        report
    }

    /// Diagnostic snapshot.
    #[must_use]
    pub fn stats(&self) -> DispatchStats {
        DispatchStats {
            queued_batches: self.queue.len(),
            pending_deltas: self.queue.iter().map(|b| b.deltas.len()).sum(),
            flushed_messages: self.flushed_messages,
            flushed_deltas: self.flushed_deltas,
        }
    }

    /// The open batch compatible with `fragment_id` (and, for triggers,
    /// not already carrying a firing of `trigger_id`), sealing and opening
    /// as needed.
    fn open_batch(&mut self, fragment_id: Option<&str>, trigger_id: Option<&str>) -> &mut Batch {
        let compatible = self.queue.back().is_some_and(|batch| {
            batch.fragment_id.as_deref() == fragment_id
                && trigger_id.is_none_or(|id| !batch.trigger_ids.contains(id))
        });
        if !compatible {
            self.queue
                .push_back(Batch::with_fragment(fragment_id.map(str::to_owned)));
        }
        self.queue.back_mut().expect("batch just ensured")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::RecordingSink;

    #[test]
    fn values_coalesce_last_write_wins() {
        let mut dispatcher = RerunRequestDispatcher::new();
        let sink = RecordingSink::new();

        dispatcher.enqueue_value("count", WidgetValue::Int(1));
        dispatcher.enqueue_value("count", WidgetValue::Int(2));
        let report = dispatcher.flush(&sink);

        assert_eq!(report.messages, 1);
        assert_eq!(report.deltas, 1);
        let payloads = sink.payloads();
        assert_eq!(payloads[0].delta("count"), Some(&WidgetValue::Int(2)));
    }

    #[test]
    fn distinct_ids_share_one_message() {
        let mut dispatcher = RerunRequestDispatcher::new();
        let sink = RecordingSink::new();

        dispatcher.enqueue_value("a", WidgetValue::Int(1));
        dispatcher.enqueue_value("b", WidgetValue::Int(2));
        let report = dispatcher.flush(&sink);

        assert_eq!(report.messages, 1);
        let payload = &sink.payloads()[0];
        let ids: Vec<&str> = payload.deltas.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"], "first-write order preserved");
    }

    #[test]
    fn repeated_trigger_firings_never_merge() {
        let mut dispatcher = RerunRequestDispatcher::new();
        let sink = RecordingSink::new();

        dispatcher.enqueue_trigger("btn", WidgetValue::fired_trigger(), None);
        dispatcher.enqueue_trigger("btn", WidgetValue::fired_trigger(), None);
        let report = dispatcher.flush(&sink);

        assert_eq!(report.messages, 2, "each firing is its own message");
        assert_eq!(report.trigger_ids, vec!["btn", "btn"]);
    }

    #[test]
    fn trigger_and_values_share_a_batch() {
        let mut dispatcher = RerunRequestDispatcher::new();
        let sink = RecordingSink::new();

        dispatcher.enqueue_value("name", WidgetValue::Text("Ada".into()));
        dispatcher.enqueue_trigger("submit", WidgetValue::fired_trigger(), None);
        let report = dispatcher.flush(&sink);

        assert_eq!(report.messages, 1);
        let payload = &sink.payloads()[0];
        assert_eq!(payload.len(), 2);
        assert_eq!(payload.delta("name"), Some(&WidgetValue::Text("Ada".into())));
        assert_eq!(payload.delta("submit"), Some(&WidgetValue::fired_trigger()));
    }

    #[test]
    fn fragment_tag_seals_batches() {
        let mut dispatcher = RerunRequestDispatcher::new();
        let sink = RecordingSink::new();

        dispatcher.enqueue_value("outside", WidgetValue::Int(1));
        dispatcher.enqueue_trigger("frag_btn", WidgetValue::fired_trigger(), Some("frag-a"));
        dispatcher.enqueue_value("later", WidgetValue::Int(2));
        dispatcher.flush(&sink);

        let payloads = sink.payloads();
        assert_eq!(payloads.len(), 3);
        assert_eq!(payloads[0].fragment_id, None);
        assert_eq!(payloads[1].fragment_id.as_deref(), Some("frag-a"));
        assert_eq!(payloads[1].len(), 1, "fragment message carries only scoped ids");
        assert_eq!(payloads[2].fragment_id, None);
    }

    #[test]
    fn same_fragment_triggers_of_distinct_ids_share_a_message() {
        let mut dispatcher = RerunRequestDispatcher::new();
        let sink = RecordingSink::new();

        dispatcher.enqueue_trigger("a", WidgetValue::fired_trigger(), Some("frag"));
        dispatcher.enqueue_trigger("b", WidgetValue::fired_trigger(), Some("frag"));
        let report = dispatcher.flush(&sink);

        assert_eq!(report.messages, 1);
        assert_eq!(report.trigger_ids, vec!["a", "b"]);
    }

    #[test]
    fn discard_drops_values_but_not_firings() {
        let mut dispatcher = RerunRequestDispatcher::new();
        let sink = RecordingSink::new();

        dispatcher.enqueue_value("gone", WidgetValue::Int(1));
        dispatcher.enqueue_trigger("btn", WidgetValue::fired_trigger(), None);
        dispatcher.discard("gone");
        dispatcher.discard("btn");
        let report = dispatcher.flush(&sink);

        assert_eq!(report.messages, 1);
        let payload = &sink.payloads()[0];
        assert!(payload.delta("gone").is_none());
        assert_eq!(payload.delta("btn"), Some(&WidgetValue::fired_trigger()));
    }

    #[test]
    fn discard_prunes_emptied_batches() {
        let mut dispatcher = RerunRequestDispatcher::new();
        dispatcher.enqueue_value("only", WidgetValue::Int(1));
        dispatcher.discard("only");

        assert_eq!(dispatcher.stats().queued_batches, 0);
        let sink = RecordingSink::new();
        let report = dispatcher.flush(&sink);
        assert_eq!(report.messages, 0);
        assert!(sink.payloads().is_empty());
    }

    #[test]
    fn flush_with_nothing_pending_is_silent() {
        let mut dispatcher = RerunRequestDispatcher::new();
        let sink = RecordingSink::new();
        let report = dispatcher.flush(&sink);

        assert_eq!(report, FlushReport::default());
        assert!(sink.payloads().is_empty());
    }

    #[test]
    fn pending_ids_and_has_pending() {
        let mut dispatcher = RerunRequestDispatcher::new();
        dispatcher.enqueue_value("a", WidgetValue::Int(1));
        dispatcher.enqueue_trigger("t", WidgetValue::fired_trigger(), Some("f"));

        assert!(dispatcher.has_pending("a"));
        assert!(dispatcher.has_pending("t"));
        assert!(!dispatcher.has_pending("x"));
        assert_eq!(dispatcher.pending_ids(), vec!["a", "t"]);
    }

    #[test]
    fn stats_track_lifetime_counts() {
        let mut dispatcher = RerunRequestDispatcher::new();
        let sink = RecordingSink::new();

        dispatcher.enqueue_value("a", WidgetValue::Int(1));
        dispatcher.enqueue_value("b", WidgetValue::Int(2));
        dispatcher.flush(&sink);
        dispatcher.enqueue_value("a", WidgetValue::Int(3));
        dispatcher.flush(&sink);

        let stats = dispatcher.stats();
        assert_eq!(stats.queued_batches, 0);
        assert_eq!(stats.pending_deltas, 0);
        assert_eq!(stats.flushed_messages, 2);
        assert_eq!(stats.flushed_deltas, 3);
    }
}
