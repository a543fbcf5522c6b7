#![forbid(unsafe_code)]

//! rill: widget state & rerun synchronization for script-driven UIs.
//!
//! This facade re-exports the public surface of the rill crates:
//!
//! - [`rill_proto`] - declarations, the value union, wire payloads
//! - [`rill_sync`] - the session engine (store, triggers, forms, dispatch)
//!
//! Most hosts only need the [`prelude`].
//!
//! # Example
//!
//! ```
//! use rill::prelude::*;
//!
//! let (mut session, sink) = WidgetSession::recording();
//!
//! let declarations = DeclarationSet::new(vec![
//!     WidgetDeclaration::new("count", WidgetValue::Int(0)),
//! ])
//! .unwrap();
//! session.begin_run(declarations, RunScope::Full);
//!
//! session.set("count", WidgetValue::Int(2), ValueSource::Ui);
//! session.flush();
//!
//! assert_eq!(sink.payloads().len(), 1);
//! ```

pub use rill_proto as proto;
pub use rill_sync as sync;

pub use rill_proto::{
    DeclarationError, DeclarationSet, RerunPayload, ValueKind, ValueSource, WidgetDeclaration,
    WidgetDelta, WidgetValue,
};
pub use rill_sync::{
    DispatchStats, FlushReport, FormManager, NullSink, ReconcileOutcome, RecordingSink,
    RerunRequestDispatcher, RunScope, SessionSink, StoreStats, TriggerPhase, WidgetSession,
    WidgetStateStore,
};

/// Everything a host typically needs.
pub mod prelude {
    pub use rill_proto::{
        DeclarationSet, RerunPayload, ValueKind, ValueSource, WidgetDeclaration, WidgetDelta,
        WidgetValue,
    };
    pub use rill_sync::{
        NullSink, RecordingSink, RunScope, SessionSink, TriggerPhase, WidgetSession,
    };
}
