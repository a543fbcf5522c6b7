#![forbid(unsafe_code)]

//! rill Sync Engine
//!
//! This crate is the stateful core of rill: it keeps widget values
//! consistent with a backend that re-executes a host script and
//! re-declares the UI from scratch on every run.
//!
//! # Key Components
//!
//! - [`WidgetSession`] - the context object rendering components talk to
//! - [`WidgetStateStore`] - authoritative id → value mapping
//! - [`TriggerValueHandler`] - one-shot firing lifecycle
//! - [`FormManager`] - value batching withheld until submission
//! - [`RerunRequestDispatcher`] - coalescing and flush of outgoing messages
//! - [`SessionSink`] - the collaborator contract (transport + form signals)
//! - `reconcile` (via [`WidgetSession::begin_run`]) - merges a previous
//!   run's state with a new run's declarations
//!
//! # Role in rill
//! `rill-sync` sits between rendering components (which call [`WidgetSession`]
//! methods) and the transport (which receives [`RerunPayload`]s through a
//! [`SessionSink`]). It owns no sockets and renders nothing.
//!
//! # Concurrency model
//! Single-threaded, cooperative: UI events arrive in serialized turns, and
//! one [`WidgetSession::flush`] per processed batch of events drains the
//! dispatch queue. Suspension happens only at the sink boundary.
//!
//! [`RerunPayload`]: rill_proto::RerunPayload

pub mod debug_trace;
pub mod dispatch;
pub mod form;
pub mod reconcile;
pub mod session;
pub mod store;
pub mod trigger;

pub use dispatch::{DispatchStats, FlushReport, RerunRequestDispatcher};
pub use form::{FormManager, FormRecord};
pub use reconcile::{ReconcileOutcome, RunScope};
pub use session::{NullSink, RecordingSink, SessionSink, WidgetSession};
pub use store::{StoreStats, WidgetState, WidgetStateStore};
pub use trigger::{TriggerPhase, TriggerValueHandler};
