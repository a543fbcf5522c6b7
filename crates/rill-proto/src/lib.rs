#![forbid(unsafe_code)]

//! Declaration, value, and wire-payload model for the rill engine.
//!
//! This crate defines the data the engine and the backend agree on:
//!
//! - [`WidgetValue`] / [`ValueKind`] - the tagged value union and its tag mirror
//! - [`ValueSource`] - provenance of a stored value
//! - [`WidgetDeclaration`] / [`DeclarationSet`] - one run's declared widgets
//! - [`WidgetDelta`] / [`RerunPayload`] - the outgoing synchronization message
//!
//! # Role in rill
//! `rill-proto` is the leaf crate: it has no knowledge of stores, forms, or
//! dispatch policy. The engine (`rill-sync`) consumes these types; the
//! transport serializes [`RerunPayload`] with the serde implementations
//! provided here.

pub mod declaration;
pub mod payload;
pub mod value;

pub use declaration::{DeclarationError, DeclarationSet, WidgetDeclaration};
pub use payload::{RerunPayload, WidgetDelta};
pub use value::{ValueKind, ValueSource, WidgetValue};
