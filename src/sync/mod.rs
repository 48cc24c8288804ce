//! Optimistic field updates
//!
//! A field edit is written to the record store; when the write fails it is
//! queued in the pending change store and reported to observers as an
//! optimistic patch, so the edit is visible immediately and never lost.

pub mod controller;
pub mod observer;
pub mod patch;

pub use controller::{FieldUpdateController, RetryReport, SAVED_LOCALLY_MESSAGE};
pub use observer::{ReadModel, RecordUpdate, TracingObserver, UpdateObserver};
pub use patch::FieldPatch;
