//! Durable queue of field edits the record store has not confirmed yet
//!
//! Each table has its own list, addressed by [`Table::pending_key`]. The
//! optimistic update controller appends to it when a write fails and drains it
//! on retry.
//!
//! [`Table::pending_key`]: crate::store::Table::pending_key

pub mod file;
pub mod memory;
pub mod models;
pub mod traits;

pub use file::FilePendingStore;
pub use memory::InMemoryPendingStore;
pub use models::{PendingStoreError, PendingUpdate};
pub use traits::PendingChangeStore;
