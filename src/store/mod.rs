//! Record store client and table definitions
//!
//! The record store is an external CRUD service addressed by table name and
//! record id. Everything above this module talks to it through the
//! [`RecordStore`] trait so the HTTP client can be swapped for an in-memory
//! double in tests.

pub mod client;
pub mod decode;
pub mod error;
pub mod models;
pub mod tables;
pub mod traits;

pub use client::HttpRecordStore;
pub use decode::DecodeError;
pub use error::StoreError;
pub use models::{Envelope, Record};
pub use tables::Table;
pub use traits::RecordStore;

#[cfg(test)]
pub(crate) mod mock;
