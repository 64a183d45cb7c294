//! Domain layer for the antigenapp entity cache.
//!
//! Pure logic only, no I/O: entity models and their reference types, the
//! key-equality and merge utilities, and the fetch ledger used to
//! de-duplicate requests.

pub mod entities;
pub mod entity;
pub mod error;
pub mod keys;
pub mod ledger;
pub mod plate;
pub mod types;

pub use entity::{CreateRoute, Entity};
pub use error::CoreError;
pub use keys::{KeyFields, KeyValue};
pub use ledger::{FetchLedger, FetchState};
