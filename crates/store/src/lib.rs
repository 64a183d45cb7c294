//! Client-side entity cache with request de-duplication.
//!
//! One [`EntityStore`] per entity type caches records, remembers which
//! queries have been satisfied and suppresses redundant requests. The
//! [`Stores`] context owns all five stores plus the notification bus and
//! hosts the operations that span more than one entity type.

pub mod error;
pub mod store;
pub mod stores;

pub use error::StoreError;
pub use store::{EntityStore, GetOptions, ListOptions};
pub use stores::{ResolvedElisaWell, Stores};
