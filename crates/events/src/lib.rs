//! User-facing notifications for the antigenapp entity cache.
//!
//! Store failures are published on a [`NotificationBus`] instead of being
//! shown directly. Front ends either subscribe for live delivery or drain
//! the undisplayed log.

pub mod bus;

pub use bus::{Notification, NotificationBus, Severity};
