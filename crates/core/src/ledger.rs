//! Fetch ledger for request de-duplication.
//!
//! Remembers which filters have been satisfied (`fetched`) and which are
//! in flight (`pending`). A filter moves `Unseen -> Pending -> Fetched` on
//! success, and back to `Unseen` on failure so that a later retry is
//! allowed.
//!
//! The ledger is plain data. Callers hold it behind a lock and must run
//! [`FetchLedger::try_begin`] and the matching `complete`/`fail` without
//! suspending between the check and the insert.

use crate::keys::{covers, key_eq, KeyFields};

/// Where a filter stands in the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchState {
    /// Never requested, or the last request failed.
    Unseen,
    /// A request satisfying the filter is in flight.
    Pending,
    /// A request satisfying the filter has completed.
    Fetched,
}

/// Fetched and pending filters for one entity type.
#[derive(Debug, Clone)]
pub struct FetchLedger<F> {
    fields: &'static [&'static str],
    fetched: Vec<F>,
    pending: Vec<F>,
}

impl<F: KeyFields + Clone> FetchLedger<F> {
    /// Create an empty ledger comparing filters on `fields`.
    pub fn new(fields: &'static [&'static str]) -> Self {
        Self {
            fields,
            fetched: Vec::new(),
            pending: Vec::new(),
        }
    }

    /// Current state of `filter`.
    ///
    /// A broader pending or fetched filter counts for a narrower one, so
    /// after fetching everything, any project-scoped filter is `Fetched`.
    pub fn state(&self, filter: &F) -> FetchState {
        if self.pending.iter().any(|p| covers(p, filter, self.fields)) {
            FetchState::Pending
        } else if self.fetched.iter().any(|f| covers(f, filter, self.fields)) {
            FetchState::Fetched
        } else {
            FetchState::Unseen
        }
    }

    /// True if a completed request already satisfies `filter`, whether or
    /// not another one is in flight.
    pub fn is_fetched(&self, filter: &F) -> bool {
        self.fetched.iter().any(|f| covers(f, filter, self.fields))
    }

    /// True if some fetched or pending filter already satisfies `filter`.
    pub fn is_covered(&self, filter: &F) -> bool {
        self.state(filter) != FetchState::Unseen
    }

    /// Record the start of a request for `filter` unless one is already
    /// covered. Returns `false` when the caller should skip the request.
    pub fn try_begin(&mut self, filter: &F) -> bool {
        if self.is_covered(filter) {
            return false;
        }
        self.pending.push(filter.clone());
        true
    }

    /// Record the start of a request, bypassing the gate.
    pub fn begin_forced(&mut self, filter: &F) {
        self.pending.push(filter.clone());
    }

    /// Move one pending entry for `filter` to fetched.
    pub fn complete(&mut self, filter: &F) {
        self.remove_pending(filter);
        if !self.fetched.iter().any(|f| key_eq(f, filter, self.fields)) {
            self.fetched.push(filter.clone());
        }
    }

    /// Drop one pending entry for `filter` without marking it fetched.
    pub fn fail(&mut self, filter: &F) {
        self.remove_pending(filter);
    }

    /// True while any request is in flight.
    pub fn is_loading(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn pending(&self) -> &[F] {
        &self.pending
    }

    pub fn fetched(&self) -> &[F] {
        &self.fetched
    }

    // ---- private helpers ----

    /// Forced requests may stack several identical entries; each
    /// completion removes exactly one.
    fn remove_pending(&mut self, filter: &F) {
        if let Some(idx) = self
            .pending
            .iter()
            .position(|p| key_eq(p, filter, self.fields))
        {
            self.pending.remove(idx);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
