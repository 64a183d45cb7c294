//! Generic entity store.
//!
//! [`EntityStore`] holds the cached collection of one entity type, the
//! fetch ledger that de-duplicates list and get requests, and the keys of
//! records created or updated through it. State sits behind a
//! `tokio::sync::RwLock`; the ledger check-and-insert happens under a
//! single write guard and the guard is always released before the HTTP
//! call.
//!
//! A call whose filter is covered by a request already in flight waits
//! for that request to settle instead of issuing its own, then answers
//! from the cache. If the awaited request failed, the waiter goes
//! through the gate again and may issue the retry itself.

use std::future::Future;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::{watch, RwLock};
use tokio_util::sync::CancellationToken;

use antigenapp_client::{query_pairs, EntityApi};
use antigenapp_core::keys::{covers, intersect_keys, key_eq, merge_by_keys};
use antigenapp_core::{Entity, FetchLedger, FetchState};
use antigenapp_events::{Notification, NotificationBus};

use crate::error::StoreError;

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Options for [`EntityStore::list_records_with`].
#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    /// Issue the request even if the filter is already fetched or pending.
    pub force: bool,
    /// Abandon the request when this token fires.
    pub cancel: Option<CancellationToken>,
}

impl ListOptions {
    pub fn forced() -> Self {
        Self {
            force: true,
            cancel: None,
        }
    }

    pub fn with_cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

/// Options for [`EntityStore::get_record`].
#[derive(Debug, Clone, Default)]
pub struct GetOptions {
    /// Issue the GET even if the record is cached or already pending.
    pub force: bool,
    /// Abandon the request when this token fires.
    pub cancel: Option<CancellationToken>,
}

impl GetOptions {
    pub fn forced() -> Self {
        Self {
            force: true,
            cancel: None,
        }
    }

    pub fn with_cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

// ---------------------------------------------------------------------------
// EntityStore
// ---------------------------------------------------------------------------

struct StoreState<E: Entity> {
    records: Vec<E>,
    ledger: FetchLedger<E::Filter>,
    /// Keys of records created or updated through this store, oldest first.
    posted: Vec<E::Ref>,
    /// Create/update requests in flight.
    posting: usize,
}

/// Outcome of the ledger gate.
enum Gate {
    /// Issue the request; a pending entry has been recorded.
    Start,
    /// Answer from the cache.
    Cached,
    /// A covering request is in flight; the receiver changes once any
    /// request settles.
    Wait(watch::Receiver<u64>),
}

/// Cache, ledger and posted keys for one entity type.
pub struct EntityStore<E: Entity> {
    api: Arc<dyn EntityApi>,
    bus: Arc<NotificationBus>,
    state: RwLock<StoreState<E>>,
    /// Bumped whenever a pending ledger entry completes or fails.
    settled: watch::Sender<u64>,
}

impl<E: Entity> EntityStore<E> {
    pub fn new(api: Arc<dyn EntityApi>, bus: Arc<NotificationBus>) -> Self {
        Self {
            api,
            bus,
            state: RwLock::new(StoreState {
                records: Vec::new(),
                ledger: FetchLedger::new(E::KEY_FIELDS),
                posted: Vec::new(),
                posting: 0,
            }),
            settled: watch::channel(0).0,
        }
    }

    // -- list ---------------------------------------------------------------

    /// Ensure records matching `filter` are cached and return them.
    ///
    /// Issues `GET /api/<entity>/?<filter>` only when no fetched or
    /// pending filter already covers `filter`. When a covering request is
    /// pending, waits for it to settle. The cached subset is returned
    /// either way.
    pub async fn list_records(&self, filter: E::Filter) -> Result<Vec<E>, StoreError> {
        self.list_records_with(filter, ListOptions::default()).await
    }

    /// Re-fetch records matching `filter` regardless of the ledger.
    pub async fn refresh_records(&self, filter: E::Filter) -> Result<Vec<E>, StoreError> {
        self.list_records_with(filter, ListOptions::forced()).await
    }

    pub async fn list_records_with(
        &self,
        filter: E::Filter,
        options: ListOptions,
    ) -> Result<Vec<E>, StoreError> {
        loop {
            match self.begin(&filter, options.force, |_| false).await {
                Gate::Start => break,
                Gate::Cached => {
                    tracing::debug!(endpoint = E::ENDPOINT, ?filter, "List already fetched");
                    return Ok(self.filtered(&filter).await);
                }
                Gate::Wait(settled) => {
                    tracing::debug!(endpoint = E::ENDPOINT, ?filter, "Waiting for pending list");
                    wait_settled(options.cancel.as_ref(), settled).await?;
                }
            }
        }

        let request = async {
            let query = query_pairs(&filter)?;
            let body = self.api.list(E::ENDPOINT, &query).await?;
            decode::<Vec<E>>(body)
        };

        match with_cancel(options.cancel.as_ref(), request).await {
            Ok(records) => {
                let mut state = self.state.write().await;
                state.records = merge_by_keys(&state.records, &records, E::KEY_FIELDS);
                state.ledger.complete(&filter);
                self.mark_settled();
                tracing::info!(
                    endpoint = E::ENDPOINT,
                    ?filter,
                    received = records.len(),
                    cached = state.records.len(),
                    "Merged list response",
                );
                Ok(matching(&state.records, &filter))
            }
            Err(err) => {
                self.fail_pending(&filter).await;
                self.report(&err);
                Err(err)
            }
        }
    }

    // -- get ----------------------------------------------------------------

    /// Ensure the record identified by `key` is cached and return it.
    ///
    /// Without `force`, the GET is skipped when the record is already
    /// cached or a fetched filter covers its key, and deferred until a
    /// pending covering request settles. Returns `None` when a completed
    /// fetch covering the key did not yield the record.
    pub async fn get_record(
        &self,
        key: &E::Ref,
        options: GetOptions,
    ) -> Result<Option<E>, StoreError> {
        let filter = E::Filter::from(key.clone());
        let cached = |state: &StoreState<E>| {
            state
                .records
                .iter()
                .any(|record| key_eq(record, key, E::KEY_FIELDS))
        };
        loop {
            match self.begin(&filter, options.force, &cached).await {
                Gate::Start => break,
                Gate::Cached => {
                    tracing::debug!(endpoint = E::ENDPOINT, %key, "Record cached or fetched");
                    return Ok(self.record(key).await);
                }
                Gate::Wait(settled) => {
                    tracing::debug!(endpoint = E::ENDPOINT, %key, "Waiting for pending fetch");
                    wait_settled(options.cancel.as_ref(), settled).await?;
                }
            }
        }

        match with_cancel(options.cancel.as_ref(), self.fetch_one(key)).await {
            Ok(record) => {
                let mut state = self.state.write().await;
                state.records = merge_by_keys(&state.records, &[record.clone()], E::KEY_FIELDS);
                state.ledger.complete(&filter);
                self.mark_settled();
                tracing::info!(endpoint = E::ENDPOINT, %key, "Merged record");
                Ok(Some(record))
            }
            Err(err) => {
                self.fail_pending(&filter).await;
                self.report(&err);
                Err(err)
            }
        }
    }

    // -- create / update ----------------------------------------------------

    /// Validate and POST one record, then cache the canonical result.
    pub async fn create_record(&self, post: E::Post) -> Result<E, StoreError> {
        if let Err(err) = E::validate_post(&post) {
            let err = StoreError::from(err);
            self.report(&err);
            return Err(err);
        }

        self.state.write().await.posting += 1;
        let result = self.send_create(&post).await;
        self.finish_posting(result.as_ref().map(std::slice::from_ref))
            .await;
        result
    }

    /// Validate every payload, then POST them as one JSON array.
    ///
    /// Entities whose create route needs a read-back (antigens) are
    /// created one at a time instead.
    pub async fn create_records(&self, posts: Vec<E::Post>) -> Result<Vec<E>, StoreError> {
        if posts.is_empty() {
            return Ok(Vec::new());
        }
        if let Some(err) = posts.iter().find_map(|post| E::validate_post(post).err()) {
            let err = StoreError::from(err);
            self.report(&err);
            return Err(err);
        }
        if posts.iter().any(|post| E::create_route(post).refetch) {
            let mut created = Vec::with_capacity(posts.len());
            for post in posts {
                created.push(self.create_record(post).await?);
            }
            return Ok(created);
        }

        self.state.write().await.posting += 1;
        let request = async {
            let endpoint = E::create_route(&posts[0]).endpoint;
            let body = serde_json::to_value(&posts)?;
            tracing::info!(endpoint, count = posts.len(), "Bulk create");
            let response = self.api.create(endpoint, &body).await?;
            decode::<Vec<E>>(response)
        };
        let result = request.await;
        self.finish_posting(result.as_deref()).await;
        result
    }

    /// Validate and PUT `post` to the record identified by `key`.
    pub async fn update_record(&self, key: &E::Ref, post: E::Post) -> Result<E, StoreError> {
        if let Err(err) = E::validate_post(&post) {
            let err = StoreError::from(err);
            self.report(&err);
            return Err(err);
        }

        self.state.write().await.posting += 1;
        let request = async {
            let body = serde_json::to_value(&post)?;
            tracing::info!(endpoint = E::ENDPOINT, %key, "Update");
            let response = self
                .api
                .update(E::ENDPOINT, &key.to_string(), &body)
                .await?;
            decode::<E>(response)
        };
        let result = request.await;
        self.finish_posting(result.as_ref().map(std::slice::from_ref))
            .await;
        result
    }

    // -- read accessors -----------------------------------------------------

    /// Snapshot of the cached collection.
    pub async fn records(&self) -> Vec<E> {
        self.state.read().await.records.clone()
    }

    pub async fn record(&self, key: &E::Ref) -> Option<E> {
        self.state
            .read()
            .await
            .records
            .iter()
            .find(|record| key_eq(*record, key, E::KEY_FIELDS))
            .cloned()
    }

    /// Cached records matching `filter`; unset filter fields match anything.
    pub async fn filtered(&self, filter: &E::Filter) -> Vec<E> {
        matching(&self.state.read().await.records, filter)
    }

    /// Cached records created or updated through this store.
    pub async fn posted_records(&self) -> Vec<E> {
        let state = self.state.read().await;
        intersect_keys(&state.records, &state.posted, E::KEY_FIELDS)
            .into_iter()
            .cloned()
            .collect()
    }

    pub async fn is_loading(&self) -> bool {
        self.state.read().await.ledger.is_loading()
    }

    pub async fn is_posting(&self) -> bool {
        self.state.read().await.posting > 0
    }

    pub async fn fetch_state(&self, filter: &E::Filter) -> FetchState {
        self.state.read().await.ledger.state(filter)
    }

    // ---- private helpers ----

    /// Run the ledger gate under one write guard. `cached` adds a further
    /// reason to answer from the cache, checked under the same guard.
    ///
    /// The `Wait` receiver is subscribed before the guard is released, so
    /// a request settling right after the gate still wakes it.
    async fn begin(
        &self,
        filter: &E::Filter,
        force: bool,
        cached: impl Fn(&StoreState<E>) -> bool,
    ) -> Gate {
        let mut state = self.state.write().await;
        if force {
            state.ledger.begin_forced(filter);
            return Gate::Start;
        }
        if cached(&state) || state.ledger.is_fetched(filter) {
            return Gate::Cached;
        }
        if state.ledger.try_begin(filter) {
            Gate::Start
        } else {
            Gate::Wait(self.settled.subscribe())
        }
    }

    async fn fail_pending(&self, filter: &E::Filter) {
        self.state.write().await.ledger.fail(filter);
        self.mark_settled();
    }

    /// Wake every call waiting on a pending request.
    fn mark_settled(&self) {
        self.settled.send_modify(|generation| *generation += 1);
    }

    async fn fetch_one(&self, key: &E::Ref) -> Result<E, StoreError> {
        let body = self.api.get(E::ENDPOINT, &key.to_string()).await?;
        decode(body)
    }

    /// POST along the entity's create route. A read-back route yields only
    /// the new key, so the canonical record is then fetched by reference.
    async fn send_create(&self, post: &E::Post) -> Result<E, StoreError> {
        let route = E::create_route(post);
        let body = serde_json::to_value(post)?;
        tracing::info!(endpoint = route.endpoint, "Create");
        let response = self.api.create(route.endpoint, &body).await?;
        if !route.refetch {
            return decode(response);
        }

        let key: E::Ref = decode(response)?;
        let filter = E::Filter::from(key.clone());
        self.state.write().await.ledger.begin_forced(&filter);
        match self.fetch_one(&key).await {
            Ok(record) => {
                let mut state = self.state.write().await;
                state.records = merge_by_keys(&state.records, &[record.clone()], E::KEY_FIELDS);
                state.ledger.complete(&filter);
                self.mark_settled();
                Ok(record)
            }
            Err(err) => {
                self.fail_pending(&filter).await;
                Err(err)
            }
        }
    }

    /// Close one create/update: merge and remember the keys on success,
    /// publish a notification on failure.
    async fn finish_posting(&self, result: Result<&[E], &StoreError>) {
        let mut state = self.state.write().await;
        state.posting = state.posting.saturating_sub(1);
        match result {
            Ok(records) => {
                state.records = merge_by_keys(&state.records, records, E::KEY_FIELDS);
                for record in records {
                    let key = record.key();
                    if !state.posted.iter().any(|p| key_eq(p, &key, E::KEY_FIELDS)) {
                        state.posted.push(key);
                    }
                }
                tracing::info!(
                    endpoint = E::ENDPOINT,
                    count = records.len(),
                    "Merged posted records",
                );
            }
            Err(err) => {
                drop(state);
                self.report(err);
            }
        }
    }

    fn report(&self, err: &StoreError) {
        let Some(message) = err.user_message() else {
            tracing::debug!(endpoint = E::ENDPOINT, "Request cancelled");
            return;
        };
        tracing::warn!(endpoint = E::ENDPOINT, error = %err, "Request failed");
        self.bus
            .publish(Notification::error(message).with_entity(E::LABEL));
    }
}

fn matching<E: Entity>(records: &[E], filter: &E::Filter) -> Vec<E> {
    records
        .iter()
        .filter(|record| covers(filter, *record, E::KEY_FIELDS))
        .cloned()
        .collect()
}

fn decode<T: DeserializeOwned>(body: Value) -> Result<T, StoreError> {
    Ok(serde_json::from_value(body)?)
}

/// Wait until some pending request settles, or until `cancel` fires.
async fn wait_settled(
    cancel: Option<&CancellationToken>,
    mut settled: watch::Receiver<u64>,
) -> Result<(), StoreError> {
    with_cancel(cancel, async {
        // Errs only once the store is dropped.
        let _ = settled.changed().await;
        Ok(())
    })
    .await
}

/// Await `request`, or return [`StoreError::Cancelled`] as soon as `cancel`
/// fires. The request future is dropped on cancellation.
async fn with_cancel<T>(
    cancel: Option<&CancellationToken>,
    request: impl Future<Output = Result<T, StoreError>>,
) -> Result<T, StoreError> {
    match cancel {
        Some(token) => tokio::select! {
            biased;
            _ = token.cancelled() => Err(StoreError::Cancelled),
            result = request => result,
        },
        None => request.await,
    }
}
