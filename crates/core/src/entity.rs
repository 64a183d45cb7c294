//! The [`Entity`] trait that parameterizes the generic entity store.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::CoreError;
use crate::keys::KeyFields;

/// Where a create payload is posted, and how the canonical record is
/// obtained afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreateRoute {
    /// Endpoint name under `/api/`.
    pub endpoint: &'static str,
    /// When set, the POST response only identifies the new record; the
    /// canonical record is then fetched from the entity's own endpoint.
    pub refetch: bool,
}

impl CreateRoute {
    /// POST to `endpoint` and take the response as the canonical record.
    pub const fn direct(endpoint: &'static str) -> Self {
        Self {
            endpoint,
            refetch: false,
        }
    }

    /// POST to `endpoint`, then GET the canonical record by reference.
    pub const fn refetch(endpoint: &'static str) -> Self {
        Self {
            endpoint,
            refetch: true,
        }
    }
}

/// A REST resource held in an entity store.
pub trait Entity:
    KeyFields + Clone + fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Full key; rendered by `Display` into the resource URI segment.
    type Ref: KeyFields
        + Clone
        + fmt::Debug
        + fmt::Display
        + PartialEq
        + DeserializeOwned
        + Send
        + Sync
        + 'static;

    /// Partial key used for list queries and ledger bookkeeping.
    type Filter: KeyFields
        + Clone
        + fmt::Debug
        + Default
        + Serialize
        + From<Self::Ref>
        + Send
        + Sync
        + 'static;

    /// Create / update payload.
    type Post: Serialize + fmt::Debug + Send + Sync;

    /// Endpoint name under `/api/`, e.g. `"elisa_well"`.
    const ENDPOINT: &'static str;

    /// Field names that together form the full key.
    const KEY_FIELDS: &'static [&'static str];

    /// Singular human-readable name used in log lines and messages.
    const LABEL: &'static str;

    fn key(&self) -> Self::Ref;

    fn create_route(_post: &Self::Post) -> CreateRoute {
        CreateRoute::direct(Self::ENDPOINT)
    }

    /// Local checks run before a payload is sent.
    fn validate_post(_post: &Self::Post) -> Result<(), CoreError> {
        Ok(())
    }
}
