//! Key equality and merge-by-key utilities.
//!
//! Records, references and filters all expose their key fields through
//! [`KeyFields`]. Every comparison in the cache goes through [`key_eq`],
//! so a record, a full reference and a partial filter can be matched
//! against each other on any subset of field names.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

// ---------------------------------------------------------------------------
// Key access
// ---------------------------------------------------------------------------

/// A single key field value, borrowed from the record that owns it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyValue<'a> {
    Text(&'a str),
    Number(u32),
}

/// Named access to the key fields of a record, reference or filter.
///
/// Returns `None` when the field is absent (or unset, for filters). An
/// absent field compares equal to another absent field.
pub trait KeyFields {
    fn key_field(&self, field: &str) -> Option<KeyValue<'_>>;
}

impl<T: KeyFields + ?Sized> KeyFields for &T {
    fn key_field(&self, field: &str) -> Option<KeyValue<'_>> {
        (**self).key_field(field)
    }
}

// ---------------------------------------------------------------------------
// Comparison
// ---------------------------------------------------------------------------

/// True iff `first` and `second` hold equal values on every named field.
pub fn key_eq<A, B>(first: &A, second: &B, fields: &[&str]) -> bool
where
    A: KeyFields + ?Sized,
    B: KeyFields + ?Sized,
{
    fields
        .iter()
        .all(|field| first.key_field(field) == second.key_field(field))
}

/// True when `broad` is satisfied by the same or a wider query than
/// `narrow`: every field `broad` constrains, `narrow` constrains to the
/// same value.
///
/// An empty filter covers everything.
pub fn covers<A, B>(broad: &A, narrow: &B, fields: &[&str]) -> bool
where
    A: KeyFields + ?Sized,
    B: KeyFields + ?Sized,
{
    fields.iter().all(|field| match broad.key_field(field) {
        None => true,
        Some(value) => narrow.key_field(field) == Some(value),
    })
}

/// Records from `records` whose named fields equal those of `filter`.
pub fn filter_by_keys<'a, T, F>(records: &'a [T], filter: &F, fields: &[&str]) -> Vec<&'a T>
where
    T: KeyFields,
    F: KeyFields + ?Sized,
{
    records
        .iter()
        .filter(|record| key_eq(*record, filter, fields))
        .collect()
}

/// Records matching any of `filters`, in filter order.
///
/// A record matched by two filters appears twice, the same as in a
/// flat-map over [`filter_by_keys`].
pub fn intersect_keys<'a, T, F>(records: &'a [T], filters: &[F], fields: &[&str]) -> Vec<&'a T>
where
    T: KeyFields,
    F: KeyFields,
{
    filters
        .iter()
        .flat_map(|filter| filter_by_keys(records, filter, fields))
        .collect()
}

// ---------------------------------------------------------------------------
// Merge
// ---------------------------------------------------------------------------

/// Merge `incoming` into a copy of `existing`, de-duplicating on `fields`.
///
/// An incoming record takes the slot of the existing record it matches;
/// unmatched incoming records are appended in input order. Neither input
/// is modified.
///
/// Slots are looked up through a hash index over the key tuple, so a merge
/// costs O(existing + incoming) rather than a scan per incoming record.
pub fn merge_by_keys<T>(existing: &[T], incoming: &[T], fields: &[&str]) -> Vec<T>
where
    T: KeyFields + Clone,
{
    let mut merged = existing.to_vec();
    let mut slots = HashMap::with_capacity(existing.len() + incoming.len());
    for (idx, record) in existing.iter().enumerate() {
        slots.entry(key_tuple(record, fields)).or_insert(idx);
    }
    for record in incoming {
        match slots.entry(key_tuple(record, fields)) {
            Entry::Occupied(slot) => merged[*slot.get()] = record.clone(),
            Entry::Vacant(slot) => {
                slot.insert(merged.len());
                merged.push(record.clone());
            }
        }
    }
    merged
}

/// The values of `fields` in order; equal tuples mean [`key_eq`] holds.
fn key_tuple<'a, T: KeyFields>(record: &'a T, fields: &[&str]) -> Vec<Option<KeyValue<'a>>> {
    fields.iter().map(|field| record.key_field(field)).collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
