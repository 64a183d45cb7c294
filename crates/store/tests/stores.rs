//! Integration tests for the `Stores` context and its cross-entity
//! operations.

mod common;

use std::sync::Arc;

use antigenapp_client::ErrorKind;
use antigenapp_core::entities::{
    ElisaPlatePost, ElisaWellFilter, ElisaWellRef, ProjectItemFilter, ProjectItemRef, ProjectRef,
};
use antigenapp_store::GetOptions;
use assert_matches::assert_matches;
use serde_json::json;

use common::{stores, FakeApi};

#[tokio::test]
async fn switch_project_sets_current() {
    let api = FakeApi::seeded();
    let stores = stores(&api);
    assert!(stores.current_project().await.is_none());

    stores.switch_project(ProjectRef::new("test")).await;

    assert_eq!(stores.current_project().await, Some(ProjectRef::new("test")));
    assert!(api.calls().is_empty());
}

/// Raising or lowering a plate threshold changes which wells are
/// functional, so the plate's wells are re-fetched after the PUT.
#[tokio::test]
async fn plate_update_refreshes_its_wells() {
    let api = FakeApi::seeded();
    let stores = stores(&api);
    let plate = ProjectItemRef::new("test", 1);
    let wells = stores
        .elisa_wells
        .list_records(ElisaWellFilter::plate(&plate))
        .await
        .unwrap();
    assert_eq!(wells.iter().filter(|w| w.functional).count(), 1);

    let updated = stores
        .update_elisa_plate(
            &plate,
            ElisaPlatePost {
                project: "test".to_string(),
                threshold: 0.2,
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.threshold, 0.2);
    assert_eq!(api.count("GET", "elisa_well"), 2);
    let cached = stores.elisa_wells.records().await;
    assert_eq!(cached.len(), 2);
    assert!(cached.iter().all(|w| w.functional));
}

/// A rejected PUT leaves the cached plate as it was, records nothing as
/// posted and raises exactly one notification.
#[tokio::test]
async fn failed_plate_update_skips_well_refresh() {
    let api = FakeApi::seeded();
    let stores = stores(&api);
    let key = ProjectItemRef::new("test", 1);
    stores
        .elisa_plates
        .list_records(ProjectItemFilter::project("test"))
        .await
        .unwrap();
    api.reject(
        "elisa_plate",
        400,
        "Bad Request",
        Some(json!({ "threshold": ["Ensure this value is less than or equal to 1."] })),
    );

    let result = stores
        .update_elisa_plate(
            &key,
            ElisaPlatePost {
                project: "test".to_string(),
                threshold: 0.2,
            },
        )
        .await;

    assert_matches!(result, Err(err) if err.kind() == Some(ErrorKind::Validation));
    assert_eq!(api.count("GET", "elisa_well"), 0);
    let cached = stores.elisa_plates.record(&key).await.expect("plate cached");
    assert_eq!(cached.threshold, 0.5);
    assert_eq!(stores.elisa_plates.records().await.len(), 1);
    assert!(stores.elisa_plates.posted_records().await.is_empty());
    assert!(!stores.elisa_plates.is_posting().await);
    let notes = stores.notifications().history();
    assert_eq!(notes.len(), 1);
    assert_eq!(
        notes[0].message,
        "400: Bad Request\nEnsure this value is less than or equal to 1."
    );
}

#[tokio::test]
async fn resolving_a_well_fetches_its_antigen_and_nanobody() {
    let api = FakeApi::seeded();
    let stores = stores(&api);

    let resolved = stores
        .resolve_elisa_well(&ElisaWellRef::new("test", 1, 2))
        .await
        .unwrap()
        .expect("well exists");

    assert_eq!(resolved.well.optical_density, 0.7);
    assert_eq!(resolved.antigen.map(|a| a.number), Some(1));
    assert_eq!(resolved.nanobody.map(|n| n.name), Some("nb000001".to_string()));
    assert_eq!(api.count("GET", "elisa_well/test:1:2"), 1);
    assert_eq!(api.count("GET", "antigen/test:1"), 1);
    assert_eq!(api.count("GET", "nanobody/test:1"), 1);
}

/// Once the project is prefetched, resolving a well needs no requests.
#[tokio::test]
async fn prefetch_satisfies_later_lookups() {
    let api = FakeApi::seeded();
    let stores = stores(&api);
    let project = ProjectRef::new("test");

    stores.prefetch_project(&project).await.unwrap();
    let after_prefetch = api.calls().len();
    assert_eq!(after_prefetch, 4);

    stores.prefetch_project(&project).await.unwrap();
    let resolved = stores
        .resolve_elisa_well(&ElisaWellRef::new("test", 1, 1))
        .await
        .unwrap();

    assert!(resolved.is_some());
    assert_eq!(api.calls().len(), after_prefetch);
    assert_eq!(
        stores
            .antigens
            .filtered(&ProjectItemFilter::project("test"))
            .await
            .len(),
        1
    );
}

/// One failing list does not stop the others from caching.
#[tokio::test]
async fn prefetch_reports_first_error_but_caches_the_rest() {
    let api = FakeApi::seeded();
    let stores = stores(&api);
    api.reject("nanobody", 503, "Service Unavailable", None);

    let result = stores.prefetch_project(&ProjectRef::new("test")).await;

    assert!(result.is_err());
    assert_eq!(stores.antigens.records().await.len(), 1);
    assert_eq!(stores.elisa_plates.records().await.len(), 1);
    assert_eq!(stores.elisa_wells.records().await.len(), 2);
    assert!(stores.nanobodies.records().await.is_empty());
    assert_eq!(stores.notifications().history().len(), 1);
}

/// Resolving a well while its project is still being prefetched waits for
/// the prefetch rather than reporting the well missing.
#[tokio::test]
async fn resolve_during_prefetch_finds_the_well() {
    let api = FakeApi::seeded();
    let stores = Arc::new(stores(&api));
    api.hold_requests(true);

    let listing = {
        let stores = Arc::clone(&stores);
        tokio::spawn(async move {
            stores
                .elisa_wells
                .list_records(ElisaWellFilter::project("test"))
                .await
        })
    };
    api.entered.notified().await;
    api.hold_requests(false);

    let resolving = {
        let stores = Arc::clone(&stores);
        tokio::spawn(async move {
            stores
                .resolve_elisa_well(&ElisaWellRef::new("test", 1, 1))
                .await
        })
    };
    api.release.notify_one();

    let resolved = resolving.await.unwrap().unwrap().expect("well exists");
    assert_eq!(listing.await.unwrap().unwrap().len(), 2);

    assert_eq!(resolved.well.location, 1);
    assert!(resolved.antigen.is_some());
    assert!(resolved.nanobody.is_some());
    assert_eq!(api.count("GET", "elisa_well"), 1);
}

#[tokio::test]
async fn cached_well_is_not_refetched() {
    let api = FakeApi::seeded();
    let stores = stores(&api);
    let key = ElisaWellRef::new("test", 1, 1);
    stores
        .elisa_wells
        .get_record(&key, GetOptions::default())
        .await
        .unwrap();

    stores
        .elisa_wells
        .get_record(&key, GetOptions::default())
        .await
        .unwrap();

    assert_eq!(api.count("GET", "elisa_well/test:1:1"), 1);
}
