//! Application context owning one store per entity type.
//!
//! Operations that touch more than one entity type live here and go
//! through each store's public API; the stores never call each other.

use std::sync::Arc;

use tokio::sync::RwLock;

use antigenapp_client::{ClientConfig, ClientError, EntityApi, RestClient};
use antigenapp_core::entities::{
    Antigen, ElisaPlate, ElisaPlatePost, ElisaWell, ElisaWellFilter, ElisaWellRef, Nanobody,
    Project, ProjectItemFilter, ProjectItemRef, ProjectRef,
};
use antigenapp_events::NotificationBus;

use crate::error::StoreError;
use crate::store::{EntityStore, GetOptions};

/// A well together with the antigen and nanobody it was loaded with.
#[derive(Debug, Clone)]
pub struct ResolvedElisaWell {
    pub well: ElisaWell,
    pub antigen: Option<Antigen>,
    pub nanobody: Option<Nanobody>,
}

/// The entity cache for one API origin. Share it as `Arc<Stores>`.
pub struct Stores {
    pub projects: EntityStore<Project>,
    pub antigens: EntityStore<Antigen>,
    pub nanobodies: EntityStore<Nanobody>,
    pub elisa_plates: EntityStore<ElisaPlate>,
    pub elisa_wells: EntityStore<ElisaWell>,
    bus: Arc<NotificationBus>,
    current_project: RwLock<Option<ProjectRef>>,
}

impl Stores {
    pub fn new(api: Arc<dyn EntityApi>) -> Self {
        Self::with_bus(api, Arc::new(NotificationBus::default()))
    }

    pub fn with_bus(api: Arc<dyn EntityApi>, bus: Arc<NotificationBus>) -> Self {
        Self {
            projects: EntityStore::new(Arc::clone(&api), Arc::clone(&bus)),
            antigens: EntityStore::new(Arc::clone(&api), Arc::clone(&bus)),
            nanobodies: EntityStore::new(Arc::clone(&api), Arc::clone(&bus)),
            elisa_plates: EntityStore::new(Arc::clone(&api), Arc::clone(&bus)),
            elisa_wells: EntityStore::new(api, Arc::clone(&bus)),
            bus,
            current_project: RwLock::new(None),
        }
    }

    /// Build stores backed by a [`RestClient`] for `config`.
    pub fn from_config(config: &ClientConfig) -> Result<Self, ClientError> {
        let api: Arc<dyn EntityApi> = Arc::new(RestClient::new(config)?);
        Ok(Self::new(api))
    }

    pub fn notifications(&self) -> &Arc<NotificationBus> {
        &self.bus
    }

    // -- current project ----------------------------------------------------

    pub async fn switch_project(&self, project: ProjectRef) {
        tracing::info!(project = %project, "Switched project");
        *self.current_project.write().await = Some(project);
    }

    pub async fn current_project(&self) -> Option<ProjectRef> {
        self.current_project.read().await.clone()
    }

    // -- cross-entity operations --------------------------------------------

    /// PUT a plate, then re-fetch its wells.
    ///
    /// The server derives each well's `functional` flag from the plate
    /// threshold, so cached wells are stale after any plate update.
    pub async fn update_elisa_plate(
        &self,
        key: &ProjectItemRef,
        post: ElisaPlatePost,
    ) -> Result<ElisaPlate, StoreError> {
        let plate = self.elisa_plates.update_record(key, post).await?;
        self.elisa_wells
            .refresh_records(ElisaWellFilter::plate(key))
            .await?;
        Ok(plate)
    }

    /// Fetch a well and the antigen and nanobody it references.
    ///
    /// Returns `None` when the well is not available.
    pub async fn resolve_elisa_well(
        &self,
        key: &ElisaWellRef,
    ) -> Result<Option<ResolvedElisaWell>, StoreError> {
        let Some(well) = self
            .elisa_wells
            .get_record(key, GetOptions::default())
            .await?
        else {
            return Ok(None);
        };

        let (antigen_ref, nanobody_ref) = (well.antigen_ref(), well.nanobody_ref());
        let (antigen, nanobody) = futures::join!(
            self.antigens.get_record(&antigen_ref, GetOptions::default()),
            self.nanobodies.get_record(&nanobody_ref, GetOptions::default()),
        );

        Ok(Some(ResolvedElisaWell {
            well,
            antigen: antigen?,
            nanobody: nanobody?,
        }))
    }

    /// List the antigens, nanobodies, plates and wells of one project
    /// concurrently. Every list runs to completion; the first error is
    /// returned.
    pub async fn prefetch_project(&self, project: &ProjectRef) -> Result<(), StoreError> {
        let items = ProjectItemFilter::project(project.short_title.clone());
        let (antigens, nanobodies, plates, wells) = futures::join!(
            self.antigens.list_records(items.clone()),
            self.nanobodies.list_records(items.clone()),
            self.elisa_plates.list_records(items),
            self.elisa_wells
                .list_records(ElisaWellFilter::project(project.short_title.clone())),
        );
        tracing::info!(
            project = %project,
            antigens = antigens.as_ref().map_or(0, Vec::len),
            nanobodies = nanobodies.as_ref().map_or(0, Vec::len),
            plates = plates.as_ref().map_or(0, Vec::len),
            wells = wells.as_ref().map_or(0, Vec::len),
            "Prefetched project",
        );
        antigens?;
        nanobodies?;
        plates?;
        wells?;
        Ok(())
    }
}
