//! ELISA plates, numbered within a project.
//!
//! A well is functional when its optical density reaches the plate
//! threshold; the server computes this, so changing a plate's threshold
//! changes the `functional` flag of every well on it.

use serde::{Deserialize, Serialize};

use crate::entities::project::validate_short_title;
use crate::entities::{ElisaWellRef, ProjectItemFilter, ProjectItemRef, PROJECT_ITEM_KEYS};
use crate::entity::Entity;
use crate::error::CoreError;
use crate::keys::{KeyFields, KeyValue};
use crate::types::Timestamp;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElisaPlate {
    pub project: String,
    pub number: u32,
    pub threshold: f64,
    #[serde(default)]
    pub elisawell_set: Vec<ElisaWellRef>,
    pub creation_time: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ElisaPlatePost {
    pub project: String,
    pub threshold: f64,
}

impl KeyFields for ElisaPlate {
    fn key_field(&self, field: &str) -> Option<KeyValue<'_>> {
        match field {
            "project" => Some(KeyValue::Text(&self.project)),
            "number" => Some(KeyValue::Number(self.number)),
            _ => None,
        }
    }
}

impl Entity for ElisaPlate {
    type Ref = ProjectItemRef;
    type Filter = ProjectItemFilter;
    type Post = ElisaPlatePost;

    const ENDPOINT: &'static str = "elisa_plate";
    const KEY_FIELDS: &'static [&'static str] = PROJECT_ITEM_KEYS;
    const LABEL: &'static str = "ELISA plate";

    fn key(&self) -> ProjectItemRef {
        ProjectItemRef::new(self.project.clone(), self.number)
    }

    fn validate_post(post: &ElisaPlatePost) -> Result<(), CoreError> {
        validate_short_title(&post.project)?;
        validate_threshold(post.threshold)
    }
}

/// Thresholds are optical densities: finite and non-negative.
pub fn validate_threshold(threshold: f64) -> Result<(), CoreError> {
    if !threshold.is_finite() || threshold < 0.0 {
        return Err(CoreError::Validation(format!(
            "Plate threshold must be a non-negative number, got {threshold}"
        )));
    }
    Ok(())
}
