//! ELISA wells, keyed by `{project, plate, location}`.
//!
//! A well references the antigen and nanobody it was loaded with by their
//! numbers inside the well's own project.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::entities::project::validate_short_title;
use crate::entities::ProjectItemRef;
use crate::entity::Entity;
use crate::error::CoreError;
use crate::keys::{KeyFields, KeyValue};
use crate::plate::{location_to_grid, validate_location};

pub const ELISA_WELL_KEYS: &[&str] = &["project", "plate", "location"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElisaWell {
    pub project: String,
    pub plate: u32,
    pub location: u32,
    pub antigen: u32,
    pub nanobody: u32,
    pub optical_density: f64,
    /// Server-computed: optical density at or above the plate threshold.
    #[serde(default)]
    pub functional: bool,
}

impl ElisaWell {
    pub fn plate_ref(&self) -> ProjectItemRef {
        ProjectItemRef::new(self.project.clone(), self.plate)
    }

    pub fn antigen_ref(&self) -> ProjectItemRef {
        ProjectItemRef::new(self.project.clone(), self.antigen)
    }

    pub fn nanobody_ref(&self) -> ProjectItemRef {
        ProjectItemRef::new(self.project.clone(), self.nanobody)
    }

    /// Row letter and column of the well on its plate.
    pub fn grid(&self) -> Result<(char, u32), CoreError> {
        location_to_grid(self.location)
    }
}

/// Full key of a well. Renders as `<project>:<plate>:<location>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElisaWellRef {
    pub project: String,
    pub plate: u32,
    pub location: u32,
}

impl ElisaWellRef {
    pub fn new(project: impl Into<String>, plate: u32, location: u32) -> Self {
        Self {
            project: project.into(),
            plate,
            location,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ElisaWellFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plate: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<u32>,
}

impl ElisaWellFilter {
    /// Every well in one project.
    pub fn project(project: impl Into<String>) -> Self {
        Self {
            project: Some(project.into()),
            ..Self::default()
        }
    }

    /// Every well on one plate.
    pub fn plate(plate: &ProjectItemRef) -> Self {
        Self {
            project: Some(plate.project.clone()),
            plate: Some(plate.number),
            location: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ElisaWellPost {
    pub project: String,
    pub plate: u32,
    pub location: u32,
    pub antigen: u32,
    pub nanobody: u32,
    pub optical_density: f64,
}

impl KeyFields for ElisaWell {
    fn key_field(&self, field: &str) -> Option<KeyValue<'_>> {
        match field {
            "project" => Some(KeyValue::Text(&self.project)),
            "plate" => Some(KeyValue::Number(self.plate)),
            "location" => Some(KeyValue::Number(self.location)),
            _ => None,
        }
    }
}

impl KeyFields for ElisaWellRef {
    fn key_field(&self, field: &str) -> Option<KeyValue<'_>> {
        match field {
            "project" => Some(KeyValue::Text(&self.project)),
            "plate" => Some(KeyValue::Number(self.plate)),
            "location" => Some(KeyValue::Number(self.location)),
            _ => None,
        }
    }
}

impl KeyFields for ElisaWellFilter {
    fn key_field(&self, field: &str) -> Option<KeyValue<'_>> {
        match field {
            "project" => self.project.as_deref().map(KeyValue::Text),
            "plate" => self.plate.map(KeyValue::Number),
            "location" => self.location.map(KeyValue::Number),
            _ => None,
        }
    }
}

impl From<ElisaWellRef> for ElisaWellFilter {
    fn from(well: ElisaWellRef) -> Self {
        Self {
            project: Some(well.project),
            plate: Some(well.plate),
            location: Some(well.location),
        }
    }
}

impl fmt::Display for ElisaWellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.project, self.plate, self.location)
    }
}

impl FromStr for ElisaWellRef {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CoreError::InvalidReference {
            kind: "ELISA well",
            value: s.to_string(),
        };
        let mut parts = s.rsplitn(3, ':');
        let location = parts.next().ok_or_else(invalid)?;
        let plate = parts.next().ok_or_else(invalid)?;
        let project = parts.next().ok_or_else(invalid)?;
        if project.is_empty() {
            return Err(invalid());
        }
        Ok(Self::new(
            project,
            plate.parse().map_err(|_| invalid())?,
            location.parse().map_err(|_| invalid())?,
        ))
    }
}

impl Entity for ElisaWell {
    type Ref = ElisaWellRef;
    type Filter = ElisaWellFilter;
    type Post = ElisaWellPost;

    const ENDPOINT: &'static str = "elisa_well";
    const KEY_FIELDS: &'static [&'static str] = ELISA_WELL_KEYS;
    const LABEL: &'static str = "ELISA well";

    fn key(&self) -> ElisaWellRef {
        ElisaWellRef::new(self.project.clone(), self.plate, self.location)
    }

    fn validate_post(post: &ElisaWellPost) -> Result<(), CoreError> {
        validate_short_title(&post.project)?;
        validate_location(post.location)?;
        if !post.optical_density.is_finite() {
            return Err(CoreError::Validation(format!(
                "Optical density must be a finite number, got {}",
                post.optical_density
            )));
        }
        Ok(())
    }
}
