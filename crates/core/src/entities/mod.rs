//! Entity models, references and filters.
//!
//! Antigens, nanobodies and ELISA plates are numbered within a project and
//! share [`ProjectItemRef`] / [`ProjectItemFilter`]. Projects and ELISA
//! wells have their own key shapes.

pub mod antigen;
pub mod elisa_plate;
pub mod elisa_well;
pub mod nanobody;
pub mod project;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::keys::{KeyFields, KeyValue};

pub use antigen::{Antigen, AntigenPost, LocalAntigenPost, UniProtAntigenPost};
pub use elisa_plate::{ElisaPlate, ElisaPlatePost};
pub use elisa_well::{ElisaWell, ElisaWellFilter, ElisaWellPost, ElisaWellRef};
pub use nanobody::{Nanobody, NanobodyPost};
pub use project::{Project, ProjectFilter, ProjectPost, ProjectRef};

/// Key fields of anything numbered within a project.
pub const PROJECT_ITEM_KEYS: &[&str] = &["project", "number"];

// ---------------------------------------------------------------------------
// ProjectItemRef
// ---------------------------------------------------------------------------

/// Full key of an antigen, nanobody or ELISA plate.
///
/// Renders as `<project>:<number>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProjectItemRef {
    pub project: String,
    pub number: u32,
}

impl ProjectItemRef {
    pub fn new(project: impl Into<String>, number: u32) -> Self {
        Self {
            project: project.into(),
            number,
        }
    }
}

impl KeyFields for ProjectItemRef {
    fn key_field(&self, field: &str) -> Option<KeyValue<'_>> {
        match field {
            "project" => Some(KeyValue::Text(&self.project)),
            "number" => Some(KeyValue::Number(self.number)),
            _ => None,
        }
    }
}

impl fmt::Display for ProjectItemRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.project, self.number)
    }
}

impl FromStr for ProjectItemRef {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CoreError::InvalidReference {
            kind: "project item",
            value: s.to_string(),
        };
        let (project, number) = s.rsplit_once(':').ok_or_else(invalid)?;
        if project.is_empty() {
            return Err(invalid());
        }
        let number = number.parse().map_err(|_| invalid())?;
        Ok(Self::new(project, number))
    }
}

// ---------------------------------------------------------------------------
// ProjectItemFilter
// ---------------------------------------------------------------------------

/// Partial key of an antigen, nanobody or ELISA plate.
///
/// Serializes to query parameters with unset fields omitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProjectItemFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number: Option<u32>,
}

impl ProjectItemFilter {
    /// Everything in one project.
    pub fn project(project: impl Into<String>) -> Self {
        Self {
            project: Some(project.into()),
            number: None,
        }
    }
}

impl KeyFields for ProjectItemFilter {
    fn key_field(&self, field: &str) -> Option<KeyValue<'_>> {
        match field {
            "project" => self.project.as_deref().map(KeyValue::Text),
            "number" => self.number.map(KeyValue::Number),
            _ => None,
        }
    }
}

impl From<ProjectItemRef> for ProjectItemFilter {
    fn from(item: ProjectItemRef) -> Self {
        Self {
            project: Some(item.project),
            number: Some(item.number),
        }
    }
}
