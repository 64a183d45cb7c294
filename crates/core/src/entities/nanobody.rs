//! Nanobodies, numbered within a project.

use serde::{Deserialize, Serialize};

use crate::entities::project::validate_short_title;
use crate::entities::{ElisaWellRef, ProjectItemFilter, ProjectItemRef, PROJECT_ITEM_KEYS};
use crate::entity::Entity;
use crate::error::CoreError;
use crate::keys::{KeyFields, KeyValue};
use crate::types::Timestamp;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Nanobody {
    pub project: String,
    pub number: u32,
    pub name: String,
    #[serde(default)]
    pub elisawell_set: Vec<ElisaWellRef>,
    pub creation_time: Timestamp,
}

/// The server assigns the number and name; only the project is posted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NanobodyPost {
    pub project: String,
}

impl KeyFields for Nanobody {
    fn key_field(&self, field: &str) -> Option<KeyValue<'_>> {
        match field {
            "project" => Some(KeyValue::Text(&self.project)),
            "number" => Some(KeyValue::Number(self.number)),
            _ => None,
        }
    }
}

impl Entity for Nanobody {
    type Ref = ProjectItemRef;
    type Filter = ProjectItemFilter;
    type Post = NanobodyPost;

    const ENDPOINT: &'static str = "nanobody";
    const KEY_FIELDS: &'static [&'static str] = PROJECT_ITEM_KEYS;
    const LABEL: &'static str = "nanobody";

    fn key(&self) -> ProjectItemRef {
        ProjectItemRef::new(self.project.clone(), self.number)
    }

    fn validate_post(post: &NanobodyPost) -> Result<(), CoreError> {
        validate_short_title(&post.project)
    }
}
