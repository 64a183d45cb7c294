//! Projects, keyed by `short_title`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::entity::Entity;
use crate::error::CoreError;
use crate::keys::{KeyFields, KeyValue};

pub const MAX_SHORT_TITLE_LENGTH: usize = 64;
pub const MAX_TITLE_LENGTH: usize = 256;

const PROJECT_KEYS: &[&str] = &["short_title"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub short_title: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProjectRef {
    pub short_title: String,
}

impl ProjectRef {
    pub fn new(short_title: impl Into<String>) -> Self {
        Self {
            short_title: short_title.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProjectFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub short_title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectPost {
    pub short_title: String,
    pub title: String,
    pub description: Option<String>,
}

impl KeyFields for Project {
    fn key_field(&self, field: &str) -> Option<KeyValue<'_>> {
        match field {
            "short_title" => Some(KeyValue::Text(&self.short_title)),
            _ => None,
        }
    }
}

impl KeyFields for ProjectRef {
    fn key_field(&self, field: &str) -> Option<KeyValue<'_>> {
        match field {
            "short_title" => Some(KeyValue::Text(&self.short_title)),
            _ => None,
        }
    }
}

impl KeyFields for ProjectFilter {
    fn key_field(&self, field: &str) -> Option<KeyValue<'_>> {
        match field {
            "short_title" => self.short_title.as_deref().map(KeyValue::Text),
            _ => None,
        }
    }
}

impl From<ProjectRef> for ProjectFilter {
    fn from(project: ProjectRef) -> Self {
        Self {
            short_title: Some(project.short_title),
        }
    }
}

impl fmt::Display for ProjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.short_title)
    }
}

impl FromStr for ProjectRef {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(CoreError::InvalidReference {
                kind: "project",
                value: s.to_string(),
            });
        }
        Ok(Self::new(s))
    }
}

impl Entity for Project {
    type Ref = ProjectRef;
    type Filter = ProjectFilter;
    type Post = ProjectPost;

    const ENDPOINT: &'static str = "project";
    const KEY_FIELDS: &'static [&'static str] = PROJECT_KEYS;
    const LABEL: &'static str = "project";

    fn key(&self) -> ProjectRef {
        ProjectRef::new(self.short_title.clone())
    }

    fn validate_post(post: &ProjectPost) -> Result<(), CoreError> {
        validate_short_title(&post.short_title)?;
        if post.title.trim().is_empty() {
            return Err(CoreError::Validation(
                "Project title must not be empty".to_string(),
            ));
        }
        if post.title.len() > MAX_TITLE_LENGTH {
            return Err(CoreError::Validation(format!(
                "Project title exceeds maximum length of {MAX_TITLE_LENGTH} characters"
            )));
        }
        Ok(())
    }
}

/// Short titles appear in references, so ':' and '/' are not allowed.
pub fn validate_short_title(short_title: &str) -> Result<(), CoreError> {
    if short_title.trim().is_empty() {
        return Err(CoreError::Validation(
            "Project short title must not be empty".to_string(),
        ));
    }
    if short_title.len() > MAX_SHORT_TITLE_LENGTH {
        return Err(CoreError::Validation(format!(
            "Project short title exceeds maximum length of {MAX_SHORT_TITLE_LENGTH} characters"
        )));
    }
    if short_title.contains([':', '/']) {
        return Err(CoreError::Validation(format!(
            "Project short title must not contain ':' or '/', got '{short_title}'"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn post(short_title: &str, title: &str) -> ProjectPost {
        ProjectPost {
            short_title: short_title.to_string(),
            title: title.to_string(),
            description: None,
        }
    }

    #[test]
    fn deserializes_api_payload() {
        let project: Project = serde_json::from_value(serde_json::json!({
            "short_title": "test",
            "title": "test",
            "description": "test",
        }))
        .unwrap();
        assert_eq!(project.key(), ProjectRef::new("test"));
        assert_eq!(project.description.as_deref(), Some("test"));
    }

    #[test]
    fn null_description_is_accepted() {
        let project: Project = serde_json::from_value(serde_json::json!({
            "short_title": "t",
            "title": "T",
            "description": null,
        }))
        .unwrap();
        assert!(project.description.is_none());
    }

    #[test]
    fn valid_post_passes() {
        assert!(Project::validate_post(&post("nb-2024", "Nanobody screen")).is_ok());
    }

    #[test]
    fn post_rejects_empty_and_long_short_titles() {
        assert_matches!(
            Project::validate_post(&post("", "Title")),
            Err(CoreError::Validation(_))
        );
        let long = "x".repeat(MAX_SHORT_TITLE_LENGTH + 1);
        assert!(Project::validate_post(&post(&long, "Title")).is_err());
    }

    #[test]
    fn post_rejects_reference_separators() {
        assert!(Project::validate_post(&post("a:b", "Title")).is_err());
        assert!(Project::validate_post(&post("a/b", "Title")).is_err());
    }

    #[test]
    fn post_rejects_blank_title() {
        assert!(Project::validate_post(&post("ok", "  ")).is_err());
    }
}
