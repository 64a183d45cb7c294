//! Antigens, numbered within a project.
//!
//! Antigens are created through one of two endpoints: `local_antigen` for
//! a locally entered sequence, or `uniprot_antigen` for a UniProt
//! accession. Either response carries the new antigen's key, and the
//! canonical record is then read back from `antigen`.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::entities::{ElisaWellRef, ProjectItemFilter, ProjectItemRef, PROJECT_ITEM_KEYS};
use crate::entity::{CreateRoute, Entity};
use crate::error::CoreError;
use crate::keys::{KeyFields, KeyValue};
use crate::types::Timestamp;

/// One-letter amino acid codes accepted in a sequence.
pub const AMINO_CODE_PATTERN: &str = r"^[ARNDCHIQEGLKMFPSTWYV]+$";

/// UniProt accession number format.
pub const UNIPROT_ACCESSION_PATTERN: &str =
    r"^([OPQ][0-9][A-Z0-9]{3}[0-9]|[A-NR-Z][0-9]([A-Z][A-Z0-9]{2}[0-9]){1,2})$";

static AMINO_CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(AMINO_CODE_PATTERN).expect("valid regex"));

static UNIPROT_ACCESSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(UNIPROT_ACCESSION_PATTERN).expect("valid regex"));

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Antigen {
    pub project: String,
    pub number: u32,
    /// Server-generated display name.
    pub name: String,
    #[serde(default)]
    pub sequence: Option<String>,
    #[serde(default)]
    pub molecular_mass: Option<u32>,
    #[serde(default)]
    pub uniprot_accession_number: Option<String>,
    #[serde(default)]
    pub elisawell_set: Vec<ElisaWellRef>,
    pub creation_time: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocalAntigenPost {
    pub project: String,
    pub sequence: String,
    pub molecular_mass: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UniProtAntigenPost {
    pub project: String,
    pub uniprot_accession_number: String,
}

/// Body of an antigen create request; serializes as the inner payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AntigenPost {
    Local(LocalAntigenPost),
    UniProt(UniProtAntigenPost),
}

impl KeyFields for Antigen {
    fn key_field(&self, field: &str) -> Option<KeyValue<'_>> {
        match field {
            "project" => Some(KeyValue::Text(&self.project)),
            "number" => Some(KeyValue::Number(self.number)),
            _ => None,
        }
    }
}

impl Entity for Antigen {
    type Ref = ProjectItemRef;
    type Filter = ProjectItemFilter;
    type Post = AntigenPost;

    const ENDPOINT: &'static str = "antigen";
    const KEY_FIELDS: &'static [&'static str] = PROJECT_ITEM_KEYS;
    const LABEL: &'static str = "antigen";

    fn key(&self) -> ProjectItemRef {
        ProjectItemRef::new(self.project.clone(), self.number)
    }

    fn create_route(post: &AntigenPost) -> CreateRoute {
        match post {
            AntigenPost::Local(_) => CreateRoute::refetch("local_antigen"),
            AntigenPost::UniProt(_) => CreateRoute::refetch("uniprot_antigen"),
        }
    }

    fn validate_post(post: &AntigenPost) -> Result<(), CoreError> {
        match post {
            AntigenPost::Local(local) => {
                validate_sequence(&local.sequence)?;
                if local.molecular_mass == 0 {
                    return Err(CoreError::Validation(
                        "Molecular mass must be greater than zero".to_string(),
                    ));
                }
                Ok(())
            }
            AntigenPost::UniProt(uniprot) => {
                validate_uniprot_accession(&uniprot.uniprot_accession_number)
            }
        }
    }
}

/// Sequences must be non-empty and use one-letter amino acid codes only.
pub fn validate_sequence(sequence: &str) -> Result<(), CoreError> {
    if !AMINO_CODE_RE.is_match(sequence) {
        return Err(CoreError::Validation(format!(
            "Sequence must consist of amino acid codes (ARNDCHIQEGLKMFPSTWYV), got '{sequence}'"
        )));
    }
    Ok(())
}

pub fn validate_uniprot_accession(accession: &str) -> Result<(), CoreError> {
    if !UNIPROT_ACCESSION_RE.is_match(accession) {
        return Err(CoreError::Validation(format!(
            "'{accession}' is not a valid UniProt accession number"
        )));
    }
    Ok(())
}
