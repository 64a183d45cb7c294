#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Invalid {kind} reference: '{value}'")]
    InvalidReference { kind: &'static str, value: String },
}
