use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: i64 },

    #[error("{0}")]
    InvalidInput(String),

    /// A caller-supplied id could not be resolved. Joins never raise this;
    /// malformed keys inside stored records are skipped instead.
    #[error("malformed reference: {field}")]
    MalformedReference { field: String },
}

impl EngineError {
    pub fn invalid(message: impl Into<String>) -> Self {
        EngineError::InvalidInput(message.into())
    }

    pub fn code(&self) -> &'static str {
        match self {
            EngineError::NotFound { .. } => "not_found",
            EngineError::InvalidInput(_) | EngineError::MalformedReference { .. } => "bad_params",
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
