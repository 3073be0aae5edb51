use thiserror::Error;

#[derive(Error, Debug)]
pub enum TallyError {
    #[error("invalid {field}: {message}")]
    Validation { field: &'static str, message: String },

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("database error: {0}")]
    DataAccess(#[from] sqlx::Error),
}

pub type Result<T> = std::result::Result<T, TallyError>;

impl TallyError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        TallyError::Validation {
            field,
            message: message.into(),
        }
    }

    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        TallyError::NotFound {
            entity,
            id: id.into(),
        }
    }
}
