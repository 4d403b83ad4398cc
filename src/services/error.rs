use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    Conflict(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ServiceError {
    pub fn document_not_found() -> Self {
        Self::NotFound("Document not found".to_string())
    }

    pub fn bookmark_not_found() -> Self {
        Self::NotFound("Bookmark not found".to_string())
    }
}
