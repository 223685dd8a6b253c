use thiserror::Error;

#[derive(Error, Debug)]
pub enum FunnelError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid submission: {}", errors.join("; "))]
    Validation { errors: Vec<String> },

    #[error("Quiz already completed for session '{session_id}'")]
    AlreadyCompleted { session_id: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type FunnelResult<T> = Result<T, FunnelError>;
