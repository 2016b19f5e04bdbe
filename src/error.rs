#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Invalid record: {0}")]
    Validation(String),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("{0} not found")]
    NotFound(String),
    #[error("Invalid image data: {0}")]
    Decode(#[from] image::ImageError),
}

pub type StoreResult<T> = Result<T, StoreError>;
