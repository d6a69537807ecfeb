pub mod availability;
pub mod booking;
pub mod reconcile;
pub mod stay;

#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
}

pub type DomainResult<T> = Result<T, DomainError>;
