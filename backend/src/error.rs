use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use common::model::failure::{ErrorKind, Failure};
use rusqlite::ErrorCode;
use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Busy, locked or unopenable database. Background tasks retry these on
    /// their next tick.
    #[error("storage unavailable: {0}")]
    Unavailable(#[source] rusqlite::Error),

    #[error("storage error: {0}")]
    Storage(#[source] rusqlite::Error),

    #[error("invalid data shape: {0}")]
    Shape(String),

    #[error("`{action}` succeeded but its audit entry was not written: {source}")]
    AuditFailed {
        action: String,
        source: Box<StoreError>,
    },

    #[error("access denied: {0}")]
    Denied(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("i/o failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv failure: {0}")]
    Csv(#[from] csv::Error),

    #[error("background task failed: {0}")]
    Join(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(error: rusqlite::Error) -> Self {
        if is_transient(&error) {
            StoreError::Unavailable(error)
        } else {
            StoreError::Storage(error)
        }
    }
}

impl From<tokio::task::JoinError> for StoreError {
    fn from(error: tokio::task::JoinError) -> Self {
        StoreError::Join(error.to_string())
    }
}

fn is_transient(error: &rusqlite::Error) -> bool {
    matches!(
        error.sqlite_error_code(),
        Some(ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked | ErrorCode::CannotOpen)
    )
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::Unavailable(_) => ErrorKind::Transient,
            StoreError::Storage(_) | StoreError::Io(_) => ErrorKind::Storage,
            StoreError::Shape(_) | StoreError::Csv(_) => ErrorKind::DataShape,
            StoreError::AuditFailed { .. } => ErrorKind::Logging,
            StoreError::Denied(_) => ErrorKind::Denied,
            StoreError::NotFound(_) => ErrorKind::NotFound,
            StoreError::InvalidRequest(_) => ErrorKind::InvalidRequest,
            StoreError::Join(_) => ErrorKind::Internal,
        }
    }

    pub fn is_transient(&self) -> bool {
        self.kind() == ErrorKind::Transient
    }

    pub fn to_failure(&self) -> Failure {
        Failure {
            kind: self.kind(),
            message: self.to_string(),
        }
    }
}

impl ResponseError for StoreError {
    fn status_code(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::Transient => StatusCode::SERVICE_UNAVAILABLE,
            ErrorKind::DataShape | ErrorKind::InvalidRequest => StatusCode::BAD_REQUEST,
            ErrorKind::Denied => StatusCode::FORBIDDEN,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Storage | ErrorKind::Logging | ErrorKind::Internal => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(self.to_failure())
    }
}
