use serde::{Deserialize, Serialize};

/// Broad category of a failed operation, as reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Busy, locked or unreachable store. Retrying later may succeed.
    Transient,
    Storage,
    DataShape,
    /// The action went through but its audit entry could not be written.
    Logging,
    Denied,
    NotFound,
    InvalidRequest,
    Internal,
}

/// Structured failure body returned by every endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Failure {
    pub kind: ErrorKind,
    pub message: String,
}
