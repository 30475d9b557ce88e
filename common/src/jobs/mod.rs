use serde::{Deserialize, Serialize};

/// Status of a background job, as last reported by the job itself.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum JobStatus {
    Pending,
    InProgress(u32),
    Completed(String),
    Failed(String),
}
