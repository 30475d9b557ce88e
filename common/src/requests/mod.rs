use crate::model::record::RecordSet;
use crate::model::user::{Role, SourcePermissions};
use serde::{Deserialize, Serialize};

#[derive(Deserialize, Serialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Full replacement of a source's working table.
#[derive(Deserialize, Serialize)]
pub struct SaveRecordsRequest {
    pub records: RecordSet,
}

/// Historical snapshot import. `taken_at` uses `YYYY-MM-DD HH:MM:SS`.
#[derive(Deserialize, Serialize)]
pub struct ImportSnapshotRequest {
    pub taken_at: String,
    pub records: RecordSet,
}

#[derive(Deserialize, Serialize)]
pub struct RecordActionRequest {
    pub action: String,
}

#[derive(Deserialize, Serialize)]
pub struct QueryRequest {
    pub sql: String,
}

#[derive(Deserialize, Serialize)]
pub struct UserRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub role: Option<Role>,
}

#[derive(Deserialize, Serialize)]
pub struct PermissionsRequest {
    pub permissions: SourcePermissions,
}
