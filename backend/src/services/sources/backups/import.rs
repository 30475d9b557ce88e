use super::{parse_taken_at, IMPORT};
use crate::auth::session::SessionState;
use crate::config::Config;
use crate::error::StoreResult;
use crate::services::{audited, authorize, blocking, open_source};
use actix_web::{web, HttpRequest, HttpResponse};
use common::model::user::Capability;
use common::requests::ImportSnapshotRequest;

/// `POST /api/sources/{source}/backups/import`
///
/// Appends the given rows to the backup table tagged with `taken_at`.
/// Existing rows of that date stay in place.
pub(crate) async fn process(
    req: HttpRequest,
    source: web::Path<String>,
    config: web::Data<Config>,
    sessions: web::Data<SessionState>,
    payload: web::Json<ImportSnapshotRequest>,
) -> StoreResult<HttpResponse> {
    let source = source.into_inner();
    let session = authorize(&req, &sessions, &config, &source, Capability::Import).await?;

    let payload = payload.into_inner();
    let taken_at = parse_taken_at(&payload.taken_at)?;
    let records = payload.records;
    let config = config.get_ref().clone();
    let receipt = blocking(move || {
        let mut store = open_source(&config, &source)?;
        audited(&mut store, &session, IMPORT, |s| {
            s.backups().import_snapshot(&records, taken_at)
        })
    })
    .await?;
    Ok(HttpResponse::Ok().json(receipt))
}
