use crate::auth::session::SessionState;
use crate::config::Config;
use crate::error::StoreResult;
use crate::services::{audited, authorize_all, blocking, open_source, Action};
use actix_web::{web, HttpRequest, HttpResponse};
use chrono::Local;
use common::model::user::Capability;

const BACKUP: Action = Action {
    done: "Saved to Backup",
    attempted: "Save Backup",
};

/// `POST /api/sources/{source}/backups`: snapshots the working table under
/// today's date, replacing any earlier snapshot of the same day. Since that
/// discards the earlier rows, the caller needs `Delete` as well as `Backup`.
pub(crate) async fn process(
    req: HttpRequest,
    source: web::Path<String>,
    config: web::Data<Config>,
    sessions: web::Data<SessionState>,
) -> StoreResult<HttpResponse> {
    let source = source.into_inner();
    let session = authorize_all(
        &req,
        &sessions,
        &config,
        &source,
        &[Capability::Backup, Capability::Delete],
    )
    .await?;

    let config = config.get_ref().clone();
    let receipt = blocking(move || {
        let mut store = open_source(&config, &source)?;
        audited(&mut store, &session, BACKUP, |s| {
            s.backups().snapshot_working_table(Local::now().naive_local())
        })
    })
    .await?;
    Ok(HttpResponse::Ok().json(receipt))
}
