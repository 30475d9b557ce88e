use crate::auth::session::SessionState;
use crate::config::Config;
use crate::error::StoreResult;
use crate::services::{audited, authorize, blocking, open_source, Action};
use actix_web::http::header::{ContentDisposition, DispositionParam, DispositionType};
use actix_web::{web, HttpRequest, HttpResponse};
use chrono::Local;
use common::model::user::Capability;
use std::fs;

const DOWNLOAD: Action = Action {
    done: "Downloaded Backup",
    attempted: "Download Backup",
};

/// `POST /api/sources/{source}/backups/export`
///
/// Returns a consistent copy of the source database as an attachment named
/// `<source>-<timestamp>.db`. The copy is written into a private temporary
/// directory that is removed once the bytes are read, so concurrent exports
/// never collide and nothing is left on disk.
pub(crate) async fn process(
    req: HttpRequest,
    source: web::Path<String>,
    config: web::Data<Config>,
    sessions: web::Data<SessionState>,
) -> StoreResult<HttpResponse> {
    let source = source.into_inner();
    let session = authorize(&req, &sessions, &config, &source, Capability::Export).await?;

    let filename = format!("{}-{}.db", source, Local::now().format("%Y%m%d-%H%M%S"));
    let config = config.get_ref().clone();
    let body = blocking(move || {
        let scratch = tempfile::Builder::new().prefix("daybook-export").tempdir()?;
        let dest = scratch.path().join("export.db");
        let mut store = open_source(&config, &source)?;
        audited(&mut store, &session, DOWNLOAD, |s| s.export_to(&dest))?;
        let bytes = fs::read(&dest)?;
        Ok(bytes)
    })
    .await?;

    Ok(HttpResponse::Ok()
        .content_type("application/vnd.sqlite3")
        .insert_header(ContentDisposition {
            disposition: DispositionType::Attachment,
            parameters: vec![DispositionParam::Filename(filename)],
        })
        .body(body))
}
