//! # Spreadsheet import
//!
//! `POST /api/sources/{source}/backups/upload` takes `multipart/form-data`
//! with two fields:
//! - `taken_at`: snapshot time for every imported row.
//! - `file`: a CSV file (comma, semicolon, tab or pipe separated, first line
//!   is the header).
//!
//! The file is parsed in memory, each cell typed as integer, real, text or
//! null, and the rows appended to the backup table the same way
//! `backups/import` does.

use super::{parse_taken_at, IMPORT};
use crate::auth::session::SessionState;
use crate::config::Config;
use crate::error::{StoreError, StoreResult};
use crate::interchange::records_from_csv;
use crate::services::sources::form::read_upload;
use crate::services::{audited, authorize, blocking, open_source};
use actix_multipart::Multipart;
use actix_web::{web, HttpRequest, HttpResponse};
use common::model::user::Capability;

pub(crate) async fn process(
    req: HttpRequest,
    source: web::Path<String>,
    config: web::Data<Config>,
    sessions: web::Data<SessionState>,
    payload: Multipart,
) -> StoreResult<HttpResponse> {
    let source = source.into_inner();
    let session = authorize(&req, &sessions, &config, &source, Capability::Import).await?;

    let form = read_upload(payload).await?;
    let taken_at = form
        .taken_at
        .ok_or_else(|| StoreError::InvalidRequest("missing taken_at field".into()))?;
    let taken_at = parse_taken_at(&taken_at)?;
    let data = form.file;
    let config = config.get_ref().clone();
    let receipt = blocking(move || {
        let records = records_from_csv(&data)?;
        let mut store = open_source(&config, &source)?;
        audited(&mut store, &session, IMPORT, |s| {
            s.backups().import_snapshot(&records, taken_at)
        })
    })
    .await?;
    Ok(HttpResponse::Ok().json(receipt))
}
