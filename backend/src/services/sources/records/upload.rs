//! # Working table upload
//!
//! `PUT /api/sources/{source}/records/upload` takes `multipart/form-data`
//! with a `file` field holding a CSV spreadsheet, and replaces the working
//! table with its rows exactly like `PUT /records` does, audit entry
//! included.

use super::SAVE;
use crate::auth::session::SessionState;
use crate::config::Config;
use crate::error::StoreResult;
use crate::interchange::records_from_csv;
use crate::services::sources::form::read_upload;
use crate::services::{audited, authorize, blocking, open_source};
use actix_multipart::Multipart;
use actix_web::{web, HttpRequest, HttpResponse};
use common::model::user::Capability;
use serde_json::json;

pub(crate) async fn process(
    req: HttpRequest,
    source: web::Path<String>,
    config: web::Data<Config>,
    sessions: web::Data<SessionState>,
    payload: Multipart,
) -> StoreResult<HttpResponse> {
    let source = source.into_inner();
    let session = authorize(&req, &sessions, &config, &source, Capability::Edit).await?;

    let data = read_upload(payload).await?.file;
    let config = config.get_ref().clone();
    let written = blocking(move || {
        let records = records_from_csv(&data)?;
        let mut store = open_source(&config, &source)?;
        audited(&mut store, &session, SAVE, |s| s.records().replace_all(&records))
    })
    .await?;
    log::info!("Working table replaced from upload ({} rows)", written);
    Ok(HttpResponse::Ok().json(json!({ "rows": written })))
}
