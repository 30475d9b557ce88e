//! # Working table save
//!
//! `PUT /api/sources/{source}/records` takes a full `RecordSet` and replaces
//! the source's working table with it. The replacement is a single
//! transaction: on any failure (bad column name, ragged row) the previous
//! table is left as it was. The outcome is written to the source's audit log
//! as `Saved to Database` or `Failed to Save Database: <error>`.

use crate::auth::session::SessionState;
use crate::config::Config;
use crate::error::StoreResult;
use super::SAVE;
use crate::services::{audited, authorize, blocking, open_source};
use actix_web::{web, HttpRequest, HttpResponse};
use common::model::user::Capability;
use common::requests::SaveRecordsRequest;
use serde_json::json;

pub(crate) async fn process(
    req: HttpRequest,
    source: web::Path<String>,
    config: web::Data<Config>,
    sessions: web::Data<SessionState>,
    payload: web::Json<SaveRecordsRequest>,
) -> StoreResult<HttpResponse> {
    let source = source.into_inner();
    let session = authorize(&req, &sessions, &config, &source, Capability::Edit).await?;

    let config = config.get_ref().clone();
    let records = payload.into_inner().records;
    let written = blocking(move || {
        let mut store = open_source(&config, &source)?;
        audited(&mut store, &session, SAVE, |s| s.records().replace_all(&records))
    })
    .await?;
    Ok(HttpResponse::Ok().json(json!({ "rows": written })))
}
