use crate::auth::session::SessionState;
use crate::config::Config;
use crate::error::StoreResult;
use crate::interchange::records_to_csv;
use crate::services::{audited, authorize, blocking, open_source, Action};
use actix_web::http::header::{ContentDisposition, DispositionParam, DispositionType};
use actix_web::{web, HttpRequest, HttpResponse};
use common::model::user::Capability;

const EXPORT: Action = Action {
    done: "Downloaded CSV",
    attempted: "Download CSV",
};

/// `GET /api/sources/{source}/records/export`: the working table as a CSV
/// attachment named after the source.
pub(crate) async fn process(
    req: HttpRequest,
    source: web::Path<String>,
    config: web::Data<Config>,
    sessions: web::Data<SessionState>,
) -> StoreResult<HttpResponse> {
    let source = source.into_inner();
    let session = authorize(&req, &sessions, &config, &source, Capability::Export).await?;

    let filename = format!("{}.csv", source);
    let config = config.get_ref().clone();
    let body = blocking(move || {
        let mut store = open_source(&config, &source)?;
        audited(&mut store, &session, EXPORT, |s| {
            let records = s.records().load()?;
            let mut out = Vec::new();
            records_to_csv(&records, &mut out)?;
            Ok(out)
        })
    })
    .await?;

    Ok(HttpResponse::Ok()
        .content_type("text/csv; charset=utf-8")
        .insert_header(ContentDisposition {
            disposition: DispositionType::Attachment,
            parameters: vec![DispositionParam::Filename(filename)],
        })
        .body(body))
}
