use crate::auth::session::SessionState;
use crate::config::Config;
use crate::error::StoreResult;
use crate::services::{authorize, blocking, open_source};
use actix_web::{web, HttpRequest, HttpResponse};
use common::model::user::Capability;

/// Actix web handler for `GET /api/sources/{source}/records`.
///
/// Returns the working table as a `RecordSet`; an empty set if nothing was
/// ever saved.
pub(crate) async fn process(
    req: HttpRequest,
    source: web::Path<String>,
    config: web::Data<Config>,
    sessions: web::Data<SessionState>,
) -> StoreResult<HttpResponse> {
    let source = source.into_inner();
    authorize(&req, &sessions, &config, &source, Capability::View).await?;

    let config = config.get_ref().clone();
    let records = blocking(move || {
        let mut store = open_source(&config, &source)?;
        store.records().load()
    })
    .await?;
    Ok(HttpResponse::Ok().json(records))
}
