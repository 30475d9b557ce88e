use crate::auth::session::SessionState;
use crate::config::Config;
use crate::error::{StoreError, StoreResult};
use crate::services::{authorize, blocking, open_source};
use actix_web::{web, HttpRequest, HttpResponse};
use chrono::NaiveDate;
use common::model::user::Capability;

/// `GET /api/sources/{source}/backups/{date}` with `date` as `YYYY-MM-DD`.
pub(crate) async fn process(
    req: HttpRequest,
    path: web::Path<(String, String)>,
    config: web::Data<Config>,
    sessions: web::Data<SessionState>,
) -> StoreResult<HttpResponse> {
    let (source, raw_date) = path.into_inner();
    authorize(&req, &sessions, &config, &source, Capability::View).await?;
    let date = NaiveDate::parse_from_str(&raw_date, "%Y-%m-%d")
        .map_err(|_| StoreError::InvalidRequest(format!("bad date '{}'", raw_date)))?;

    let config = config.get_ref().clone();
    let snapshot = blocking(move || {
        let mut store = open_source(&config, &source)?;
        store.backups().load_snapshot(date)
    })
    .await?;
    snapshot
        .map(|s| HttpResponse::Ok().json(s))
        .ok_or_else(|| StoreError::NotFound(format!("no snapshot on {}", date)))
}
