use crate::auth::session::SessionState;
use crate::config::Config;
use crate::error::StoreResult;
use crate::services::{authorize, blocking, open_source};
use crate::store::audit::Watermark;
use crate::store::parse_timestamp;
use actix_web::{web, HttpRequest, HttpResponse};
use common::model::user::Capability;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub(crate) struct TailQuery {
    since: Option<String>,
    after_id: Option<i64>,
}

/// `GET /api/sources/{source}/audit?since=&after_id=`
///
/// Entries strictly newer than `since` (UTC), oldest first; all of them when
/// `since` is absent. Clients that also pass back the id of the last entry
/// they received get later entries sharing its timestamp too.
pub(crate) async fn process(
    req: HttpRequest,
    source: web::Path<String>,
    query: web::Query<TailQuery>,
    config: web::Data<Config>,
    sessions: web::Data<SessionState>,
) -> StoreResult<HttpResponse> {
    let source = source.into_inner();
    authorize(&req, &sessions, &config, &source, Capability::View).await?;
    let TailQuery { since, after_id } = query.into_inner();
    let since = since
        .filter(|s| !s.trim().is_empty())
        .map(|s| parse_timestamp(s.trim()))
        .transpose()?;

    let config = config.get_ref().clone();
    let entries = blocking(move || {
        let store = open_source(&config, &source)?;
        match (since, after_id) {
            (Some(timestamp), Some(id)) => {
                store.audit().tail_after(Some(Watermark { timestamp, id }))
            }
            (since, _) => store.audit().tail(since),
        }
    })
    .await?;
    Ok(HttpResponse::Ok().json(entries))
}
