use crate::auth::session::SessionState;
use crate::config::Config;
use crate::error::{StoreError, StoreResult};
use crate::services::{authorize, blocking, open_source};
use crate::store::report::summarize;
use actix_web::{web, HttpRequest, HttpResponse};
use chrono::NaiveDate;
use common::model::user::Capability;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub(crate) struct ReportQuery {
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
}

/// `GET /api/sources/{source}/report?start=&end=`
///
/// Summarizes the working table, restricted to rows created between `start`
/// and `end` (inclusive) when both are given. Giving only one bound is a bad
/// request.
pub(crate) async fn process(
    req: HttpRequest,
    source: web::Path<String>,
    range: web::Query<ReportQuery>,
    config: web::Data<Config>,
    sessions: web::Data<SessionState>,
) -> StoreResult<HttpResponse> {
    let source = source.into_inner();
    authorize(&req, &sessions, &config, &source, Capability::View).await?;

    let range = match (range.start, range.end) {
        (Some(start), Some(end)) if start <= end => Some((start, end)),
        (Some(_), Some(_)) => {
            return Err(StoreError::InvalidRequest("start is after end".into()))
        }
        (None, None) => None,
        _ => {
            return Err(StoreError::InvalidRequest(
                "start and end must be given together".into(),
            ))
        }
    };

    let config = config.get_ref().clone();
    let report = blocking(move || {
        let mut store = open_source(&config, &source)?;
        let records = match range {
            Some((start, end)) => store.records().load_between(start, end)?,
            None => store.records().load()?,
        };
        Ok(summarize(&records))
    })
    .await?;
    Ok(HttpResponse::Ok().json(report))
}
