use crate::auth::session::SessionState;
use crate::config::Config;
use crate::error::StoreResult;
use crate::services::{audited, authorize, blocking, open_source, Action};
use crate::store::query::run_query;
use actix_web::{web, HttpRequest, HttpResponse};
use common::model::user::Capability;
use common::requests::QueryRequest;

const QUERY: Action = Action {
    done: "Executed SQL Query",
    attempted: "Execute SQL Query",
};

/// `POST /api/sources/{source}/query`: runs one read-only statement and
/// returns its rows. Statements that would write are refused with `403`.
pub(crate) async fn process(
    req: HttpRequest,
    source: web::Path<String>,
    config: web::Data<Config>,
    sessions: web::Data<SessionState>,
    payload: web::Json<QueryRequest>,
) -> StoreResult<HttpResponse> {
    let source = source.into_inner();
    let session = authorize(&req, &sessions, &config, &source, Capability::Query).await?;

    let config = config.get_ref().clone();
    let sql = payload.into_inner().sql;
    let result = blocking(move || {
        let mut store = open_source(&config, &source)?;
        audited(&mut store, &session, QUERY, |s| run_query(s.connection(), &sql))
    })
    .await?;
    Ok(HttpResponse::Ok().json(result))
}
