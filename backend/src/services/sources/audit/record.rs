use crate::auth::session::SessionState;
use crate::config::Config;
use crate::error::StoreResult;
use crate::services::{authorize, blocking, open_source};
use actix_web::{web, HttpRequest, HttpResponse};
use common::model::user::Capability;
use common::requests::RecordActionRequest;

/// `POST /api/sources/{source}/audit`: records an action performed on the
/// client side (e.g. a cell edit) under the caller's name. Any session that
/// may view the source may record actions on it.
pub(crate) async fn process(
    req: HttpRequest,
    source: web::Path<String>,
    config: web::Data<Config>,
    sessions: web::Data<SessionState>,
    payload: web::Json<RecordActionRequest>,
) -> StoreResult<HttpResponse> {
    let source = source.into_inner();
    let session = authorize(&req, &sessions, &config, &source, Capability::View).await?;

    let action = payload.into_inner().action;
    let config = config.get_ref().clone();
    let entry = blocking(move || {
        let store = open_source(&config, &source)?;
        store
            .audit()
            .append(session.user_id, &session.username, &action)
    })
    .await?;
    Ok(HttpResponse::Created().json(entry))
}
