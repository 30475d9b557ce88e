use crate::auth::session::SessionState;
use crate::config::Config;
use crate::error::StoreResult;
use crate::job_controller::state::AuditFeed;
use crate::services::authorize;
use actix_web::{web, HttpRequest, HttpResponse};
use common::model::user::Capability;

/// `GET /api/sources/{source}/audit/feed`: the bounded buffer of entries the
/// background poller has delivered for this source, oldest first.
pub(crate) async fn process(
    req: HttpRequest,
    source: web::Path<String>,
    config: web::Data<Config>,
    sessions: web::Data<SessionState>,
    feed: web::Data<AuditFeed>,
) -> StoreResult<HttpResponse> {
    let source = source.into_inner();
    authorize(&req, &sessions, &config, &source, Capability::View).await?;
    Ok(HttpResponse::Ok().json(feed.entries(&source).await))
}
