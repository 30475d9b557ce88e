use crate::auth::session::SessionState;
use crate::config::Config;
use crate::error::{StoreError, StoreResult};
use crate::job_controller::state::DataViews;
use crate::services::authorize;
use actix_web::{web, HttpRequest, HttpResponse};
use common::model::user::Capability;

/// `GET /api/sources/{source}/view`: the cached working table together with
/// its fingerprint. Clients compare the fingerprint to decide whether to
/// redraw. `404` until the refresh watcher has published the source once.
pub(crate) async fn process(
    req: HttpRequest,
    source: web::Path<String>,
    config: web::Data<Config>,
    sessions: web::Data<SessionState>,
    views: web::Data<DataViews>,
) -> StoreResult<HttpResponse> {
    let source = source.into_inner();
    authorize(&req, &sessions, &config, &source, Capability::View).await?;
    match views.get(&source).await {
        Some(view) => Ok(HttpResponse::Ok().json(view)),
        None => Err(StoreError::NotFound(format!(
            "no view published for '{}' yet",
            source
        ))),
    }
}
