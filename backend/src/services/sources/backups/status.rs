use crate::auth::session::SessionState;
use crate::config::Config;
use crate::error::StoreResult;
use crate::job_controller::daily_backup::job_id;
use crate::job_controller::state::JobsState;
use crate::services::authorize;
use actix_web::{web, HttpRequest, HttpResponse};
use common::jobs::JobStatus;
use common::model::user::Capability;
use serde_json::json;

/// `GET /api/sources/{source}/backups/status`: what the daily backup job last
/// reported for this source. `Pending` until its first run finishes.
pub(crate) async fn process(
    req: HttpRequest,
    source: web::Path<String>,
    config: web::Data<Config>,
    sessions: web::Data<SessionState>,
    state: web::Data<JobsState>,
) -> StoreResult<HttpResponse> {
    let source = source.into_inner();
    authorize(&req, &sessions, &config, &source, Capability::View).await?;

    let job_id = job_id(&source);
    let status = state
        .jobs
        .read()
        .await
        .get(&job_id)
        .cloned()
        .unwrap_or(JobStatus::Pending);
    Ok(HttpResponse::Ok().json(json!({ "job_id": job_id, "status": status })))
}
