use crate::auth::session::SessionState;
use crate::auth::UserDirectory;
use crate::config::Config;
use crate::error::StoreResult;
use crate::services::{blocking, require_admin};
use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;

const DEFAULT_LIMIT: usize = 100;

#[derive(Debug, Deserialize)]
pub(crate) struct AuditQuery {
    limit: Option<usize>,
}

/// `GET /api/users/audit?limit=`: newest logins and account changes first.
pub(crate) async fn process(
    req: HttpRequest,
    query: web::Query<AuditQuery>,
    config: web::Data<Config>,
    sessions: web::Data<SessionState>,
) -> StoreResult<HttpResponse> {
    require_admin(&req, &sessions).await?;
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT);
    let path = config.auth_path();
    let entries = blocking(move || {
        let users = UserDirectory::open(&path)?;
        users.audit().recent(limit)
    })
    .await?;
    Ok(HttpResponse::Ok().json(entries))
}
