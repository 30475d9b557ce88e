use crate::auth::session::SessionState;
use crate::auth::UserDirectory;
use crate::config::Config;
use crate::error::{StoreError, StoreResult};
use crate::services::{blocking, require_session};
use actix_web::{web, HttpRequest, HttpResponse};

/// Actix web handler for `POST /api/session/logout`.
///
/// The session is dropped before the audit entry is written, so a failing
/// audit write still logs the caller out and is reported as such.
pub(crate) async fn process(
    req: HttpRequest,
    config: web::Data<Config>,
    sessions: web::Data<SessionState>,
) -> StoreResult<HttpResponse> {
    let session = require_session(&req, &sessions).await?;
    sessions.remove(&session.token).await;

    let path = config.auth_path();
    blocking(move || {
        let users = UserDirectory::open(&path)?;
        users
            .audit()
            .append(session.user_id, &session.username, "Logged out")
            .map(|_| ())
            .map_err(|e| StoreError::AuditFailed {
                action: "Logged out".into(),
                source: Box::new(e),
            })
    })
    .await?;
    Ok(HttpResponse::NoContent().finish())
}
