use super::record_change;
use crate::auth::session::SessionState;
use crate::auth::UserDirectory;
use crate::config::Config;
use crate::error::StoreResult;
use crate::services::{blocking, require_admin};
use actix_web::{web, HttpRequest, HttpResponse};
use common::requests::PermissionsRequest;

/// `PUT /api/users/{id}/permissions/{source}`: replaces the account's grants
/// on one configured source. Open sessions of the account are ended so the
/// new grants apply from its next login.
pub(crate) async fn process(
    req: HttpRequest,
    path: web::Path<(i64, String)>,
    config: web::Data<Config>,
    sessions: web::Data<SessionState>,
    payload: web::Json<PermissionsRequest>,
) -> StoreResult<HttpResponse> {
    let admin = require_admin(&req, &sessions).await?;
    let (user_id, source) = path.into_inner();
    config.source_path(&source)?;

    let permissions = payload.into_inner().permissions;
    let auth_path = config.auth_path();
    blocking(move || {
        let users = UserDirectory::open(&auth_path)?;
        users.set_permissions(user_id, &source, &permissions)?;
        record_change(
            &users,
            &admin,
            format!("Set permissions for user {} on {}", user_id, source),
        )
    })
    .await?;
    sessions.remove_user(user_id).await;
    Ok(HttpResponse::NoContent().finish())
}
