use super::record_change;
use crate::auth::session::SessionState;
use crate::auth::UserDirectory;
use crate::config::Config;
use crate::error::{StoreError, StoreResult};
use crate::services::{blocking, require_admin};
use actix_web::{web, HttpRequest, HttpResponse};

/// `DELETE /api/users/{id}`: removes an account and its grants and ends its
/// sessions. An admin cannot delete their own account.
pub(crate) async fn process(
    req: HttpRequest,
    user_id: web::Path<i64>,
    config: web::Data<Config>,
    sessions: web::Data<SessionState>,
) -> StoreResult<HttpResponse> {
    let admin = require_admin(&req, &sessions).await?;
    let user_id = user_id.into_inner();
    if user_id == admin.user_id {
        return Err(StoreError::InvalidRequest(
            "cannot delete the account in use".into(),
        ));
    }
    let path = config.auth_path();
    blocking(move || {
        let mut users = UserDirectory::open(&path)?;
        users.delete_user(user_id)?;
        record_change(&users, &admin, format!("Deleted user {}", user_id))
    })
    .await?;
    sessions.remove_user(user_id).await;
    Ok(HttpResponse::NoContent().finish())
}
