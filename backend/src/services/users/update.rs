use super::record_change;
use crate::auth::session::SessionState;
use crate::auth::UserDirectory;
use crate::config::Config;
use crate::error::StoreResult;
use crate::services::{blocking, require_admin};
use actix_web::{web, HttpRequest, HttpResponse};
use common::requests::UserRequest;

/// `PUT /api/users/{id}`: replaces name, password and role of an account.
/// Open sessions of the account are ended. Audit entries written under the
/// old name keep it.
pub(crate) async fn process(
    req: HttpRequest,
    user_id: web::Path<i64>,
    config: web::Data<Config>,
    sessions: web::Data<SessionState>,
    payload: web::Json<UserRequest>,
) -> StoreResult<HttpResponse> {
    let admin = require_admin(&req, &sessions).await?;
    let user_id = user_id.into_inner();
    let UserRequest {
        username,
        password,
        role,
    } = payload.into_inner();
    let path = config.auth_path();
    let user = blocking(move || {
        let users = UserDirectory::open(&path)?;
        let user = users.update_user(user_id, &username, &password, role)?;
        record_change(&users, &admin, format!("Updated user {}", user.username))?;
        Ok(user)
    })
    .await?;
    sessions.remove_user(user_id).await;
    Ok(HttpResponse::Ok().json(user))
}
