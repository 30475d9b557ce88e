use super::record_change;
use crate::auth::session::SessionState;
use crate::auth::UserDirectory;
use crate::config::Config;
use crate::error::StoreResult;
use crate::services::{blocking, require_admin};
use actix_web::{web, HttpRequest, HttpResponse};
use common::requests::UserRequest;

/// `POST /api/users`: creates an account. A taken username is a bad request.
pub(crate) async fn process(
    req: HttpRequest,
    config: web::Data<Config>,
    sessions: web::Data<SessionState>,
    payload: web::Json<UserRequest>,
) -> StoreResult<HttpResponse> {
    let admin = require_admin(&req, &sessions).await?;
    let UserRequest {
        username,
        password,
        role,
    } = payload.into_inner();
    let path = config.auth_path();
    let user = blocking(move || {
        let users = UserDirectory::open(&path)?;
        let user = users.add_user(&username, &password, role)?;
        record_change(&users, &admin, format!("Added user {}", user.username))?;
        Ok(user)
    })
    .await?;
    Ok(HttpResponse::Created().json(user))
}
