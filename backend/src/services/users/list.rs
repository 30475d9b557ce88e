use crate::auth::session::SessionState;
use crate::auth::UserDirectory;
use crate::config::Config;
use crate::error::StoreResult;
use crate::services::{blocking, require_admin};
use actix_web::{web, HttpRequest, HttpResponse};

pub(crate) async fn process(
    req: HttpRequest,
    config: web::Data<Config>,
    sessions: web::Data<SessionState>,
) -> StoreResult<HttpResponse> {
    require_admin(&req, &sessions).await?;
    let path = config.auth_path();
    let users = blocking(move || {
        let users = UserDirectory::open(&path)?;
        users.list_users()
    })
    .await?;
    Ok(HttpResponse::Ok().json(users))
}
