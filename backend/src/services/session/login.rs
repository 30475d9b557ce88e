use crate::auth::session::SessionState;
use crate::auth::UserDirectory;
use crate::config::Config;
use crate::error::{StoreError, StoreResult};
use crate::services::blocking;
use actix_web::{web, HttpResponse};
use common::requests::LoginRequest;

/// Actix web handler for `POST /api/session/login`.
///
/// On success the new session is stored in `SessionState` and returned as
/// JSON. Wrong credentials give `403` and leave nothing behind apart from a
/// `Failed login attempt` entry in the user database's audit log.
pub(crate) async fn process(
    config: web::Data<Config>,
    sessions: web::Data<SessionState>,
    payload: web::Json<LoginRequest>,
) -> StoreResult<HttpResponse> {
    let LoginRequest { username, password } = payload.into_inner();
    let path = config.auth_path();
    let session = blocking(move || {
        let users = UserDirectory::open(&path)?;
        match users.authenticate(&username, &password) {
            Ok(session) => {
                users
                    .audit()
                    .append(session.user_id, &session.username, "Logged in")?;
                Ok(session)
            }
            Err(err @ StoreError::Denied(_)) => {
                if let Err(e) = users.audit().append(0, &username, "Failed login attempt") {
                    log::error!("Could not record failed login: {}", e);
                }
                log::warn!("Rejected login for '{}'", username);
                Err(err)
            }
            Err(err) => Err(err),
        }
    })
    .await?;

    log::info!("User '{}' logged in", session.username);
    sessions.insert(session.clone()).await;
    Ok(HttpResponse::Ok().json(session))
}
