//! # Session Service Module
//!
//! - `POST /api/session/login`: checks credentials against the user
//!   database and returns a `Session` whose `token` must be sent back in the
//!   `x-session-token` header.
//! - `POST /api/session/logout`: forgets the caller's session.
//!
//! Both are written to the user database's own audit log.

mod login;
mod logout;

use actix_web::web::{post, scope};
use actix_web::Scope;

const API_PATH: &str = "/api/session";

pub fn configure_routes() -> Scope {
    scope(API_PATH)
        .route("/login", post().to(login::process))
        .route("/logout", post().to(logout::process))
}
