//! # User Administration Module
//!
//! Account management for administrators, under `/api/users`:
//! - `GET /`: every account (`list`).
//! - `POST /`: new account (`add`).
//! - `GET /audit?limit=`: newest entries of the user database's audit log
//!   (`audit`).
//! - `PUT /{id}` and `DELETE /{id}`: change or remove an account (`update`,
//!   `delete`).
//! - `PUT /{id}/permissions/{source}`: per-source grants for `user`-role
//!   accounts (`permissions`).
//!
//! Every change is written to the user database's audit log. Sessions that
//! are already open keep the permissions they were created with.

mod add;
mod audit;
mod delete;
mod list;
mod permissions;
mod update;

use crate::auth::UserDirectory;
use crate::error::{StoreError, StoreResult};
use actix_web::web::{delete, get, post, put, scope};
use actix_web::Scope;
use common::model::user::Session;

const API_PATH: &str = "/api/users";

pub fn configure_routes() -> Scope {
    scope(API_PATH)
        .route("", get().to(list::process))
        .route("", post().to(add::process))
        .route("/audit", get().to(audit::process))
        .route("/{id}", put().to(update::process))
        .route("/{id}", delete().to(delete::process))
        .route("/{id}/permissions/{source}", put().to(permissions::process))
}

/// Writes an administrative change to the user database's audit log. The
/// change itself is already committed when this runs.
fn record_change(users: &UserDirectory, admin: &Session, action: String) -> StoreResult<()> {
    users
        .audit()
        .append(admin.user_id, &admin.username, &action)
        .map(|_| ())
        .map_err(|e| StoreError::AuditFailed {
            action,
            source: Box::new(e),
        })
}
