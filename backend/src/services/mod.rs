//! # HTTP services
//!
//! Every endpoint lives in its own file with a `process` handler, grouped by
//! the scope it is mounted under:
//! - `sources`: everything under `/api/sources/{source}` (working table,
//!   backups, audit log).
//! - `session`: login and logout.
//! - `users`: account administration, admins only.
//!
//! The helpers below are the request-side gate shared by all of them:
//! resolve the caller's session from the `x-session-token` header, check a
//! capability on a source, run SQLite work off the async runtime and record
//! the outcome in the source's audit log.

pub mod session;
pub mod sources;
pub mod users;

use crate::auth::session::SessionState;
use crate::config::Config;
use crate::error::{StoreError, StoreResult};
use crate::store::StoreHandle;
use actix_web::HttpRequest;
use common::model::user::{Capability, Session};

pub const SESSION_HEADER: &str = "x-session-token";

/// Runs blocking SQLite work on the blocking pool.
pub(crate) async fn blocking<T, F>(work: F) -> StoreResult<T>
where
    F: FnOnce() -> StoreResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work).await?
}

/// The session behind the request's token, or `Denied`.
pub(crate) async fn require_session(req: &HttpRequest, sessions: &SessionState) -> StoreResult<Session> {
    let token = req
        .headers()
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| StoreError::Denied("missing session token".into()))?;
    sessions
        .get(token)
        .await
        .ok_or_else(|| StoreError::Denied("unknown or expired session".into()))
}

/// Session check plus a capability check on `source`. Unknown sources are
/// rejected before any permission is looked at.
pub(crate) async fn authorize(
    req: &HttpRequest,
    sessions: &SessionState,
    config: &Config,
    source: &str,
    capability: Capability,
) -> StoreResult<Session> {
    authorize_all(req, sessions, config, source, &[capability]).await
}

/// Like `authorize`, for operations that need every one of `capabilities`.
pub(crate) async fn authorize_all(
    req: &HttpRequest,
    sessions: &SessionState,
    config: &Config,
    source: &str,
    capabilities: &[Capability],
) -> StoreResult<Session> {
    config.source_path(source)?;
    let session = require_session(req, sessions).await?;
    if let Some(missing) = capabilities.iter().find(|c| !session.permits(source, **c)) {
        log::warn!(
            "User '{}' denied {:?} on '{}'",
            session.username,
            missing,
            source
        );
        return Err(StoreError::Denied(format!(
            "{:?} is not permitted on '{}'",
            missing, source
        )));
    }
    Ok(session)
}

pub(crate) async fn require_admin(req: &HttpRequest, sessions: &SessionState) -> StoreResult<Session> {
    let session = require_session(req, sessions).await?;
    if !session.is_admin() {
        return Err(StoreError::Denied("administrator role required".into()));
    }
    Ok(session)
}

/// Opens the handle for a configured source.
pub(crate) fn open_source(config: &Config, source: &str) -> StoreResult<StoreHandle> {
    let path = config.source_path(source)?;
    StoreHandle::open(&path, source)
}

/// Labels written to the audit log around one operation.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Action {
    /// Written after success, e.g. `Saved to Database`.
    pub done: &'static str,
    /// Prefix of the failure entry, e.g. `Save Database` gives
    /// `Failed to Save Database: <error>`.
    pub attempted: &'static str,
}

/// Runs `op` and records its outcome in the store's audit log.
///
/// A failed `op` is logged best-effort and its own error returned. When `op`
/// succeeds but the audit entry cannot be written, the caller gets
/// `AuditFailed`, which says the action itself went through.
pub(crate) fn audited<T>(
    store: &mut StoreHandle,
    session: &Session,
    action: Action,
    op: impl FnOnce(&mut StoreHandle) -> StoreResult<T>,
) -> StoreResult<T> {
    match op(store) {
        Ok(value) => {
            store
                .audit()
                .append(session.user_id, &session.username, action.done)
                .map_err(|e| StoreError::AuditFailed {
                    action: action.done.to_string(),
                    source: Box::new(e),
                })?;
            Ok(value)
        }
        Err(err) => {
            let label = format!("Failed to {}: {}", action.attempted, err);
            if let Err(log_err) = store
                .audit()
                .append(session.user_id, &session.username, &label)
            {
                log::error!(
                    "Could not record failure on '{}': {}",
                    store.source(),
                    log_err
                );
            }
            Err(err)
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use common::model::user::{Role, SourcePermissions};
    use std::collections::HashMap;
    use std::path::Path;

    pub fn config_in(dir: &Path) -> Config {
        Config {
            data_dir: dir.to_path_buf(),
            sources: vec!["test1".into(), "test2".into()],
            ..Config::default()
        }
    }

    pub fn session(token: &str, role: Option<Role>) -> Session {
        Session {
            token: token.into(),
            user_id: 7,
            username: "clerk".into(),
            role,
            permissions: HashMap::new(),
        }
    }

    pub fn viewer(token: &str, source: &str) -> Session {
        let mut s = session(token, Some(Role::User));
        s.permissions.insert(
            source.into(),
            SourcePermissions {
                can_view: true,
                ..SourcePermissions::default()
            },
        );
        s
    }
}
