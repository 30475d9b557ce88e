//! Session/role gate backed by the user database.
//!
//! Passwords are stored and compared as given. Accounts with the `admin`
//! role, or with no role at all, may act on every source; `user` accounts
//! are limited to their per-source grants.

pub mod session;

use crate::error::{StoreError, StoreResult};
use crate::store::audit::{self, AuditLog};
use common::model::user::{Role, Session, SourcePermissions, User};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::time::Duration;
use uuid::Uuid;

const DEFAULT_ADMIN: (&str, &str) = ("admin", "admin");

pub struct UserDirectory {
    conn: Connection,
}

impl UserDirectory {
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        Self::prepare(Connection::open(path)?)
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        Self::prepare(Connection::open_in_memory()?)
    }

    fn prepare(conn: Connection) -> StoreResult<Self> {
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT UNIQUE NOT NULL,
                password TEXT NOT NULL,
                role TEXT CHECK (role IS NULL OR role IN ('admin', 'user'))
            );
            CREATE TABLE IF NOT EXISTS permissions (
                user_id INTEGER NOT NULL REFERENCES users (id),
                source TEXT NOT NULL,
                can_view INTEGER NOT NULL DEFAULT 0,
                can_edit INTEGER NOT NULL DEFAULT 0,
                can_delete INTEGER NOT NULL DEFAULT 0,
                buttons TEXT NOT NULL DEFAULT '',
                PRIMARY KEY (user_id, source)
            );",
        )?;
        audit::init_schema(&conn)?;

        let users: i64 = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
        if users == 0 {
            conn.execute(
                "INSERT INTO users (username, password, role) VALUES (?1, ?2, 'admin')",
                params![DEFAULT_ADMIN.0, DEFAULT_ADMIN.1],
            )?;
            log::warn!(
                "Created default administrator '{}'; change its password",
                DEFAULT_ADMIN.0
            );
        }
        Ok(Self { conn })
    }

    /// Audit log of logins and user management.
    pub fn audit(&self) -> AuditLog<'_> {
        AuditLog::new(&self.conn)
    }

    /// Checks the credentials and builds a fresh session. Nothing is kept
    /// when they do not match.
    pub fn authenticate(&self, username: &str, password: &str) -> StoreResult<Session> {
        let found = self
            .conn
            .query_row(
                "SELECT id, username, role FROM users WHERE username = ?1 AND password = ?2",
                params![username, password],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, Option<String>>(2)?,
                    ))
                },
            )
            .optional()?;
        let Some((user_id, username, role)) = found else {
            return Err(StoreError::Denied("invalid username or password".into()));
        };
        Ok(Session {
            token: Uuid::new_v4().to_string(),
            user_id,
            username,
            role: role.as_deref().and_then(Role::parse),
            permissions: self.permissions_for(user_id)?,
        })
    }

    pub fn list_users(&self) -> StoreResult<Vec<User>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, username, role FROM users ORDER BY id")?;
        let users = stmt
            .query_map([], |row| {
                Ok(User {
                    id: row.get(0)?,
                    username: row.get(1)?,
                    role: row
                        .get::<_, Option<String>>(2)?
                        .as_deref()
                        .and_then(Role::parse),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(users)
    }

    pub fn add_user(&self, username: &str, password: &str, role: Option<Role>) -> StoreResult<User> {
        check_credentials(username, password)?;
        self.conn
            .execute(
                "INSERT INTO users (username, password, role) VALUES (?1, ?2, ?3)",
                params![username, password, role.map(|r| r.as_str())],
            )
            .map_err(|e| unique_violation(e, username))?;
        Ok(User {
            id: self.conn.last_insert_rowid(),
            username: username.to_string(),
            role,
        })
    }

    /// Renames and/or re-keys an account. Audit entries already written keep
    /// the old name.
    pub fn update_user(
        &self,
        user_id: i64,
        username: &str,
        password: &str,
        role: Option<Role>,
    ) -> StoreResult<User> {
        check_credentials(username, password)?;
        let changed = self
            .conn
            .execute(
                "UPDATE users SET username = ?1, password = ?2, role = ?3 WHERE id = ?4",
                params![username, password, role.map(|r| r.as_str()), user_id],
            )
            .map_err(|e| unique_violation(e, username))?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("user {}", user_id)));
        }
        Ok(User {
            id: user_id,
            username: username.to_string(),
            role,
        })
    }

    pub fn delete_user(&mut self, user_id: i64) -> StoreResult<()> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM permissions WHERE user_id = ?1", params![user_id])?;
        let removed = tx.execute("DELETE FROM users WHERE id = ?1", params![user_id])?;
        if removed == 0 {
            return Err(StoreError::NotFound(format!("user {}", user_id)));
        }
        tx.commit()?;
        Ok(())
    }

    pub fn set_permissions(
        &self,
        user_id: i64,
        source: &str,
        permissions: &SourcePermissions,
    ) -> StoreResult<()> {
        let exists: Option<i64> = self
            .conn
            .query_row("SELECT id FROM users WHERE id = ?1", params![user_id], |row| {
                row.get(0)
            })
            .optional()?;
        if exists.is_none() {
            return Err(StoreError::NotFound(format!("user {}", user_id)));
        }
        self.conn.execute(
            "INSERT OR REPLACE INTO permissions
                (user_id, source, can_view, can_edit, can_delete, buttons)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                user_id,
                source,
                permissions.can_view,
                permissions.can_edit,
                permissions.can_delete,
                permissions.buttons.join(",")
            ],
        )?;
        Ok(())
    }

    pub fn permissions_for(&self, user_id: i64) -> StoreResult<HashMap<String, SourcePermissions>> {
        let mut stmt = self.conn.prepare(
            "SELECT source, can_view, can_edit, can_delete, buttons FROM permissions WHERE user_id = ?1",
        )?;
        let rows = stmt
            .query_map(params![user_id], |row| {
                let buttons: String = row.get(4)?;
                Ok((
                    row.get::<_, String>(0)?,
                    SourcePermissions {
                        can_view: row.get(1)?,
                        can_edit: row.get(2)?,
                        can_delete: row.get(3)?,
                        buttons: buttons
                            .split(',')
                            .map(str::trim)
                            .filter(|b| !b.is_empty())
                            .map(str::to_string)
                            .collect(),
                    },
                ))
            })?
            .collect::<Result<HashMap<_, _>, _>>()?;
        Ok(rows)
    }
}

fn check_credentials(username: &str, password: &str) -> StoreResult<()> {
    if username.trim().is_empty() || password.is_empty() {
        return Err(StoreError::InvalidRequest(
            "username and password must not be empty".into(),
        ));
    }
    Ok(())
}

fn unique_violation(error: rusqlite::Error, username: &str) -> StoreError {
    if error.sqlite_error_code() == Some(ErrorCode::ConstraintViolation) {
        StoreError::InvalidRequest(format!("username '{}' is already taken", username))
    } else {
        error.into()
    }
}
