use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "admin" => Some(Role::Admin),
            "user" => Some(Role::User),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub role: Option<Role>,
}

/// What a `user`-role account may do on one data source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourcePermissions {
    pub can_view: bool,
    pub can_edit: bool,
    pub can_delete: bool,
    /// Names of extra actions granted, e.g. `backup`, `import`, `query`, `export`.
    #[serde(default)]
    pub buttons: Vec<String>,
}

/// Operations gated per data source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    View,
    Edit,
    Delete,
    Backup,
    Import,
    Query,
    Export,
}

impl Capability {
    fn button(&self) -> Option<&'static str> {
        match self {
            Capability::Backup => Some("backup"),
            Capability::Import => Some("import"),
            Capability::Query => Some("query"),
            Capability::Export => Some("export"),
            _ => None,
        }
    }
}

/// An authenticated user, as handed to the rest of the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub user_id: i64,
    pub username: String,
    pub role: Option<Role>,
    pub permissions: HashMap<String, SourcePermissions>,
}

impl Session {
    pub fn is_admin(&self) -> bool {
        self.role == Some(Role::Admin)
    }

    /// Admins and accounts without a role are unrestricted; `user` accounts
    /// need an explicit grant for the source.
    pub fn permits(&self, source: &str, capability: Capability) -> bool {
        match self.role {
            None | Some(Role::Admin) => true,
            Some(Role::User) => {
                let Some(p) = self.permissions.get(source) else {
                    return false;
                };
                match capability {
                    Capability::View => p.can_view,
                    Capability::Edit => p.can_edit,
                    Capability::Delete => p.can_delete,
                    other => other
                        .button()
                        .is_some_and(|b| p.buttons.iter().any(|granted| granted == b)),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(role: Option<Role>) -> Session {
        let mut permissions = HashMap::new();
        permissions.insert(
            "test1".to_string(),
            SourcePermissions {
                can_view: true,
                can_edit: false,
                can_delete: false,
                buttons: vec!["backup".into()],
            },
        );
        Session {
            token: "t".into(),
            user_id: 2,
            username: "clerk".into(),
            role,
            permissions,
        }
    }

    #[test]
    fn user_role_follows_grants() {
        let s = session(Some(Role::User));
        assert!(s.permits("test1", Capability::View));
        assert!(s.permits("test1", Capability::Backup));
        assert!(!s.permits("test1", Capability::Edit));
        assert!(!s.permits("test1", Capability::Query));
        assert!(!s.permits("test2", Capability::View));
    }

    #[test]
    fn admin_and_roleless_are_unrestricted() {
        assert!(session(Some(Role::Admin)).permits("test2", Capability::Edit));
        assert!(session(None).permits("test9", Capability::Query));
    }
}
