use std::collections::HashSet;
use std::fmt;

use once_cell::sync::Lazy;
use serde::Serialize;

use super::SessionUser;

/// Reserved username that is always treated as an administrator.
pub const ADMIN_USERNAME: &str = "admin";

/// The one admin rule. Older stored sessions predate the flag and only carry
/// the literal username, so both are honoured.
pub fn is_admin(session: Option<&SessionUser>) -> bool {
    session.is_some_and(|user| {
        user.is_admin
            || user.username.as_deref() == Some(ADMIN_USERNAME)
            || user.name == ADMIN_USERNAME
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Permission {
    OpenProtectedPages,

    OpenAdminPanel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Role {
    Guest,
    Member,
    Admin,
}

static GUEST_PERMISSIONS: Lazy<HashSet<Permission>> = Lazy::new(HashSet::new);

static MEMBER_PERMISSIONS: Lazy<HashSet<Permission>> = Lazy::new(|| {
    let mut permissions = HashSet::new();

    permissions.extend(GUEST_PERMISSIONS.iter().copied());

    permissions.insert(Permission::OpenProtectedPages);

    permissions
});

static ADMIN_PERMISSIONS: Lazy<HashSet<Permission>> = Lazy::new(|| {
    let mut permissions = HashSet::new();

    permissions.extend(MEMBER_PERMISSIONS.iter().copied());

    permissions.insert(Permission::OpenAdminPanel);

    permissions
});

impl Role {
    pub fn of(session: Option<&SessionUser>) -> Self {
        match session {
            None => Role::Guest,
            Some(_) if is_admin(session) => Role::Admin,
            Some(_) => Role::Member,
        }
    }

    pub fn permissions(&self) -> &'static HashSet<Permission> {
        match self {
            Role::Guest => &GUEST_PERMISSIONS,
            Role::Member => &MEMBER_PERMISSIONS,
            Role::Admin => &ADMIN_PERMISSIONS,
        }
    }

    pub fn has_permission(&self, permission: Permission) -> bool {
        self.permissions().contains(&permission)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Role::Guest => "guest",
            Role::Member => "member",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
