use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Permission, Role};

/// A registered account as kept in the accounts list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: i64,
    pub username: String,
    /// bcrypt hash, or verbatim text for accounts written by older clients.
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

fn default_active() -> bool {
    true
}

/// Account listing for the admin screen; never carries the password.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSummary {
    pub id: i64,
    pub username: String,
    pub email: Option<String>,
    pub is_active: bool,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&Account> for AccountSummary {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            username: account.username.clone(),
            email: account.email.clone(),
            is_active: account.is_active,
            is_admin: account.is_admin,
            created_at: account.created_at,
        }
    }
}

/// The reduced account view persisted as the current session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub is_admin: bool,
    /// Only present in sessions written by older clients.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

impl From<&Account> for SessionUser {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            name: account.username.clone(),
            email: account.email.clone(),
            is_admin: account.is_admin,
            username: None,
        }
    }
}

impl SessionUser {
    pub fn role(&self) -> Role {
        Role::of(Some(self))
    }

    pub fn has_permission(&self, permission: Permission) -> bool {
        self.role().has_permission(permission)
    }
}
