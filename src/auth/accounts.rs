use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

use super::{ADMIN_USERNAME, Account, SessionUser};
use crate::error::AppError;
use crate::store::{KvStore, keys};

pub const USER_EXISTS_MESSAGE: &str = "user already exists";
pub const INVALID_CREDENTIALS_MESSAGE: &str = "invalid username or password";
pub const LOGIN_SUCCESS_MESSAGE: &str = "logged in successfully";
pub const LOGOUT_MESSAGE: &str = "logged out";

/// Result of a login or registration attempt. Failures are ordinary values,
/// not errors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthOutcome {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<SessionUser>,
}

impl AuthOutcome {
    fn failure(message: &str) -> Self {
        Self {
            success: false,
            message: message.to_string(),
            user: None,
        }
    }
}

/// Accounts and the current session, both kept in the key-value store.
/// Changes to the account list are serialized through `write_lock`, which
/// keeps usernames unique.
#[derive(Clone, Debug)]
pub struct AccountStore {
    kv: KvStore,
    bcrypt_cost: u32,
    write_lock: Arc<Mutex<()>>,
}

impl AccountStore {
    pub fn new(kv: KvStore, bcrypt_cost: u32) -> Self {
        Self {
            kv,
            bcrypt_cost,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub async fn accounts(&self) -> Result<Vec<Account>, AppError> {
        self.kv.get_list(keys::USERS).await
    }

    async fn save_accounts(&self, accounts: &[Account]) -> Result<(), AppError> {
        self.kv.set(keys::USERS, accounts).await
    }

    #[instrument(skip_all, fields(username = %username))]
    pub async fn register(&self, username: &str, password: &str) -> Result<AuthOutcome, AppError> {
        info!("Registering account");
        {
            let _guard = self.write_lock.lock().await;
            let mut accounts = self.accounts().await?;

            if accounts.iter().any(|account| account.username == username) {
                warn!("Username already taken");
                return Ok(AuthOutcome::failure(USER_EXISTS_MESSAGE));
            }

            let hashed_password = bcrypt::hash(password, self.bcrypt_cost)?;

            accounts.push(Account {
                id: next_account_id(&accounts),
                username: username.to_string(),
                password: hashed_password,
                email: None,
                is_active: true,
                is_admin: username == ADMIN_USERNAME,
                created_at: Utc::now(),
            });
            self.save_accounts(&accounts).await?;
        }

        self.login(username, password).await
    }

    #[instrument(skip_all, fields(username = %username))]
    pub async fn login(&self, username: &str, password: &str) -> Result<AuthOutcome, AppError> {
        info!("Authenticating account");
        let accounts = self.accounts().await?;

        let matched = accounts
            .iter()
            .find(|account| account.username == username && verify_password(password, &account.password));

        match matched {
            Some(account) => {
                let session = SessionUser::from(account);
                self.kv.set(keys::CURRENT_USER, &session).await?;
                info!(account_id = account.id, "Session established");

                Ok(AuthOutcome {
                    success: true,
                    message: LOGIN_SUCCESS_MESSAGE.to_string(),
                    user: Some(session),
                })
            }
            None => {
                // Unknown user and wrong password look the same from outside.
                warn!("Authentication failed");
                Ok(AuthOutcome::failure(INVALID_CREDENTIALS_MESSAGE))
            }
        }
    }

    #[instrument(skip(self))]
    pub async fn logout(&self) -> Result<(), AppError> {
        self.kv.remove(keys::CURRENT_USER).await
    }

    pub async fn current_session(&self) -> Result<Option<SessionUser>, AppError> {
        self.kv.get(keys::CURRENT_USER).await
    }

    #[instrument(skip(self))]
    pub async fn delete_account(&self, id: i64) -> Result<bool, AppError> {
        let _guard = self.write_lock.lock().await;
        let mut accounts = self.accounts().await?;
        let before = accounts.len();
        accounts.retain(|account| account.id != id);

        if accounts.len() == before {
            return Ok(false);
        }

        self.save_accounts(&accounts).await?;
        info!("Account deleted");
        Ok(true)
    }

    /// Drops every inactive account and returns how many were removed.
    #[instrument(skip(self))]
    pub async fn clear_inactive(&self) -> Result<usize, AppError> {
        let _guard = self.write_lock.lock().await;
        let mut accounts = self.accounts().await?;
        let before = accounts.len();
        accounts.retain(|account| account.is_active);

        let removed = before - accounts.len();
        if removed > 0 {
            self.save_accounts(&accounts).await?;
        }
        info!(removed, "Inactive accounts cleared");
        Ok(removed)
    }
}

fn verify_password(candidate: &str, stored: &str) -> bool {
    match bcrypt::verify(candidate, stored) {
        Ok(valid) => valid,
        // Not a bcrypt hash: an account stored verbatim by an older client.
        Err(_) => candidate == stored,
    }
}

fn next_account_id(accounts: &[Account]) -> i64 {
    let now = Utc::now().timestamp_millis();
    match accounts.iter().map(|account| account.id).max() {
        Some(max) if max >= now => max + 1,
        _ => now,
    }
}
