// Local account registry and signed-in session flag.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::info;

use crate::store::{KeyValueStore, StorageError};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("username, email, and password are all required")]
    MissingFields,

    #[error("username or email already exists")]
    AlreadyRegistered,

    #[error("invalid username/email or password")]
    InvalidCredentials,

    #[error(transparent)]
    Storage(#[from] StorageError),
}

// ---------------------------------------------------------------------------
// Accounts
// ---------------------------------------------------------------------------

/// A locally registered account. The password is stored as entered; this is
/// a device-local registry, not a server-side credential store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub username: String,
    pub email: String,
    pub password: String,
}

const USERS_KEY: &str = "users";
const SESSION_KEY: &str = "session";

/// Account operations on top of any [`KeyValueStore`].
pub struct Accounts<'a, S: KeyValueStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: KeyValueStore + ?Sized> Accounts<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    async fn load_users(&self) -> Result<Vec<User>, AccountError> {
        let Some(value) = self.store.get(USERS_KEY).await? else {
            return Ok(Vec::new());
        };
        let users = serde_json::from_value(value).map_err(|e| StorageError::Corrupt {
            key: USERS_KEY.to_string(),
            detail: e.to_string(),
        })?;
        Ok(users)
    }

    async fn save_users(&self, users: &[User]) -> Result<(), AccountError> {
        let value = serde_json::to_value(users).map_err(|e| StorageError::Encode {
            key: USERS_KEY.to_string(),
            source: e,
        })?;
        self.store.save(USERS_KEY, &value).await?;
        Ok(())
    }

    /// Register a new account. Usernames and emails must be unique across
    /// the registry, compared case-insensitively.
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<User, AccountError> {
        if username.trim().is_empty() || email.trim().is_empty() || password.is_empty() {
            return Err(AccountError::MissingFields);
        }

        let mut users = self.load_users().await?;
        let taken = users.iter().any(|u| {
            u.username.eq_ignore_ascii_case(username) || u.email.eq_ignore_ascii_case(email)
        });
        if taken {
            return Err(AccountError::AlreadyRegistered);
        }

        let user = User {
            username: username.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        };
        users.push(user.clone());
        self.save_users(&users).await?;
        info!(username, "account registered");
        Ok(user)
    }

    /// Log in with a username or email plus password. On success the
    /// session flag is set to the account's username, replacing any
    /// previous session.
    pub async fn login(&self, identifier: &str, password: &str) -> Result<User, AccountError> {
        let users = self.load_users().await?;
        let user = users
            .iter()
            .find(|u| {
                (u.username.eq_ignore_ascii_case(identifier)
                    || u.email.eq_ignore_ascii_case(identifier))
                    && u.password == password
            })
            .cloned()
            .ok_or(AccountError::InvalidCredentials)?;

        self.store
            .save(SESSION_KEY, &Value::String(user.username.clone()))
            .await?;
        info!(username = %user.username, "logged in");
        Ok(user)
    }

    /// Username of the signed-in account, if any.
    pub async fn current_session(&self) -> Result<Option<String>, AccountError> {
        let Some(value) = self.store.get(SESSION_KEY).await? else {
            return Ok(None);
        };
        match value {
            Value::String(username) => Ok(Some(username)),
            other => Err(AccountError::Storage(StorageError::Corrupt {
                key: SESSION_KEY.to_string(),
                detail: format!("expected a username string, got: {other}"),
            })),
        }
    }

    pub async fn logout(&self) -> Result<(), AccountError> {
        self.store.remove(SESSION_KEY).await?;
        info!("logged out");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
