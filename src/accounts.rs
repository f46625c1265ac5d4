//! Registration, login and password reset against `users/{username}` documents.
use std::sync::Arc;

use log::{debug, error, info, warn};

use crate::{
    DocPath, DocumentStore, PasswordCheck, PrepaseError, Result, UserRecord, SHARING_DELIMITER,
};

/// Account operations over a document store
#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn DocumentStore>,
}

impl AccountService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Creates a user. Username, password and confirmation are trimmed and
    /// must all be non-empty; the username must not be taken.
    pub async fn register(&self, username: &str, password: &str, confirm: &str) -> Result<String> {
        let username = username.trim();
        let password = password.trim();
        if username.is_empty() || password.is_empty() || confirm.trim().is_empty() {
            return Err(PrepaseError::validation(
                "Username, password and confirm password cannot be empty",
            ));
        }
        if password != confirm.trim() {
            return Err(PrepaseError::PasswordMismatch);
        }
        if username.contains(SHARING_DELIMITER) {
            warn!("Registration refused, username {} contains the sharing delimiter", username);
            return Err(PrepaseError::validation(format!(
                "Username cannot contain '{}'",
                SHARING_DELIMITER
            )));
        }

        let path = DocPath::user(username)?;
        if self.store.get(&path).await?.is_some() {
            warn!("Registration refused, username {} is occupied", username);
            return Err(PrepaseError::UsernameOccupied {
                username: username.to_string(),
            });
        }

        let record = UserRecord::with_password(password)?;
        self.store.set(&path, serde_json::to_value(record)?).await?;
        info!("Registered user {}", username);
        Ok(username.to_string())
    }

    /// Checks credentials and returns the trimmed username on success
    pub async fn login(&self, username: &str, password: &str) -> Result<String> {
        let username = username.trim();
        let password = password.trim();
        if username.is_empty() || password.is_empty() {
            return Err(PrepaseError::validation(
                "Username and password cannot be empty",
            ));
        }

        let path = DocPath::user(username)?;
        let record = self.load(&path, username).await?;

        match record.check(password)? {
            PasswordCheck::Match => {}
            PasswordCheck::MatchLegacy => {
                warn!(
                    "User {} still has a plaintext password on record, rehashing",
                    username
                );
                let upgraded = UserRecord::with_password(password)?;
                if let Err(e) = self.store.set(&path, serde_json::to_value(upgraded)?).await {
                    error!("Failed to rehash password for {}: {}", username, e);
                }
            }
            PasswordCheck::Mismatch => {
                debug!("Password mismatch for {}", username);
                return Err(PrepaseError::WrongPassword);
            }
        }

        info!("User {} logged in", username);
        Ok(username.to_string())
    }

    /// Overwrites the password of an existing user. The old password is not
    /// asked for.
    pub async fn reset_password(
        &self,
        username: &str,
        new_password: &str,
        confirm: &str,
    ) -> Result<()> {
        let username = username.trim();
        if username.is_empty() || new_password.trim().is_empty() || confirm.trim().is_empty() {
            return Err(PrepaseError::validation(
                "Username or passwords cannot be empty",
            ));
        }
        if new_password != confirm {
            return Err(PrepaseError::PasswordMismatch);
        }

        let path = DocPath::user(username)?;
        self.load(&path, username).await?;

        let record = UserRecord::with_password(new_password.trim())?;
        self.store.set(&path, serde_json::to_value(record)?).await?;
        info!("Password reset for {}", username);
        Ok(())
    }

    /// Whether a user document exists for `username`
    pub async fn exists(&self, username: &str) -> Result<bool> {
        Ok(self.store.get(&DocPath::user(username.trim())?).await?.is_some())
    }

    async fn load(&self, path: &DocPath, username: &str) -> Result<UserRecord> {
        let data = self
            .store
            .get(path)
            .await?
            .ok_or_else(|| PrepaseError::UserNotFound {
                username: username.to_string(),
            })?;
        Ok(serde_json::from_value(data)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStore;
    use serde_json::json;

    fn service() -> (MemoryStore, AccountService) {
        let store = MemoryStore::new();
        let service = AccountService::new(Arc::new(store.clone()));
        (store, service)
    }

    #[tokio::test]
    async fn registering_twice_reports_occupied_username() {
        let (_, accounts) = service();
        accounts.register("alice", "pw", "pw").await.unwrap();

        let again = accounts.register(" alice ", "other", "other").await;

        assert!(matches!(
            again,
            Err(PrepaseError::UsernameOccupied { ref username }) if username == "alice"
        ));
        assert!(accounts.exists("alice").await.unwrap());
    }

    #[tokio::test]
    async fn registration_validates_before_touching_the_store() {
        let (store, accounts) = service();

        assert!(matches!(
            accounts.register("", "pw", "pw").await,
            Err(PrepaseError::Validation { .. })
        ));
        assert!(matches!(
            accounts.register("bob", "pw", "pw2").await,
            Err(PrepaseError::PasswordMismatch)
        ));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn login_checks_the_password() {
        let (_, accounts) = service();
        accounts.register("alice", "secret", "secret").await.unwrap();

        assert!(matches!(
            accounts.login("alice", "wrong").await,
            Err(PrepaseError::WrongPassword)
        ));
        assert!(matches!(
            accounts.login("carol", "secret").await,
            Err(PrepaseError::UserNotFound { .. })
        ));
        assert_eq!(accounts.login(" alice ", "secret").await.unwrap(), "alice");
    }

    #[tokio::test]
    async fn legacy_plaintext_records_are_rehashed_on_login() {
        let (store, accounts) = service();
        let path = DocPath::user("old").unwrap();
        store.set(&path, json!({"password": "pw"})).await.unwrap();

        accounts.login("old", "pw").await.unwrap();

        let stored: UserRecord =
            serde_json::from_value(store.get(&path).await.unwrap().unwrap()).unwrap();
        assert!(stored.is_hashed());
        assert_eq!(accounts.login("old", "pw").await.unwrap(), "old");
    }

    #[tokio::test]
    async fn reset_password_replaces_the_credential() {
        let (_, accounts) = service();
        accounts.register("alice", "old", "old").await.unwrap();

        assert!(matches!(
            accounts.reset_password("alice", "new", "newer").await,
            Err(PrepaseError::PasswordMismatch)
        ));
        assert!(matches!(
            accounts.reset_password("nobody", "new", "new").await,
            Err(PrepaseError::UserNotFound { .. })
        ));

        accounts.reset_password("alice", "new", "new").await.unwrap();
        assert!(accounts.login("alice", "old").await.is_err());
        assert!(accounts.login("alice", "new").await.is_ok());
    }

    #[tokio::test]
    async fn usernames_must_not_break_sharing_codes() {
        let (store, accounts) = service();

        let taken = accounts.register("bob,__,x", "pw", "pw").await;

        assert!(matches!(taken, Err(PrepaseError::Validation { .. })));
        assert!(store.is_empty());
    }
}
