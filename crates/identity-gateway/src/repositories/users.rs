//! User directory boundary.
//!
//! Account documents belong to the platform's accounts service; the gateway
//! only needs lookup-by-email and create. [`UserDirectory`] is that
//! boundary. [`InMemoryUserDirectory`] backs tests and single-node
//! deployments; the document-store client implements the same trait.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use thiserror::Error;
use uuid::Uuid;

use crate::errors::IgError;

/// A stored account, as much of it as the gateway needs.
#[derive(Clone)]
pub struct UserRecord {
    pub user_id: String,
    pub email: String,
    pub display_name: String,
    /// bcrypt digest; opaque to everything but `crypto::verify_password`.
    pub password_digest: String,
}

/// Custom Debug implementation that redacts the digest.
impl fmt::Debug for UserRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserRecord")
            .field("user_id", &self.user_id)
            .field("email", &self.email)
            .field("display_name", &self.display_name)
            .field("password_digest", &"[REDACTED]")
            .finish()
    }
}

/// Fields required to create an account.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub display_name: String,
    pub password_digest: String,
}

/// Errors surfaced by directory operations.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// An account with this email already exists.
    #[error("account already exists")]
    Duplicate,

    /// The backing document store could not be reached.
    #[error("directory unavailable: {0}")]
    Unavailable(String),
}

impl From<DirectoryError> for IgError {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::Duplicate => {
                IgError::Conflict("An account with this email already exists".to_string())
            }
            DirectoryError::Unavailable(reason) => {
                tracing::error!(target: "ig.repositories.users", reason = %reason, "User directory unavailable");
                IgError::Internal
            }
        }
    }
}

/// Account lookup and creation (enables mocking and alternate backends).
#[async_trait::async_trait]
pub trait UserDirectory: Send + Sync {
    /// Create an account. Fails with `Duplicate` when the email is taken.
    async fn create(&self, user: NewUser) -> Result<UserRecord, DirectoryError>;

    /// Find an account by email.
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, DirectoryError>;
}

/// Process-local user directory.
///
/// Keyed by email; ids are random v4 UUIDs. Suitable for tests and
/// single-node deployments only; nothing here survives a restart.
#[derive(Clone, Default)]
pub struct InMemoryUserDirectory {
    inner: Arc<Mutex<HashMap<String, UserRecord>>>,
}

impl InMemoryUserDirectory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn create(&self, user: NewUser) -> Result<UserRecord, DirectoryError> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|e| DirectoryError::Unavailable(e.to_string()))?;

        if inner.contains_key(&user.email) {
            return Err(DirectoryError::Duplicate);
        }

        let record = UserRecord {
            user_id: Uuid::new_v4().to_string(),
            email: user.email.clone(),
            display_name: user.display_name,
            password_digest: user.password_digest,
        };

        inner.insert(user.email, record.clone());
        Ok(record)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, DirectoryError> {
        let inner = self
            .inner
            .lock()
            .map_err(|e| DirectoryError::Unavailable(e.to_string()))?;

        Ok(inner.get(email).cloned())
    }
}
