//! Placeholder authentication.
//!
//! There is no credential store: any non-blank email/password logs in after a
//! fixed delay. This is a stand-in for a real identity service and must not be
//! treated as an access control boundary.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    pub verified: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("invalid registration data")]
    InvalidRegistration,
}

#[derive(Debug, Clone)]
pub struct StubAuthenticator {
    delay: Duration,
}

impl StubAuthenticator {
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    /// # Errors
    ///
    /// [`AuthError::InvalidCredentials`] if either field is blank.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        tokio::time::sleep(self.delay).await;
        if is_blank(email) || is_blank(password) {
            return Err(AuthError::InvalidCredentials);
        }
        let name = email.split('@').next().unwrap_or(email).to_string();
        tracing::info!(email, "stub login accepted");
        Ok(User {
            id: "1".to_string(),
            email: email.to_string(),
            name,
            verified: true,
        })
    }

    /// Registered users start unverified.
    ///
    /// # Errors
    ///
    /// [`AuthError::InvalidRegistration`] if any field is blank.
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<User, AuthError> {
        tokio::time::sleep(self.delay).await;
        if is_blank(name) || is_blank(email) || is_blank(password) {
            return Err(AuthError::InvalidRegistration);
        }
        tracing::info!(email, "stub registration accepted");
        Ok(User {
            id: "1".to_string(),
            email: email.to_string(),
            name: name.to_string(),
            verified: false,
        })
    }

    /// Always succeeds.
    pub async fn verify_email(&self, _token: &str) -> bool {
        tokio::time::sleep(self.delay).await;
        true
    }
}

fn is_blank(s: &str) -> bool {
    s.trim().is_empty()
}
