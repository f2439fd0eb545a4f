use async_trait::async_trait;
use std::sync::{Mutex, PoisonError};
use thiserror::Error;

use crate::net::auth::RenewalToken;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SessionError {
    #[error("no user is logged in")]
    NotLoggedIn,

    #[error("session storage failed: {0}")]
    Storage(String),
}

/// Where the logged-in user's renewal token lives between runs
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn renewal_token(&self) -> Result<Option<RenewalToken>, SessionError>;

    async fn update_renewal_token(&self, token: RenewalToken) -> Result<(), SessionError>;

    async fn clear(&self) -> Result<(), SessionError>;
}

/// Keeps the session for the lifetime of the process only
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    token: Mutex<Option<RenewalToken>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn logged_in(token: RenewalToken) -> Self {
        Self {
            token: Mutex::new(Some(token)),
        }
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn renewal_token(&self) -> Result<Option<RenewalToken>, SessionError> {
        Ok(self.token.lock().unwrap_or_else(PoisonError::into_inner).clone())
    }

    async fn update_renewal_token(&self, token: RenewalToken) -> Result<(), SessionError> {
        *self.token.lock().unwrap_or_else(PoisonError::into_inner) = Some(token);
        Ok(())
    }

    async fn clear(&self) -> Result<(), SessionError> {
        *self.token.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_session_store() {
        let store = MemorySessionStore::new();
        assert_eq!(store.renewal_token().await.unwrap(), None);

        store
            .update_renewal_token(RenewalToken::new("r1"))
            .await
            .unwrap();
        assert_eq!(
            store.renewal_token().await.unwrap(),
            Some(RenewalToken::new("r1"))
        );

        store.clear().await.unwrap();
        assert_eq!(store.renewal_token().await.unwrap(), None);
    }
}
