use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Short-lived credential sent with every tile request
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(..)")
    }
}

/// Longer-lived credential exchanged for new access tokens
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RenewalToken(String);

impl RenewalToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for RenewalToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RenewalToken(..)")
    }
}

/// Successful body of `POST session/renew`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthInfo {
    pub access_token: AccessToken,
    pub renewal_token: RenewalToken,
}

/// Error body of `POST session/renew`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RenewSessionErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl fmt::Display for RenewSessionErrorBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.error, &self.message) {
            (Some(error), Some(message)) => write!(f, "{}: {}", error, message),
            (Some(text), None) | (None, Some(text)) => f.write_str(text),
            (None, None) => f.write_str("no details"),
        }
    }
}

/// Why renewing the access token failed.
///
/// Cloneable so that every caller waiting on the same renewal gets a copy.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RenewalError {
    #[error("network error while renewing session: {0}")]
    Network(String),

    #[error("session renewal rejected with HTTP {status} ({body})")]
    Rejected {
        status: u16,
        body: RenewSessionErrorBody,
    },

    #[error("malformed renewal response: {0}")]
    Decode(String),

    #[error("no renewal token stored for the current user")]
    NoRenewalToken,

    #[error("failed to persist renewal token: {0}")]
    Persist(String),
}
