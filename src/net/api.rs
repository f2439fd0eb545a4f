//! Remote tile/session service.
//!
//! `GET tile/{service}` returns encoded tile bytes, `POST session/renew`
//! exchanges a renewal token for a fresh [`AuthInfo`] and `DELETE session`
//! ends the session. Credentials travel as the raw `Authorization` header.

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, StatusCode};
use thiserror::Error;

use crate::core::config::ApiConfig;
use crate::net::auth::{AccessToken, AuthInfo, RenewSessionErrorBody, RenewalError, RenewalToken};
use crate::tiles::request::TileRequest;
use crate::Result;

/// Why a single tile (or session) call failed
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FetchError {
    #[error("could not obtain access token: {0}")]
    Token(#[from] RenewalError),

    #[error("network error: {0}")]
    Network(String),

    #[error("server answered HTTP {0}")]
    Status(u16),

    #[error("access token rejected")]
    Unauthorized,

    #[error("tile could not be decoded: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        FetchError::Network(e.to_string())
    }
}

/// Calls the tile repo and session handling need from the server
#[async_trait]
pub trait ApiService: Send + Sync {
    async fn renew_session(
        &self,
        renewal_token: &RenewalToken,
    ) -> std::result::Result<AuthInfo, RenewalError>;

    async fn delete_session(
        &self,
        renewal_token: &RenewalToken,
    ) -> std::result::Result<(), FetchError>;

    async fn get_tile(
        &self,
        access_token: &AccessToken,
        request: &TileRequest,
    ) -> std::result::Result<Vec<u8>, FetchError>;
}

/// [`ApiService`] over HTTP
#[derive(Debug, Clone)]
pub struct HttpApiService {
    client: Client,
    base_url: String,
}

impl HttpApiService {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.timeout())
            .tcp_keepalive(std::time::Duration::from_secs(30))
            .pool_max_idle_per_host(16)
            .build()?;

        Ok(Self::with_client(client, &config.base_url))
    }

    /// Uses an already configured client
    pub fn with_client(client: Client, base_url: &str) -> Self {
        let mut base_url = base_url.to_string();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl ApiService for HttpApiService {
    async fn renew_session(
        &self,
        renewal_token: &RenewalToken,
    ) -> std::result::Result<AuthInfo, RenewalError> {
        let response = self
            .client
            .post(self.url("session/renew"))
            .header(AUTHORIZATION, renewal_token.as_str())
            .send()
            .await
            .map_err(|e| RenewalError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| RenewalError::Network(e.to_string()))?;

        if status.is_success() {
            serde_json::from_slice::<AuthInfo>(&body)
                .map_err(|e| RenewalError::Decode(e.to_string()))
        } else {
            // A malformed error payload still reports the status
            let body = serde_json::from_slice::<RenewSessionErrorBody>(&body).unwrap_or_default();
            Err(RenewalError::Rejected {
                status: status.as_u16(),
                body,
            })
        }
    }

    async fn delete_session(
        &self,
        renewal_token: &RenewalToken,
    ) -> std::result::Result<(), FetchError> {
        let response = self
            .client
            .delete(self.url("session"))
            .header(AUTHORIZATION, renewal_token.as_str())
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::UNAUTHORIZED => Err(FetchError::Unauthorized),
            status => Err(FetchError::Status(status.as_u16())),
        }
    }

    async fn get_tile(
        &self,
        access_token: &AccessToken,
        request: &TileRequest,
    ) -> std::result::Result<Vec<u8>, FetchError> {
        let row = request.position.row.to_string();
        let col = request.position.col.to_string();

        let response = self
            .client
            .get(self.url(&format!("tile/{}", request.service_identifier)))
            .header(AUTHORIZATION, access_token.as_str())
            .query(&[
                ("layer", request.layer_identifier.as_str()),
                ("set", request.set_identifier.as_str()),
                ("matrix", request.matrix_identifier.as_str()),
                ("row", row.as_str()),
                ("col", col.as_str()),
            ])
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => Ok(response.bytes().await?.to_vec()),
            StatusCode::UNAUTHORIZED => Err(FetchError::Unauthorized),
            status => Err(FetchError::Status(status.as_u16())),
        }
    }
}
