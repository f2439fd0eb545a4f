pub mod api;
pub mod auth;

pub use api::{ApiService, FetchError, HttpApiService};
pub use auth::{AccessToken, AuthInfo, RenewSessionErrorBody, RenewalError, RenewalToken};
