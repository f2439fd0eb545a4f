use std::sync::Arc;

use crate::core::config::TrailmapConfig;
use crate::net::api::ApiService;
use crate::net::auth::{AccessToken, RenewalError};
use crate::repo::session::{SessionError, SessionStore};
use crate::repo::token_cache::AccessTokenCache;
use crate::tiles::disk::FileCache;
use crate::tiles::repo::TileRepo;
use crate::Result;

/// Everything a logged-in user's map needs, wired together.
///
/// Owned by the application; there is no global instance.
pub struct Repo {
    api: Arc<dyn ApiService>,
    session: Arc<dyn SessionStore>,
    tokens: AccessTokenCache,
    tiles: TileRepo,
}

impl Repo {
    /// Fails with [`SessionError::NotLoggedIn`] when no renewal token is
    /// stored. Starts renewing an access token right away.
    pub async fn new(
        config: &TrailmapConfig,
        api: Arc<dyn ApiService>,
        session: Arc<dyn SessionStore>,
        files: Arc<dyn FileCache>,
    ) -> Result<Self> {
        if session.renewal_token().await?.is_none() {
            return Err(SessionError::NotLoggedIn.into());
        }

        let tokens = {
            let api = Arc::clone(&api);
            let session = Arc::clone(&session);
            AccessTokenCache::new(
                move || renew_access_token(Arc::clone(&api), Arc::clone(&session)),
                config.tokens.lifetime(),
            )
        };
        tokens.prime();

        let tiles = TileRepo::new(&config.tiles, tokens.clone(), Arc::clone(&api), files);

        Ok(Self {
            api,
            session,
            tokens,
            tiles,
        })
    }

    pub fn tile_repo(&self) -> &TileRepo {
        &self.tiles
    }

    pub fn access_tokens(&self) -> &AccessTokenCache {
        &self.tokens
    }

    /// Ends the session on the server and forgets it locally.
    ///
    /// The local session is cleared even if the server call fails.
    pub async fn logout(self) -> Result<()> {
        if let Some(token) = self.session.renewal_token().await? {
            if let Err(e) = self.api.delete_session(&token).await {
                log::warn!("server side logout failed: {}", e);
            }
        }
        self.session.clear().await?;
        log::info!("logged out");
        Ok(())
    }
}

impl std::fmt::Debug for Repo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repo")
            .field("tokens", &self.tokens)
            .field("tiles", &self.tiles)
            .finish_non_exhaustive()
    }
}

async fn renew_access_token(
    api: Arc<dyn ApiService>,
    session: Arc<dyn SessionStore>,
) -> std::result::Result<AccessToken, RenewalError> {
    let renewal_token = session
        .renewal_token()
        .await
        .map_err(|e| RenewalError::Persist(e.to_string()))?
        .ok_or(RenewalError::NoRenewalToken)?;

    let info = api.renew_session(&renewal_token).await?;

    session
        .update_renewal_token(info.renewal_token)
        .await
        .map_err(|e| RenewalError::Persist(e.to_string()))?;

    Ok(info.access_token)
}
