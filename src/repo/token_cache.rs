//! Single-flight access token cache.

use futures::future::{BoxFuture, FutureExt, Shared};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tokio::time::Instant;

use crate::net::auth::{AccessToken, RenewalError};

type RenewalResult = Result<AccessToken, RenewalError>;
type RenewFn = dyn Fn() -> BoxFuture<'static, RenewalResult> + Send + Sync;
type SharedRenewal = Shared<BoxFuture<'static, RenewalResult>>;

#[derive(Debug, Clone)]
struct CachedToken {
    token: AccessToken,
    expires_at: Option<Instant>,
}

impl CachedToken {
    fn is_valid(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| now < at)
    }
}

#[derive(Default)]
struct TokenState {
    current: Option<CachedToken>,
    in_flight: Option<SharedRenewal>,
    renewals: u64,
}

struct Inner {
    renew: Box<RenewFn>,
    lifetime: Option<Duration>,
    state: Mutex<TokenState>,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, TokenState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Hands out access tokens, renewing them at most once at a time.
///
/// Callers arriving while a renewal is running wait for that renewal and all
/// receive its outcome. A failed renewal leaves the cache empty, so the next
/// `get` starts over.
#[derive(Clone)]
pub struct AccessTokenCache {
    inner: Arc<Inner>,
}

impl AccessTokenCache {
    /// Create a cache around an async renewal function. With a `lifetime`,
    /// tokens are renewed once they are that old.
    pub fn new<F, Fut>(renew: F, lifetime: Option<Duration>) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = RenewalResult> + Send + 'static,
    {
        Self {
            inner: Arc::new(Inner {
                renew: Box::new(move || renew().boxed()),
                lifetime,
                state: Mutex::new(TokenState::default()),
            }),
        }
    }

    /// A valid token, renewing first if there is none
    pub async fn get(&self) -> RenewalResult {
        let renewal = {
            let mut state = self.inner.lock();
            if let Some(cached) = &state.current {
                if cached.is_valid(Instant::now()) {
                    return Ok(cached.token.clone());
                }
                state.current = None;
            }

            match &state.in_flight {
                Some(renewal) => renewal.clone(),
                None => {
                    let renewal = self.start_renewal(&mut state);
                    state.in_flight = Some(renewal.clone());
                    renewal
                }
            }
        };

        renewal.await
    }

    /// Starts a renewal in the background without waiting for it
    pub fn prime(&self) {
        let cache = self.clone();
        tokio::spawn(async move {
            if let Err(e) = cache.get().await {
                log::warn!("initial access token renewal failed: {}", e);
            }
        });
    }

    /// Forget `token` if it is still the cached one
    pub fn invalidate(&self, token: &AccessToken) {
        let mut state = self.inner.lock();
        if state.current.as_ref().map(|c| &c.token) == Some(token) {
            log::debug!("access token invalidated");
            state.current = None;
        }
    }

    /// Cached token without renewing, if still valid
    pub fn current(&self) -> Option<AccessToken> {
        let state = self.inner.lock();
        state
            .current
            .as_ref()
            .filter(|c| c.is_valid(Instant::now()))
            .map(|c| c.token.clone())
    }

    /// Number of renewals started so far
    pub fn renewal_count(&self) -> u64 {
        self.inner.lock().renewals
    }

    fn start_renewal(&self, state: &mut TokenState) -> SharedRenewal {
        state.renewals += 1;
        log::info!("renewing access token");

        let renewal = (self.inner.renew)();
        let inner: Weak<Inner> = Arc::downgrade(&self.inner);
        let lifetime = self.inner.lifetime;

        async move {
            let result = renewal.await;
            if let Some(inner) = inner.upgrade() {
                let mut state = inner.lock();
                state.in_flight = None;
                match &result {
                    Ok(token) => {
                        state.current = Some(CachedToken {
                            token: token.clone(),
                            // Too far out to represent means it never expires
                            expires_at: lifetime.and_then(|l| Instant::now().checked_add(l)),
                        });
                    }
                    Err(e) => log::warn!("access token renewal failed: {}", e),
                }
            }
            result
        }
        .boxed()
        .shared()
    }
}

impl std::fmt::Debug for AccessTokenCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.lock();
        f.debug_struct("AccessTokenCache")
            .field("has_token", &state.current.is_some())
            .field("renewing", &state.in_flight.is_some())
            .field("lifetime", &self.inner.lifetime)
            .finish()
    }
}
