// Copyright 2021 Dmitry Tantsur <dtantsur@protonmail.com>
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Token cache.

use log::debug;
use tokio::sync::{Mutex, RwLock};

use crate::auth::{AuthType, Token};
use crate::transport::Transport;
use crate::Error;

/// A token together with the generation it was stored under.
///
/// The generation allows invalidating exactly the token that was rejected: if another caller
/// has already replaced it, the invalidation is a no-op.
#[derive(Debug, Clone)]
pub struct CachedToken {
    token: Token,
    generation: u64,
}

impl CachedToken {
    /// The token itself.
    #[inline]
    pub fn token(&self) -> &Token {
        &self.token
    }

    /// Generation of the cache when this token was stored.
    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[derive(Debug, Default)]
struct Slot {
    token: Option<Token>,
    generation: u64,
}

/// Cache holding at most one token.
///
/// The slot lock is only held while checking or replacing the token. Acquiring a new token is
/// serialized by a separate lock, so that concurrent callers finding an empty cache wait for one
/// acquisition instead of each calling the identity service.
#[derive(Debug, Default)]
pub struct TokenCache {
    slot: RwLock<Slot>,
    acquire: Mutex<()>,
}

impl TokenCache {
    /// Create an empty cache.
    #[inline]
    pub fn new() -> TokenCache {
        TokenCache::default()
    }

    /// Get the cached token (if any).
    pub async fn get(&self) -> Option<CachedToken> {
        let slot = self.slot.read().await;
        slot.token.as_ref().map(|token| CachedToken {
            token: token.clone(),
            generation: slot.generation,
        })
    }

    /// Replace the cached token.
    pub async fn set(&self, token: Token) -> CachedToken {
        let mut slot = self.slot.write().await;
        slot.generation += 1;
        slot.token = Some(token.clone());
        CachedToken {
            token,
            generation: slot.generation,
        }
    }

    /// Drop the given token if it is still the cached one.
    ///
    /// Returns `true` if the token was removed.
    pub async fn invalidate(&self, rejected: &CachedToken) -> bool {
        let mut slot = self.slot.write().await;
        if slot.token.is_some() && slot.generation == rejected.generation {
            debug!("Invalidating cached token {:?}", rejected.token);
            slot.token = None;
            true
        } else {
            false
        }
    }

    /// Drop any cached token.
    pub async fn clear(&self) {
        self.slot.write().await.token = None;
    }

    /// Get the cached token or acquire a new one.
    pub async fn get_or_authenticate(
        &self,
        auth: &dyn AuthType,
        transport: &dyn Transport,
    ) -> Result<CachedToken, Error> {
        if let Some(cached) = self.get().await {
            return Ok(cached);
        }

        let _guard = self.acquire.lock().await;
        // Another caller may have acquired a token while we were waiting.
        if let Some(cached) = self.get().await {
            return Ok(cached);
        }

        debug!("No cached token, authenticating");
        let token = auth.authenticate(transport).await?;
        debug!("Received {:?}", token);
        Ok(self.set(token).await)
    }

    /// Unconditionally acquire a new token.
    pub async fn refresh(
        &self,
        auth: &dyn AuthType,
        transport: &dyn Transport,
    ) -> Result<CachedToken, Error> {
        let _guard = self.acquire.lock().await;
        let token = auth.authenticate(transport).await?;
        debug!("Received {:?} on forced refresh", token);
        Ok(self.set(token).await)
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;
    use std::time::Duration;

    use super::TokenCache;
    use crate::auth::test::CountingAuth;
    use crate::auth::Token;
    use crate::transport::test::FakeTransport;
    use crate::ErrorKind;

    #[tokio::test]
    async fn test_empty() {
        let cache = TokenCache::new();
        assert!(cache.get().await.is_none());
    }

    #[tokio::test]
    async fn test_set_replaces() {
        let cache = TokenCache::new();
        let first = cache.set(Token::new("one")).await;
        let second = cache.set(Token::new("two")).await;
        assert!(second.generation() > first.generation());
        assert_eq!(cache.get().await.unwrap().token().value(), "two");
    }

    #[tokio::test]
    async fn test_invalidate_current() {
        let cache = TokenCache::new();
        let token = cache.set(Token::new("one")).await;
        assert!(cache.invalidate(&token).await);
        assert!(cache.get().await.is_none());
        assert!(!cache.invalidate(&token).await);
    }

    #[tokio::test]
    async fn test_invalidate_stale_is_noop() {
        let cache = TokenCache::new();
        let stale = cache.set(Token::new("one")).await;
        let _ = cache.set(Token::new("two")).await;
        assert!(!cache.invalidate(&stale).await);
        assert_eq!(cache.get().await.unwrap().token().value(), "two");
    }

    #[tokio::test]
    async fn test_get_or_authenticate_caches() {
        let cache = TokenCache::new();
        let auth = CountingAuth::default();
        let transport = FakeTransport::default();
        let first = cache.get_or_authenticate(&auth, &transport).await.unwrap();
        let second = cache.get_or_authenticate(&auth, &transport).await.unwrap();
        assert_eq!(first.token().value(), "token-1");
        assert_eq!(second.token().value(), "token-1");
        assert_eq!(auth.calls(), 1);
    }

    #[tokio::test]
    async fn test_get_or_authenticate_failure_keeps_cache_empty() {
        let cache = TokenCache::new();
        let auth = CountingAuth {
            fail: true,
            ..Default::default()
        };
        let transport = FakeTransport::default();
        let err = cache
            .get_or_authenticate(&auth, &transport)
            .await
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::AuthenticationFailed);
        assert!(cache.get().await.is_none());
    }

    #[tokio::test]
    async fn test_refresh_is_forced() {
        let cache = TokenCache::new();
        let auth = CountingAuth::default();
        let transport = FakeTransport::default();
        let _ = cache.get_or_authenticate(&auth, &transport).await.unwrap();
        let token = cache.refresh(&auth, &transport).await.unwrap();
        assert_eq!(token.token().value(), "token-2");
        assert_eq!(auth.calls(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_single_flight() {
        let cache = Arc::new(TokenCache::new());
        let auth = CountingAuth {
            delay: Some(Duration::from_millis(50)),
            ..Default::default()
        };
        let transport = Arc::new(FakeTransport::default());

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let auth = auth.clone();
                let transport = Arc::clone(&transport);
                tokio::spawn(async move {
                    cache
                        .get_or_authenticate(&auth, transport.as_ref())
                        .await
                        .unwrap()
                        .token()
                        .value()
                        .to_string()
                })
            })
            .collect();

        for task in tasks {
            assert_eq!(task.await.unwrap(), "token-1");
        }
        assert_eq!(auth.calls(), 1);
    }
}
