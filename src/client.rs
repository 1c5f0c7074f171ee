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

//! Low-level authenticated client.

use std::sync::Arc;
use std::time::Duration;

#[cfg(feature = "stream")]
use futures::Stream;
use http::header::{HeaderMap, HeaderName, HeaderValue};
use http::Error as HttpError;
use log::{debug, trace};
use reqwest::{Method, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use static_assertions::assert_impl_all;

use super::auth::AuthType;
use super::cache::{CachedToken, TokenCache};
use super::request::{self, RequestDescriptor};
#[cfg(feature = "stream")]
use super::stream::paginated;
use super::transport::Transport;
use super::{Error, ErrorKind};

#[cfg(feature = "stream")]
pub use super::stream::PaginatedResource;

/// Authenticated HTTP client.
///
/// Every request gets a token attached. If a service responds with HTTP 401, the cached token is
/// dropped, a new one is acquired and the request is repeated once.
///
/// Uses `Arc` internally and should be reused when possible by cloning it. Clones share the
/// token cache.
#[derive(Debug, Clone)]
pub struct AuthenticatedClient {
    transport: Arc<dyn Transport>,
    auth: Arc<dyn AuthType>,
    cache: Arc<TokenCache>,
}

assert_impl_all!(AuthenticatedClient: Send, Sync);

impl AuthenticatedClient {
    /// Create a new authenticated client with an empty token cache.
    #[inline]
    pub fn new<T, A>(transport: T, auth: A) -> AuthenticatedClient
    where
        T: Transport + 'static,
        A: AuthType + 'static,
    {
        AuthenticatedClient::new_with_cache(
            Arc::new(transport),
            Arc::new(auth),
            Arc::new(TokenCache::new()),
        )
    }

    /// Create a new authenticated client with an explicit token cache.
    #[inline]
    pub fn new_with_cache(
        transport: Arc<dyn Transport>,
        auth: Arc<dyn AuthType>,
        cache: Arc<TokenCache>,
    ) -> AuthenticatedClient {
        AuthenticatedClient {
            transport,
            auth,
            cache,
        }
    }

    /// Create a new authenticated client using `reqwest` as a transport.
    #[inline]
    pub fn from_client<A>(client: reqwest::Client, auth: A) -> AuthenticatedClient
    where
        A: AuthType + 'static,
    {
        AuthenticatedClient::new(client, auth)
    }

    /// Get a reference to the authentication type in use.
    #[inline]
    pub fn auth_type(&self) -> &dyn AuthType {
        self.auth.as_ref()
    }

    /// Get a reference to the transport in use.
    #[inline]
    pub fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }

    /// Get a reference to the token cache.
    #[inline]
    pub fn token_cache(&self) -> &TokenCache {
        self.cache.as_ref()
    }

    /// Force re-authentication.
    ///
    /// # Warning
    ///
    /// The new token will also be used by clones of this client, since they share the same
    /// cache.
    pub async fn refresh(&self) -> Result<(), Error> {
        let _ = self
            .cache
            .refresh(self.auth.as_ref(), self.transport.as_ref())
            .await?;
        Ok(())
    }

    /// Drop the cached token, the next request will re-authenticate.
    #[inline]
    pub async fn invalidate_token(&self) {
        self.cache.clear().await
    }

    /// Set a new authentication for this client.
    ///
    /// The client is detached from the token cache it shared with its clones.
    #[inline]
    pub fn set_auth_type<Auth: AuthType + 'static>(&mut self, auth_type: Auth) {
        self.auth = Arc::new(auth_type);
        self.cache = Arc::new(TokenCache::new());
    }

    /// Execute a request, check the result for errors.
    pub async fn execute(&self, request: &RequestDescriptor) -> Result<Response, Error> {
        request::check(self.execute_unchecked(request).await?).await
    }

    /// Execute a request without checking for HTTP errors.
    ///
    /// The authentication retry still happens: a response with HTTP 401 to the repeated request
    /// results in an `AuthenticationFailed` error.
    pub async fn execute_unchecked(&self, request: &RequestDescriptor) -> Result<Response, Error> {
        let token = self
            .cache
            .get_or_authenticate(self.auth.as_ref(), self.transport.as_ref())
            .await?;
        let response = self.send_with_token(request, &token).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        debug!(
            "HTTP {} request to {} was rejected with {:?}, re-authenticating",
            request.method(),
            request.url(),
            token.token()
        );
        let _ = self.cache.invalidate(&token).await;
        let token = self
            .cache
            .get_or_authenticate(self.auth.as_ref(), self.transport.as_ref())
            .await?;
        let response = self.send_with_token(request, &token).await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            let body = response.text().await?;
            let message = request::extract_message(&body);
            debug!(
                "HTTP {} request to {} was rejected again: {}",
                request.method(),
                request.url(),
                message
            );
            return Err(Error::new(ErrorKind::AuthenticationFailed, message)
                .with_status(StatusCode::UNAUTHORIZED)
                .with_body(body));
        }

        Ok(response)
    }

    async fn send_with_token(
        &self,
        request: &RequestDescriptor,
        token: &CachedToken,
    ) -> Result<Response, Error> {
        let mut req = request.to_request();
        let _ = req
            .headers_mut()
            .insert(self.auth.token_header(), token.token().to_header_value()?);
        let response = self.transport.send(req).await?;
        trace!(
            "HTTP {} request to {} returned {}",
            request.method(),
            request.url(),
            response.status()
        );
        Ok(response)
    }

    /// Start an authenticated request.
    #[inline]
    pub fn request(&self, method: Method, url: Url) -> RequestBuilder {
        RequestBuilder {
            inner: Ok(RequestDescriptor::new(method, url)),
            client: self.clone(),
        }
    }

    #[cfg(test)]
    pub(crate) fn new_fake(
        responses: Vec<(u16, &'static str)>,
    ) -> (
        AuthenticatedClient,
        Arc<crate::transport::test::FakeTransport>,
        crate::auth::test::CountingAuth,
    ) {
        let transport = Arc::new(crate::transport::test::FakeTransport::new(responses));
        let auth = crate::auth::test::CountingAuth::default();
        let client = AuthenticatedClient::new_with_cache(
            transport.clone(),
            Arc::new(auth.clone()),
            Arc::new(TokenCache::new()),
        );
        (client, transport, auth)
    }
}

/// A request builder with error handling.
///
/// Errors are deferred until the request is built or sent.
#[derive(Debug)]
#[must_use = "preparing a request is not enough to run it"]
pub struct RequestBuilder {
    inner: Result<RequestDescriptor, Error>,
    client: AuthenticatedClient,
}

impl RequestBuilder {
    fn and_then<F>(self, f: F) -> RequestBuilder
    where
        F: FnOnce(RequestDescriptor) -> Result<RequestDescriptor, Error>,
    {
        RequestBuilder {
            inner: self.inner.and_then(f),
            ..self
        }
    }

    /// Add a body to the request.
    pub fn body<T: Into<Vec<u8>>>(self, body: T) -> RequestBuilder {
        self.and_then(|desc| Ok(desc.with_body(body)))
    }

    /// Add a header to the request.
    pub fn header<K, V>(self, key: K, value: V) -> RequestBuilder
    where
        HeaderName: TryFrom<K>,
        <HeaderName as TryFrom<K>>::Error: Into<HttpError>,
        HeaderValue: TryFrom<V>,
        <HeaderValue as TryFrom<V>>::Error: Into<HttpError>,
    {
        self.and_then(|desc| {
            let key = HeaderName::try_from(key).map_err(|e| invalid_header(e.into()))?;
            let value = HeaderValue::try_from(value).map_err(|e| invalid_header(e.into()))?;
            Ok(desc.with_header(key, value))
        })
    }

    /// Add headers to a request.
    pub fn headers(self, headers: HeaderMap) -> RequestBuilder {
        self.and_then(|mut desc| {
            for (key, value) in headers.into_iter() {
                if let Some(key) = key {
                    desc = desc.with_header(key, value);
                }
            }
            Ok(desc)
        })
    }

    /// Add a JSON body to the request.
    pub fn json<T: Serialize + ?Sized>(self, json: &T) -> RequestBuilder {
        self.and_then(|desc| desc.with_json(json))
    }

    /// Send a query with the request.
    pub fn query<T: Serialize + ?Sized>(self, query: &T) -> RequestBuilder {
        self.and_then(|desc| desc.with_query(query))
    }

    /// Override the timeout for the request.
    pub fn timeout(self, timeout: Duration) -> RequestBuilder {
        self.and_then(|desc| Ok(desc.with_timeout(timeout)))
    }

    /// Build a request descriptor.
    #[inline]
    pub fn build(self) -> Result<RequestDescriptor, Error> {
        self.inner
    }

    /// Send the request and receive JSON in response.
    pub async fn fetch_json<T>(self) -> Result<T, Error>
    where
        T: DeserializeOwned + Send,
    {
        self.send().await?.json::<T>().await.map_err(Error::from)
    }

    /// Send the request and check for errors.
    pub async fn send(self) -> Result<Response, Error> {
        let client = self.client.clone();
        client.execute(&self.build()?).await
    }

    /// Send the request without checking for HTTP and OpenStack errors.
    pub async fn send_unchecked(self) -> Result<Response, Error> {
        let client = self.client.clone();
        client.execute_unchecked(&self.build()?).await
    }

    /// Send the request and receive JSON in response with pagination.
    ///
    /// Note that the actual requests will happen only on iteration over the results.
    ///
    /// ```rust,no_run
    /// # async fn example() -> Result<(), osclient::Error> {
    /// use futures::pin_mut;
    /// use futures::stream::TryStreamExt;
    /// use serde::Deserialize;
    ///
    /// #[derive(Debug, Deserialize)]
    /// pub struct Server {
    ///     pub id: String,
    ///     pub name: String,
    /// }
    ///
    /// #[derive(Debug, Deserialize)]
    /// pub struct ServersRoot {
    ///     pub servers: Vec<Server>,
    /// }
    ///
    /// impl osclient::PaginatedResource for Server {
    ///     type Id = String;
    ///     type Root = ServersRoot;
    ///     fn resource_id(&self) -> Self::Id {
    ///         self.id.clone()
    ///     }
    /// }
    ///
    /// impl From<ServersRoot> for Vec<Server> {
    ///     fn from(value: ServersRoot) -> Vec<Server> {
    ///         value.servers
    ///     }
    /// }
    ///
    /// let client = osclient::from_env()?;
    /// let url = reqwest::Url::parse("https://cloud.local/compute/v2.1/servers").unwrap();
    ///
    /// let servers = client
    ///     .request(reqwest::Method::GET, url)
    ///     .fetch_paginated::<Server>(None, None)?;
    ///
    /// pin_mut!(servers);
    /// while let Some(srv) = servers.try_next().await? {
    ///     println!("ID = {}, Name = {}", srv.id, srv.name);
    /// }
    /// # Ok(()) }
    /// # #[tokio::main]
    /// # async fn main() { example().await.unwrap(); }
    /// ```
    #[cfg(feature = "stream")]
    pub fn fetch_paginated<T>(
        self,
        limit: Option<usize>,
        starting_with: Option<<T as PaginatedResource>::Id>,
    ) -> Result<impl Stream<Item = Result<T, Error>>, Error>
    where
        T: PaginatedResource + Unpin,
        <T as PaginatedResource>::Root: Into<Vec<T>> + Send,
    {
        let client = self.client.clone();
        let request = self.build()?;
        Ok(paginated(client, request, limit, starting_with))
    }
}

fn invalid_header(err: HttpError) -> Error {
    Error::new(ErrorKind::InvalidInput, format!("Invalid header: {}", err))
}

#[cfg(test)]
mod test {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use reqwest::{Method, Request, Response, StatusCode, Url};
    use serde::Deserialize;

    use super::AuthenticatedClient;
    use crate::auth::test::CountingAuth;
    use crate::request::RequestDescriptor;
    use crate::{Error, ErrorKind, Token, TokenCache, Transport};

    fn descriptor() -> RequestDescriptor {
        RequestDescriptor::new(
            Method::GET,
            Url::parse("http://127.0.0.1/v2.1/flavors/1").unwrap(),
        )
    }

    #[tokio::test]
    async fn test_success_sends_once() {
        let (client, transport, auth) = AuthenticatedClient::new_fake(vec![(200, "{}")]);
        let resp = client.execute(&descriptor()).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(transport.calls(), 1);
        assert_eq!(auth.calls(), 1);
        assert_eq!(transport.requests()[0].token.as_deref(), Some("token-1"));
    }

    #[tokio::test]
    async fn test_cached_token_is_reused() {
        let (client, transport, auth) =
            AuthenticatedClient::new_fake(vec![(200, "{}"), (200, "{}")]);
        let _ = client.execute(&descriptor()).await.unwrap();
        let _ = client.execute(&descriptor()).await.unwrap();
        assert_eq!(transport.calls(), 2);
        assert_eq!(auth.calls(), 1);
    }

    #[tokio::test]
    async fn test_clones_share_cache() {
        let (client, _transport, auth) =
            AuthenticatedClient::new_fake(vec![(200, "{}"), (200, "{}")]);
        let clone = client.clone();
        let _ = client.execute(&descriptor()).await.unwrap();
        let _ = clone.execute(&descriptor()).await.unwrap();
        assert_eq!(auth.calls(), 1);
    }

    #[tokio::test]
    async fn test_retry_after_unauthorized() {
        let (client, transport, auth) = AuthenticatedClient::new_fake(vec![
            (401, "Your token has expired"),
            (200, r#"{"flavor": {"id": "1"}}"#),
        ]);
        let resp = client.execute(&descriptor()).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(transport.calls(), 2);
        assert_eq!(auth.calls(), 2);
        let requests = transport.requests();
        assert_eq!(requests[0].token.as_deref(), Some("token-1"));
        assert_eq!(requests[1].token.as_deref(), Some("token-2"));
        let cached = client.token_cache().get().await.unwrap();
        assert_eq!(cached.token().value(), "token-2");
    }

    #[tokio::test]
    async fn test_retry_replays_body() {
        let (client, transport, _auth) =
            AuthenticatedClient::new_fake(vec![(401, ""), (202, "")]);
        let desc = RequestDescriptor::new(
            Method::POST,
            Url::parse("http://127.0.0.1/v2.1/servers/1/action").unwrap(),
        )
        .with_body(r#"{"reboot": {"type": "HARD"}}"#);
        let _ = client.execute(&desc).await.unwrap();
        let requests = transport.requests();
        assert_eq!(requests[0].method, Method::POST);
        assert_eq!(requests[1].method, Method::POST);
        assert_eq!(requests[0].body, requests[1].body);
        assert!(requests[1].body.is_some());
    }

    #[tokio::test]
    async fn test_unauthorized_twice() {
        let (client, transport, auth) = AuthenticatedClient::new_fake(vec![
            (401, "Your token has expired"),
            (401, r#"{"error": {"message": "The request you have made requires authentication.", "code": 401}}"#),
        ]);
        let err = client.execute(&descriptor()).await.err().unwrap();
        assert_eq!(err.kind(), ErrorKind::AuthenticationFailed);
        assert_eq!(err.status(), Some(StatusCode::UNAUTHORIZED));
        assert_eq!(
            err.message(),
            Some("The request you have made requires authentication.")
        );
        assert_eq!(transport.calls(), 2);
        assert_eq!(auth.calls(), 2);
    }

    #[tokio::test]
    async fn test_unauthorized_then_failure() {
        let (client, transport, _auth) =
            AuthenticatedClient::new_fake(vec![(401, ""), (404, r#"{"message": "No flavor"}"#)]);
        let err = client.execute(&descriptor()).await.err().unwrap();
        assert_eq!(err.kind(), ErrorKind::ResourceNotFound);
        assert_eq!(err.message(), Some("No flavor"));
        assert_eq!(transport.calls(), 2);
    }

    /// Rejects one token, accepts any other.
    #[derive(Debug, Default)]
    struct RejectingTransport {
        rejected: AtomicUsize,
        accepted: AtomicUsize,
    }

    #[async_trait]
    impl Transport for RejectingTransport {
        async fn send(&self, request: Request) -> Result<Response, Error> {
            let token = request.headers().get("x-auth-token").unwrap();
            let status = if token == "stale" {
                let _ = self.rejected.fetch_add(1, Ordering::SeqCst);
                StatusCode::UNAUTHORIZED
            } else {
                let _ = self.accepted.fetch_add(1, Ordering::SeqCst);
                StatusCode::OK
            };
            Ok(Response::from(
                http::Response::builder().status(status).body("{}").unwrap(),
            ))
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_unauthorized_reauthenticate_once() {
        let transport = Arc::new(RejectingTransport::default());
        let auth = CountingAuth {
            delay: Some(Duration::from_millis(50)),
            ..Default::default()
        };
        let cache = Arc::new(TokenCache::new());
        let _ = cache.set(Token::new("stale")).await;
        let client =
            AuthenticatedClient::new_with_cache(transport.clone(), Arc::new(auth.clone()), cache);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let client = client.clone();
                tokio::spawn(async move { client.execute(&descriptor()).await })
            })
            .collect();
        for handle in handles {
            let resp = handle.await.unwrap().unwrap();
            assert_eq!(resp.status(), StatusCode::OK);
        }

        assert_eq!(auth.calls(), 1);
        assert_eq!(transport.accepted.load(Ordering::SeqCst), 8);
        assert!(transport.rejected.load(Ordering::SeqCst) <= 8);
        let cached = client.token_cache().get().await.unwrap();
        assert_eq!(cached.token().value(), "token-1");
    }

    #[tokio::test]
    async fn test_failure_is_not_retried() {
        let (client, transport, auth) =
            AuthenticatedClient::new_fake(vec![(500, "database is down")]);
        let err = client.execute(&descriptor()).await.err().unwrap();
        assert_eq!(err.kind(), ErrorKind::InternalServerError);
        assert_eq!(err.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
        assert_eq!(err.body(), Some("database is down"));
        assert_eq!(transport.calls(), 1);
        assert_eq!(auth.calls(), 1);
    }

    #[tokio::test]
    async fn test_unchecked_returns_failure() {
        let (client, _transport, _auth) = AuthenticatedClient::new_fake(vec![(409, "conflict")]);
        let resp = client.execute_unchecked(&descriptor()).await.unwrap();
        assert_eq!(resp.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_transport_error_is_not_retried() {
        let (client, transport, auth) = AuthenticatedClient::new_fake(vec![]);
        transport.push_failure(ErrorKind::TransportError);
        let err = client.execute(&descriptor()).await.err().unwrap();
        assert_eq!(err.kind(), ErrorKind::TransportError);
        assert_eq!(transport.calls(), 1);
        assert_eq!(auth.calls(), 1);
    }

    #[tokio::test]
    async fn test_identity_failure() {
        let transport = Arc::new(crate::transport::test::FakeTransport::default());
        let auth = CountingAuth {
            fail: true,
            ..Default::default()
        };
        let client = AuthenticatedClient::new_with_cache(
            transport.clone(),
            Arc::new(auth),
            Default::default(),
        );
        let err = client.execute(&descriptor()).await.err().unwrap();
        assert_eq!(err.kind(), ErrorKind::AuthenticationFailed);
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn test_refresh_and_invalidate() {
        let (client, _transport, auth) = AuthenticatedClient::new_fake(vec![]);
        client.refresh().await.unwrap();
        assert_eq!(auth.calls(), 1);
        client.invalidate_token().await;
        assert!(client.token_cache().get().await.is_none());
    }

    #[derive(Debug, Deserialize)]
    struct Flavor {
        id: String,
    }

    #[derive(Debug, Deserialize)]
    struct FlavorRoot {
        flavor: Flavor,
    }

    #[tokio::test]
    async fn test_builder_fetch_json() {
        let (client, transport, _auth) =
            AuthenticatedClient::new_fake(vec![(200, r#"{"flavor": {"id": "42"}}"#)]);
        let root: FlavorRoot = client
            .request(Method::GET, Url::parse("http://127.0.0.1/v2.1/flavors/42").unwrap())
            .query(&[("detailed", "true")])
            .header("x-openstack-request-id", "req-1")
            .fetch_json()
            .await
            .unwrap();
        assert_eq!(root.flavor.id, "42");
        assert_eq!(
            transport.requests()[0].url,
            "http://127.0.0.1/v2.1/flavors/42?detailed=true"
        );
    }

    #[tokio::test]
    async fn test_builder_invalid_header() {
        let (client, transport, auth) = AuthenticatedClient::new_fake(vec![]);
        let err = client
            .request(Method::GET, Url::parse("http://127.0.0.1/v2.1/flavors").unwrap())
            .header("invalid header", "value")
            .query(&[("is_public", "true")])
            .send()
            .await
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert_eq!(transport.calls(), 0);
        assert_eq!(auth.calls(), 0);
    }

    #[tokio::test]
    async fn test_builder_json_body() {
        let (client, transport, _auth) = AuthenticatedClient::new_fake(vec![(202, "")]);
        let _ = client
            .request(Method::POST, Url::parse("http://127.0.0.1/v2.1/servers").unwrap())
            .json(&serde_json::json!({"server": {"name": "test"}}))
            .send()
            .await
            .unwrap();
        let body: serde_json::Value =
            serde_json::from_slice(transport.requests()[0].body.as_ref().unwrap()).unwrap();
        assert_eq!(body["server"]["name"], "test");
    }
}
