// Copyright 2019 Dmitry Tantsur <dtantsur@protonmail.com>
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

//! Adapter for a specific service.

use reqwest::{IntoUrl, Method, Response, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use super::client::{AuthenticatedClient, RequestBuilder};
use super::poll::{self, WaitOptions};
use super::status::ResourceStatus;
use super::url;
use super::{Error, ErrorKind};

/// Adapter for a specific service.
///
/// An `Adapter` is an [AuthenticatedClient](struct.AuthenticatedClient.html) tied to the
/// root URL of a service, so that all calls accept paths relative to it (e.g. `servers/1234`).
#[derive(Debug, Clone)]
pub struct Adapter {
    client: AuthenticatedClient,
    endpoint: Url,
}

impl Adapter {
    /// Create a new adapter for the service root URL.
    pub fn new<U: IntoUrl>(client: AuthenticatedClient, endpoint: U) -> Result<Adapter, Error> {
        let endpoint = endpoint.into_url()?;
        url::check_base(&endpoint)?;
        Ok(Adapter { client, endpoint })
    }

    /// Underlying client.
    #[inline]
    pub fn client(&self) -> &AuthenticatedClient {
        &self.client
    }

    /// Root URL of the service.
    #[inline]
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Construct an endpoint from the path.
    #[inline]
    pub fn get_endpoint(&self, path: &str) -> Result<Url, Error> {
        url::extend_path(self.endpoint.clone(), path)
    }

    /// Make an HTTP request.
    ///
    /// The `path` argument is a URL path without the service endpoint (e.g. `servers/1234`).
    ///
    /// The result is a `RequestBuilder` that can be customized further.
    ///
    /// ```rust,no_run
    /// # async fn example() -> Result<(), osclient::Error> {
    /// use reqwest::Method;
    ///
    /// let client = osclient::from_env()?;
    /// let adapter = osclient::Adapter::new(client, "https://cloud.local/compute/v2.1")?;
    /// let response = adapter
    ///     .request(Method::HEAD, "servers/1234")?
    ///     .send()
    ///     .await?;
    /// println!("Response: {:?}", response);
    /// # Ok(()) }
    /// ```
    ///
    /// This is the most generic call to make a request. You may prefer to use more specific `get`,
    /// `post`, `put` or `delete` calls instead.
    pub fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, Error> {
        Ok(self.client.request(method, self.get_endpoint(path)?))
    }

    /// Issue a GET request.
    #[inline]
    pub async fn get(&self, path: &str) -> Result<Response, Error> {
        self.request(Method::GET, path)?.send().await
    }

    /// Fetch a JSON using the GET request.
    #[inline]
    pub async fn get_json<T>(&self, path: &str) -> Result<T, Error>
    where
        T: DeserializeOwned + Send,
    {
        self.request(Method::GET, path)?.fetch_json().await
    }

    /// Fetch a JSON using the GET request with a query.
    ///
    /// See `reqwest` crate documentation for how to define a query.
    #[inline]
    pub async fn get_json_query<Q, T>(&self, path: &str, query: &Q) -> Result<T, Error>
    where
        Q: Serialize + ?Sized,
        T: DeserializeOwned + Send,
    {
        self.request(Method::GET, path)?
            .query(query)
            .fetch_json()
            .await
    }

    /// POST a JSON object.
    #[inline]
    pub async fn post<T>(&self, path: &str, body: &T) -> Result<Response, Error>
    where
        T: Serialize + ?Sized,
    {
        self.request(Method::POST, path)?.json(body).send().await
    }

    /// POST a JSON object and receive a JSON back.
    #[inline]
    pub async fn post_json<T, R>(&self, path: &str, body: &T) -> Result<R, Error>
    where
        T: Serialize + ?Sized,
        R: DeserializeOwned + Send,
    {
        self.request(Method::POST, path)?
            .json(body)
            .fetch_json()
            .await
    }

    /// PUT a JSON object.
    #[inline]
    pub async fn put<T>(&self, path: &str, body: &T) -> Result<Response, Error>
    where
        T: Serialize + ?Sized,
    {
        self.request(Method::PUT, path)?.json(body).send().await
    }

    /// Issue an empty PUT request.
    #[inline]
    pub async fn put_empty(&self, path: &str) -> Result<Response, Error> {
        self.request(Method::PUT, path)?.send().await
    }

    /// PUT a JSON object and receive a JSON back.
    #[inline]
    pub async fn put_json<T, R>(&self, path: &str, body: &T) -> Result<R, Error>
    where
        T: Serialize + ?Sized,
        R: DeserializeOwned + Send,
    {
        self.request(Method::PUT, path)?
            .json(body)
            .fetch_json()
            .await
    }

    /// Issue a DELETE request.
    #[inline]
    pub async fn delete(&self, path: &str) -> Result<Response, Error> {
        self.request(Method::DELETE, path)?.send().await
    }

    /// Fetch a resource and extract its status.
    ///
    /// The `pointer` is a JSON pointer to the status field, e.g. `/server/status` for Compute
    /// servers or `/status` for Image service images.
    pub async fn get_status<S>(&self, path: &str, pointer: &str) -> Result<S, Error>
    where
        S: ResourceStatus + DeserializeOwned,
    {
        let mut resource: Value = self.get_json(path).await?;
        let value = resource.pointer_mut(pointer).map(Value::take).ok_or_else(|| {
            Error::new(
                ErrorKind::InvalidResponse,
                format!("Resource at {} has no field {}", path, pointer),
            )
        })?;
        serde_json::from_value(value).map_err(|e| {
            Error::new(
                ErrorKind::InvalidResponse,
                format!("Invalid status of resource at {}: {}", path, e),
            )
        })
    }

    /// Wait for a resource at the path to reach the target status.
    ///
    /// See [get_status](#method.get_status) for the meaning of `pointer`.
    pub async fn wait_for_status<S>(
        &self,
        path: &str,
        pointer: &str,
        target: S,
        options: WaitOptions,
    ) -> Result<S, Error>
    where
        S: ResourceStatus + DeserializeOwned,
    {
        poll::wait_for_status(path, || self.get_status(path, pointer), target, options).await
    }

    /// Wait for a resource at the path to disappear.
    ///
    /// See [get_status](#method.get_status) for the meaning of `pointer`.
    pub async fn wait_until_deleted<S>(
        &self,
        path: &str,
        pointer: &str,
        options: WaitOptions,
    ) -> Result<(), Error>
    where
        S: ResourceStatus + DeserializeOwned,
    {
        poll::wait_until_deleted(path, || self.get_status::<S>(path, pointer), options).await
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use reqwest::{Method, Url};

    use super::Adapter;
    use crate::client::AuthenticatedClient;
    use crate::poll::WaitOptions;
    use crate::status::ServerStatus;
    use crate::ErrorKind;

    fn adapter(responses: Vec<(u16, &'static str)>) -> (
        Adapter,
        std::sync::Arc<crate::transport::test::FakeTransport>,
    ) {
        let (client, transport, _auth) = AuthenticatedClient::new_fake(responses);
        let endpoint = Url::parse("http://127.0.0.1/compute/v2.1/").unwrap();
        (Adapter::new(client, endpoint).unwrap(), transport)
    }

    fn options() -> WaitOptions {
        WaitOptions::default()
            .with_refresh_delay(Duration::from_secs(1))
            .with_timeout(Duration::from_secs(60))
    }

    #[test]
    fn test_endpoint() {
        let (adapter, _) = adapter(vec![]);
        assert_eq!(
            adapter.get_endpoint("servers/1234").unwrap().as_str(),
            "http://127.0.0.1/compute/v2.1/servers/1234"
        );
    }

    #[test]
    fn test_not_a_base() {
        let (client, _transport, _auth) = AuthenticatedClient::new_fake(vec![]);
        let err = Adapter::new(client, Url::parse("data:text/plain,hi").unwrap())
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[tokio::test]
    async fn test_requests() {
        let (adapter, transport) = adapter(vec![(202, ""), (204, "")]);
        let _ = adapter
            .post("servers/1/action", &serde_json::json!({"os-start": null}))
            .await
            .unwrap();
        let _ = adapter.delete("servers/1").await.unwrap();
        let requests = transport.requests();
        assert_eq!(requests[0].method, Method::POST);
        assert_eq!(
            requests[0].url,
            "http://127.0.0.1/compute/v2.1/servers/1/action"
        );
        assert_eq!(requests[1].method, Method::DELETE);
    }

    #[tokio::test]
    async fn test_get_status() {
        let (adapter, _) = adapter(vec![(200, r#"{"server": {"status": "ACTIVE"}}"#)]);
        let status: ServerStatus = adapter
            .get_status("servers/1", "/server/status")
            .await
            .unwrap();
        assert_eq!(status, ServerStatus::Active);
    }

    #[tokio::test]
    async fn test_get_status_missing() {
        let (adapter, _) = adapter(vec![(200, r#"{"server": {}}"#)]);
        let err = adapter
            .get_status::<ServerStatus>("servers/1", "/server/status")
            .await
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::InvalidResponse);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_status() {
        let (adapter, transport) = adapter(vec![
            (200, r#"{"server": {"status": "BUILD"}}"#),
            (200, r#"{"server": {"status": "ACTIVE"}}"#),
        ]);
        let status = adapter
            .wait_for_status("servers/1", "/server/status", ServerStatus::Active, options())
            .await
            .unwrap();
        assert_eq!(status, ServerStatus::Active);
        assert_eq!(transport.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_status_error() {
        let (adapter, _) = adapter(vec![(200, r#"{"server": {"status": "ERROR"}}"#)]);
        let err = adapter
            .wait_for_status("servers/1", "/server/status", ServerStatus::Active, options())
            .await
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::OperationFailed);
        assert_eq!(err.resource_id(), Some("servers/1"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_empty_path() {
        let (adapter, transport) = adapter(vec![(200, r#"{"server": {"status": "ACTIVE"}}"#)]);
        let err = adapter
            .wait_for_status("", "/server/status", ServerStatus::Active, options())
            .await
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_until_deleted() {
        let (adapter, transport) = adapter(vec![
            (200, r#"{"server": {"status": "ACTIVE"}}"#),
            (404, r#"{"itemNotFound": {"message": "Instance could not be found"}}"#),
        ]);
        adapter
            .wait_until_deleted::<ServerStatus>("servers/1", "/server/status", options())
            .await
            .unwrap();
        assert_eq!(transport.calls(), 2);
    }
}
