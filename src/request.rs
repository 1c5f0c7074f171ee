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

//! Utilities to work with OpenStack requests.

use std::collections::HashMap;
use std::convert::TryFrom;
use std::time::Duration;

use log::trace;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::{Method, Request, Response, Url};
use serde::{Deserialize, Serialize};

use super::{Error, ErrorKind};

/// A description of an HTTP request.
///
/// Unlike `reqwest::Request`, a descriptor can always be cloned, which allows the
/// [AuthenticatedClient](../struct.AuthenticatedClient.html) to replay it.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    method: Method,
    url: Url,
    headers: HeaderMap,
    body: Option<Vec<u8>>,
    timeout: Option<Duration>,
}

impl RequestDescriptor {
    /// Create a request without headers and body.
    #[inline]
    pub fn new(method: Method, url: Url) -> RequestDescriptor {
        RequestDescriptor {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
            timeout: None,
        }
    }

    /// Add a header.
    #[inline]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> RequestDescriptor {
        let _ = self.headers.insert(name, value);
        self
    }

    /// Replace the target URL.
    #[inline]
    pub fn with_url(mut self, url: Url) -> RequestDescriptor {
        self.url = url;
        self
    }

    /// Set a raw body.
    #[inline]
    pub fn with_body<B: Into<Vec<u8>>>(mut self, body: B) -> RequestDescriptor {
        self.body = Some(body.into());
        self
    }

    /// Set a timeout for each attempt to send the request.
    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> RequestDescriptor {
        self.timeout = Some(timeout);
        self
    }

    /// Set a JSON body and the corresponding content type.
    pub fn with_json<T: Serialize + ?Sized>(self, json: &T) -> Result<RequestDescriptor, Error> {
        let body = serde_json::to_vec(json).map_err(|e| {
            Error::new(
                ErrorKind::InvalidInput,
                format!("Cannot serialize request body: {}", e),
            )
        })?;
        Ok(self
            .with_header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .with_body(body))
    }

    /// Append query parameters to the URL.
    pub fn with_query<Q: Serialize + ?Sized>(
        mut self,
        query: &Q,
    ) -> Result<RequestDescriptor, Error> {
        let encoded = serde_urlencoded::to_string(query).map_err(|e| {
            Error::new(
                ErrorKind::InvalidInput,
                format!("Cannot serialize query: {}", e),
            )
        })?;
        if !encoded.is_empty() {
            let query = match self.url.query() {
                Some(existing) if !existing.is_empty() => format!("{}&{}", existing, encoded),
                _ => encoded,
            };
            self.url.set_query(Some(&query));
        }
        Ok(self)
    }

    /// HTTP method.
    #[inline]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Target URL.
    #[inline]
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Request headers.
    #[inline]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Request body (if any).
    #[inline]
    pub fn body(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }

    /// Build a new `reqwest::Request` from this descriptor.
    pub fn to_request(&self) -> Request {
        let mut request = Request::new(self.method.clone(), self.url.clone());
        *request.headers_mut() = self.headers.clone();
        if let Some(ref body) = self.body {
            *request.body_mut() = Some(body.clone().into());
        }
        *request.timeout_mut() = self.timeout;
        request
    }
}

impl TryFrom<Request> for RequestDescriptor {
    type Error = Error;

    /// Convert a prepared request, failing for streaming bodies.
    fn try_from(value: Request) -> Result<RequestDescriptor, Error> {
        let body = match value.body() {
            Some(body) => Some(
                body.as_bytes()
                    .ok_or_else(|| {
                        Error::new(
                            ErrorKind::InvalidInput,
                            "Streaming bodies cannot be used with authenticated requests",
                        )
                    })?
                    .to_vec(),
            ),
            None => None,
        };
        Ok(RequestDescriptor {
            method: value.method().clone(),
            url: value.url().clone(),
            headers: value.headers().clone(),
            body,
            timeout: value.timeout().copied(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct Message {
    message: Option<String>,
    faultstring: Option<String>,
    title: Option<String>,
    // Ironic legacy format: JSON inside JSON
    error_message: Option<String>,
}

impl Message {
    fn convert(self, recursive: bool) -> Option<String> {
        if let Some(value) = self.message.or(self.faultstring).or(self.title) {
            Some(value)
        } else if recursive {
            self.error_message.and_then(|json| {
                serde_json::from_str::<Message>(&json)
                    .ok()
                    .and_then(|msg| msg.convert(false))
            })
        } else {
            None
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorResponse {
    Map(HashMap<String, Message>),
    Message(Message),
}

pub(crate) fn extract_message(text: &str) -> String {
    serde_json::from_str::<ErrorResponse>(text)
        .ok()
        .and_then(|body| match body {
            ErrorResponse::Map(map) => map.into_iter().next().and_then(|(_k, v)| v.convert(true)),
            ErrorResponse::Message(msg) => msg.convert(true),
        })
        .unwrap_or_else(|| text.to_string())
}

/// Check for OpenStack errors in the response.
///
/// Any non-successful status is converted into an error carrying the status and the body.
pub async fn check(response: Response) -> Result<Response, Error> {
    let status = response.status();
    if status.is_success() {
        trace!(
            "HTTP request to {} returned {}",
            response.url(),
            response.status()
        );
        Ok(response)
    } else {
        let body = response.text().await?;
        let message = extract_message(&body);
        trace!("HTTP request returned {}; error: {}", status, message);
        Err(Error::new(status.into(), message)
            .with_status(status)
            .with_body(body))
    }
}

/// Check the response and convert it to a JSON.
#[inline]
pub async fn to_json<T>(response: Response) -> Result<T, Error>
where
    T: serde::de::DeserializeOwned + Send,
{
    check(response).await?.json::<T>().await.map_err(Error::from)
}
