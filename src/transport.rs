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

//! HTTP transport abstraction.

use std::fmt::Debug;

use async_trait::async_trait;
use log::trace;
use reqwest::{Client, Request, Response};
use static_assertions::assert_obj_safe;

use super::Error;

/// An HTTP transport.
///
/// A transport sends a fully prepared request and returns the response as is. It must not
/// interpret HTTP statuses: a 401 response is a normal response at this level, so that the
/// [AuthenticatedClient](struct.AuthenticatedClient.html) can react to it.
#[async_trait]
pub trait Transport: Debug + Send + Sync {
    /// Send a request.
    async fn send(&self, request: Request) -> Result<Response, Error>;
}

assert_obj_safe!(Transport);

#[async_trait]
impl Transport for Client {
    async fn send(&self, request: Request) -> Result<Response, Error> {
        trace!("Sending HTTP {} request to {}", request.method(), request.url());
        self.execute(request).await.map_err(Error::from)
    }
}
