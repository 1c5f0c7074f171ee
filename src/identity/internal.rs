// Copyright 2020 Dmitry Tantsur <dtantsur@protonmail.com>
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

//! Internal implementation of the identity authentication.

use log::{debug, error};
use reqwest::{Method, Response, Url};

use super::protocol::{self, AuthRoot};
use super::{IdOrName, Scope, INVALID_SUBJECT_HEADER, MISSING_SUBJECT_HEADER};
use crate::auth::Token;
use crate::request::{self, RequestDescriptor};
use crate::transport::Transport;
use crate::{url, Error, ErrorKind};

/// Internal identity authentication object.
#[derive(Debug, Clone)]
pub(crate) struct Internal {
    auth_url: Url,
    body: AuthRoot,
    token_endpoint: Url,
}

impl Internal {
    /// Create a new implementation.
    pub fn new(mut auth_url: Url, body: AuthRoot) -> Result<Internal, Error> {
        let _ = auth_url
            .path_segments_mut()
            .map_err(|_| Error::new(ErrorKind::InvalidConfig, "Invalid auth_url: wrong schema?"))?
            .pop_if_empty();

        let token_endpoint = if auth_url.as_str().ends_with("/v3") {
            url::extend(auth_url.clone(), &["auth", "tokens"])?
        } else {
            url::extend(auth_url.clone(), &["v3", "auth", "tokens"])?
        };

        Ok(Internal {
            auth_url,
            body,
            token_endpoint,
        })
    }

    /// Access to the auth URL.
    #[inline]
    pub fn auth_url(&self) -> &Url {
        &self.auth_url
    }

    /// Add a scope to the authentication.
    pub fn set_scope(&mut self, scope: Scope) {
        self.body.auth.scope = Some(match scope {
            Scope::Project { project, domain } => {
                protocol::Scope::Project(protocol::Project { project, domain })
            }
        });
    }

    /// User name or ID.
    #[inline]
    pub fn user(&self) -> Option<&IdOrName> {
        match self.body.auth.identity {
            protocol::Identity::Password(ref pw) => Some(&pw.user),
            _ => None,
        }
    }

    /// Project name or ID (if project scoped).
    #[inline]
    pub fn project(&self) -> Option<&IdOrName> {
        match self.body.auth.scope {
            Some(protocol::Scope::Project(ref prj)) => Some(&prj.project),
            _ => None,
        }
    }

    /// Request a new token from the identity service.
    pub async fn authenticate(&self, transport: &dyn Transport) -> Result<Token, Error> {
        debug!("Requesting a token from {}", self.token_endpoint);
        let request = RequestDescriptor::new(Method::POST, self.token_endpoint.clone())
            .with_json(&self.body)?;
        let resp = transport.send(request.to_request()).await?;
        token_from_response(request::check(resp).await?).await
    }

    #[cfg(test)]
    pub fn token_endpoint(&self) -> &Url {
        &self.token_endpoint
    }
}

async fn token_from_response(resp: Response) -> Result<Token, Error> {
    let value = match resp.headers().get("x-subject-token") {
        Some(hdr) => match hdr.to_str() {
            Ok(s) => Ok(s.to_string()),
            Err(e) => {
                error!(
                    "Invalid X-Subject-Token received from {}: {}",
                    resp.url(),
                    e
                );
                Err(Error::new(
                    ErrorKind::InvalidResponse,
                    INVALID_SUBJECT_HEADER,
                ))
            }
        },
        None => {
            error!("No X-Subject-Token header received from {}", resp.url());
            Err(Error::new(
                ErrorKind::InvalidResponse,
                MISSING_SUBJECT_HEADER,
            ))
        }
    }?;

    let root = resp.json::<protocol::TokenRoot>().await?;
    debug!("Received a token expiring at {}", root.token.expires_at);
    Ok(Token::new(value).with_expires_at(root.token.expires_at))
}
