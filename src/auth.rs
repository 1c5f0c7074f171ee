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

//! Base code for authentication.

use std::collections::hash_map::DefaultHasher;
use std::fmt::{self, Debug};
use std::hash::{Hash, Hasher};

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use reqwest::header::{HeaderName, HeaderValue};
use static_assertions::{assert_impl_all, assert_obj_safe};

use super::transport::Transport;
use super::{Error, ErrorKind};

/// Name of the header used by OpenStack services for tokens.
pub const AUTH_TOKEN_HEADER: &str = "x-auth-token";

/// An authentication token.
///
/// The value is opaque. The expiration time is informational only: a token is considered valid
/// until a service rejects it.
#[derive(Clone, PartialEq, Eq)]
pub struct Token {
    value: String,
    expires_at: Option<DateTime<FixedOffset>>,
}

impl Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut hasher = DefaultHasher::new();
        self.value.hash(&mut hasher);
        write!(
            f,
            "Token {{ value: hash({}), expires_at: {:?} }}",
            hasher.finish(),
            self.expires_at
        )
    }
}

impl Token {
    /// Create a token from its value.
    pub fn new<S: Into<String>>(value: S) -> Token {
        Token {
            value: value.into(),
            expires_at: None,
        }
    }

    /// Add an expiration time reported by the identity service.
    #[inline]
    pub fn with_expires_at(mut self, expires_at: DateTime<FixedOffset>) -> Token {
        self.expires_at = Some(expires_at);
        self
    }

    /// Token value.
    #[inline]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Expiration time as reported by the identity service.
    #[inline]
    pub fn expires_at(&self) -> Option<&DateTime<FixedOffset>> {
        self.expires_at.as_ref()
    }

    /// Convert the token into a sensitive header value.
    pub fn to_header_value(&self) -> Result<HeaderValue, Error> {
        let mut value = HeaderValue::from_str(&self.value).map_err(|e| {
            Error::new(
                ErrorKind::InvalidResponse,
                format!("Token cannot be used as a header value: {}", e),
            )
        })?;
        value.set_sensitive(true);
        Ok(value)
    }
}

/// Trait for an authentication type.
///
/// An authentication type is an identity provider: it is able to obtain a new token, usually by
/// calling a remote identity service through the provided transport. It does not cache tokens,
/// caching is the job of the [AuthenticatedClient](struct.AuthenticatedClient.html).
#[async_trait]
pub trait AuthType: Debug + Sync + Send {
    /// Obtain a new token.
    async fn authenticate(&self, transport: &dyn Transport) -> Result<Token, Error>;

    /// Header used to pass the token to services.
    fn token_header(&self) -> HeaderName {
        HeaderName::from_static(AUTH_TOKEN_HEADER)
    }
}

assert_obj_safe!(AuthType);

/// Authentication type that uses a pre-issued token.
///
/// Re-authentication returns the same token, so a request rejected with it will fail with
/// `AuthenticationFailed` after one retry.
///
/// ```rust,no_run
/// let auth = osclient::FixedToken::new("<a token>");
/// let client = osclient::AuthenticatedClient::from_client(reqwest::Client::new(), auth);
/// ```
#[derive(Clone, Debug)]
pub struct FixedToken {
    token: Token,
    header: HeaderName,
}

assert_impl_all!(FixedToken: Send, Sync);

impl FixedToken {
    /// Create an authentication method from the token value.
    #[inline]
    pub fn new<S: Into<String>>(token: S) -> FixedToken {
        FixedToken {
            token: Token::new(token),
            header: HeaderName::from_static(AUTH_TOKEN_HEADER),
        }
    }

    /// Use a different header to pass the token.
    #[inline]
    pub fn with_header(mut self, header: HeaderName) -> FixedToken {
        self.header = header;
        self
    }
}

#[async_trait]
impl AuthType for FixedToken {
    async fn authenticate(&self, _transport: &dyn Transport) -> Result<Token, Error> {
        Ok(self.token.clone())
    }

    fn token_header(&self) -> HeaderName {
        self.header.clone()
    }
}
