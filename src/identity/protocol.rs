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

//! JSON structures and protocol bits for the Identity V3 API.

use std::fmt;

use chrono::{DateTime, FixedOffset};
use serde::ser::{SerializeStruct, Serializer};
use serde::{Deserialize, Serialize};

use crate::common::IdOrName;

#[derive(Clone, Serialize)]
pub struct UserAndPassword {
    #[serde(flatten)]
    pub user: IdOrName,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<IdOrName>,
}

impl fmt::Debug for UserAndPassword {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("UserAndPassword")
            .field("user", &self.user)
            .field("password", &"***")
            .field("domain", &self.domain)
            .finish()
    }
}

#[derive(Clone, Serialize)]
struct UserWrapper<'a> {
    user: &'a UserAndPassword,
}

#[derive(Clone, Serialize)]
struct TokenId<'a> {
    id: &'a str,
}

#[derive(Clone)]
pub enum Identity {
    Password(UserAndPassword),
    Token(String),
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Identity::Password(pw) => f.debug_tuple("Password").field(pw).finish(),
            Identity::Token(_) => f.write_str("Token(***)"),
        }
    }
}

impl Serialize for Identity {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut inner = serializer.serialize_struct("Identity", 2)?;
        match self {
            Identity::Password(ref user) => {
                inner.serialize_field("methods", &["password"])?;
                inner.serialize_field("password", &UserWrapper { user })?;
            }
            Identity::Token(ref token) => {
                inner.serialize_field("methods", &["token"])?;
                inner.serialize_field("token", &TokenId { id: token })?;
            }
        }
        inner.end()
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct Project {
    #[serde(flatten)]
    pub project: IdOrName,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<IdOrName>,
}

#[derive(Clone, Debug, Serialize)]
pub enum Scope {
    #[serde(rename = "project")]
    Project(Project),
}

#[derive(Clone, Debug, Serialize)]
pub struct Auth {
    pub identity: Identity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<Scope>,
}

#[derive(Clone, Debug, Serialize)]
pub struct AuthRoot {
    pub auth: Auth,
}

#[derive(Clone, Debug, Deserialize)]
pub struct TokenBody {
    pub expires_at: DateTime<FixedOffset>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct TokenRoot {
    pub token: TokenBody,
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_password_body() {
        let body = AuthRoot {
            auth: Auth {
                identity: Identity::Password(UserAndPassword {
                    user: IdOrName::from_name("admin"),
                    password: "pa$$w0rd".to_string(),
                    domain: Some(IdOrName::from_name("Default")),
                }),
                scope: Some(Scope::Project(Project {
                    project: IdOrName::from_name("demo"),
                    domain: Some(IdOrName::from_id("default")),
                })),
            },
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({
                "auth": {
                    "identity": {
                        "methods": ["password"],
                        "password": {
                            "user": {
                                "name": "admin",
                                "password": "pa$$w0rd",
                                "domain": {"name": "Default"}
                            }
                        }
                    },
                    "scope": {
                        "project": {"name": "demo", "domain": {"id": "default"}}
                    }
                }
            })
        );
        assert!(!format!("{:?}", body).contains("pa$$w0rd"));
    }

    #[test]
    fn test_token_body() {
        let body = AuthRoot {
            auth: Auth {
                identity: Identity::Token("abcd".to_string()),
                scope: None,
            },
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({
                "auth": {
                    "identity": {"methods": ["token"], "token": {"id": "abcd"}}
                }
            })
        );
    }

    #[test]
    fn test_token_root() {
        let root: TokenRoot = serde_json::from_str(
            r#"{"token": {"expires_at": "2026-01-01T12:00:00.000000Z", "catalog": []}}"#,
        )
        .unwrap();
        assert_eq!(root.token.expires_at.to_rfc3339(), "2026-01-01T12:00:00+00:00");
    }
}
