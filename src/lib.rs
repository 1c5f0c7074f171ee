// Copyright 2019-2022 Dmitry Tantsur <dtantsur@protonmail.com>
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

//! Asynchronous OpenStack client with token management and status polling.
//!
//! # Authenticated requests
//!
//! An [AuthenticatedClient](struct.AuthenticatedClient.html) attaches a cached token to every
//! request. When a service rejects the token with HTTP 401, the token is dropped, a new one is
//! requested from the [AuthType](trait.AuthType.html) and the request is sent once more.
//!
//! The easiest way to create a client is to use the `OS_*` environment variables or a
//! `clouds.yaml` configuration file:
//!
//! ```rust,no_run
//! # async fn example() -> Result<(), osclient::Error> {
//! let client = osclient::from_env()?;
//! let url = reqwest::Url::parse("https://cloud.local/image/v2/images").expect("invalid URL");
//! let images: serde_json::Value = client
//!     .request(reqwest::Method::GET, url)
//!     .fetch_json()
//!     .await?;
//! # Ok(()) }
//! ```
//!
//! Most of the time the service endpoint is known in advance. An [Adapter](struct.Adapter.html)
//! binds a client to it so that only relative paths need to be provided.
//!
//! # Waiting for resources
//!
//! The [poll](poll/index.html) module implements waiting for a resource to reach a status, with
//! a timeout, cancellation and error state detection. Statuses implement
//! [ResourceStatus](status/trait.ResourceStatus.html):
//!
//! ```rust,no_run
//! use osclient::status::ServerStatus;
//! use osclient::WaitOptions;
//!
//! # async fn example() -> Result<(), osclient::Error> {
//! let client = osclient::from_env()?;
//! let compute = osclient::Adapter::new(client, "https://cloud.local/compute/v2.1/")?;
//! let status = compute
//!     .wait_for_status(
//!         "servers/8a1b2c3d",
//!         "/server/status",
//!         ServerStatus::Active,
//!         WaitOptions::default(),
//!     )
//!     .await?;
//! assert_eq!(status, ServerStatus::Active);
//! # Ok(()) }
//! ```
//!
//! # Pagination
//!
//! With the `stream` feature (enabled by default), collections supporting `limit` and `marker`
//! can be consumed as a `Stream`, see
//! [PaginatedResource](trait.PaginatedResource.html).

#![crate_type = "lib"]
// NOTE: we do not use generic deny(warnings) to avoid breakages with new
// versions of the compiler. Add more warnings here as you discover them.
// Taken from https://github.com/rust-unofficial/patterns/
#![deny(
    dead_code,
    improper_ctypes,
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    non_shorthand_field_patterns,
    no_mangle_generic_items,
    overflowing_literals,
    path_statements,
    patterns_in_fns_without_body,
    trivial_casts,
    trivial_numeric_casts,
    unconditional_recursion,
    unsafe_code,
    unused,
    unused_allocation,
    unused_comparisons,
    unused_doc_comments,
    unused_import_braces,
    unused_parens,
    unused_qualifications,
    unused_results,
    while_true
)]
#![allow(
    clippy::new_ret_no_self,
    clippy::should_implement_trait,
    clippy::wrong_self_convention
)]

mod adapter;
mod auth;
mod cache;
mod client;
mod common;
mod error;
pub mod identity;
mod loading;
mod macros;
pub mod poll;
pub mod request;
pub mod status;
#[cfg(feature = "stream")]
mod stream;
mod transport;
mod url;
mod utils;

pub use crate::adapter::Adapter;
pub use crate::auth::{AuthType, FixedToken, Token, AUTH_TOKEN_HEADER};
pub use crate::cache::{CachedToken, TokenCache};
#[cfg(feature = "stream")]
pub use crate::client::PaginatedResource;
pub use crate::client::{AuthenticatedClient, RequestBuilder};
pub use crate::error::{Error, ErrorKind};
pub use crate::loading::{from_config, from_env, CloudConfig};
pub use crate::poll::WaitOptions;
pub use crate::request::RequestDescriptor;
pub use crate::status::ResourceStatus;
pub use crate::transport::Transport;
