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

//! Support for loading clients from external input.

#[cfg(any(feature = "native-tls", feature = "rustls"))]
use std::fs;

#[cfg(any(feature = "native-tls", feature = "rustls"))]
use reqwest::Certificate;
use reqwest::Client;

use crate::client::AuthenticatedClient;
use crate::{Error, ErrorKind};

/// Create an HTTP client with the provided CA certificate.
#[inline]
#[allow(unused_mut)] // mut builder unused with --no-default-features
fn get_client(cacert: Option<String>) -> Result<Client, Error> {
    let mut builder = Client::builder();
    #[cfg(any(feature = "native-tls", feature = "rustls"))]
    if let Some(cert_path) = cacert {
        let cert_content = fs::read(&cert_path).map_err(|e| {
            Error::new(
                ErrorKind::InvalidConfig,
                format!("Cannot open cacert file {}: {}", cert_path, e),
            )
        })?;

        let cert = Certificate::from_pem(&cert_content).map_err(|e| {
            Error::new(
                ErrorKind::InvalidConfig,
                format!("Cannot parse {} as PEM: {}", cert_path, e),
            )
        })?;

        builder = builder.add_root_certificate(cert);
    }

    #[cfg(not(any(feature = "native-tls", feature = "rustls")))]
    if cacert.is_some() {
        return Err(Error::new(
            ErrorKind::InvalidConfig,
            "TLS support is disabled",
        ));
    }

    builder.build().map_err(|e| {
        Error::new(
            ErrorKind::InvalidConfig,
            format!("Cannot initialize HTTP backend: {}", e),
        )
    })
}

mod cloud;
mod config;
mod env;

pub use cloud::CloudConfig;

/// Create an `AuthenticatedClient` from a `clouds.yaml` configuration file.
///
/// The files `clouds.yaml`, `clouds-public.yaml` and `secure.yaml` are searched in the current
/// directory, `~/.config/openstack` and `/etc/openstack`.
#[inline]
pub fn from_config<S: AsRef<str>>(cloud_name: S) -> Result<AuthenticatedClient, Error> {
    CloudConfig::from_config(cloud_name)?.create_client()
}

/// Create an `AuthenticatedClient` from environment variables.
///
/// Supported authentication types (`OS_AUTH_TYPE`) are `password`, `v3token` and `token`.
/// If `OS_CLOUD` is set, the configuration is loaded from `clouds.yaml` instead.
#[inline]
pub fn from_env() -> Result<AuthenticatedClient, Error> {
    CloudConfig::from_env()?.create_client()
}
