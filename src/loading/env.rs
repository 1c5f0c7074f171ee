// Copyright 2018-2020 Dmitry Tantsur <dtantsur@protonmail.com>
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

//! Support for `OS_` environment variables.

use std::env;

use log::debug;

use super::cloud::{Auth, CloudConfig};
use super::config;
use crate::Error;

// Separated from std::env for unit testing.
trait Environment {
    fn get(&self, name: &'static str) -> Option<String>;
}

#[derive(Debug, Clone, Copy)]
struct RealEnvironment;

impl Environment for RealEnvironment {
    fn get(&self, name: &'static str) -> Option<String> {
        env::var(name).ok()
    }
}

fn _from_env<E: Environment>(env: E) -> Result<CloudConfig, Error> {
    if let Some(cloud_name) = env.get("OS_CLOUD") {
        debug!("OS_CLOUD is set, loading cloud {} from clouds.yaml", cloud_name);
        return config::from_config(&cloud_name);
    }

    let auth = Auth {
        auth_url: env.get("OS_AUTH_URL"),
        password: env.get("OS_PASSWORD"),
        project_id: env.get("OS_PROJECT_ID"),
        project_name: env.get("OS_PROJECT_NAME"),
        project_domain_id: env.get("OS_PROJECT_DOMAIN_ID"),
        project_domain_name: env.get("OS_PROJECT_DOMAIN_NAME"),
        token: env.get("OS_TOKEN"),
        username: env.get("OS_USERNAME"),
        user_domain_name: env.get("OS_USER_DOMAIN_NAME"),
    };

    Ok(CloudConfig {
        auth: Some(auth),
        auth_type: env.get("OS_AUTH_TYPE"),
        cacert: env.get("OS_CACERT"),
    })
}

/// Create a cloud configuration from `OS_*` environment variables.
#[inline]
pub(crate) fn from_env() -> Result<CloudConfig, Error> {
    _from_env(RealEnvironment)
}
