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

use std::env;
use std::str::FromStr;

use futures::pin_mut;
use futures::stream::TryStreamExt;
use serde::Deserialize;

use osclient::status::ServerStatus;

#[derive(Debug, Deserialize)]
pub struct Server {
    pub id: String,
    pub name: String,
    pub status: ServerStatus,
}

#[derive(Debug, Deserialize)]
pub struct ServersRoot {
    pub servers: Vec<Server>,
}

impl From<ServersRoot> for Vec<Server> {
    fn from(value: ServersRoot) -> Vec<Server> {
        value.servers
    }
}

impl osclient::PaginatedResource for Server {
    type Id = String;
    type Root = ServersRoot;
    fn resource_id(&self) -> Self::Id {
        self.id.clone()
    }
}

#[tokio::main]
async fn main() {
    env_logger::init();
    let mut args = env::args().skip(1);
    let endpoint = args
        .next()
        .expect("Usage: list-servers-paginated <compute endpoint> [limit]");
    let limit = args
        .next()
        .map(|s| FromStr::from_str(&s).expect("Expected a number"));

    let client = osclient::from_env()
        .expect("Failed to create an identity provider from the environment");
    let compute = osclient::Adapter::new(client, endpoint).expect("Invalid compute endpoint");

    let sstream = compute
        .request(reqwest::Method::GET, "servers/detail")
        .expect("Invalid URL")
        .fetch_paginated::<Server>(limit, None)
        .expect("Invalid request");
    pin_mut!(sstream);
    while let Some(srv) = sstream
        .try_next()
        .await
        .expect("Failed to fetch the next chunk")
    {
        println!("ID = {}, Name = {}, Status = {}", srv.id, srv.name, srv.status);
    }
    println!("Done listing");
}
