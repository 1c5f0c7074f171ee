// Copyright 2022 Dmitry Tantsur <dtantsur@protonmail.com>
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
use std::time::Duration;

use osclient::status::ImageStatus;
use osclient::{Adapter, ErrorKind, WaitOptions};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() {
    env_logger::init();
    let mut args = env::args().skip(1);
    let endpoint = args
        .next()
        .expect("Usage: wait-for-image <image endpoint> <image ID>");
    let image_id = args
        .next()
        .expect("Usage: wait-for-image <image endpoint> <image ID>");

    let client = osclient::from_env()
        .expect("Failed to create an identity provider from the environment");
    let adapter = Adapter::new(client, endpoint).expect("Invalid image endpoint");

    let cancel = CancellationToken::new();
    let on_ctrl_c = cancel.clone();
    let _ = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_ctrl_c.cancel();
        }
    });

    let options = WaitOptions::default()
        .with_refresh_delay(Duration::from_secs(2))
        .with_timeout(Duration::from_secs(600))
        .with_cancellation(cancel)
        .with_progress(|done| {
            if !done {
                println!("Still waiting...");
            }
        });

    let path = format!("images/{}", image_id);
    match adapter
        .wait_for_status(&path, "/status", ImageStatus::Active, options)
        .await
    {
        Ok(status) => println!("Image {} is {}", image_id, status),
        Err(e) if e.kind() == ErrorKind::Cancelled => println!("Interrupted"),
        Err(e) => println!("Waiting for image {} failed: {}", image_id, e),
    }
}
