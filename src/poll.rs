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

//! Waiting for resources to reach a status.
//!
//! The poller repeatedly calls an accessor returning the current status of a resource until
//! the status satisfies a condition, the resource enters its error state, the timeout expires
//! or the caller cancels the wait.
//!
//! ```rust,no_run
//! # async fn example(client: osclient::Adapter) -> Result<(), osclient::Error> {
//! use osclient::poll::WaitOptions;
//! use osclient::status::ImageStatus;
//!
//! let options = WaitOptions::default().with_progress(|done| println!("done: {}", done));
//! let status = osclient::poll::wait_for_status(
//!     "8a1b2c3d",
//!     || client.get_status::<ImageStatus>("v2/images/8a1b2c3d", "/status"),
//!     ImageStatus::Active,
//!     options,
//! )
//! .await?;
//! # Ok(()) }
//! ```

use std::fmt;
use std::future::{pending, Future};
use std::time::Duration;

use log::debug;
use tokio::sync::mpsc::UnboundedSender;
use tokio::time::{sleep, sleep_until, Instant};
use tokio_util::sync::CancellationToken;

use super::status::ResourceStatus;
use super::{Error, ErrorKind};

/// Default delay between two status checks.
pub const DEFAULT_REFRESH_DELAY: Duration = Duration::from_secs(5);

/// Default time to wait before giving up.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Options of a wait.
pub struct WaitOptions {
    refresh_delay: Duration,
    timeout: Option<Duration>,
    cancellation: Option<CancellationToken>,
    progress: Option<Box<dyn FnMut(bool) + Send>>,
}

impl fmt::Debug for WaitOptions {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("WaitOptions")
            .field("refresh_delay", &self.refresh_delay)
            .field("timeout", &self.timeout)
            .field("cancellation", &self.cancellation)
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

impl Default for WaitOptions {
    fn default() -> WaitOptions {
        WaitOptions {
            refresh_delay: DEFAULT_REFRESH_DELAY,
            timeout: Some(DEFAULT_TIMEOUT),
            cancellation: None,
            progress: None,
        }
    }
}

impl WaitOptions {
    /// Delay between two status checks.
    #[inline]
    pub fn with_refresh_delay(mut self, refresh_delay: Duration) -> WaitOptions {
        self.refresh_delay = refresh_delay;
        self
    }

    /// Time to wait before failing with `OperationTimedOut`.
    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> WaitOptions {
        self.timeout = Some(timeout);
        self
    }

    /// Wait until the condition is met, the resource fails or the wait is cancelled.
    #[inline]
    pub fn without_timeout(mut self) -> WaitOptions {
        self.timeout = None;
        self
    }

    /// Cancellation token; cancelling it fails the wait with `Cancelled`.
    ///
    /// A status request that is already in flight is not interrupted.
    #[inline]
    pub fn with_cancellation(mut self, token: CancellationToken) -> WaitOptions {
        self.cancellation = Some(token);
        self
    }

    /// Progress callback.
    ///
    /// Called with `false` after every check that has not reached the target and with `true`
    /// once it is reached. Not called when the resource enters its error state.
    #[inline]
    pub fn with_progress<F>(mut self, progress: F) -> WaitOptions
    where
        F: FnMut(bool) + Send + 'static,
    {
        self.progress = Some(Box::new(progress));
        self
    }

    /// Report progress into a channel.
    ///
    /// A closed channel is ignored.
    pub fn with_progress_channel(self, sender: UnboundedSender<bool>) -> WaitOptions {
        self.with_progress(move |done| {
            let _ = sender.send(done);
        })
    }

    /// Configured delay between two status checks.
    #[inline]
    pub fn refresh_delay(&self) -> Duration {
        self.refresh_delay
    }

    /// Configured timeout, `None` to wait indefinitely.
    #[inline]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    fn report(&mut self, done: bool) {
        if let Some(ref mut progress) = self.progress {
            progress(done);
        }
    }
}

async fn expire(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => pending().await,
    }
}

async fn poll<S, F, Fut, C>(
    resource_id: &str,
    mut accessor: F,
    mut condition: C,
    mut options: WaitOptions,
) -> Result<Option<S>, Error>
where
    S: ResourceStatus,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<S>, Error>>,
    C: FnMut(Option<&S>) -> bool,
{
    if resource_id.is_empty() {
        return Err(Error::new(
            ErrorKind::InvalidInput,
            "Resource ID to wait for cannot be empty",
        ));
    }

    let start = Instant::now();
    // Too large timeouts are the same as no timeout.
    let deadline = options.timeout.and_then(|timeout| start.checked_add(timeout));
    let cancellation = options.cancellation.take().unwrap_or_default();

    loop {
        if cancellation.is_cancelled() {
            return Err(Error::cancelled(resource_id));
        }
        if deadline.map(|d| Instant::now() >= d).unwrap_or(false) {
            return Err(Error::timed_out(resource_id, start.elapsed()));
        }

        let current = accessor().await?;
        debug!("Resource {} has status {:?}", resource_id, current);
        if let Some(ref status) = current {
            if status.is_error() {
                return Err(Error::operation_failed(resource_id));
            }
        }
        if condition(current.as_ref()) {
            options.report(true);
            return Ok(current);
        }
        options.report(false);

        tokio::select! {
            biased;
            _ = cancellation.cancelled() => return Err(Error::cancelled(resource_id)),
            _ = expire(deadline) => {
                return Err(Error::timed_out(resource_id, start.elapsed()))
            }
            _ = sleep(options.refresh_delay) => {}
        }
    }
}

/// Wait for the status of a resource to satisfy the condition.
///
/// Returns the last observed status. Errors from the accessor are returned as they are.
pub async fn wait_for<S, F, Fut, C>(
    resource_id: &str,
    mut accessor: F,
    mut condition: C,
    options: WaitOptions,
) -> Result<S, Error>
where
    S: ResourceStatus,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<S, Error>>,
    C: FnMut(&S) -> bool,
{
    let status = poll(
        resource_id,
        || {
            let fut = accessor();
            async move { fut.await.map(Some) }
        },
        |status| status.map(&mut condition).unwrap_or(false),
        options,
    )
    .await?;
    status.ok_or_else(|| {
        Error::new(
            ErrorKind::InvalidResponse,
            format!("no status received for resource {}", resource_id),
        )
    })
}

/// Wait for a resource to reach the target status.
pub async fn wait_for_status<S, F, Fut>(
    resource_id: &str,
    accessor: F,
    target: S,
    options: WaitOptions,
) -> Result<S, Error>
where
    S: ResourceStatus,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<S, Error>>,
{
    wait_for(resource_id, accessor, |status| *status == target, options).await
}

/// Wait for a resource to be deleted.
///
/// The resource is considered deleted when the accessor fails with `ResourceNotFound` or
/// returns a status for which `is_deleted` is true.
pub async fn wait_until_deleted<S, F, Fut>(
    resource_id: &str,
    mut accessor: F,
    options: WaitOptions,
) -> Result<(), Error>
where
    S: ResourceStatus,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<S, Error>>,
{
    let _ = poll(
        resource_id,
        || {
            let fut = accessor();
            async move {
                match fut.await {
                    Ok(status) => Ok(Some(status)),
                    Err(err) if err.kind() == ErrorKind::ResourceNotFound => Ok(None),
                    Err(err) => Err(err),
                }
            }
        },
        |status: Option<&S>| status.map(|s| s.is_deleted()).unwrap_or(true),
        options,
    )
    .await?;
    Ok(())
}
