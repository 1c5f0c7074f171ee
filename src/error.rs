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

//! Error and Result implementations.

use std::fmt;
use std::time::Duration;

use reqwest::StatusCode;

/// Kind of an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    /// Authentication failure.
    ///
    /// Returned when the identity service rejects the credentials or when a request is still
    /// rejected with HTTP 401 after the token has been re-acquired once.
    AuthenticationFailed,

    /// Access denied (HTTP 403).
    AccessDenied,

    /// Requested resource was not found (HTTP 404).
    ResourceNotFound,

    /// Request cannot be fulfilled due to a conflict (HTTP 409).
    Conflict,

    /// Input value(s) are invalid or missing.
    InvalidInput,

    /// Any other non-successful HTTP status.
    RequestFailed,

    /// Internal server error or bad gateway (HTTP 5xx).
    InternalServerError,

    /// Timeout reached while waiting for a resource.
    OperationTimedOut,

    /// The resource entered its error state while waiting for it.
    OperationFailed,

    /// Waiting for a resource was cancelled by the caller.
    Cancelled,

    /// Network or connection failure.
    TransportError,

    /// Response received from the server is malformed.
    InvalidResponse,

    /// Error parsing configuration.
    InvalidConfig,
}

/// Error from an OpenStack call.
#[derive(Debug, Clone)]
pub struct Error {
    kind: ErrorKind,
    message: Option<String>,
    status: Option<StatusCode>,
    body: Option<String>,
    resource_id: Option<String>,
    elapsed: Option<Duration>,
}

impl ErrorKind {
    /// Short description of the error kind.
    pub fn description(&self) -> &'static str {
        match self {
            ErrorKind::AuthenticationFailed => "failed to authenticate",
            ErrorKind::AccessDenied => "access to the resource is denied",
            ErrorKind::ResourceNotFound => "requested resource was not found",
            ErrorKind::Conflict => "request cannot be fulfilled due to a conflict",
            ErrorKind::InvalidInput => "input value(s) are invalid or missing",
            ErrorKind::RequestFailed => "request returned an unexpected status",
            ErrorKind::InternalServerError => "internal server error or bad gateway",
            ErrorKind::OperationTimedOut => "time-out reached while waiting for the resource",
            ErrorKind::OperationFailed => "the requested operation has failed",
            ErrorKind::Cancelled => "waiting for the resource was cancelled",
            ErrorKind::TransportError => "error when accessing the server",
            ErrorKind::InvalidResponse => "received invalid response",
            ErrorKind::InvalidConfig => "configuration file cannot be found or is invalid",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.description())
    }
}

impl Error {
    /// Create a new error of the provided kind.
    #[inline]
    pub fn new<S: Into<String>>(kind: ErrorKind, message: S) -> Error {
        Error {
            kind,
            message: Some(message.into()),
            status: None,
            body: None,
            resource_id: None,
            elapsed: None,
        }
    }

    /// Error for a resource that entered its error state.
    pub fn operation_failed<S: Into<String>>(resource_id: S) -> Error {
        let resource_id = resource_id.into();
        Error::new(
            ErrorKind::OperationFailed,
            format!("resource {} entered the error state", resource_id),
        )
        .with_resource_id(resource_id)
    }

    /// Error for a wait that did not finish in time.
    pub fn timed_out<S: Into<String>>(resource_id: S, elapsed: Duration) -> Error {
        let resource_id = resource_id.into();
        let mut err = Error::new(
            ErrorKind::OperationTimedOut,
            format!(
                "resource {} did not reach the expected state in {:.3} seconds",
                resource_id,
                elapsed.as_secs_f64()
            ),
        )
        .with_resource_id(resource_id);
        err.elapsed = Some(elapsed);
        err
    }

    /// Error for a wait cancelled by the caller.
    pub fn cancelled<S: Into<String>>(resource_id: S) -> Error {
        let resource_id = resource_id.into();
        Error::new(
            ErrorKind::Cancelled,
            format!("waiting for resource {} was cancelled", resource_id),
        )
        .with_resource_id(resource_id)
    }

    /// Add an HTTP status code to the error.
    #[inline]
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = Some(status);
        self
    }

    /// Add a raw response body to the error.
    #[inline]
    pub fn with_body<S: Into<String>>(mut self, body: S) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Add a resource ID to the error.
    #[inline]
    pub fn with_resource_id<S: Into<String>>(mut self, resource_id: S) -> Self {
        self.resource_id = Some(resource_id.into());
        self
    }

    /// Error kind.
    #[inline]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Error message (if any).
    #[inline]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// HTTP status code (if any).
    #[inline]
    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    /// Raw body of the failed response (if any).
    #[inline]
    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }

    /// ID of the resource this error refers to (if any).
    #[inline]
    pub fn resource_id(&self) -> Option<&str> {
        self.resource_id.as_deref()
    }

    /// Time spent waiting before the error happened (for time-outs).
    #[inline]
    pub fn elapsed(&self) -> Option<Duration> {
        self.elapsed
    }

    /// Whether the error was produced by a non-successful HTTP response.
    #[inline]
    pub fn is_request_failure(&self) -> bool {
        self.status.is_some()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.kind)?;

        if let Some(ref msg) = self.message {
            write!(f, ": {}", msg)?;
        }

        Ok(())
    }
}

impl ::std::error::Error for Error {}

impl From<StatusCode> for ErrorKind {
    fn from(value: StatusCode) -> ErrorKind {
        match value {
            StatusCode::UNAUTHORIZED => ErrorKind::AuthenticationFailed,
            StatusCode::FORBIDDEN => ErrorKind::AccessDenied,
            StatusCode::NOT_FOUND => ErrorKind::ResourceNotFound,
            StatusCode::CONFLICT => ErrorKind::Conflict,
            c if c == StatusCode::BAD_REQUEST || c == StatusCode::UNPROCESSABLE_ENTITY => {
                ErrorKind::InvalidInput
            }
            c if c.is_server_error() => ErrorKind::InternalServerError,
            _ => ErrorKind::RequestFailed,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(value: reqwest::Error) -> Error {
        let kind = if value.is_decode() {
            ErrorKind::InvalidResponse
        } else if value.is_builder() {
            ErrorKind::InvalidInput
        } else {
            ErrorKind::TransportError
        };

        let error = Error::new(kind, value.to_string());
        if let Some(status) = value.status() {
            error.with_status(status)
        } else {
            error
        }
    }
}

impl From<http::header::InvalidHeaderValue> for Error {
    fn from(value: http::header::InvalidHeaderValue) -> Error {
        Error::new(ErrorKind::InvalidInput, value.to_string())
    }
}
