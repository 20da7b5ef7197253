// SPDX-License-Identifier: MIT OR Apache-2.0
//! HTTP exchange model for the remote command client.
//!
//! A single attempt at talking to the remote service produces exactly one
//! [`TransportOutcome`]: either a [`Response`] (the server spoke, whatever the
//! status) or a [`TransportFailure`] (the server was never reached).  The
//! [`classify`] function derives that outcome from an [`Exchange`] record.
//!
//! Transports implement the [`Transport`] trait; [`HttpTransport`] talks real
//! HTTP through `reqwest`, [`MockTransport`] replays scripted replies.

#![deny(unsafe_code)]
#![warn(missing_docs)]

/// reqwest-backed transport.
pub mod http;
/// Scripted transport for tests and local development.
pub mod mock;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub use http::HttpTransport;
pub use mock::{MockReply, MockTransport};

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// An outgoing HTTP request, fully prepared and ready to send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpRequest {
    /// HTTP method, upper case (e.g. `"POST"`).
    pub method: String,
    /// Absolute request URL.
    pub url: String,
    /// Request headers; names are stored lower case.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Raw request body.
    #[serde(default)]
    pub body: Vec<u8>,
}

impl HttpRequest {
    /// Create a request with no headers and an empty body.
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into().to_ascii_uppercase(),
            url: url.into(),
            headers: BTreeMap::new(),
            body: Vec::new(),
        }
    }

    /// Shorthand for a `GET` request.
    pub fn get(url: impl Into<String>) -> Self {
        Self::new("GET", url)
    }

    /// Shorthand for a `POST` request.
    pub fn post(url: impl Into<String>) -> Self {
        Self::new("POST", url)
    }

    /// Set a header, replacing any previous value.
    #[must_use]
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.as_ref().to_ascii_lowercase(), value.into());
        self
    }

    /// Replace the request body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }
}

// ---------------------------------------------------------------------------
// Response
// ---------------------------------------------------------------------------

/// A response received from the remote service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    /// HTTP status code.
    pub status: u16,
    /// Response headers; names are stored lower case.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Raw response body.
    #[serde(default)]
    pub body: Vec<u8>,
}

impl Response {
    /// Create a response with the given status, no headers and an empty body.
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: BTreeMap::new(),
            body: Vec::new(),
        }
    }

    /// Set a header, replacing any previous value.
    #[must_use]
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.as_ref().to_ascii_lowercase(), value.into());
        self
    }

    /// Replace the response body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Body decoded as UTF-8, with invalid sequences replaced.
    pub fn body_text(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// `true` for statuses below 400.
    pub fn is_success(&self) -> bool {
        self.status < 400
    }
}

// ---------------------------------------------------------------------------
// Failure
// ---------------------------------------------------------------------------

/// Low-level reason no response could be obtained.
///
/// Purely descriptive: every kind is handled the same way by the error
/// translation stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The request never left the client.
    NotSent,
    /// Connection refused, DNS resolution or TLS handshake failed.
    Connect,
    /// No complete response within the timeout.
    Timeout,
    /// The request failed while being sent.
    Request,
    /// The response body could not be read.
    Body,
    /// Anything else.
    Other,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NotSent => "not_sent",
            Self::Connect => "connect",
            Self::Timeout => "timeout",
            Self::Request => "request",
            Self::Body => "body",
            Self::Other => "other",
        };
        f.write_str(s)
    }
}

/// No response was obtained from the remote service.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
#[error("{kind} failure: {cause}")]
pub struct TransportFailure {
    /// Low-level failure kind.
    pub kind: FailureKind,
    /// Human-readable cause descriptor.
    pub cause: String,
}

impl TransportFailure {
    /// Create a failure of the given kind.
    pub fn new(kind: FailureKind, cause: impl Into<String>) -> Self {
        Self {
            kind,
            cause: cause.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Outcome & classification
// ---------------------------------------------------------------------------

/// Result of one network attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportOutcome {
    /// The service answered.
    Response(Response),
    /// The service was never reached.
    Failure(TransportFailure),
}

impl TransportOutcome {
    /// The response, if one was received.
    pub fn response(&self) -> Option<&Response> {
        match self {
            Self::Response(r) => Some(r),
            Self::Failure(_) => None,
        }
    }

    /// The transport failure, if no response was received.
    pub fn failure(&self) -> Option<&TransportFailure> {
        match self {
            Self::Response(_) => None,
            Self::Failure(f) => Some(f),
        }
    }

    /// `true` when a response was received.
    pub fn has_response(&self) -> bool {
        matches!(self, Self::Response(_))
    }
}

/// Everything known about a failed attempt, before classification.
#[derive(Debug, Clone, Default)]
pub struct Exchange {
    /// The request, if one was prepared.
    pub request: Option<HttpRequest>,
    /// The response, if one was received.
    pub response: Option<Response>,
    /// The transport error, if the exchange broke down.
    pub failure: Option<TransportFailure>,
}

impl Exchange {
    /// An exchange that produced a response.
    pub fn answered(request: HttpRequest, response: Response) -> Self {
        Self {
            request: Some(request),
            response: Some(response),
            failure: None,
        }
    }

    /// An exchange that broke down before a response arrived.
    pub fn broken(request: Option<HttpRequest>, failure: TransportFailure) -> Self {
        Self {
            request,
            response: None,
            failure: Some(failure),
        }
    }
}

/// Decide whether a response was actually received.
///
/// A present response wins over a recorded failure.  [`Transport::send`]
/// never yields both, so that only matters for hand-built exchanges.
/// Without a response the outcome is always a [`TransportFailure`]; a
/// missing request maps to [`FailureKind::NotSent`].
pub fn classify(exchange: Exchange) -> TransportOutcome {
    match exchange {
        Exchange {
            response: Some(response),
            ..
        } => TransportOutcome::Response(response),
        Exchange {
            failure: Some(failure),
            ..
        } => TransportOutcome::Failure(failure),
        Exchange { request: None, .. } => TransportOutcome::Failure(TransportFailure::new(
            FailureKind::NotSent,
            "request was never prepared",
        )),
        Exchange {
            request: Some(request),
            ..
        } => TransportOutcome::Failure(TransportFailure::new(
            FailureKind::Other,
            format!("no response for {} {}", request.method, request.url),
        )),
    }
}

// ---------------------------------------------------------------------------
// Transport trait
// ---------------------------------------------------------------------------

/// Sends prepared requests to the remote service.
///
/// Implementations return `Ok` for *every* response the server produced,
/// including 4xx and 5xx statuses; `Err` is reserved for attempts that never
/// produced a response.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform one exchange.
    async fn send(&self, request: HttpRequest) -> Result<Response, TransportFailure>;

    /// Human-readable name used in tracing output.
    fn name(&self) -> &str;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
