// SPDX-License-Identifier: MIT OR Apache-2.0
//! reqwest-backed [`Transport`].
//!
//! Every status code the server sends back, 4xx and 5xx included, comes back
//! as `Ok(Response)`.  Only exchanges that never produced a full response
//! become a [`TransportFailure`].

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;

use crate::{FailureKind, HttpRequest, Response, Transport, TransportFailure};

/// Sends requests over real HTTP using a shared [`reqwest::Client`].
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Build a transport whose requests time out after `timeout`.
    ///
    /// # Errors
    ///
    /// Fails when the underlying client cannot be constructed (e.g. the TLS
    /// backend is unavailable).
    pub fn new(timeout: Duration) -> Result<Self, TransportFailure> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| {
                TransportFailure::new(
                    FailureKind::NotSent,
                    format!("failed to build HTTP client: {err}"),
                )
            })?;
        Ok(Self { client })
    }

    /// Wrap an already configured client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: HttpRequest) -> Result<Response, TransportFailure> {
        let method = reqwest::Method::from_bytes(request.method.as_bytes()).map_err(|err| {
            TransportFailure::new(
                FailureKind::NotSent,
                format!("invalid method `{}`: {err}", request.method),
            )
        })?;

        let mut builder = self.client.request(method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if !request.body.is_empty() {
            builder = builder.body(request.body);
        }

        debug!(target: "rcc.transport", method=%request.method, url=%request.url, "sending");
        let resp = builder.send().await.map_err(failure_from_reqwest)?;

        let status = resp.status().as_u16();
        let headers: BTreeMap<String, String> = resp
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
            })
            .collect();
        let body = match resp.bytes().await {
            Ok(bytes) => bytes.to_vec(),
            Err(err) => return Err(body_failure(status, &err)),
        };
        debug!(target: "rcc.transport", status, bytes = body.len(), "received");

        Ok(Response {
            status,
            headers,
            body,
        })
    }

    fn name(&self) -> &str {
        "http"
    }
}

/// Map a reqwest error onto a [`FailureKind`].
fn failure_from_reqwest(err: reqwest::Error) -> TransportFailure {
    let kind = if err.is_timeout() {
        FailureKind::Timeout
    } else if err.is_connect() {
        FailureKind::Connect
    } else if err.is_builder() {
        FailureKind::NotSent
    } else if err.is_body() || err.is_decode() {
        FailureKind::Body
    } else if err.is_request() {
        FailureKind::Request
    } else {
        FailureKind::Other
    };
    TransportFailure::new(kind, error_chain(&err))
}

/// A body that broke off after the status line still counts as a failed
/// exchange; the status is kept in the cause.
fn body_failure(status: u16, err: &reqwest::Error) -> TransportFailure {
    let kind = if err.is_timeout() {
        FailureKind::Timeout
    } else {
        FailureKind::Body
    };
    TransportFailure::new(
        kind,
        format!("{status} response body could not be read: {}", error_chain(err)),
    )
}

fn error_chain(err: &dyn std::error::Error) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(inner) = source {
        out.push_str(": ");
        out.push_str(&inner.to_string());
        source = inner.source();
    }
    out
}
