// SPDX-License-Identifier: MIT OR Apache-2.0
//! rcc-runtime
//!
//! Command execution pipeline for the remote command client.
//!
//! Responsibilities:
//! - emit a `prepare` event so listeners can supply or adjust the request
//! - send the request through a [`Transport`](rcc_transport::Transport)
//! - on failure, emit an `error` event through a prioritized listener table
//! - translate real error responses into [`StructuredError`]s via a pluggable
//!   [`ErrorParser`], and let later listeners recover the command

#![deny(unsafe_code)]

/// The [`Client`] that drives one command through the pipeline.
pub mod client;
/// Command value types.
pub mod command;
/// Prioritized listener tables.
pub mod emitter;
/// Event payloads and the resolution slot.
pub mod event;
/// Error parsers and the structured error type.
pub mod parser;
/// Metrics and tracing setup.
pub mod telemetry;
/// The error translation stage.
pub mod translate;

use rcc_config::ConfigError;
use rcc_error::{ErrorCode, RccError};
use rcc_transport::{FailureKind, TransportFailure};
use thiserror::Error;

pub use client::Client;
pub use command::Command;
pub use emitter::{Emitter, Listener, ListenerTable, Priority};
pub use event::{ErrorEvent, PrepareEvent, Resolution};
pub use parser::{ErrorParser, JsonErrorParser, ParseError, StatusOnlyParser, StructuredError};
pub use telemetry::{CommandMetrics, MetricsSnapshot, init_tracing, init_tracing_from_config};
pub use translate::ErrorTranslationStage;

/// Errors surfaced by [`Client::execute`].
#[derive(Debug, Error)]
pub enum CommandError {
    /// No response was obtained and no listener recovered the command.
    #[error("transport failure: {0}")]
    Transport(#[from] TransportFailure),

    /// The service answered with an error status and no listener recovered
    /// the command.
    #[error(
        "service error (status {status}): {}",
        .error.as_ref().and_then(StructuredError::summary).unwrap_or_else(|| "no details".into())
    )]
    Service {
        status: u16,
        error: Option<StructuredError>,
    },

    /// The error parser failed on a real response. Never recoverable.
    #[error("error parser failed on a {status} response")]
    ParserFault {
        status: u16,
        #[source]
        source: ParseError,
    },

    /// A successful response body was not valid JSON.
    #[error("response body could not be decoded (status {status})")]
    Decode {
        status: u16,
        #[source]
        source: serde_json::Error,
    },

    /// A listener failed or rejected the command.
    #[error("listener `{listener}` failed: {message}")]
    Listener { listener: String, message: String },

    /// The command was rejected before anything was sent.
    #[error("invalid command `{command}`: {reason}")]
    InvalidCommand { command: String, reason: String },

    /// The client configuration is unusable.
    #[error("invalid client configuration: {0}")]
    Config(#[from] ConfigError),
}

impl CommandError {
    /// Stable error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Transport(f) => match f.kind {
                FailureKind::NotSent => ErrorCode::TransportNotSent,
                FailureKind::Connect => ErrorCode::TransportConnect,
                FailureKind::Timeout => ErrorCode::TransportTimeout,
                FailureKind::Request | FailureKind::Body | FailureKind::Other => {
                    ErrorCode::TransportFailed
                }
            },
            Self::Service { status, .. } if *status >= 500 => ErrorCode::ServiceServerError,
            Self::Service { .. } => ErrorCode::ServiceClientError,
            Self::ParserFault { .. } => ErrorCode::ParserFault,
            Self::Decode { .. } => ErrorCode::ServiceDecodeFailed,
            Self::Listener { .. } => ErrorCode::PipelineListenerFailed,
            Self::InvalidCommand { .. } => ErrorCode::PipelineInvalidCommand,
            Self::Config(_) => ErrorCode::ConfigInvalid,
        }
    }

    /// The structured error, for service errors that were parsed.
    pub fn structured_error(&self) -> Option<&StructuredError> {
        match self {
            Self::Service { error, .. } => error.as_ref(),
            _ => None,
        }
    }
}

impl From<&CommandError> for RccError {
    fn from(err: &CommandError) -> Self {
        let mut out = RccError::new(err.code(), err.to_string());
        match err {
            CommandError::Transport(f) => {
                out = out.with_context("failure_kind", f.kind);
            }
            CommandError::Service { status, error } => {
                out = out.with_context("status", status);
                if let Some(e) = error {
                    out = out.with_context("structured_error", e);
                }
            }
            CommandError::ParserFault { status, source } => {
                out = out
                    .with_context("status", status)
                    .with_context("parse_error", source.to_string());
            }
            CommandError::Decode { status, .. } => {
                out = out.with_context("status", status);
            }
            CommandError::Listener { listener, .. } => {
                out = out.with_context("listener", listener);
            }
            CommandError::InvalidCommand { command, .. } => {
                out = out.with_context("command", command);
            }
            CommandError::Config(ConfigError::ValidationError { reasons }) => {
                out = out.with_context("reasons", reasons);
            }
            CommandError::Config(_) => {}
        }
        out
    }
}
