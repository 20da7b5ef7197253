// SPDX-License-Identifier: MIT OR Apache-2.0
//! Error taxonomy with stable error codes for the remote command client.
//!
//! Every [`RccError`] carries an [`ErrorCode`] (a machine-readable, stable
//! string tag), a human-readable message, an optional cause, and arbitrary
//! key-value context.  Runtime crates keep their own `thiserror` enums and
//! convert into [`RccError`] at the boundary where a caller wants a uniform
//! shape (logging, serialisation, exit codes).

#![deny(unsafe_code)]
#![warn(missing_docs)]

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ---------------------------------------------------------------------------
// ErrorCategory
// ---------------------------------------------------------------------------

/// Broad family that an [`ErrorCode`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// No response was obtained from the remote service.
    Transport,
    /// The remote service answered with an error response.
    Service,
    /// The error parser failed on a real response.
    Parser,
    /// Command pipeline or listener failures.
    Pipeline,
    /// Configuration errors.
    Config,
    /// Catch-all for unexpected internal errors.
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Transport => "transport",
            Self::Service => "service",
            Self::Parser => "parser",
            Self::Pipeline => "pipeline",
            Self::Config => "config",
            Self::Internal => "internal",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// ErrorCode
// ---------------------------------------------------------------------------

/// Machine-readable, stable error code.
///
/// Each variant serialises to a `SCREAMING_SNAKE_CASE` string that is
/// guaranteed not to change across patch releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // -- Transport --
    /// The connection could not be established (refused, DNS, TLS).
    TransportConnect,
    /// The exchange did not complete within the configured timeout.
    TransportTimeout,
    /// The request never left the client.
    TransportNotSent,
    /// Any other transport-level failure.
    TransportFailed,

    // -- Service --
    /// The service returned a client-side (4xx) error response.
    ServiceClientError,
    /// The service returned a server-side (5xx) error response.
    ServiceServerError,
    /// A successful response body could not be decoded.
    ServiceDecodeFailed,

    // -- Parser --
    /// The error parser rejected a real response.
    ParserFault,

    // -- Pipeline --
    /// A listener explicitly failed the command.
    PipelineListenerFailed,
    /// The command itself is malformed (e.g. non-object parameters).
    PipelineInvalidCommand,

    // -- Config --
    /// Configuration file or value is invalid.
    ConfigInvalid,

    // -- Internal --
    /// Catch-all for unexpected internal errors.
    Internal,
}

impl ErrorCode {
    /// Returns the broad [`ErrorCategory`] this code belongs to.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::TransportConnect
            | Self::TransportTimeout
            | Self::TransportNotSent
            | Self::TransportFailed => ErrorCategory::Transport,

            Self::ServiceClientError | Self::ServiceServerError | Self::ServiceDecodeFailed => {
                ErrorCategory::Service
            }

            Self::ParserFault => ErrorCategory::Parser,

            Self::PipelineListenerFailed | Self::PipelineInvalidCommand => {
                ErrorCategory::Pipeline
            }

            Self::ConfigInvalid => ErrorCategory::Config,

            Self::Internal => ErrorCategory::Internal,
        }
    }

    /// Stable `&'static str` representation of the code (e.g.
    /// `"TRANSPORT_CONNECT"`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TransportConnect => "TRANSPORT_CONNECT",
            Self::TransportTimeout => "TRANSPORT_TIMEOUT",
            Self::TransportNotSent => "TRANSPORT_NOT_SENT",
            Self::TransportFailed => "TRANSPORT_FAILED",
            Self::ServiceClientError => "SERVICE_CLIENT_ERROR",
            Self::ServiceServerError => "SERVICE_SERVER_ERROR",
            Self::ServiceDecodeFailed => "SERVICE_DECODE_FAILED",
            Self::ParserFault => "PARSER_FAULT",
            Self::PipelineListenerFailed => "PIPELINE_LISTENER_FAILED",
            Self::PipelineInvalidCommand => "PIPELINE_INVALID_COMMAND",
            Self::ConfigInvalid => "CONFIG_INVALID",
            Self::Internal => "INTERNAL",
        }
    }

    /// Whether a caller may reasonably try the same command again.
    ///
    /// Only advisory: this crate never retries on its own.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::TransportConnect | Self::TransportTimeout | Self::ServiceServerError
        )
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// RccError
// ---------------------------------------------------------------------------

/// Unified client error.
///
/// # Builder usage
///
/// ```
/// use rcc_error::{ErrorCode, RccError};
///
/// let err = RccError::new(ErrorCode::ServiceClientError, "throttled")
///     .with_context("status", 400)
///     .with_context("command", "DescribeThings");
/// assert_eq!(err.context.len(), 2);
/// ```
pub struct RccError {
    /// Machine-readable error code.
    pub code: ErrorCode,
    /// Human-readable description.
    pub message: String,
    /// Optional underlying cause.
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
    /// Arbitrary structured context for diagnostics.
    pub context: BTreeMap<String, serde_json::Value>,
}

impl RccError {
    /// Create a new error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
            context: BTreeMap::new(),
        }
    }

    /// Attach a key-value pair to the diagnostic context.
    ///
    /// Values that fail to serialise are skipped.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.context.insert(key.into(), v);
        }
        self
    }

    /// Attach an underlying cause.
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Shorthand for `self.code.category()`.
    pub fn category(&self) -> ErrorCategory {
        self.code.category()
    }
}

impl fmt::Debug for RccError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut d = f.debug_struct("RccError");
        d.field("code", &self.code);
        d.field("message", &self.message);
        if let Some(ref src) = self.source {
            d.field("source", &src.to_string());
        }
        if !self.context.is_empty() {
            d.field("context", &self.context);
        }
        d.finish()
    }
}

impl fmt::Display for RccError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.as_str(), self.message)?;
        if !self.context.is_empty() {
            if let Ok(ctx) = serde_json::to_string(&self.context) {
                write!(f, " {ctx}")?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for RccError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

// ---------------------------------------------------------------------------
// Serialization support
// ---------------------------------------------------------------------------

/// Serialisable snapshot of an [`RccError`] (without the opaque source).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct RccErrorDto {
    /// Error code.
    pub code: ErrorCode,
    /// Human-readable message.
    pub message: String,
    /// Structured context.
    pub context: BTreeMap<String, serde_json::Value>,
    /// String representation of the source error, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_message: Option<String>,
}

impl From<&RccError> for RccErrorDto {
    fn from(err: &RccError) -> Self {
        Self {
            code: err.code,
            message: err.message.clone(),
            context: err.context.clone(),
            source_message: err.source.as_ref().map(|s| s.to_string()),
        }
    }
}

impl From<RccErrorDto> for RccError {
    fn from(dto: RccErrorDto) -> Self {
        Self {
            code: dto.code,
            message: dto.message,
            source: None,
            context: dto.context,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::io;

    const ALL_CODES: &[ErrorCode] = &[
        ErrorCode::TransportConnect,
        ErrorCode::TransportTimeout,
        ErrorCode::TransportNotSent,
        ErrorCode::TransportFailed,
        ErrorCode::ServiceClientError,
        ErrorCode::ServiceServerError,
        ErrorCode::ServiceDecodeFailed,
        ErrorCode::ParserFault,
        ErrorCode::PipelineListenerFailed,
        ErrorCode::PipelineInvalidCommand,
        ErrorCode::ConfigInvalid,
        ErrorCode::Internal,
    ];

    #[test]
    fn basic_construction() {
        let err = RccError::new(ErrorCode::Internal, "boom");
        assert_eq!(err.code, ErrorCode::Internal);
        assert_eq!(err.message, "boom");
        assert!(err.source.is_none());
        assert!(err.context.is_empty());
    }

    #[test]
    fn display_without_context() {
        let err = RccError::new(ErrorCode::TransportConnect, "connection refused");
        assert_eq!(err.to_string(), "[TRANSPORT_CONNECT] connection refused");
    }

    #[test]
    fn display_with_context() {
        let err = RccError::new(ErrorCode::ServiceClientError, "bad request")
            .with_context("status", 400);
        let s = err.to_string();
        assert!(s.starts_with("[SERVICE_CLIENT_ERROR] bad request"));
        assert!(s.contains("\"status\":400"));
    }

    #[test]
    fn debug_with_source() {
        let src = io::Error::new(io::ErrorKind::ConnectionRefused, "refused");
        let err = RccError::new(ErrorCode::TransportConnect, "connect").with_source(src);
        let dbg = format!("{err:?}");
        assert!(dbg.contains("TransportConnect"));
        assert!(dbg.contains("refused"));
    }

    #[test]
    fn transport_codes_categorised() {
        for code in [
            ErrorCode::TransportConnect,
            ErrorCode::TransportTimeout,
            ErrorCode::TransportNotSent,
            ErrorCode::TransportFailed,
        ] {
            assert_eq!(code.category(), ErrorCategory::Transport, "{code:?}");
        }
    }

    #[test]
    fn service_codes_categorised() {
        assert_eq!(
            ErrorCode::ServiceClientError.category(),
            ErrorCategory::Service
        );
        assert_eq!(
            ErrorCode::ServiceServerError.category(),
            ErrorCategory::Service
        );
        assert_eq!(
            ErrorCode::ServiceDecodeFailed.category(),
            ErrorCategory::Service
        );
    }

    #[test]
    fn parser_pipeline_config_categorised() {
        assert_eq!(ErrorCode::ParserFault.category(), ErrorCategory::Parser);
        assert_eq!(
            ErrorCode::PipelineListenerFailed.category(),
            ErrorCategory::Pipeline
        );
        assert_eq!(ErrorCode::ConfigInvalid.category(), ErrorCategory::Config);
        assert_eq!(ErrorCode::Internal.category(), ErrorCategory::Internal);
    }

    #[test]
    fn transient_codes() {
        assert!(ErrorCode::TransportTimeout.is_transient());
        assert!(ErrorCode::ServiceServerError.is_transient());
        assert!(!ErrorCode::ServiceClientError.is_transient());
        assert!(!ErrorCode::ParserFault.is_transient());
    }

    #[test]
    fn std_error_source_chain() {
        let inner = io::Error::new(io::ErrorKind::TimedOut, "timed out");
        let err = RccError::new(ErrorCode::TransportTimeout, "slow").with_source(inner);
        let src = std::error::Error::source(&err).unwrap();
        assert_eq!(src.to_string(), "timed out");
    }

    #[test]
    fn dto_keeps_source_message() {
        let src = io::Error::new(io::ErrorKind::BrokenPipe, "pipe broke");
        let err = RccError::new(ErrorCode::TransportFailed, "send").with_source(src);
        let dto: RccErrorDto = (&err).into();
        assert_eq!(dto.source_message.as_deref(), Some("pipe broke"));
        let back: RccError = dto.into();
        assert!(back.source.is_none());
        assert_eq!(back.code, ErrorCode::TransportFailed);
    }

    #[test]
    fn all_codes_have_unique_as_str() {
        let mut seen = HashSet::new();
        for code in ALL_CODES {
            assert!(seen.insert(code.as_str()), "duplicate: {code:?}");
        }
    }

    #[test]
    fn all_codes_serialize_to_as_str() {
        for code in ALL_CODES {
            let json = serde_json::to_string(code).unwrap();
            assert_eq!(json, format!(r#""{}""#, code.as_str()));
        }
    }

    #[test]
    fn error_category_display() {
        assert_eq!(ErrorCategory::Transport.to_string(), "transport");
        assert_eq!(ErrorCategory::Parser.to_string(), "parser");
    }
}
