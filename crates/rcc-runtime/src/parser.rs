// SPDX-License-Identifier: MIT OR Apache-2.0
//! Error parsers turn a raw error [`Response`] into a [`StructuredError`].
//!
//! The structured error is an open mapping whose shape is decided by the
//! parser, not by this crate.  Two schema-agnostic parsers ship here:
//! [`JsonErrorParser`] for services that answer with a JSON object, and
//! [`StatusOnlyParser`] for services whose error bodies carry nothing useful.
//! Anything service-specific is supplied by the caller, either as a type
//! implementing [`ErrorParser`] or as a plain closure.

use rcc_config::{ClientConfig, DEFAULT_REQUEST_ID_HEADER};
use rcc_transport::Response;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ---------------------------------------------------------------------------
// StructuredError
// ---------------------------------------------------------------------------

/// Caller-defined decoded representation of an error response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StructuredError(Map<String, Value>);

impl StructuredError {
    /// An empty mapping.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a field (builder pattern).
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert a field, returning the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    /// Look up a field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Error code, taken from the first of `code`, `__type` or `error` that
    /// holds a string.
    pub fn code(&self) -> Option<&str> {
        self.first_str(&["code", "__type", "error"])
    }

    /// Error message, taken from `message` or `Message`.
    pub fn message(&self) -> Option<&str> {
        self.first_str(&["message", "Message"])
    }

    /// Service-assigned request id, if the parser recorded one.
    pub fn request_id(&self) -> Option<&str> {
        self.first_str(&["request_id"])
    }

    /// HTTP status, if the parser recorded one.
    pub fn status(&self) -> Option<u16> {
        self.get("status")
            .and_then(Value::as_u64)
            .and_then(|s| u16::try_from(s).ok())
    }

    /// One-line `code: message` summary, if either is present.
    pub fn summary(&self) -> Option<String> {
        match (self.code(), self.message()) {
            (Some(code), Some(message)) => Some(format!("{code}: {message}")),
            (Some(code), None) => Some(code.to_string()),
            (None, Some(message)) => Some(message.to_string()),
            (None, None) => None,
        }
    }

    /// Borrow the underlying map.
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// `true` when there are no fields.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Convert into a JSON object value.
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    fn first_str(&self, keys: &[&str]) -> Option<&str> {
        keys.iter().find_map(|k| self.0.get(*k).and_then(Value::as_str))
    }
}

impl From<Map<String, Value>> for StructuredError {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl TryFrom<Value> for StructuredError {
    type Error = ParseError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(ParseError::NotAnObject {
                found: json_type(&other),
            }),
        }
    }
}

impl PartialEq<Value> for StructuredError {
    fn eq(&self, other: &Value) -> bool {
        matches!(other, Value::Object(map) if *map == self.0)
    }
}

// ---------------------------------------------------------------------------
// ParseError
// ---------------------------------------------------------------------------

/// Failure of an [`ErrorParser`] on a real response.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// The body is not valid JSON.
    #[error("response body is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// The body is JSON but not an object.
    #[error("expected a JSON object, found {found}")]
    NotAnObject {
        /// JSON type that was found instead.
        found: &'static str,
    },

    /// Parser-specific failure.
    #[error("{0}")]
    Custom(String),
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ---------------------------------------------------------------------------
// ErrorParser
// ---------------------------------------------------------------------------

/// Converts an error [`Response`] into a [`StructuredError`].
///
/// Parsers are synchronous and perform no I/O: the body has already been
/// read by the transport.
pub trait ErrorParser: Send + Sync {
    /// Parse one response.
    ///
    /// # Errors
    ///
    /// Any error is treated as a fatal fault of the command; it is never
    /// offered to listeners for recovery.
    fn parse(&self, response: &Response) -> Result<StructuredError, ParseError>;
}

impl<F> ErrorParser for F
where
    F: Fn(&Response) -> Result<StructuredError, ParseError> + Send + Sync,
{
    fn parse(&self, response: &Response) -> Result<StructuredError, ParseError> {
        self(response)
    }
}

// ---------------------------------------------------------------------------
// Built-in: JsonErrorParser
// ---------------------------------------------------------------------------

/// Decodes the body as a JSON object and records `status` and, when the
/// configured header is present, `request_id`.
///
/// Fields already present in the body are never overwritten, except
/// `status`, which always reflects the HTTP status.  An empty body yields a
/// mapping holding just those two fields.
#[derive(Debug, Clone)]
pub struct JsonErrorParser {
    request_id_header: String,
}

impl JsonErrorParser {
    /// Parser reading the request id from `x-request-id`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            request_id_header: DEFAULT_REQUEST_ID_HEADER.to_string(),
        }
    }

    /// Parser using the request id header from `config`.
    #[must_use]
    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new().with_request_id_header(&config.request_id_header)
    }

    /// Read the request id from a different header.
    #[must_use]
    pub fn with_request_id_header(mut self, header: impl Into<String>) -> Self {
        self.request_id_header = header.into();
        self
    }
}

impl Default for JsonErrorParser {
    fn default() -> Self {
        Self::new()
    }
}

impl ErrorParser for JsonErrorParser {
    fn parse(&self, response: &Response) -> Result<StructuredError, ParseError> {
        let mut parsed = if response.body.iter().all(u8::is_ascii_whitespace) {
            StructuredError::new()
        } else {
            let value: Value = serde_json::from_slice(&response.body)?;
            StructuredError::try_from(value)?
        };

        parsed.insert("status", response.status);
        if parsed.get("request_id").is_none() {
            if let Some(id) = response.header(&self.request_id_header) {
                parsed.insert("request_id", id);
            }
        }
        Ok(parsed)
    }
}

// ---------------------------------------------------------------------------
// Built-in: StatusOnlyParser
// ---------------------------------------------------------------------------

/// Ignores the body and records only `status` and a canonical `reason`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatusOnlyParser;

impl ErrorParser for StatusOnlyParser {
    fn parse(&self, response: &Response) -> Result<StructuredError, ParseError> {
        Ok(StructuredError::new()
            .with("status", response.status)
            .with("reason", reason_phrase(response.status)))
    }
}

fn reason_phrase(status: u16) -> &'static str {
    match status {
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        408 => "Request Timeout",
        409 => "Conflict",
        413 => "Payload Too Large",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        501 => "Not Implemented",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        504 => "Gateway Timeout",
        400..=499 => "Client Error",
        500..=599 => "Server Error",
        _ => "Unknown",
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_parser_reads_object_body() {
        let resp = Response::new(400)
            .with_header("X-Request-Id", "req-9")
            .with_body(r#"{"code":"ValidationError","message":"name is required"}"#);
        let parsed = JsonErrorParser::new().parse(&resp).unwrap();
        assert_eq!(
            parsed,
            json!({
                "code": "ValidationError",
                "message": "name is required",
                "status": 400,
                "request_id": "req-9"
            })
        );
        assert_eq!(parsed.code(), Some("ValidationError"));
        assert_eq!(parsed.message(), Some("name is required"));
        assert_eq!(parsed.request_id(), Some("req-9"));
        assert_eq!(parsed.status(), Some(400));
    }

    #[test]
    fn json_parser_empty_body_still_records_status() {
        let parsed = JsonErrorParser::new().parse(&Response::new(503)).unwrap();
        assert_eq!(parsed, json!({"status": 503}));
    }

    #[test]
    fn json_parser_keeps_body_request_id() {
        let resp = Response::new(400)
            .with_header("x-request-id", "from-header")
            .with_body(r#"{"request_id":"from-body"}"#);
        let parsed = JsonErrorParser::new().parse(&resp).unwrap();
        assert_eq!(parsed.request_id(), Some("from-body"));
    }

    #[test]
    fn json_parser_custom_header() {
        let resp = Response::new(500).with_header("x-amzn-requestid", "amz-1");
        let parsed = JsonErrorParser::new()
            .with_request_id_header("x-amzn-requestid")
            .parse(&resp)
            .unwrap();
        assert_eq!(parsed.request_id(), Some("amz-1"));
    }

    #[test]
    fn json_parser_rejects_garbage() {
        let resp = Response::new(400).with_body("<html>oops</html>");
        let err = JsonErrorParser::new().parse(&resp).unwrap_err();
        assert!(matches!(err, ParseError::InvalidJson(_)));
    }

    #[test]
    fn json_parser_rejects_non_object() {
        let resp = Response::new(400).with_body("[1,2]");
        let err = JsonErrorParser::new().parse(&resp).unwrap_err();
        assert!(matches!(err, ParseError::NotAnObject { found: "array" }));
    }

    #[test]
    fn status_only_parser() {
        let parsed = StatusOnlyParser.parse(&Response::new(429)).unwrap();
        assert_eq!(parsed, json!({"status": 429, "reason": "Too Many Requests"}));
        let parsed = StatusOnlyParser.parse(&Response::new(418)).unwrap();
        assert_eq!(parsed.get("reason"), Some(&json!("Client Error")));
    }

    #[test]
    fn closures_are_parsers() {
        let parser = |r: &Response| Ok::<_, ParseError>(StructuredError::new().with("seen", r.status));
        let parsed = ErrorParser::parse(&parser, &Response::new(404)).unwrap();
        assert_eq!(parsed, json!({"seen": 404}));
    }

    #[test]
    fn code_falls_back_to_type_field() {
        let e = StructuredError::try_from(json!({"__type": "ResourceNotFound"})).unwrap();
        assert_eq!(e.code(), Some("ResourceNotFound"));
        assert_eq!(e.summary().as_deref(), Some("ResourceNotFound"));
    }

    #[test]
    fn non_object_values_are_not_structured_errors() {
        let err = StructuredError::try_from(json!("nope")).unwrap_err();
        assert_eq!(err.to_string(), "expected a JSON object, found string");
    }

    #[test]
    fn serialises_transparently() {
        let e = StructuredError::new().with("foo", "bar");
        assert_eq!(serde_json::to_string(&e).unwrap(), r#"{"foo":"bar"}"#);
    }
}
