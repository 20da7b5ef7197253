// SPDX-License-Identifier: MIT OR Apache-2.0
//! Event payloads carried through the [`Emitter`](crate::Emitter).
//!
//! Each payload lives for exactly one command attempt and is dropped once
//! its emission finishes.

use rcc_transport::{HttpRequest, Response, TransportOutcome};
use serde_json::Value;
use tracing::{debug, warn};

use crate::CommandError;
use crate::command::Command;
use crate::parser::StructuredError;

// ---------------------------------------------------------------------------
// PrepareEvent
// ---------------------------------------------------------------------------

/// Emitted before the request is sent; listeners may supply the request.
#[derive(Debug)]
pub struct PrepareEvent {
    command: Command,
    request: Option<HttpRequest>,
}

impl PrepareEvent {
    /// Create an event with an empty request slot.
    pub fn new(command: Command) -> Self {
        Self {
            command,
            request: None,
        }
    }

    /// The command being prepared.
    pub fn command(&self) -> &Command {
        &self.command
    }

    /// The request prepared so far, if any.
    pub fn request(&self) -> Option<&HttpRequest> {
        self.request.as_ref()
    }

    /// Mutable access to the prepared request, if any.
    pub fn request_mut(&mut self) -> Option<&mut HttpRequest> {
        self.request.as_mut()
    }

    /// Set or replace the request.
    pub fn set_request(&mut self, request: HttpRequest) {
        self.request = Some(request);
    }

    /// Split into the command and the prepared request.
    pub fn into_parts(self) -> (Command, Option<HttpRequest>) {
        (self.command, self.request)
    }
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// Final-result slot of an [`ErrorEvent`].
#[derive(Debug, Default)]
pub enum Resolution {
    /// Nobody has claimed the outcome; the default failure applies.
    #[default]
    Unresolved,
    /// A listener recovered the command with this value.
    Resolved(Value),
    /// A listener replaced the failure with this error.
    Failed(CommandError),
}

impl Resolution {
    /// `true` once any listener has claimed the outcome.
    pub fn is_claimed(&self) -> bool {
        !matches!(self, Self::Unresolved)
    }
}

// ---------------------------------------------------------------------------
// ErrorEvent
// ---------------------------------------------------------------------------

/// The failure notification for one failed command attempt.
///
/// Carries the command, the request (if one was prepared), the classified
/// [`TransportOutcome`], the structured error slot and the [`Resolution`]
/// slot.  The first listener to claim the resolution wins; later claims are
/// rejected and leave the slot untouched.
#[derive(Debug)]
pub struct ErrorEvent {
    command: Command,
    request: Option<HttpRequest>,
    outcome: TransportOutcome,
    structured_error: Option<StructuredError>,
    translated: bool,
    resolution: Resolution,
}

impl ErrorEvent {
    /// Create a notification with no structured error and an unresolved slot.
    pub fn new(command: Command, request: Option<HttpRequest>, outcome: TransportOutcome) -> Self {
        Self {
            command,
            request,
            outcome,
            structured_error: None,
            translated: false,
            resolution: Resolution::Unresolved,
        }
    }

    /// The command that failed.
    pub fn command(&self) -> &Command {
        &self.command
    }

    /// The request that was sent (or attempted), if one was prepared.
    pub fn request(&self) -> Option<&HttpRequest> {
        self.request.as_ref()
    }

    /// The classified outcome of the attempt.
    pub fn outcome(&self) -> &TransportOutcome {
        &self.outcome
    }

    /// The response, if the service answered.
    pub fn response(&self) -> Option<&Response> {
        self.outcome.response()
    }

    /// The structured error attached by the translation stage (or a
    /// listener). `None` when no response was available.
    pub fn structured_error(&self) -> Option<&StructuredError> {
        self.structured_error.as_ref()
    }

    /// Replace the structured error.
    pub fn set_structured_error(&mut self, error: StructuredError) {
        self.structured_error = Some(error);
    }

    /// Remove and return the structured error.
    pub fn take_structured_error(&mut self) -> Option<StructuredError> {
        self.structured_error.take()
    }

    /// Current state of the resolution slot.
    pub fn resolution(&self) -> &Resolution {
        &self.resolution
    }

    /// `true` once a listener has claimed the outcome.
    pub fn is_resolved(&self) -> bool {
        self.resolution.is_claimed()
    }

    /// Recover the command with `value`.
    ///
    /// Returns `false`, leaving the slot untouched, if the outcome was
    /// already claimed.
    pub fn set_result(&mut self, value: impl Into<Value>) -> bool {
        self.claim(Resolution::Resolved(value.into()))
    }

    /// Fail the command with `error` instead of the default failure.
    ///
    /// Returns `false`, leaving the slot untouched, if the outcome was
    /// already claimed.
    pub fn fail(&mut self, error: CommandError) -> bool {
        self.claim(Resolution::Failed(error))
    }

    fn claim(&mut self, resolution: Resolution) -> bool {
        if self.resolution.is_claimed() {
            warn!(
                target: "rcc.pipeline",
                command = %self.command.name,
                "resolution already claimed; ignoring later claim"
            );
            return false;
        }
        debug!(target: "rcc.pipeline", command = %self.command.name, "resolution claimed");
        self.resolution = resolution;
        true
    }

    pub(crate) fn is_translated(&self) -> bool {
        self.translated
    }

    pub(crate) fn mark_translated(&mut self) {
        self.translated = true;
    }

    /// Turn the notification into the command's final result.
    ///
    /// Unclaimed notifications fail with the default error for their
    /// outcome: [`CommandError::Service`] when the service answered,
    /// [`CommandError::Transport`] otherwise.
    pub fn into_result(self) -> Result<Value, CommandError> {
        match self.resolution {
            Resolution::Resolved(value) => Ok(value),
            Resolution::Failed(error) => Err(error),
            Resolution::Unresolved => Err(match self.outcome {
                TransportOutcome::Response(response) => CommandError::Service {
                    status: response.status,
                    error: self.structured_error,
                },
                TransportOutcome::Failure(failure) => CommandError::Transport(failure),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rcc_transport::{FailureKind, TransportFailure};
    use serde_json::json;

    fn response_event(status: u16) -> ErrorEvent {
        ErrorEvent::new(
            Command::new("foo"),
            Some(HttpRequest::get("http://foo.com")),
            TransportOutcome::Response(Response::new(status)),
        )
    }

    fn failure_event() -> ErrorEvent {
        ErrorEvent::new(
            Command::new("foo"),
            None,
            TransportOutcome::Failure(TransportFailure::new(FailureKind::Connect, "refused")),
        )
    }

    #[test]
    fn starts_unresolved_without_structured_error() {
        let ev = response_event(400);
        assert!(!ev.is_resolved());
        assert!(ev.structured_error().is_none());
        assert_eq!(ev.response().map(|r| r.status), Some(400));
    }

    #[test]
    fn first_claim_wins() {
        let mut ev = response_event(400);
        assert!(ev.set_result("first"));
        assert!(!ev.set_result("second"));
        assert!(!ev.fail(CommandError::Listener {
            listener: "late".into(),
            message: "too late".into(),
        }));
        assert_eq!(ev.into_result().unwrap(), json!("first"));
    }

    #[test]
    fn unresolved_response_fails_with_service_error() {
        let mut ev = response_event(404);
        ev.set_structured_error(StructuredError::new().with("code", "NotFound"));
        match ev.into_result() {
            Err(CommandError::Service { status, error }) => {
                assert_eq!(status, 404);
                assert_eq!(error.unwrap().code(), Some("NotFound"));
            }
            other => panic!("expected service error, got {other:?}"),
        }
    }

    #[test]
    fn unresolved_failure_fails_with_transport_error() {
        match failure_event().into_result() {
            Err(CommandError::Transport(f)) => assert_eq!(f.kind, FailureKind::Connect),
            other => panic!("expected transport error, got {other:?}"),
        }
    }

    #[test]
    fn listener_can_replace_the_failure() {
        let mut ev = failure_event();
        assert!(ev.fail(CommandError::Listener {
            listener: "policy".into(),
            message: "offline mode".into(),
        }));
        assert!(matches!(
            ev.into_result(),
            Err(CommandError::Listener { .. })
        ));
    }

    #[test]
    fn structured_error_can_be_suppressed() {
        let mut ev = response_event(500);
        ev.set_structured_error(StructuredError::new().with("code", "Boom"));
        assert!(ev.take_structured_error().is_some());
        assert!(matches!(
            ev.into_result(),
            Err(CommandError::Service { error: None, .. })
        ));
    }

    #[test]
    fn translation_mark_sticks() {
        let mut ev = response_event(400);
        assert!(!ev.is_translated());
        ev.mark_translated();
        ev.mark_translated();
        assert!(ev.is_translated());
    }

    #[test]
    fn prepare_event_request_slot() {
        let mut ev = PrepareEvent::new(Command::new("foo"));
        assert!(ev.request().is_none());
        ev.set_request(HttpRequest::get("http://foo.com"));
        if let Some(req) = ev.request_mut() {
            req.headers.insert("x-trace".into(), "1".into());
        }
        let (cmd, req) = ev.into_parts();
        assert_eq!(cmd.name, "foo");
        assert_eq!(req.unwrap().headers["x-trace"], "1");
    }
}
