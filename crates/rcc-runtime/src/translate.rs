// SPDX-License-Identifier: MIT OR Apache-2.0
//! Bridges transport-level failures into service-level structured errors.
//!
//! [`ErrorTranslationStage`] listens to the `error` event at
//! [`Priority::NORMAL`].  When the service answered, it runs the configured
//! [`ErrorParser`] once and attaches the result to the event, leaving the
//! resolution slot alone so later listeners decide the outcome.  When the
//! service was never reached it does nothing at all.

use rcc_transport::Response;
use std::sync::Arc;
use tracing::{debug, error, trace};

use crate::CommandError;
use crate::emitter::{Emitter, Listener, Priority};
use crate::event::ErrorEvent;
use crate::parser::{ErrorParser, ParseError, StructuredError};

/// Name under which the stage registers itself.
pub const STAGE_NAME: &str = "error-translation";

/// Error translation stage.
///
/// Stateless apart from the shared parser handle, so one stage may be
/// cloned into many clients.
#[derive(Clone)]
pub struct ErrorTranslationStage {
    parser: Arc<dyn ErrorParser>,
}

impl ErrorTranslationStage {
    /// Create a stage around `parser`.
    pub fn new(parser: impl ErrorParser + 'static) -> Self {
        Self {
            parser: Arc::new(parser),
        }
    }

    /// Create a stage around a closure.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&Response) -> Result<StructuredError, ParseError> + Send + Sync + 'static,
    {
        Self::new(f)
    }

    /// Create a stage around an already shared parser.
    pub fn with_shared(parser: Arc<dyn ErrorParser>) -> Self {
        Self { parser }
    }

    /// Register the stage on `emitter` at [`Priority::NORMAL`].
    pub fn attach(self, emitter: &mut Emitter) {
        emitter.listen_error(Priority::NORMAL, self);
    }

    /// Handle one failure notification.
    ///
    /// Parses at most once per notification, even if the stage is
    /// registered more than once.
    ///
    /// # Errors
    ///
    /// Returns the parser's error untouched.
    pub fn on_failure(&self, event: &mut ErrorEvent) -> Result<(), ParseError> {
        if event.is_translated() {
            trace!(target: "rcc.translate", "already translated");
            return Ok(());
        }
        let Some(response) = event.response() else {
            trace!(target: "rcc.translate", command = %event.command().name, "no response; nothing to translate");
            return Ok(());
        };
        let status = response.status;
        let parsed = self.parser.parse(response)?;
        debug!(
            target: "rcc.translate",
            command = %event.command().name,
            status,
            code = parsed.code().unwrap_or("-"),
            "attached structured error"
        );
        event.mark_translated();
        event.set_structured_error(parsed);
        Ok(())
    }
}

impl Listener<ErrorEvent> for ErrorTranslationStage {
    fn on_event(&self, event: &mut ErrorEvent) -> Result<(), CommandError> {
        self.on_failure(event).map_err(|source| {
            let status = event.response().map(|r| r.status).unwrap_or_default();
            error!(
                target: "rcc.translate",
                command = %event.command().name,
                status,
                error = %source,
                "error parser failed"
            );
            CommandError::ParserFault { status, source }
        })
    }

    fn name(&self) -> &str {
        STAGE_NAME
    }
}
