// SPDX-License-Identifier: MIT OR Apache-2.0
//! The [`Client`]: drives one [`Command`] through prepare, send and the
//! error pipeline.

use rcc_config::{ClientConfig, validate_config};
use rcc_transport::{
    Exchange, HttpRequest, HttpTransport, Response, Transport, TransportOutcome, classify,
};
use serde_json::{Map, Value, json};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::CommandError;
use crate::command::Command;
use crate::emitter::Emitter;
use crate::event::{ErrorEvent, PrepareEvent};
use crate::parser::ErrorParser;
use crate::telemetry::CommandMetrics;
use crate::translate::ErrorTranslationStage;

/// `User-Agent` sent when the configuration does not name one.
pub const DEFAULT_USER_AGENT: &str = concat!("rcc/", env!("CARGO_PKG_VERSION"));

/// Remote command client.
///
/// Owns the transport, the event pipeline and the metrics.  Listener
/// registration needs `&mut self`; execution only needs `&self`, so a fully
/// configured client may be shared behind an [`Arc`].
pub struct Client {
    config: ClientConfig,
    transport: Arc<dyn Transport>,
    emitter: Emitter,
    metrics: Arc<CommandMetrics>,
}

impl Client {
    /// Create a client over an existing transport.
    pub fn new(config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            config,
            transport,
            emitter: Emitter::new(),
            metrics: Arc::new(CommandMetrics::new()),
        }
    }

    /// Create a client talking HTTP, with the timeout from `config`.
    ///
    /// The configuration is validated first; warnings are logged.  Tracing
    /// is left to the caller (see
    /// [`init_tracing_from_config`](crate::init_tracing_from_config)).
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::Config`] if validation fails, or
    /// [`CommandError::Transport`] if the HTTP client cannot be built.
    pub fn from_config(config: ClientConfig) -> Result<Self, CommandError> {
        for warning in validate_config(&config)? {
            warn!(target: "rcc.pipeline", ?warning, "client configuration warning");
        }
        let transport = HttpTransport::new(Duration::from_secs(config.timeout_secs))?;
        Ok(Self::new(config, Arc::new(transport)))
    }

    /// Attach an [`ErrorTranslationStage`] around `parser` (builder pattern).
    #[must_use]
    pub fn with_error_parser(mut self, parser: impl ErrorParser + 'static) -> Self {
        ErrorTranslationStage::new(parser).attach(&mut self.emitter);
        self
    }

    /// The client configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The event pipeline.
    pub fn emitter(&self) -> &Emitter {
        &self.emitter
    }

    /// Mutable access to the event pipeline, for registering listeners.
    pub fn emitter_mut(&mut self) -> &mut Emitter {
        &mut self.emitter
    }

    /// Shared handle to the execution counters.
    pub fn metrics(&self) -> Arc<CommandMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Convenience wrapper: build a [`Command`] and execute it.
    ///
    /// `params` must be a JSON object; `null` is accepted as "no parameters".
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::InvalidCommand`] for any other `params`
    /// value, without sending anything.  Otherwise see [`Client::execute`].
    pub async fn call(&self, name: &str, params: Value) -> Result<Value, CommandError> {
        let params = match params {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                let err = CommandError::InvalidCommand {
                    command: name.to_string(),
                    reason: format!("params must be a JSON object, found {}", json_type(&other)),
                };
                self.metrics.record_failure(&err);
                return Err(err);
            }
        };
        self.execute(Command {
            name: name.to_string(),
            params,
        })
        .await
    }

    /// Execute one command.
    ///
    /// A response below 400 resolves the command with its decoded body.
    /// Anything else emits the `error` event; listeners may recover the
    /// command, replace the failure, or let the default failure through.
    ///
    /// # Errors
    ///
    /// Returns the failure left on the event after all listeners ran, a
    /// listener error (including [`CommandError::ParserFault`]), or
    /// [`CommandError::Decode`] for an undecodable success body.
    pub async fn execute(&self, command: Command) -> Result<Value, CommandError> {
        let started = Instant::now();
        let name = command.name.clone();
        debug!(target: "rcc.pipeline", command = %name, "executing");

        let result = self.run(command).await;
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        match &result {
            Ok(_) => info!(target: "rcc.pipeline", command = %name, elapsed_ms, "command finished"),
            Err(e) => warn!(
                target: "rcc.pipeline",
                command = %name,
                code = %e.code(),
                elapsed_ms,
                error = %e,
                "command failed"
            ),
        }
        result
    }

    async fn run(&self, command: Command) -> Result<Value, CommandError> {
        let mut prepare = PrepareEvent::new(command);
        if let Err(e) = self.emitter.emit_prepare(&mut prepare) {
            self.metrics.record_failure(&e);
            return Err(e);
        }
        let (command, prepared) = prepare.into_parts();
        let request = prepared.or_else(|| self.default_request(&command));

        let exchange = match request {
            None => Exchange::default(),
            Some(request) => match self.transport.send(request.clone()).await {
                Ok(response) if response.is_success() => {
                    let result = decode_success(&response);
                    match &result {
                        Ok(_) => self.metrics.record_success(),
                        Err(e) => self.metrics.record_failure(e),
                    }
                    return result;
                }
                Ok(response) => Exchange::answered(request, response),
                Err(failure) => Exchange::broken(Some(request), failure),
            },
        };

        let request = exchange.request.clone();
        let outcome = classify(exchange);
        match &outcome {
            TransportOutcome::Response(r) => {
                debug!(target: "rcc.pipeline", command = %command.name, status = r.status, "service returned an error");
            }
            TransportOutcome::Failure(f) => {
                debug!(target: "rcc.pipeline", command = %command.name, kind = %f.kind, "no response received");
            }
        }

        let mut event = ErrorEvent::new(command, request, outcome);
        if let Err(e) = self.emitter.emit_error(&mut event) {
            self.metrics.record_failure(&e);
            return Err(e);
        }

        let result = event.into_result();
        match &result {
            Ok(_) => self.metrics.record_recovered(),
            Err(e) => self.metrics.record_failure(e),
        }
        result
    }

    fn default_request(&self, command: &Command) -> Option<HttpRequest> {
        let endpoint = self.config.endpoint.as_deref().filter(|e| !e.is_empty())?;
        let body = json!({
            "operation": command.name,
            "params": command.params,
        });
        let user_agent = self
            .config
            .user_agent
            .clone()
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());
        Some(
            HttpRequest::post(endpoint)
                .with_header("content-type", "application/json")
                .with_header("user-agent", user_agent)
                .with_body(body.to_string()),
        )
    }
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

fn decode_success(response: &Response) -> Result<Value, CommandError> {
    if response.body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    serde_json::from_slice(&response.body).map_err(|source| CommandError::Decode {
        status: response.status,
        source,
    })
}
