// SPDX-License-Identifier: MIT OR Apache-2.0
//! Listener registration and dispatch through the public [`Emitter`] API.

use rcc_runtime::{Command, CommandError, Emitter, ErrorEvent, Listener, PrepareEvent, Priority};
use rcc_transport::{HttpRequest, Response, TransportOutcome};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Counts invocations; optionally rejects the event.
struct CountingListener {
    name: &'static str,
    calls: Arc<AtomicU32>,
    reject: bool,
}

impl CountingListener {
    fn new(name: &'static str, calls: Arc<AtomicU32>) -> Self {
        Self {
            name,
            calls,
            reject: false,
        }
    }

    fn rejecting(mut self) -> Self {
        self.reject = true;
        self
    }
}

impl Listener<ErrorEvent> for CountingListener {
    fn on_event(&self, _event: &mut ErrorEvent) -> Result<(), CommandError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.reject {
            return Err(CommandError::Listener {
                listener: self.name.to_string(),
                message: "rejected".into(),
            });
        }
        Ok(())
    }

    fn name(&self) -> &str {
        self.name
    }
}

fn error_event() -> ErrorEvent {
    ErrorEvent::new(
        Command::new("foo"),
        Some(HttpRequest::get("http://foo.com")),
        TransportOutcome::Response(Response::new(400)),
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
fn listeners_report_dispatch_order() {
    let calls = Arc::new(AtomicU32::new(0));
    let mut emitter = Emitter::new();
    emitter.listen_error(Priority::LATE, CountingListener::new("late", calls.clone()));
    emitter.listen_error(Priority::FIRST, CountingListener::new("first", calls.clone()));
    emitter.listen_error(Priority::NORMAL, CountingListener::new("normal", calls.clone()));
    emitter.listen_error(Priority::LAST, CountingListener::new("last", calls.clone()));

    let order: Vec<&str> = emitter
        .error_listeners()
        .listeners()
        .into_iter()
        .map(|(_, name)| name)
        .collect();
    assert_eq!(order, vec!["first", "normal", "late", "last"]);

    emitter.emit_error(&mut error_event()).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 4);
}

#[test]
fn listener_error_stops_dispatch() {
    let calls = Arc::new(AtomicU32::new(0));
    let mut emitter = Emitter::new();
    emitter.listen_error(
        Priority::EARLY,
        CountingListener::new("gate", calls.clone()).rejecting(),
    );
    emitter.listen_error(Priority::LATE, CountingListener::new("after", calls.clone()));

    let err = emitter.emit_error(&mut error_event()).unwrap_err();

    assert!(matches!(err, CommandError::Listener { ref listener, .. } if listener == "gate"));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn removed_listener_no_longer_runs() {
    let calls = Arc::new(AtomicU32::new(0));
    let mut emitter = Emitter::new();
    emitter.listen_error(Priority::NORMAL, CountingListener::new("gone", calls.clone()));
    assert_eq!(emitter.error_listeners_mut().remove("gone"), 1);

    emitter.emit_error(&mut error_event()).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn prepare_listeners_see_earlier_changes() {
    let mut emitter = Emitter::new();
    emitter.on_prepare("route", Priority::EARLY, |ev| {
        ev.set_request(HttpRequest::post("http://svc.test/things"));
    });
    emitter.on_prepare("sign", Priority::NORMAL, |ev| {
        if let Some(req) = ev.request_mut() {
            req.headers.insert("authorization".into(), "token".into());
        }
    });

    let mut ev = PrepareEvent::new(Command::new("CreateThing"));
    emitter.emit_prepare(&mut ev).unwrap();

    let req = ev.request().unwrap();
    assert_eq!(req.url, "http://svc.test/things");
    assert_eq!(req.headers["authorization"], "token");
    assert_eq!(emitter.prepare_listeners().len(), 2);
}
