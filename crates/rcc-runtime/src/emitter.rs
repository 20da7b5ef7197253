// SPDX-License-Identifier: MIT OR Apache-2.0
//! Prioritized, sequential event dispatch for one command execution.
//!
//! Each event kind has its own [`ListenerTable`]: an explicit list of
//! `(priority, sequence, listener)` records.  Before every emission the table
//! is sorted by descending priority, ties broken by registration order, and
//! listeners run one after another with exclusive `&mut` access to the event.
//! The first listener error aborts the emission and is returned to the
//! caller.

use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::CommandError;
use crate::event::{ErrorEvent, PrepareEvent};

// ---------------------------------------------------------------------------
// Priority
// ---------------------------------------------------------------------------

/// Ordering key for listeners. Higher priorities run first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Priority(pub i32);

impl Priority {
    /// Runs before everything else.
    pub const FIRST: Priority = Priority(i32::MAX);
    /// Runs before normal listeners.
    pub const EARLY: Priority = Priority(10_000);
    /// Default tier; the error translation stage lives here.
    pub const NORMAL: Priority = Priority(0);
    /// Runs after normal listeners; sees the structured error.
    pub const LATE: Priority = Priority(-10_000);
    /// Runs after everything else.
    pub const LAST: Priority = Priority(i32::MIN);
}

impl Default for Priority {
    fn default() -> Self {
        Self::NORMAL
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::FIRST => f.write_str("first"),
            Self::EARLY => f.write_str("early"),
            Self::NORMAL => f.write_str("normal"),
            Self::LATE => f.write_str("late"),
            Self::LAST => f.write_str("last"),
            Priority(n) => write!(f, "{n}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Listener
// ---------------------------------------------------------------------------

/// Subscriber for events of type `E`.
pub trait Listener<E>: Send + Sync {
    /// React to (and optionally mutate) the event.
    ///
    /// # Errors
    ///
    /// An error stops the emission; no later listener runs.
    fn on_event(&self, event: &mut E) -> Result<(), CommandError>;

    /// Human-readable name used in tracing output.
    fn name(&self) -> &str {
        "anonymous"
    }
}

/// Adapter turning an infallible closure into a [`Listener`].
struct FnListener<F> {
    name: String,
    f: F,
}

impl<E, F> Listener<E> for FnListener<F>
where
    F: Fn(&mut E) + Send + Sync,
{
    fn on_event(&self, event: &mut E) -> Result<(), CommandError> {
        (self.f)(event);
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

// ---------------------------------------------------------------------------
// ListenerTable
// ---------------------------------------------------------------------------

struct ListenerRecord<E> {
    priority: Priority,
    seq: u64,
    listener: Arc<dyn Listener<E>>,
}

/// Registration table for one event kind.
pub struct ListenerTable<E> {
    records: Vec<ListenerRecord<E>>,
    next_seq: u64,
}

impl<E> Default for ListenerTable<E> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            next_seq: 0,
        }
    }
}

impl<E> ListenerTable<E> {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener at the given priority.
    pub fn add(&mut self, priority: Priority, listener: Arc<dyn Listener<E>>) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.records.push(ListenerRecord {
            priority,
            seq,
            listener,
        });
    }

    /// Remove every listener with the given name, returning how many were
    /// removed.
    pub fn remove(&mut self, name: &str) -> usize {
        let before = self.records.len();
        self.records.retain(|r| r.listener.name() != name);
        before - self.records.len()
    }

    /// Listener names and priorities in dispatch order.
    pub fn listeners(&self) -> Vec<(Priority, &str)> {
        self.ordered()
            .into_iter()
            .map(|r| (r.priority, r.listener.name()))
            .collect()
    }

    /// Number of registered listeners.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// `true` if no listeners are registered.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Run every listener against `event` in dispatch order.
    ///
    /// # Errors
    ///
    /// Returns the first listener error; remaining listeners are skipped.
    pub fn dispatch(&self, event: &mut E) -> Result<(), CommandError> {
        for record in self.ordered() {
            debug!(
                target: "rcc.emitter",
                listener = %record.listener.name(),
                priority = %record.priority,
                "dispatching"
            );
            record.listener.on_event(event)?;
        }
        Ok(())
    }

    fn ordered(&self) -> Vec<&ListenerRecord<E>> {
        let mut ordered: Vec<&ListenerRecord<E>> = self.records.iter().collect();
        ordered.sort_by(|a, b| b.priority.cmp(&a.priority).then(a.seq.cmp(&b.seq)));
        ordered
    }
}

// ---------------------------------------------------------------------------
// Emitter
// ---------------------------------------------------------------------------

/// The command event pipeline: one [`ListenerTable`] per event kind.
///
/// ```
/// use rcc_runtime::{Emitter, Priority};
///
/// let mut emitter = Emitter::new();
/// emitter.on_error("recover", Priority::LATE, |ev| {
///     ev.set_result("fallback");
/// });
/// assert_eq!(emitter.error_listeners().len(), 1);
/// ```
#[derive(Default)]
pub struct Emitter {
    prepare: ListenerTable<PrepareEvent>,
    error: ListenerTable<ErrorEvent>,
}

impl Emitter {
    /// Create an emitter with no listeners.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a closure for the `prepare` event.
    pub fn on_prepare<F>(&mut self, name: impl Into<String>, priority: Priority, f: F)
    where
        F: Fn(&mut PrepareEvent) + Send + Sync + 'static,
    {
        self.prepare.add(
            priority,
            Arc::new(FnListener {
                name: name.into(),
                f,
            }),
        );
    }

    /// Register a closure for the `error` event.
    pub fn on_error<F>(&mut self, name: impl Into<String>, priority: Priority, f: F)
    where
        F: Fn(&mut ErrorEvent) + Send + Sync + 'static,
    {
        self.error.add(
            priority,
            Arc::new(FnListener {
                name: name.into(),
                f,
            }),
        );
    }

    /// Register a [`Listener`] for the `prepare` event.
    pub fn listen_prepare(
        &mut self,
        priority: Priority,
        listener: impl Listener<PrepareEvent> + 'static,
    ) {
        self.prepare.add(priority, Arc::new(listener));
    }

    /// Register a [`Listener`] for the `error` event.
    pub fn listen_error(&mut self, priority: Priority, listener: impl Listener<ErrorEvent> + 'static) {
        self.error.add(priority, Arc::new(listener));
    }

    /// Emit `prepare`.
    ///
    /// # Errors
    ///
    /// Returns the first listener error.
    pub fn emit_prepare(&self, event: &mut PrepareEvent) -> Result<(), CommandError> {
        self.prepare.dispatch(event)
    }

    /// Emit `error`.
    ///
    /// # Errors
    ///
    /// Returns the first listener error (e.g. a parser fault).
    pub fn emit_error(&self, event: &mut ErrorEvent) -> Result<(), CommandError> {
        self.error.dispatch(event)
    }

    /// The `prepare` listener table.
    pub fn prepare_listeners(&self) -> &ListenerTable<PrepareEvent> {
        &self.prepare
    }

    /// Mutable access to the `prepare` listener table.
    pub fn prepare_listeners_mut(&mut self) -> &mut ListenerTable<PrepareEvent> {
        &mut self.prepare
    }

    /// The `error` listener table.
    pub fn error_listeners(&self) -> &ListenerTable<ErrorEvent> {
        &self.error
    }

    /// Mutable access to the `error` listener table.
    pub fn error_listeners_mut(&mut self) -> &mut ListenerTable<ErrorEvent> {
        &mut self.error
    }
}
