#![forbid(unsafe_code)]

//! Test harness for tidings.
//!
//! - [`CallLog`]: shared, ordered record of callback invocations.
//! - [`Probe`]: subscriber type whose methods write to a [`CallLog`].
//! - [`RecordingTracer`]: [`Tracer`] that keeps every begin/end event.
//! - [`model`]: operation language, proptest strategies, and a reference
//!   model that a real channel is checked against.

pub mod model;

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use tidings_core::trace::{TraceToken, Tracer};

// ---------------------------------------------------------------------------
// CallLog
// ---------------------------------------------------------------------------

/// Shared, ordered log of invocations.
///
/// Cloning shares the same backing buffer, so a clone can be moved into a
/// callback while the test keeps another to inspect.
#[derive(Clone, Default)]
pub struct CallLog {
    calls: Rc<RefCell<Vec<String>>>,
}

impl CallLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one call.
    pub fn push(&self, call: impl Into<String>) {
        self.calls.borrow_mut().push(call.into());
    }

    /// Snapshot of every call recorded so far.
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    /// Drain the log and return what it held.
    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.calls.borrow_mut())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.calls.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.calls.borrow().is_empty()
    }

    /// Closure that records `label:{args}` for each call.
    pub fn recorder<A>(&self, label: &'static str) -> impl Fn(&A) + 'static + use<A>
    where
        A: fmt::Display + ?Sized + 'static,
    {
        let log = self.clone();
        move |args: &A| log.push(format!("{label}:{args}"))
    }
}

impl fmt::Debug for CallLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.calls.borrow().iter()).finish()
    }
}

// ---------------------------------------------------------------------------
// Probe
// ---------------------------------------------------------------------------

/// Subscriber whose methods record `{name}:{args}` into a [`CallLog`].
pub struct Probe {
    name: String,
    log: CallLog,
    hits: Cell<usize>,
}

impl Probe {
    #[must_use]
    pub fn new(name: impl Into<String>, log: &CallLog) -> Self {
        Self {
            name: name.into(),
            log: log.clone(),
            hits: Cell::new(0),
        }
    }

    /// Shared probe, ready to be attached by `Rc` or `Weak`.
    #[must_use]
    pub fn shared(name: impl Into<String>, log: &CallLog) -> Rc<Self> {
        Rc::new(Self::new(name, log))
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// How many times any method of this probe ran.
    #[must_use]
    pub fn hits(&self) -> usize {
        self.hits.get()
    }

    /// Method for `Channel<u32>`.
    pub fn on_value(&self, value: &u32) {
        self.record(value);
    }

    /// Method for `Channel<str>`.
    pub fn on_text(&self, text: &str) {
        self.record(text);
    }

    /// Method for `Channel<()>`.
    pub fn on_signal(&self) {
        self.record("!");
    }

    fn record(&self, args: impl fmt::Display) {
        self.hits.set(self.hits.get() + 1);
        self.log.push(format!("{}:{args}", self.name));
    }
}

impl fmt::Debug for Probe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Probe")
            .field("name", &self.name)
            .field("hits", &self.hits.get())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// RecordingTracer
// ---------------------------------------------------------------------------

/// One tracer callback, as observed by [`RecordingTracer`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TraceEvent {
    Begin {
        subject: &'static str,
        token: TraceToken,
    },
    End {
        token: TraceToken,
    },
}

/// Tracer that records every event for later assertions.
#[derive(Default)]
pub struct RecordingTracer {
    next: Cell<u64>,
    events: RefCell<Vec<TraceEvent>>,
}

impl RecordingTracer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn shared() -> Rc<Self> {
        Rc::new(Self::new())
    }

    #[must_use]
    pub fn events(&self) -> Vec<TraceEvent> {
        self.events.borrow().clone()
    }

    /// Subjects of every `begin`, in order.
    #[must_use]
    pub fn subjects(&self) -> Vec<&'static str> {
        self.events
            .borrow()
            .iter()
            .filter_map(|e| match e {
                TraceEvent::Begin { subject, .. } => Some(*subject),
                TraceEvent::End { .. } => None,
            })
            .collect()
    }

    /// Number of completed begin/end pairs.
    #[must_use]
    pub fn dispatches(&self) -> usize {
        self.events
            .borrow()
            .iter()
            .filter(|e| matches!(e, TraceEvent::End { .. }))
            .count()
    }

    /// Whether every `begin` is immediately followed by its own `end`.
    #[must_use]
    pub fn is_bracketed(&self) -> bool {
        let events = self.events.borrow();
        events.len() % 2 == 0
            && events.chunks(2).all(|pair| match pair {
                [TraceEvent::Begin { token: a, .. }, TraceEvent::End { token: b }] => a == b,
                _ => false,
            })
    }

    pub fn clear(&self) {
        self.events.borrow_mut().clear();
    }
}

impl Tracer for RecordingTracer {
    fn begin(&self, subject: &'static str) -> TraceToken {
        let raw = self.next.get() + 1;
        self.next.set(raw);
        let token = TraceToken::new(raw);
        self.events
            .borrow_mut()
            .push(TraceEvent::Begin { subject, token });
        token
    }

    fn end(&self, token: TraceToken) {
        self.events.borrow_mut().push(TraceEvent::End { token });
    }
}

impl fmt::Debug for RecordingTracer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordingTracer")
            .field("events", &self.events.borrow().len())
            .finish()
    }
}
