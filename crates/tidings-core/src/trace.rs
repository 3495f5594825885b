#![forbid(unsafe_code)]

//! Dispatch tracing hook.
//!
//! Channels bracket every callback invocation with [`Tracer::begin`] and
//! [`Tracer::end`]. The tracer is injected through
//! [`ChannelConfig`](crate::config::ChannelConfig); the default is
//! [`NoopTracer`], and [`LogTracer`] forwards the hook into `tracing`.

use std::cell::{Cell, RefCell};
use std::fmt;

use web_time::Instant;

/// Opaque token linking a [`Tracer::begin`] call to its [`Tracer::end`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct TraceToken(u64);

impl TraceToken {
    /// Token for tracers that do not correlate begin and end.
    pub const NONE: Self = Self(0);

    /// Build a token from a tracer-defined value.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The tracer-defined value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TraceToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Observer of individual callback dispatches.
///
/// `begin` is called right before a callback runs, with the name of the
/// subject that owns the channel; `end` right after it returns.
pub trait Tracer {
    /// A dispatch on `subject` is about to run.
    fn begin(&self, subject: &'static str) -> TraceToken;

    /// The dispatch identified by `token` has returned.
    fn end(&self, token: TraceToken);
}

/// Tracer that does nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopTracer;

impl Tracer for NoopTracer {
    #[inline]
    fn begin(&self, _subject: &'static str) -> TraceToken {
        TraceToken::NONE
    }

    #[inline]
    fn end(&self, _token: TraceToken) {}
}

/// Tracer that emits a `tracing` event per dispatch with its duration.
#[derive(Default)]
pub struct LogTracer {
    next: Cell<u64>,
    open: RefCell<Vec<(TraceToken, &'static str, Instant)>>,
}

impl LogTracer {
    /// Create a tracer with no open dispatches.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of dispatches begun but not yet ended.
    #[must_use]
    pub fn open_count(&self) -> usize {
        self.open.borrow().len()
    }
}

impl Tracer for LogTracer {
    fn begin(&self, subject: &'static str) -> TraceToken {
        let raw = self.next.get().wrapping_add(1);
        self.next.set(raw);
        let token = TraceToken::new(raw);
        self.open.borrow_mut().push((token, subject, Instant::now()));
        tracing::trace!(subject, token = raw, "dispatch begin");
        token
    }

    fn end(&self, token: TraceToken) {
        let mut open = self.open.borrow_mut();
        let Some(pos) = open.iter().rposition(|(t, _, _)| *t == token) else {
            tracing::debug!(token = token.raw(), "dispatch end without matching begin");
            return;
        };
        let (_, subject, started) = open.remove(pos);
        let elapsed_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
        tracing::trace!(subject, token = token.raw(), elapsed_us, "dispatch end");
    }
}

impl fmt::Debug for LogTracer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogTracer")
            .field("open", &self.open_count())
            .finish()
    }
}
