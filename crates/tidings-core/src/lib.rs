#![forbid(unsafe_code)]

//! Core primitives for tidings: typed in-process publish/subscribe.
//!
//! - [`Handle`]: copyable identity of a registered callback, derived from
//!   function and instance addresses.
//! - [`Channel`]: ordered registry of callbacks sharing one argument type,
//!   with safe and strict dispatch.
//! - [`WeakBinding`] / [`WeakMethod`]: callbacks that re-resolve a weakly
//!   held subscriber on every call.
//! - [`subject!`]: declares a struct carrying several independently typed
//!   channels, addressable by `(argument, tag)` through [`HasChannel`].
//! - [`Tracer`]: hook bracketing every dispatch, injected per subject.
//!
//! # Architecture
//!
//! Everything is single-threaded. Subscribers are shared with `Rc` or
//! referenced with `Weak`; a `Weak` target is upgraded once per call and
//! an entry whose target is gone is marked dead rather than removed, so
//! dispatch only ever needs `&self`.

pub mod channel;
pub mod config;
pub mod error;
pub mod handle;
pub mod subject;
pub mod trace;
pub mod weak;

pub use channel::{BindingKind, Channel, Entry, Observers};
pub use config::{ChannelConfig, DuplicatePolicy};
pub use error::{ChannelError, Disposed};
pub use handle::{Handle, Instance};
pub use subject::{HasChannel, Subject};
pub use trace::{LogTracer, NoopTracer, TraceToken, Tracer};
pub use weak::{Target, WeakBinding, WeakMethod};
