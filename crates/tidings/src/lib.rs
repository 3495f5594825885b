#![forbid(unsafe_code)]

//! Typed in-process publish/subscribe.
//!
//! A *subject* owns several *channels*; each channel stores callbacks that
//! accept one argument type and calls them in registration order. Callbacks
//! can be free functions, methods on a shared subscriber, methods on a
//! weakly referenced subscriber, or closures.
//!
//! # Quick Start
//!
//! ```
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use tidings::prelude::*;
//!
//! struct Screen {
//!     lines: RefCell<Vec<String>>,
//! }
//!
//! impl Screen {
//!     fn on_status(&self, text: &str) {
//!         self.lines.borrow_mut().push(text.to_owned());
//!     }
//! }
//!
//! tidings::subject! {
//!     pub struct Player {
//!         pub status: Channel<str>,
//!         pub stopped: Channel<()>,
//!     }
//! }
//!
//! let screen = Rc::new(Screen { lines: RefCell::new(Vec::new()) });
//! let mut player = Player::new();
//! player
//!     .status
//!     .attach_member(Screen::on_status, Rc::downgrade(&screen))
//!     .unwrap();
//!
//! player.status.notify("playing");
//! drop(screen);
//! player.status.notify("paused");
//! assert_eq!(player.status.dead_count(), 1);
//! assert_eq!(player.wipe_dead_observers(), 1);
//! ```
//!
//! # Crates
//!
//! - `tidings-core`: every type re-exported here.
//! - `tidings-harness`: recorders and a reference model for tests.

// `subject` brings in both the module and the `subject!` macro.
pub use tidings_core::{channel, config, error, handle, subject, trace, weak};

pub use tidings_core::{
    BindingKind, Channel, ChannelConfig, ChannelError, Disposed, DuplicatePolicy, Entry,
    HasChannel, Handle, Instance, LogTracer, NoopTracer, Observers, Subject, Target, TraceToken,
    Tracer, WeakBinding, WeakMethod,
};

/// Everything needed to declare subjects and attach to channels.
pub mod prelude {
    pub use tidings_core::channel::{Channel, Observers};
    pub use tidings_core::config::{ChannelConfig, DuplicatePolicy};
    pub use tidings_core::error::{ChannelError, Disposed};
    pub use tidings_core::handle::Handle;
    pub use tidings_core::subject::{HasChannel, Subject};
    pub use tidings_core::trace::{LogTracer, Tracer};
    pub use tidings_core::weak::{Target, WeakBinding, WeakMethod};
}
