#![forbid(unsafe_code)]

//! Channel configuration.
//!
//! A [`ChannelConfig`] carries the duplicate-registration policy, the name
//! the channel reports to its tracer, and the tracer itself. Subjects hand
//! one config to every channel they own.
//!
//! ```
//! use std::rc::Rc;
//! use tidings_core::config::{ChannelConfig, DuplicatePolicy};
//! use tidings_core::trace::LogTracer;
//!
//! let config = ChannelConfig::new()
//!     .duplicates(DuplicatePolicy::Reject)
//!     .named("app::Window")
//!     .tracer(Rc::new(LogTracer::new()));
//! assert_eq!(config.duplicate_policy(), DuplicatePolicy::Reject);
//! assert_eq!(config.subject(), Some("app::Window"));
//! ```

use std::fmt;
use std::rc::Rc;

use crate::trace::{NoopTracer, Tracer};

/// What `attach` does when the derived handle is already registered.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "lowercase")
)]
pub enum DuplicatePolicy {
    /// Store the duplicate; it is notified once per registration.
    #[default]
    Allow,
    /// Refuse the registration with `ChannelError::RedundantObserver`.
    Reject,
}

/// Configuration shared by the channels of one subject.
#[derive(Clone)]
pub struct ChannelConfig {
    duplicates: DuplicatePolicy,
    subject: Option<&'static str>,
    tracer: Rc<dyn Tracer>,
}

impl ChannelConfig {
    /// Allow duplicates, no subject name, no-op tracer.
    #[must_use]
    pub fn new() -> Self {
        Self {
            duplicates: DuplicatePolicy::default(),
            subject: None,
            tracer: Rc::new(NoopTracer),
        }
    }

    /// Default configuration named after the subject type `S`.
    #[must_use]
    pub fn for_subject<S: ?Sized>() -> Self {
        Self::new().named(std::any::type_name::<S>())
    }

    /// Set the duplicate-registration policy.
    #[must_use]
    pub fn duplicates(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicates = policy;
        self
    }

    /// Set the subject name reported to the tracer.
    #[must_use]
    pub fn named(mut self, subject: &'static str) -> Self {
        self.subject = Some(subject);
        self
    }

    /// Set the dispatch tracer.
    #[must_use]
    pub fn tracer(mut self, tracer: Rc<dyn Tracer>) -> Self {
        self.tracer = tracer;
        self
    }

    /// The duplicate-registration policy.
    #[must_use]
    pub fn duplicate_policy(&self) -> DuplicatePolicy {
        self.duplicates
    }

    /// The configured subject name, if any.
    #[must_use]
    pub fn subject(&self) -> Option<&'static str> {
        self.subject
    }

    /// The dispatch tracer.
    #[must_use]
    pub fn tracer_ref(&self) -> &Rc<dyn Tracer> {
        &self.tracer
    }
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ChannelConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelConfig")
            .field("duplicates", &self.duplicates)
            .field("subject", &self.subject)
            .finish_non_exhaustive()
    }
}
