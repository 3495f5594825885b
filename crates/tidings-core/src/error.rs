#![forbid(unsafe_code)]

//! Error types for channel registration and dispatch.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | Redundant observer | Handle already attached under [`DuplicatePolicy::Reject`] | `attach*` returns [`ChannelError::RedundantObserver`], nothing stored |
//! | Subscriber disposed (safe path) | Weak target dropped | Entry marked dead, delivery continues |
//! | Subscriber disposed (strict path) | Weak target dropped | `try_notify` returns [`ChannelError::SubscriberDisposed`] |
//! | Unknown handle | `detach` of an absent handle | No-op |
//!
//! [`DuplicatePolicy::Reject`]: crate::config::DuplicatePolicy::Reject

use std::fmt;

use crate::handle::Handle;

/// A weakly bound subscriber could not be resolved at call time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Disposed;

impl fmt::Display for Disposed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("subscriber disposed")
    }
}

impl std::error::Error for Disposed {}

/// Errors from channel operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelError {
    /// The derived handle is already registered and duplicates are rejected.
    RedundantObserver { handle: Handle },
    /// A weakly bound subscriber was gone during a strict dispatch.
    SubscriberDisposed { handle: Handle },
}

impl ChannelError {
    /// The handle the error refers to.
    #[must_use]
    pub const fn handle(&self) -> Handle {
        match self {
            Self::RedundantObserver { handle } | Self::SubscriberDisposed { handle } => *handle,
        }
    }
}

impl fmt::Display for ChannelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RedundantObserver { handle } => {
                write!(f, "observer {handle} is already attached")
            }
            Self::SubscriberDisposed { handle } => {
                write!(f, "subscriber behind observer {handle} was disposed")
            }
        }
    }
}

impl std::error::Error for ChannelError {}
