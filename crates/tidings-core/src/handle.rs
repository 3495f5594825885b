#![forbid(unsafe_code)]

//! Registration handles.
//!
//! A [`Handle`] identifies "this callback bound to this target" so it can be
//! detached later. It is derived from the address of the function pointer
//! and, for member callbacks, the address of the bound instance. Closures
//! have no stable identity and get a per-channel serial instead.
//!
//! # Invariants
//!
//! 1. The same `(function, instance)` pair always derives the same handle
//!    within one process run.
//! 2. A strong ([`Rc`]) and a weak ([`Weak`]) reference to the same
//!    allocation derive the same instance component.
//! 3. Extra bound arguments never participate in identity.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | Collision | Compiler merged two identical functions | Handles compare equal |
//! | Collision | Instance address reused after the original was freed | Handles compare equal |
//!
//! Handles carry no type information and are only meaningful for the
//! channel that issued them.

use std::fmt;
use std::rc::{Rc, Weak};

use crate::weak::Target;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
enum Key {
    Free { func: usize },
    Member { func: usize, instance: usize },
    Closure { serial: u64 },
}

/// Opaque, copyable identity of a registered callback.
///
/// ```
/// use tidings_core::handle::Handle;
///
/// fn on_event(_: &str) {}
///
/// assert_eq!(Handle::of_fn(on_event), Handle::of_fn(on_event));
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Handle(Key);

impl Handle {
    /// Handle of a free function.
    #[must_use]
    pub fn of_fn<A: ?Sized>(f: fn(&A)) -> Self {
        Self::free(f as usize)
    }

    /// Handle of a free function with a trailing bound argument.
    #[must_use]
    pub fn of_bound_fn<A: ?Sized, B>(f: fn(&A, &B)) -> Self {
        Self::free(f as usize)
    }

    /// Handle of a method bound to `instance`.
    #[must_use]
    pub fn of_method<T, A: ?Sized>(method: fn(&T, &A), instance: &impl Instance<T>) -> Self {
        Self::member(method as usize, instance.instance_addr())
    }

    /// Handle of a method with a trailing bound argument, bound to `instance`.
    #[must_use]
    pub fn of_bound_method<T, A: ?Sized, B>(
        method: fn(&T, &A, &B),
        instance: &impl Instance<T>,
    ) -> Self {
        Self::member(method as usize, instance.instance_addr())
    }

    pub(crate) fn free(func: usize) -> Self {
        Self(Key::Free { func })
    }

    pub(crate) fn member(func: usize, instance: usize) -> Self {
        Self(Key::Member { func, instance })
    }

    pub(crate) fn from_serial(serial: u64) -> Self {
        Self(Key::Closure { serial })
    }

    /// Whether the handle was derived from a callback bound to an instance.
    #[must_use]
    pub fn is_member(&self) -> bool {
        matches!(self.0, Key::Member { .. })
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Key::Free { func } => write!(f, "fn@{func:#x}"),
            Key::Member { func, instance } => write!(f, "member@{func:#x}/{instance:#x}"),
            Key::Closure { serial } => write!(f, "closure#{serial}"),
        }
    }
}

/// A reference whose pointee address identifies a subscriber instance.
pub trait Instance<T> {
    /// Address of the referenced allocation.
    fn instance_addr(&self) -> usize;
}

impl<T> Instance<T> for Rc<T> {
    fn instance_addr(&self) -> usize {
        Rc::as_ptr(self).cast::<()>().addr()
    }
}

impl<T> Instance<T> for Weak<T> {
    fn instance_addr(&self) -> usize {
        Weak::as_ptr(self).cast::<()>().addr()
    }
}

impl<T> Instance<T> for Target<T> {
    fn instance_addr(&self) -> usize {
        match self {
            Target::Shared(rc) => rc.instance_addr(),
            Target::Weak(weak) => weak.instance_addr(),
        }
    }
}
