#![forbid(unsafe_code)]

//! Weak bindings: callbacks that re-resolve their subscriber on every call.
//!
//! A [`WeakBinding<T>`] holds a [`Weak<T>`] and upgrades it each time it is
//! invoked. If the subscriber has been dropped the call reports
//! [`Disposed`] instead of touching freed state. The channel's safe
//! dispatch path turns that outcome into dead-entry bookkeeping.
//!
//! # Invariants
//!
//! 1. Resolution happens per call, never once at bind time.
//! 2. The upgraded [`Rc`] lives only for the duration of one call.
//! 3. A binding never keeps its subscriber alive between calls.

use std::fmt;
use std::rc::{Rc, Weak};

use crate::error::Disposed;

// ---------------------------------------------------------------------------
// Target<T>
// ---------------------------------------------------------------------------

/// How a member callback refers to its subscriber.
///
/// `Shared` makes the channel a co-owner of the subscriber. `Weak` leaves
/// ownership with the caller and turns the callback into a weak binding.
pub enum Target<T> {
    /// Strong reference; the subscriber lives at least as long as the entry.
    Shared(Rc<T>),
    /// Non-owning reference, resolved on every call.
    Weak(Weak<T>),
}

impl<T> Target<T> {
    /// Whether the target is a weak reference.
    #[must_use]
    pub fn is_weak(&self) -> bool {
        matches!(self, Self::Weak(_))
    }
}

impl<T> From<Rc<T>> for Target<T> {
    fn from(rc: Rc<T>) -> Self {
        Self::Shared(rc)
    }
}

impl<T> From<Weak<T>> for Target<T> {
    fn from(weak: Weak<T>) -> Self {
        Self::Weak(weak)
    }
}

impl<T> Clone for Target<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Shared(rc) => Self::Shared(Rc::clone(rc)),
            Self::Weak(weak) => Self::Weak(Weak::clone(weak)),
        }
    }
}

impl<T> fmt::Debug for Target<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Shared(rc) => f
                .debug_tuple("Shared")
                .field(&Rc::strong_count(rc))
                .finish(),
            Self::Weak(weak) => f.debug_tuple("Weak").field(&weak.strong_count()).finish(),
        }
    }
}

// ---------------------------------------------------------------------------
// WeakBinding<T>
// ---------------------------------------------------------------------------

/// Non-owning reference to a subscriber that is resolved on each use.
pub struct WeakBinding<T> {
    target: Weak<T>,
}

impl<T> WeakBinding<T> {
    /// Bind weakly to an existing subscriber.
    #[must_use]
    pub fn new(target: &Rc<T>) -> Self {
        Self {
            target: Rc::downgrade(target),
        }
    }

    /// Wrap an existing weak reference.
    #[must_use]
    pub fn from_weak(target: Weak<T>) -> Self {
        Self { target }
    }

    /// Upgrade to a strong reference for the duration of a call.
    ///
    /// # Errors
    ///
    /// Returns [`Disposed`] if the subscriber has been dropped.
    pub fn try_resolve(&self) -> Result<Rc<T>, Disposed> {
        self.target.upgrade().ok_or(Disposed)
    }

    /// Run `f` against the live subscriber.
    ///
    /// # Errors
    ///
    /// Returns [`Disposed`] without calling `f` if the subscriber is gone.
    pub fn invoke<R>(&self, f: impl FnOnce(&T) -> R) -> Result<R, Disposed> {
        let strong = self.try_resolve()?;
        Ok(f(&strong))
    }

    /// Whether the subscriber is still alive.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.target.strong_count() > 0
    }
}

impl<T> Clone for WeakBinding<T> {
    fn clone(&self) -> Self {
        Self {
            target: Weak::clone(&self.target),
        }
    }
}

impl<T> fmt::Debug for WeakBinding<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakBinding")
            .field("alive", &self.is_alive())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// WeakMethod<T, A, R>
// ---------------------------------------------------------------------------

/// A method pointer bound to a weakly referenced subscriber.
///
/// ```
/// use std::cell::Cell;
/// use std::rc::Rc;
/// use tidings_core::weak::WeakMethod;
///
/// struct Counter(Cell<u32>);
///
/// impl Counter {
///     fn add(&self, n: &u32) -> u32 {
///         self.0.set(self.0.get() + n);
///         self.0.get()
///     }
/// }
///
/// let counter = Rc::new(Counter(Cell::new(0)));
/// let bound = WeakMethod::new(&counter, Counter::add);
/// assert_eq!(bound.call(&2), Ok(2));
///
/// drop(counter);
/// assert!(bound.call(&2).is_err());
/// ```
pub struct WeakMethod<T, A: ?Sized, R = ()> {
    binding: WeakBinding<T>,
    method: fn(&T, &A) -> R,
}

impl<T, A: ?Sized, R> WeakMethod<T, A, R> {
    /// Bind `method` weakly to `target`.
    #[must_use]
    pub fn new(target: &Rc<T>, method: fn(&T, &A) -> R) -> Self {
        Self::from_binding(WeakBinding::new(target), method)
    }

    /// Bind `method` to an existing weak binding.
    #[must_use]
    pub fn from_binding(binding: WeakBinding<T>, method: fn(&T, &A) -> R) -> Self {
        Self { binding, method }
    }

    /// Resolve the subscriber and call the method on it.
    ///
    /// # Errors
    ///
    /// Returns [`Disposed`] if the subscriber has been dropped.
    pub fn call(&self, args: &A) -> Result<R, Disposed> {
        self.binding.invoke(|target| (self.method)(target, args))
    }

    /// The underlying binding.
    #[must_use]
    pub fn binding(&self) -> &WeakBinding<T> {
        &self.binding
    }
}

impl<T, A: ?Sized, R> fmt::Debug for WeakMethod<T, A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakMethod")
            .field("alive", &self.binding.is_alive())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};

    #[derive(Default)]
    struct Recorder {
        calls: Cell<u32>,
        last: RefCell<String>,
    }

    impl Recorder {
        fn on_text(&self, text: &str) {
            self.calls.set(self.calls.get() + 1);
            *self.last.borrow_mut() = text.to_owned();
        }

        fn total(&self, n: &(u32, u32)) -> u32 {
            n.0 + n.1
        }
    }

    #[test]
    fn resolves_while_alive() {
        let rec = Rc::new(Recorder::default());
        let binding = WeakBinding::new(&rec);
        assert!(binding.is_alive());
        assert!(binding.try_resolve().is_ok());
        assert_eq!(binding.invoke(|r| r.calls.get()), Ok(0));
    }

    #[test]
    fn reports_disposed_after_drop() {
        let rec = Rc::new(Recorder::default());
        let binding = WeakBinding::new(&rec);
        drop(rec);
        assert!(!binding.is_alive());
        assert_eq!(binding.try_resolve().err(), Some(Disposed));

        let mut ran = false;
        let outcome = binding.invoke(|_| ran = true);
        assert_eq!(outcome, Err(Disposed));
        assert!(!ran, "closure must not run on a disposed subscriber");
    }

    #[test]
    fn binding_does_not_keep_subscriber_alive() {
        let rec = Rc::new(Recorder::default());
        let _binding = WeakBinding::new(&rec);
        assert_eq!(Rc::strong_count(&rec), 1);
        assert_eq!(Rc::weak_count(&rec), 1);
    }

    #[test]
    fn resolution_is_per_call() {
        let rec = Rc::new(Recorder::default());
        let method = WeakMethod::new(&rec, Recorder::on_text);

        assert_eq!(method.call("first"), Ok(()));
        assert_eq!(rec.calls.get(), 1);
        assert_eq!(*rec.last.borrow(), "first");
        // The temporary strong reference is released after the call.
        assert_eq!(Rc::strong_count(&rec), 1);

        drop(rec);
        assert_eq!(method.call("second"), Err(Disposed));
    }

    #[test]
    fn method_returns_value() {
        let rec = Rc::new(Recorder::default());
        let method = WeakMethod::new(&rec, Recorder::total);
        assert_eq!(method.call(&(2, 3)), Ok(5));
    }

    #[test]
    fn target_conversions() {
        let rec = Rc::new(Recorder::default());
        let shared: Target<Recorder> = Rc::clone(&rec).into();
        let weak: Target<Recorder> = Rc::downgrade(&rec).into();
        assert!(!shared.is_weak());
        assert!(weak.is_weak());
        assert_eq!(Rc::strong_count(&rec), 2);
        assert!(format!("{weak:?}").starts_with("Weak"));
    }

    #[test]
    fn debug_reports_liveness() {
        let rec = Rc::new(Recorder::default());
        let binding = WeakBinding::new(&rec);
        assert!(format!("{binding:?}").contains("alive: true"));
        drop(rec);
        assert!(format!("{binding:?}").contains("alive: false"));
    }
}
