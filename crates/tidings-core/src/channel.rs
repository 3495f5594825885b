#![forbid(unsafe_code)]

//! Single-signature notification channel.
//!
//! A [`Channel<A, Tag>`] stores callbacks that all accept `&A` and calls
//! every one of them on [`notify`](Channel::notify). `Tag` is a zero-size
//! marker that lets two channels with the same argument type live side by
//! side on one subject as distinct types.
//!
//! # Invariants
//!
//! 1. Entries are visited in registration order, and removal of any entry
//!    preserves the relative order of the rest.
//! 2. Every callback in one notify pass receives the same `&A`.
//! 3. A disposed weak subscriber never prevents delivery to later entries
//!    on the safe path.
//! 4. Dead entries stay in place, skipped, until
//!    [`wipe_dead_observers`](Channel::wipe_dead_observers) or a detach
//!    removes them.
//! 5. Dispatch takes `&self` and mutation takes `&mut self`, so a callback
//!    cannot attach to or detach from the channel it is running on.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | Redundant attach | Live handle exists, [`DuplicatePolicy::Reject`] | `Err(RedundantObserver)`, nothing stored |
//! | Dead subscriber | Weak target dropped | `notify` marks dead, `try_notify` returns `Err` |
//! | Unknown handle | Detach of absent handle | No-op, returns `0`/`false` |
//! | Empty channel | Notify with no entries | No-op |

use std::cell::Cell;
use std::fmt;
use std::marker::PhantomData;
use std::slice;

use crate::config::{ChannelConfig, DuplicatePolicy};
use crate::error::{ChannelError, Disposed};
use crate::handle::{Handle, Instance};
use crate::weak::{Target, WeakBinding, WeakMethod};

type Callback<A> = Box<dyn Fn(&A) -> Result<(), Disposed>>;

/// How an entry's callback is bound.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BindingKind {
    /// Free function, optionally with bound trailing arguments.
    Free,
    /// Method on a subscriber the channel co-owns.
    Member,
    /// Method on a weakly referenced subscriber.
    WeakMember,
    /// Arbitrary closure.
    Closure,
}

// ---------------------------------------------------------------------------
// Entry
// ---------------------------------------------------------------------------

/// A registered callback.
pub struct Entry<A: ?Sized> {
    handle: Handle,
    kind: BindingKind,
    dead: Cell<bool>,
    callback: Callback<A>,
}

impl<A: ?Sized> Entry<A> {
    /// The handle this entry was registered under.
    #[must_use]
    pub fn handle(&self) -> Handle {
        self.handle
    }

    /// How the callback is bound.
    #[must_use]
    pub fn kind(&self) -> BindingKind {
        self.kind
    }

    /// Whether a previous notify found the subscriber disposed.
    #[must_use]
    pub fn is_dead(&self) -> bool {
        self.dead.get()
    }
}

impl<A: ?Sized> fmt::Debug for Entry<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entry")
            .field("handle", &self.handle)
            .field("kind", &self.kind)
            .field("dead", &self.dead.get())
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Observers view
// ---------------------------------------------------------------------------

/// Read-only view over a channel's entries, in registration order.
pub struct Observers<'a, A: ?Sized> {
    entries: &'a [Entry<A>],
}

impl<'a, A: ?Sized> Observers<'a, A> {
    /// Number of entries, dead ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&'a Entry<A>> {
        self.entries.get(index)
    }

    /// Iterate entries in registration order.
    pub fn iter(&self) -> slice::Iter<'a, Entry<A>> {
        self.entries.iter()
    }

    /// Iterate handles in registration order.
    pub fn handles(&self) -> impl Iterator<Item = Handle> + 'a {
        self.entries.iter().map(Entry::handle)
    }

    /// Whether any entry carries `handle`.
    #[must_use]
    pub fn contains(&self, handle: Handle) -> bool {
        self.entries.iter().any(|e| e.handle == handle)
    }
}

impl<'a, A: ?Sized> IntoIterator for Observers<'a, A> {
    type Item = &'a Entry<A>;
    type IntoIter = slice::Iter<'a, Entry<A>>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl<A: ?Sized> fmt::Debug for Observers<'_, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.entries.iter()).finish()
    }
}

// ---------------------------------------------------------------------------
// Channel
// ---------------------------------------------------------------------------

/// Registry of callbacks accepting `&A`, discriminated by `Tag`.
///
/// ```
/// use std::cell::RefCell;
/// use std::rc::Rc;
/// use tidings_core::channel::Channel;
///
/// let seen = Rc::new(RefCell::new(Vec::new()));
/// let mut channel: Channel<str> = Channel::new();
///
/// let log = Rc::clone(&seen);
/// let handle = channel.attach_fn(move |s| log.borrow_mut().push(s.to_owned()));
///
/// channel.notify("hello");
/// channel.detach(handle);
/// channel.notify("world");
///
/// assert_eq!(*seen.borrow(), ["hello"]);
/// ```
pub struct Channel<A: ?Sized, Tag = ()> {
    entries: Vec<Entry<A>>,
    config: ChannelConfig,
    next_serial: u64,
    _tag: PhantomData<fn() -> Tag>,
}

impl<A: ?Sized + 'static, Tag> Channel<A, Tag> {
    /// Create an empty channel with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(ChannelConfig::default())
    }

    /// Create an empty channel with `config`.
    #[must_use]
    pub fn with_config(config: ChannelConfig) -> Self {
        Self {
            entries: Vec::new(),
            config,
            next_serial: 0,
            _tag: PhantomData,
        }
    }

    /// The channel's configuration.
    #[must_use]
    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    /// Name reported to the tracer: the configured subject, or this
    /// channel's own type name.
    #[must_use]
    pub fn subject_name(&self) -> &'static str {
        self.config
            .subject()
            .unwrap_or_else(std::any::type_name::<Self>)
    }

    // -- attach ---------------------------------------------------------

    /// Attach a free function.
    ///
    /// # Errors
    ///
    /// [`ChannelError::RedundantObserver`] if the function is already
    /// attached and duplicates are rejected.
    pub fn attach(&mut self, f: fn(&A)) -> Result<Handle, ChannelError> {
        self.insert(
            Handle::of_fn(f),
            BindingKind::Free,
            Box::new(move |args: &A| {
                f(args);
                Ok(())
            }),
        )
    }

    /// Attach a free function with a trailing bound argument.
    ///
    /// The bound value does not take part in the handle.
    ///
    /// # Errors
    ///
    /// [`ChannelError::RedundantObserver`] if the function is already
    /// attached and duplicates are rejected.
    pub fn attach_with<B: 'static>(
        &mut self,
        f: fn(&A, &B),
        bound: B,
    ) -> Result<Handle, ChannelError> {
        self.insert(
            Handle::of_bound_fn(f),
            BindingKind::Free,
            Box::new(move |args: &A| {
                f(args, &bound);
                Ok(())
            }),
        )
    }

    /// Attach a method bound to `target`.
    ///
    /// An `Rc<T>` target makes the channel a co-owner of the subscriber. A
    /// `Weak<T>` target creates a weak binding that is resolved on every
    /// dispatch.
    ///
    /// # Errors
    ///
    /// [`ChannelError::RedundantObserver`] if the same method on the same
    /// instance is already attached and duplicates are rejected.
    pub fn attach_member<T: 'static>(
        &mut self,
        method: fn(&T, &A),
        target: impl Into<Target<T>>,
    ) -> Result<Handle, ChannelError> {
        let target = target.into();
        let handle = Handle::of_method(method, &target);
        match target {
            Target::Shared(subscriber) => self.insert(
                handle,
                BindingKind::Member,
                Box::new(move |args: &A| {
                    method(&subscriber, args);
                    Ok(())
                }),
            ),
            Target::Weak(weak) => {
                let bound = WeakMethod::from_binding(WeakBinding::from_weak(weak), method);
                self.insert(
                    handle,
                    BindingKind::WeakMember,
                    Box::new(move |args: &A| bound.call(args)),
                )
            }
        }
    }

    /// Attach a method with a trailing bound argument.
    ///
    /// # Errors
    ///
    /// [`ChannelError::RedundantObserver`] if the same method on the same
    /// instance is already attached and duplicates are rejected.
    pub fn attach_member_with<T: 'static, B: 'static>(
        &mut self,
        method: fn(&T, &A, &B),
        target: impl Into<Target<T>>,
        bound: B,
    ) -> Result<Handle, ChannelError> {
        let target = target.into();
        let handle = Handle::of_bound_method(method, &target);
        match target {
            Target::Shared(subscriber) => self.insert(
                handle,
                BindingKind::Member,
                Box::new(move |args: &A| {
                    method(&subscriber, args, &bound);
                    Ok(())
                }),
            ),
            Target::Weak(weak) => {
                let binding = WeakBinding::from_weak(weak);
                self.insert(
                    handle,
                    BindingKind::WeakMember,
                    Box::new(move |args: &A| binding.invoke(|t| method(t, args, &bound))),
                )
            }
        }
    }

    /// Attach an arbitrary closure.
    ///
    /// Closures have no stable identity, so each gets a fresh handle and the
    /// duplicate policy never applies.
    pub fn attach_fn(&mut self, callback: impl Fn(&A) + 'static) -> Handle {
        self.next_serial = self.next_serial.wrapping_add(1);
        let handle = Handle::from_serial(self.next_serial);
        self.push(
            handle,
            BindingKind::Closure,
            Box::new(move |args: &A| {
                callback(args);
                Ok(())
            }),
        );
        handle
    }

    fn insert(
        &mut self,
        handle: Handle,
        kind: BindingKind,
        callback: Callback<A>,
    ) -> Result<Handle, ChannelError> {
        if self.config.duplicate_policy() == DuplicatePolicy::Reject
            && self.entries.iter().any(|e| e.handle == handle && !e.is_dead())
        {
            tracing::debug!(
                subject = self.subject_name(),
                %handle,
                "rejected redundant observer"
            );
            return Err(ChannelError::RedundantObserver { handle });
        }
        self.push(handle, kind, callback);
        Ok(handle)
    }

    fn push(&mut self, handle: Handle, kind: BindingKind, callback: Callback<A>) {
        self.entries.push(Entry {
            handle,
            kind,
            dead: Cell::new(false),
            callback,
        });
        tracing::trace!(
            subject = self.subject_name(),
            %handle,
            ?kind,
            observers = self.entries.len(),
            "observer attached"
        );
    }

    // -- detach ---------------------------------------------------------

    /// Remove every entry registered under `handle`; returns how many.
    ///
    /// Detaching an unknown handle is a no-op.
    pub fn detach(&mut self, handle: Handle) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| e.handle != handle);
        let removed = before - self.entries.len();
        tracing::trace!(subject = self.subject_name(), %handle, removed, "detach");
        removed
    }

    /// Remove only the earliest entry registered under `handle`.
    pub fn detach_first(&mut self, handle: Handle) -> bool {
        let Some(pos) = self.entries.iter().position(|e| e.handle == handle) else {
            return false;
        };
        self.entries.remove(pos);
        tracing::trace!(subject = self.subject_name(), %handle, "detach first");
        true
    }

    /// Remove the earliest entry regardless of handle.
    pub fn detach_front(&mut self) -> Option<Handle> {
        if self.entries.is_empty() {
            return None;
        }
        let handle = self.entries.remove(0).handle;
        tracing::trace!(subject = self.subject_name(), %handle, "detach front");
        Some(handle)
    }

    /// Remove every entry; returns how many there were.
    pub fn detach_all(&mut self) -> usize {
        let removed = self.entries.len();
        self.entries.clear();
        tracing::trace!(subject = self.subject_name(), removed, "detach all");
        removed
    }

    /// Remove entries marked dead by earlier notifies; returns how many.
    pub fn wipe_dead_observers(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| !e.is_dead());
        let wiped = before - self.entries.len();
        if wiped > 0 {
            tracing::debug!(subject = self.subject_name(), wiped, "wiped dead observers");
        }
        wiped
    }

    // -- notify ---------------------------------------------------------

    /// Call every live entry with `args`, in registration order.
    ///
    /// A weakly bound subscriber that has been dropped is marked dead and
    /// skipped; delivery continues with the next entry.
    pub fn notify(&self, args: &A) {
        let mut delivered = 0_usize;
        let mut disposed = 0_usize;
        for entry in self.entries.iter().filter(|e| !e.is_dead()) {
            match self.dispatch(entry, args) {
                Ok(()) => delivered += 1,
                Err(Disposed) => {
                    self.mark_dead(entry);
                    disposed += 1;
                }
            }
        }
        tracing::trace!(
            subject = self.subject_name(),
            delivered,
            disposed,
            "notify"
        );
    }

    /// Call every entry with `args`, stopping at the first disposed
    /// subscriber.
    ///
    /// Entries are not marked dead, and entries already marked dead are
    /// tried again, so a dead subscriber always surfaces as an error here.
    ///
    /// # Errors
    ///
    /// [`ChannelError::SubscriberDisposed`] naming the first entry whose
    /// subscriber was gone. Entries after it are not called.
    pub fn try_notify(&self, args: &A) -> Result<(), ChannelError> {
        for entry in &self.entries {
            self.dispatch(entry, args)
                .map_err(|Disposed| ChannelError::SubscriberDisposed {
                    handle: entry.handle,
                })?;
        }
        Ok(())
    }

    /// Call only the first live entry. Returns whether a callback ran.
    ///
    /// If that entry's subscriber turns out to be disposed it is marked dead
    /// and nothing else is called.
    pub fn notify_one(&self, args: &A) -> bool {
        let Some(entry) = self.entries.iter().find(|e| !e.is_dead()) else {
            return false;
        };
        match self.dispatch(entry, args) {
            Ok(()) => true,
            Err(Disposed) => {
                self.mark_dead(entry);
                false
            }
        }
    }

    fn dispatch(&self, entry: &Entry<A>, args: &A) -> Result<(), Disposed> {
        let tracer = self.config.tracer_ref();
        let token = tracer.begin(self.subject_name());
        let outcome = (entry.callback)(args);
        tracer.end(token);
        tracing::trace!(
            subject = self.subject_name(),
            handle = %entry.handle,
            kind = ?entry.kind,
            token = token.raw(),
            disposed = outcome.is_err(),
            "observer dispatched"
        );
        outcome
    }

    fn mark_dead(&self, entry: &Entry<A>) {
        entry.dead.set(true);
        tracing::debug!(
            subject = self.subject_name(),
            handle = %entry.handle,
            "subscriber disposed, entry marked dead"
        );
    }

    // -- introspection --------------------------------------------------

    /// Read-only view of the entries.
    #[must_use]
    pub fn observers(&self) -> Observers<'_, A> {
        Observers {
            entries: &self.entries,
        }
    }

    /// Number of entries, dead ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the channel has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries marked dead and not yet wiped.
    #[must_use]
    pub fn dead_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_dead()).count()
    }

    /// Whether any entry carries `handle`.
    #[must_use]
    pub fn contains(&self, handle: Handle) -> bool {
        self.observers().contains(handle)
    }
}

impl<Tag> Channel<(), Tag> {
    /// Attach a free function taking no arguments.
    ///
    /// # Errors
    ///
    /// [`ChannelError::RedundantObserver`] if the function is already
    /// attached and duplicates are rejected.
    pub fn attach_unit(&mut self, f: fn()) -> Result<Handle, ChannelError> {
        self.insert(
            Handle::free(f as usize),
            BindingKind::Free,
            Box::new(move |_: &()| {
                f();
                Ok(())
            }),
        )
    }

    /// Attach a method taking no arguments.
    ///
    /// # Errors
    ///
    /// [`ChannelError::RedundantObserver`] if the same method on the same
    /// instance is already attached and duplicates are rejected.
    pub fn attach_member_unit<T: 'static>(
        &mut self,
        method: fn(&T),
        target: impl Into<Target<T>>,
    ) -> Result<Handle, ChannelError> {
        let target = target.into();
        let handle = Handle::member(method as usize, target.instance_addr());
        match target {
            Target::Shared(subscriber) => self.insert(
                handle,
                BindingKind::Member,
                Box::new(move |_: &()| {
                    method(&subscriber);
                    Ok(())
                }),
            ),
            Target::Weak(weak) => {
                let binding = WeakBinding::from_weak(weak);
                self.insert(
                    handle,
                    BindingKind::WeakMember,
                    Box::new(move |_: &()| binding.invoke(method)),
                )
            }
        }
    }

    /// Notify without arguments.
    pub fn fire(&self) {
        self.notify(&());
    }

    /// Strict notify without arguments.
    ///
    /// # Errors
    ///
    /// See [`try_notify`](Self::try_notify).
    pub fn try_fire(&self) -> Result<(), ChannelError> {
        self.try_notify(&())
    }
}

impl<A: ?Sized + 'static, Tag> Default for Channel<A, Tag> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: ?Sized + 'static, Tag> fmt::Debug for Channel<A, Tag> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("subject", &self.subject_name())
            .field("observers", &self.entries.len())
            .field("dead", &self.dead_count())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
