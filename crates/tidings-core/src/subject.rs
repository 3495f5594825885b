#![forbid(unsafe_code)]

//! Subjects: several independently typed channels on one value.
//!
//! The [`subject!`](crate::subject!) macro turns a struct declaration whose
//! fields are channels into a subject. Each channel stays a named field, and
//! the struct additionally implements [`HasChannel<A, Tag>`] once per field
//! so generic code can reach a channel by its `(argument, tag)` identity.
//!
//! ```
//! use std::cell::Cell;
//! use std::rc::Rc;
//! use tidings_core::subject::Subject;
//!
//! pub enum Meta {}
//!
//! tidings_core::subject! {
//!     pub struct Document {
//!         pub meta: Channel<str, Meta>,
//!         pub named: Channel<str>,
//!         pub closed: Channel<()>,
//!     }
//! }
//!
//! let hits = Rc::new(Cell::new(0));
//! let mut doc = Document::new();
//! let h = Rc::clone(&hits);
//! doc.meta.attach_fn(move |_| h.set(h.get() + 1));
//!
//! doc.meta.notify("title");
//! doc.named.notify("ignored by meta observers");
//! doc.on::<str, Meta>().notify("via tag");
//! assert_eq!(hits.get(), 2);
//! assert_eq!(doc.observer_count(), 1);
//! ```
//!
//! # Invariants
//!
//! 1. Channels never share entries: notifying or detaching on one field has
//!    no effect on any other.
//! 2. Two fields with the same `(A, Tag)` pair are rejected at compile time
//!    (conflicting `HasChannel` impls).
//! 3. Every channel of a subject shares one [`ChannelConfig`], so they
//!    report the same subject name to the same tracer.
//!
//! # Extension
//!
//! A subject can be extended by wrapping it and implementing `Deref` and
//! `DerefMut` to the base. The base channels stay reachable as fields and
//! through [`Subject::on`]. Build the base with
//! `ChannelConfig::for_subject::<Wrapper>()` so the wrapper's own type name
//! is reported to the tracer.
//!
//! [`ChannelConfig`]: crate::config::ChannelConfig

use crate::channel::Channel;

/// Static access to the channel with argument type `A` and tag `Tag`.
pub trait HasChannel<A: ?Sized, Tag = ()> {
    /// Shared access, for notifying and introspection.
    fn channel(&self) -> &Channel<A, Tag>;

    /// Exclusive access, for attaching and detaching.
    fn channel_mut(&mut self) -> &mut Channel<A, Tag>;
}

/// Operations over every channel of a subject.
pub trait Subject {
    /// Name reported to the tracer.
    fn subject_name(&self) -> &'static str;

    /// Number of channels declared on the subject.
    fn channel_count(&self) -> usize;

    /// Total entries across all channels, dead ones included.
    fn observer_count(&self) -> usize;

    /// Wipe dead entries on every channel; returns how many were removed.
    fn wipe_dead_observers(&mut self) -> usize;

    /// Detach everything from every channel; returns how many were removed.
    fn detach_all(&mut self) -> usize;

    /// The channel identified by `(A, Tag)`.
    fn on<A: ?Sized, Tag>(&self) -> &Channel<A, Tag>
    where
        Self: HasChannel<A, Tag> + Sized,
    {
        HasChannel::<A, Tag>::channel(self)
    }

    /// The channel identified by `(A, Tag)`, mutably.
    fn on_mut<A: ?Sized, Tag>(&mut self) -> &mut Channel<A, Tag>
    where
        Self: HasChannel<A, Tag> + Sized,
    {
        HasChannel::<A, Tag>::channel_mut(self)
    }
}

#[doc(hidden)]
#[macro_export]
macro_rules! __subject_tag {
    () => {
        ()
    };
    ($tag:ty) => {
        $tag
    };
}

/// Declare a subject struct whose fields are channels.
///
/// Each field must be written as `name: Channel<A>` or
/// `name: Channel<A, Tag>`. The macro generates `new`, `with_tracer`,
/// `with_config`, `Default`, `Debug`, [`Subject`] and one [`HasChannel`]
/// impl per field.
///
/// [`Subject`]: crate::subject::Subject
/// [`HasChannel`]: crate::subject::HasChannel
#[macro_export]
macro_rules! subject {
    (
        $(#[$attr:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[$fattr:meta])*
                $fvis:vis $field:ident : Channel<$args:ty $(, $tag:ty)?>
            ),+ $(,)?
        }
    ) => {
        $(#[$attr])*
        $vis struct $name {
            $(
                $(#[$fattr])*
                $fvis $field: $crate::channel::Channel<$args, $crate::__subject_tag!($($tag)?)>,
            )+
            __tidings_subject: &'static str,
        }

        #[allow(dead_code)]
        impl $name {
            /// Create the subject with every channel empty.
            #[must_use]
            $vis fn new() -> Self {
                Self::with_config($crate::config::ChannelConfig::new())
            }

            /// Create the subject with a dispatch tracer.
            #[must_use]
            $vis fn with_tracer(tracer: ::std::rc::Rc<dyn $crate::trace::Tracer>) -> Self {
                Self::with_config($crate::config::ChannelConfig::new().tracer(tracer))
            }

            /// Create the subject with `config` shared by every channel.
            ///
            /// Without an explicit subject name the struct's type name is used.
            #[must_use]
            $vis fn with_config(config: $crate::config::ChannelConfig) -> Self {
                let subject = config
                    .subject()
                    .unwrap_or_else(::std::any::type_name::<Self>);
                let config = config.named(subject);
                Self {
                    $( $field: $crate::channel::Channel::with_config(config.clone()), )+
                    __tidings_subject: subject,
                }
            }
        }

        impl ::std::default::Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl ::std::fmt::Debug for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.debug_struct(::std::stringify!($name))
                    $( .field(::std::stringify!($field), &self.$field) )+
                    .finish()
            }
        }

        impl $crate::subject::Subject for $name {
            fn subject_name(&self) -> &'static str {
                self.__tidings_subject
            }

            fn channel_count(&self) -> usize {
                <[&str]>::len(&[ $( ::std::stringify!($field) ),+ ])
            }

            fn observer_count(&self) -> usize {
                0 $( + self.$field.len() )+
            }

            fn wipe_dead_observers(&mut self) -> usize {
                0 $( + self.$field.wipe_dead_observers() )+
            }

            fn detach_all(&mut self) -> usize {
                0 $( + self.$field.detach_all() )+
            }
        }

        $(
            impl $crate::subject::HasChannel<$args, $crate::__subject_tag!($($tag)?)> for $name {
                fn channel(&self) -> &$crate::channel::Channel<$args, $crate::__subject_tag!($($tag)?)> {
                    &self.$field
                }

                fn channel_mut(
                    &mut self,
                ) -> &mut $crate::channel::Channel<$args, $crate::__subject_tag!($($tag)?)> {
                    &mut self.$field
                }
            }
        )+
    };
}
