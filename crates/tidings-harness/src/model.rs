#![forbid(unsafe_code)]

//! Reference model for `Channel<u32>`.
//!
//! A [`Scenario`] drives a real channel and a plain-data [`Model`] with the
//! same [`ChannelOp`] sequence and compares, after every step, the returned
//! values, the callbacks that ran (in order), and the resulting entry list.
//!
//! Subscribers live in a fixed set of slots. The scenario holds a `Weak` to
//! every slot for the whole run so a freed probe's address is never handed
//! to a later allocation while handles derived from it are still in use.

use std::fmt;
use std::rc::{Rc, Weak};

use proptest::prelude::*;
use tidings_core::channel::Channel;
use tidings_core::config::{ChannelConfig, DuplicatePolicy};
use tidings_core::error::ChannelError;
use tidings_core::handle::Handle;

use crate::{CallLog, Probe};

/// Number of subscriber slots.
pub const SLOTS: usize = 3;

/// Number of distinct free functions.
pub const FREE_FNS: usize = 2;

fn free_first(value: &u32, log: &CallLog) {
    log.push(format!("free0:{value}"));
}

fn free_second(value: &u32, log: &CallLog) {
    log.push(format!("free1:{value}"));
}

const FREE: [fn(&u32, &CallLog); FREE_FNS] = [free_first, free_second];

// ---------------------------------------------------------------------------
// Operation language
// ---------------------------------------------------------------------------

/// One step applied to both the channel and the model.
///
/// Slot and index arguments are reduced modulo the available range.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
pub enum ChannelOp {
    AttachFree(u8),
    AttachShared(u8),
    AttachWeak(u8),
    AttachClosure,
    DetachFree(u8),
    DetachMember(u8),
    DetachFirstMember(u8),
    DetachClosure(u8),
    DetachFront,
    DetachAll,
    /// Drop the scenario's own strong reference to a slot.
    Release(u8),
    Notify(u32),
    TryNotify(u32),
    NotifyOne(u32),
    Wipe,
}

/// Strategy for a single operation, weighted toward attach and notify.
pub fn channel_op() -> impl Strategy<Value = ChannelOp> {
    let slot = 0..SLOTS as u8;
    let value = 0..100_u32;
    prop_oneof![
        3 => (0..FREE_FNS as u8).prop_map(ChannelOp::AttachFree),
        3 => slot.clone().prop_map(ChannelOp::AttachShared),
        4 => slot.clone().prop_map(ChannelOp::AttachWeak),
        2 => Just(ChannelOp::AttachClosure),
        1 => (0..FREE_FNS as u8).prop_map(ChannelOp::DetachFree),
        2 => slot.clone().prop_map(ChannelOp::DetachMember),
        1 => slot.clone().prop_map(ChannelOp::DetachFirstMember),
        1 => any::<u8>().prop_map(ChannelOp::DetachClosure),
        1 => Just(ChannelOp::DetachFront),
        1 => Just(ChannelOp::DetachAll),
        2 => slot.prop_map(ChannelOp::Release),
        4 => value.clone().prop_map(ChannelOp::Notify),
        1 => value.clone().prop_map(ChannelOp::TryNotify),
        1 => value.prop_map(ChannelOp::NotifyOne),
        1 => Just(ChannelOp::Wipe),
    ]
}

/// Strategy for an operation sequence of up to `max_len` steps.
pub fn channel_ops(max_len: usize) -> impl Strategy<Value = Vec<ChannelOp>> {
    proptest::collection::vec(channel_op(), 0..max_len)
}

// ---------------------------------------------------------------------------
// Outcome / Divergence
// ---------------------------------------------------------------------------

/// Observable result of one step. Handles and errors are compared through
/// their `Display` form.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    Skipped,
    Released,
    Attached(Result<String, String>),
    Removed(usize),
    RemovedOne(bool),
    Front(Option<String>),
    Notified(Vec<String>),
    TryNotified(Vec<String>, Result<(), String>),
    NotifiedOne(Vec<String>, bool),
    /// Entry list as `(handle, dead)` pairs.
    Shape(Vec<(String, bool)>),
}

/// The channel and the model disagreed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Divergence {
    pub step: usize,
    pub op: ChannelOp,
    pub expected: Outcome,
    pub actual: Outcome,
}

impl fmt::Display for Divergence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "step {} ({:?}): expected {:?}, got {:?}",
            self.step, self.op, self.expected, self.actual
        )
    }
}

impl std::error::Error for Divergence {}

// ---------------------------------------------------------------------------
// Model
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Key {
    Free(usize),
    Member(usize),
    Closure(u64),
}

#[derive(Clone, Copy, Debug)]
struct ModelEntry {
    key: Key,
    shared: bool,
    dead: bool,
}

/// Plain-data description of what a channel should contain.
#[derive(Debug)]
pub struct Model {
    entries: Vec<ModelEntry>,
    held: [bool; SLOTS],
    policy: DuplicatePolicy,
    next_serial: u64,
    free_handles: Vec<Handle>,
    member_handles: Vec<Handle>,
}

impl Model {
    fn new(
        policy: DuplicatePolicy,
        free_handles: Vec<Handle>,
        member_handles: Vec<Handle>,
    ) -> Self {
        Self {
            entries: Vec::new(),
            held: [true; SLOTS],
            policy,
            next_serial: 0,
            free_handles,
            member_handles,
        }
    }

    fn handle(&self, key: Key) -> String {
        match key {
            Key::Free(i) => self.free_handles[i].to_string(),
            Key::Member(slot) => self.member_handles[slot].to_string(),
            Key::Closure(serial) => format!("closure#{serial}"),
        }
    }

    fn label(key: Key, value: u32) -> String {
        match key {
            Key::Free(i) => format!("free{i}:{value}"),
            Key::Member(slot) => format!("probe{slot}:{value}"),
            Key::Closure(serial) => format!("closure{serial}:{value}"),
        }
    }

    /// A slot's probe is alive while the scenario or a shared entry holds it.
    fn alive(&self, slot: usize) -> bool {
        self.held[slot]
            || self
                .entries
                .iter()
                .any(|e| e.shared && e.key == Key::Member(slot))
    }

    fn resolves(&self, entry: &ModelEntry) -> bool {
        match entry.key {
            Key::Member(slot) if !entry.shared => self.alive(slot),
            _ => true,
        }
    }

    fn attach(&mut self, key: Key, shared: bool) -> Outcome {
        let redundant = self.policy == DuplicatePolicy::Reject
            && self.entries.iter().any(|e| e.key == key && !e.dead);
        let handle = match key {
            Key::Free(i) => Some(self.free_handles[i]),
            Key::Member(slot) => Some(self.member_handles[slot]),
            Key::Closure(_) => None,
        };
        if let (true, Some(handle)) = (redundant, handle) {
            return Outcome::Attached(Err(ChannelError::RedundantObserver { handle }.to_string()));
        }
        self.entries.push(ModelEntry {
            key,
            shared,
            dead: false,
        });
        Outcome::Attached(Ok(self.handle(key)))
    }

    fn detach(&mut self, key: Key) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| e.key != key);
        before - self.entries.len()
    }

    fn notify(&mut self, value: u32) -> Vec<String> {
        let mut calls = Vec::new();
        for i in 0..self.entries.len() {
            let entry = self.entries[i];
            if entry.dead {
                continue;
            }
            if self.resolves(&entry) {
                calls.push(Self::label(entry.key, value));
            } else {
                self.entries[i].dead = true;
            }
        }
        calls
    }

    fn try_notify(&self, value: u32) -> (Vec<String>, Result<(), String>) {
        let mut calls = Vec::new();
        for entry in &self.entries {
            if let Key::Member(slot) = entry.key {
                if !self.resolves(entry) {
                    let handle = self.member_handles[slot];
                    return (
                        calls,
                        Err(ChannelError::SubscriberDisposed { handle }.to_string()),
                    );
                }
            }
            calls.push(Self::label(entry.key, value));
        }
        (calls, Ok(()))
    }

    fn notify_one(&mut self, value: u32) -> (Vec<String>, bool) {
        let Some(i) = self.entries.iter().position(|e| !e.dead) else {
            return (Vec::new(), false);
        };
        let entry = self.entries[i];
        if self.resolves(&entry) {
            (vec![Self::label(entry.key, value)], true)
        } else {
            self.entries[i].dead = true;
            (Vec::new(), false)
        }
    }

    fn apply(&mut self, op: ChannelOp, closure: Option<u64>) -> Outcome {
        match op {
            ChannelOp::AttachFree(i) => self.attach(Key::Free(usize::from(i) % FREE_FNS), false),
            ChannelOp::AttachShared(s) => {
                let slot = usize::from(s) % SLOTS;
                if self.alive(slot) {
                    self.attach(Key::Member(slot), true)
                } else {
                    Outcome::Skipped
                }
            }
            ChannelOp::AttachWeak(s) => self.attach(Key::Member(usize::from(s) % SLOTS), false),
            ChannelOp::AttachClosure => {
                self.next_serial += 1;
                self.attach(Key::Closure(self.next_serial), false)
            }
            ChannelOp::DetachFree(i) => {
                Outcome::Removed(self.detach(Key::Free(usize::from(i) % FREE_FNS)))
            }
            ChannelOp::DetachMember(s) => {
                Outcome::Removed(self.detach(Key::Member(usize::from(s) % SLOTS)))
            }
            ChannelOp::DetachFirstMember(s) => {
                let key = Key::Member(usize::from(s) % SLOTS);
                match self.entries.iter().position(|e| e.key == key) {
                    Some(pos) => {
                        self.entries.remove(pos);
                        Outcome::RemovedOne(true)
                    }
                    None => Outcome::RemovedOne(false),
                }
            }
            ChannelOp::DetachClosure(_) => match closure {
                Some(serial) => Outcome::Removed(self.detach(Key::Closure(serial))),
                None => Outcome::Skipped,
            },
            ChannelOp::DetachFront => {
                if self.entries.is_empty() {
                    Outcome::Front(None)
                } else {
                    let key = self.entries.remove(0).key;
                    Outcome::Front(Some(self.handle(key)))
                }
            }
            ChannelOp::DetachAll => {
                let removed = self.entries.len();
                self.entries.clear();
                Outcome::Removed(removed)
            }
            ChannelOp::Release(s) => {
                self.held[usize::from(s) % SLOTS] = false;
                Outcome::Released
            }
            ChannelOp::Notify(v) => Outcome::Notified(self.notify(v)),
            ChannelOp::TryNotify(v) => {
                let (calls, result) = self.try_notify(v);
                Outcome::TryNotified(calls, result)
            }
            ChannelOp::NotifyOne(v) => {
                let (calls, ran) = self.notify_one(v);
                Outcome::NotifiedOne(calls, ran)
            }
            ChannelOp::Wipe => {
                let before = self.entries.len();
                self.entries.retain(|e| !e.dead);
                Outcome::Removed(before - self.entries.len())
            }
        }
    }

    fn shape(&self) -> Outcome {
        Outcome::Shape(
            self.entries
                .iter()
                .map(|e| (self.handle(e.key), e.dead))
                .collect(),
        )
    }
}

// ---------------------------------------------------------------------------
// Scenario
// ---------------------------------------------------------------------------

/// A real `Channel<u32>` paired with its [`Model`].
pub struct Scenario {
    channel: Channel<u32>,
    model: Model,
    log: CallLog,
    held: Vec<Option<Rc<Probe>>>,
    weaks: Vec<Weak<Probe>>,
    free_handles: Vec<Handle>,
    member_handles: Vec<Handle>,
    /// Closure handles with the serial the model assigned to each.
    closures: Vec<(Handle, u64)>,
    step: usize,
}

impl Scenario {
    #[must_use]
    pub fn new(policy: DuplicatePolicy) -> Self {
        let log = CallLog::new();
        let held: Vec<_> = (0..SLOTS)
            .map(|slot| Some(Probe::shared(format!("probe{slot}"), &log)))
            .collect();
        let weaks: Vec<_> = held.iter().flatten().map(Rc::downgrade).collect();
        let free_handles: Vec<_> = FREE.iter().map(|f| Handle::of_bound_fn(*f)).collect();
        let member_handles: Vec<_> = weaks
            .iter()
            .map(|w| Handle::of_method(Probe::on_value, w))
            .collect();
        Self {
            channel: Channel::with_config(
                ChannelConfig::new().duplicates(policy).named("harness::Scenario"),
            ),
            model: Model::new(policy, free_handles.clone(), member_handles.clone()),
            log,
            held,
            weaks,
            free_handles,
            member_handles,
            closures: Vec::new(),
            step: 0,
        }
    }

    /// The channel under test.
    #[must_use]
    pub fn channel(&self) -> &Channel<u32> {
        &self.channel
    }

    /// Apply `op` to both sides and compare.
    ///
    /// # Errors
    ///
    /// Returns the first [`Divergence`] between channel and model.
    pub fn apply(&mut self, op: ChannelOp) -> Result<(), Divergence> {
        self.step += 1;
        tracing::trace!(step = self.step, ?op, "scenario step");

        let closure = self.closure_for(op);
        let actual = self.apply_real(op, closure.map(|(h, _)| h));
        let expected = self.model.apply(op, closure.map(|(_, serial)| serial));
        self.check(op, expected, actual)?;

        let actual = Outcome::Shape(
            self.channel
                .observers()
                .iter()
                .map(|e| (e.handle().to_string(), e.is_dead()))
                .collect(),
        );
        self.check(op, self.model.shape(), actual)
    }

    /// Apply every op in order.
    ///
    /// # Errors
    ///
    /// Returns the first [`Divergence`] between channel and model.
    pub fn run(&mut self, ops: &[ChannelOp]) -> Result<(), Divergence> {
        ops.iter().try_for_each(|op| self.apply(*op))
    }

    fn check(&self, op: ChannelOp, expected: Outcome, actual: Outcome) -> Result<(), Divergence> {
        if expected == actual {
            Ok(())
        } else {
            Err(Divergence {
                step: self.step,
                op,
                expected,
                actual,
            })
        }
    }

    fn closure_for(&self, op: ChannelOp) -> Option<(Handle, u64)> {
        match op {
            ChannelOp::DetachClosure(i) if !self.closures.is_empty() => {
                Some(self.closures[usize::from(i) % self.closures.len()])
            }
            _ => None,
        }
    }

    fn attached(result: Result<Handle, ChannelError>) -> Outcome {
        Outcome::Attached(result.map(|h| h.to_string()).map_err(|e| e.to_string()))
    }

    fn apply_real(&mut self, op: ChannelOp, closure: Option<Handle>) -> Outcome {
        match op {
            ChannelOp::AttachFree(i) => {
                let f = FREE[usize::from(i) % FREE_FNS];
                Self::attached(self.channel.attach_with(f, self.log.clone()))
            }
            ChannelOp::AttachShared(s) => match self.weaks[usize::from(s) % SLOTS].upgrade() {
                Some(probe) => Self::attached(self.channel.attach_member(Probe::on_value, probe)),
                None => Outcome::Skipped,
            },
            ChannelOp::AttachWeak(s) => {
                let weak = Weak::clone(&self.weaks[usize::from(s) % SLOTS]);
                Self::attached(self.channel.attach_member(Probe::on_value, weak))
            }
            ChannelOp::AttachClosure => {
                let serial = self.model.next_serial + 1;
                let log = self.log.clone();
                let handle = self
                    .channel
                    .attach_fn(move |v: &u32| log.push(format!("closure{serial}:{v}")));
                self.closures.push((handle, serial));
                Outcome::Attached(Ok(handle.to_string()))
            }
            ChannelOp::DetachFree(i) => Outcome::Removed(
                self.channel
                    .detach(self.free_handles[usize::from(i) % FREE_FNS]),
            ),
            ChannelOp::DetachMember(s) => Outcome::Removed(
                self.channel
                    .detach(self.member_handles[usize::from(s) % SLOTS]),
            ),
            ChannelOp::DetachFirstMember(s) => Outcome::RemovedOne(
                self.channel
                    .detach_first(self.member_handles[usize::from(s) % SLOTS]),
            ),
            ChannelOp::DetachClosure(_) => match closure {
                Some(handle) => Outcome::Removed(self.channel.detach(handle)),
                None => Outcome::Skipped,
            },
            ChannelOp::DetachFront => {
                Outcome::Front(self.channel.detach_front().map(|h| h.to_string()))
            }
            ChannelOp::DetachAll => Outcome::Removed(self.channel.detach_all()),
            ChannelOp::Release(s) => {
                self.held[usize::from(s) % SLOTS] = None;
                Outcome::Released
            }
            ChannelOp::Notify(v) => {
                self.channel.notify(&v);
                Outcome::Notified(self.log.take())
            }
            ChannelOp::TryNotify(v) => {
                let result = self.channel.try_notify(&v).map_err(|e| e.to_string());
                Outcome::TryNotified(self.log.take(), result)
            }
            ChannelOp::NotifyOne(v) => {
                let ran = self.channel.notify_one(&v);
                Outcome::NotifiedOne(self.log.take(), ran)
            }
            ChannelOp::Wipe => Outcome::Removed(self.channel.wipe_dead_observers()),
        }
    }
}

impl fmt::Debug for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scenario")
            .field("step", &self.step)
            .field("channel", &self.channel)
            .field("held", &self.held.iter().map(Option::is_some).collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}
