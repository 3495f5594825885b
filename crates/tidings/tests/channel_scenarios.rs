#![forbid(unsafe_code)]

//! Integration tests: attach, detach and notify on a single channel.

use std::rc::Rc;

use tidings::prelude::*;
use tidings_harness::{CallLog, Probe};

thread_local! {
    static LOG_ALL: CallLog = CallLog::new();
}

fn log_all(text: &str) {
    LOG_ALL.with(|log| log.push(format!("log_all:{text}")));
}

fn log_all_calls() -> Vec<String> {
    LOG_ALL.with(CallLog::take)
}

fn first(_: &u32) {}

fn second(v: &u32) {
    std::hint::black_box(*v);
}

// ============================================================================
// Named channel scenario
// ============================================================================

tidings::subject! {
    struct Events {
        named: Channel<str>,
    }
}

#[test]
fn free_and_member_then_detach_free() {
    let _ = log_all_calls();
    let log = CallLog::new();
    let s = Probe::shared("on_event", &log);
    let mut events = Events::new();

    let free = events.named.attach(log_all).unwrap();
    events
        .named
        .attach_member(Probe::on_text, Rc::clone(&s))
        .unwrap();

    events.named.notify("hello");
    assert_eq!(log_all_calls(), ["log_all:hello"]);
    assert_eq!(log.take(), ["on_event:hello"]);

    assert_eq!(events.named.detach(free), 1);
    events.named.notify("world");
    assert!(log_all_calls().is_empty());
    assert_eq!(log.take(), ["on_event:world"]);
    assert_eq!(s.hits(), 2);
}

#[test]
fn delivery_follows_attach_order_across_binding_kinds() {
    let _ = log_all_calls();
    let log = CallLog::new();
    let a = Probe::shared("a", &log);
    let b = Probe::shared("b", &log);
    let mut channel: Channel<str> = Channel::new();

    channel.attach_member(Probe::on_text, Rc::downgrade(&b)).unwrap();
    channel.attach_fn(log.recorder("closure"));
    channel.attach_member(Probe::on_text, Rc::clone(&a)).unwrap();

    channel.notify("x");
    assert_eq!(log.take(), ["b:x", "closure:x", "a:x"]);
    assert_eq!(channel.observers().len(), 3);
}

// ============================================================================
// Counting and detach properties
// ============================================================================

#[test]
fn distinct_attaches_each_notified_once() {
    let log = CallLog::new();
    let probes: Vec<_> = (0..5).map(|i| Probe::shared(format!("p{i}"), &log)).collect();
    let mut channel: Channel<u32> = Channel::new();
    for p in &probes {
        channel.attach_member(Probe::on_value, Rc::clone(p)).unwrap();
    }
    assert_eq!(channel.observers().len(), probes.len());

    channel.notify(&9);
    assert_eq!(log.take(), ["p0:9", "p1:9", "p2:9", "p3:9", "p4:9"]);
}

#[test]
fn detach_right_after_attach_leaves_nothing() {
    let log = CallLog::new();
    let mut channel: Channel<u32> = Channel::new();
    let handle = channel.attach_fn(log.recorder("c"));
    channel.detach(handle);
    assert_eq!(channel.observers().len(), 0);
    channel.notify(&1);
    assert!(log.is_empty());
}

#[test]
fn detach_twice_is_same_as_once() {
    let mut channel: Channel<u32> = Channel::new();
    let h1 = channel.attach(first).unwrap();
    channel.attach(second).unwrap();

    assert_eq!(channel.detach(h1), 1);
    let after_once: Vec<_> = channel.observers().handles().collect();
    assert_eq!(channel.detach(h1), 0);
    let after_twice: Vec<_> = channel.observers().handles().collect();
    assert_eq!(after_once, after_twice);
}

#[test]
fn notify_on_empty_channel_is_noop() {
    let channel: Channel<str> = Channel::new();
    channel.notify("nobody");
    assert!(!channel.notify_one("nobody"));
    assert_eq!(channel.try_notify("nobody"), Ok(()));
}

// ============================================================================
// Duplicate policy
// ============================================================================

#[test]
fn permissive_policy_keeps_duplicates() {
    let log = CallLog::new();
    let s = Probe::shared("s", &log);
    let mut channel: Channel<u32> = Channel::new();
    let h1 = channel.attach_member(Probe::on_value, Rc::clone(&s)).unwrap();
    let h2 = channel.attach_member(Probe::on_value, Rc::clone(&s)).unwrap();
    assert_eq!(h1, h2);
    assert_eq!(channel.len(), 2);

    channel.notify(&3);
    assert_eq!(log.take(), ["s:3", "s:3"]);

    assert!(channel.detach_first(h1));
    assert_eq!(channel.len(), 1);
    assert_eq!(channel.detach(h1), 1);
}

#[test]
fn strict_policy_reports_redundant_registration() {
    let log = CallLog::new();
    let s = Probe::shared("s", &log);
    let mut channel: Channel<u32> =
        Channel::with_config(ChannelConfig::new().duplicates(DuplicatePolicy::Reject));

    let handle = channel.attach_member(Probe::on_value, Rc::clone(&s)).unwrap();
    let err = channel
        .attach_member(Probe::on_value, Rc::downgrade(&s))
        .unwrap_err();
    assert_eq!(err, ChannelError::RedundantObserver { handle });
    assert_eq!(channel.len(), 1);

    // Same method on another instance is a different registration.
    let other = Probe::shared("other", &log);
    assert!(channel.attach_member(Probe::on_value, Rc::clone(&other)).is_ok());
}

#[test]
fn detach_front_removes_earliest() {
    let mut channel: Channel<u32> = Channel::new();
    let h1 = channel.attach(first).unwrap();
    let h2 = channel.attach(second).unwrap();
    let h3 = channel.attach_fn(|_| {});
    assert_eq!(channel.detach_front(), Some(h1));
    assert_eq!(channel.observers().handles().collect::<Vec<_>>(), [h2, h3]);
    channel.detach_all();
    assert_eq!(channel.detach_front(), None);
}

#[test]
fn bound_arguments_reach_the_callback() {
    fn tagged(value: &u32, tag: &&'static str) {
        LOG_ALL.with(|log| log.push(format!("{tag}:{value}")));
    }

    let _ = log_all_calls();
    let mut channel: Channel<u32> = Channel::new();
    let h1 = channel.attach_with(tagged, "left").unwrap();
    let h2 = channel.attach_with(tagged, "right").unwrap();
    assert_eq!(h1, h2, "bound arguments do not take part in identity");

    channel.notify(&4);
    assert_eq!(log_all_calls(), ["left:4", "right:4"]);
}
