#![forbid(unsafe_code)]

//! Integration tests: subjects composed from several channels.

use std::ops::{Deref, DerefMut};
use std::rc::Rc;

use tidings::prelude::*;
use tidings_harness::{CallLog, Probe, RecordingTracer};

pub enum Title {}
pub enum Body {}

tidings::subject! {
    /// A document with two string channels told apart by tag.
    pub struct Document {
        pub title: Channel<str, Title>,
        pub body: Channel<str, Body>,
        pub saved: Channel<()>,
        pub cursor: Channel<(u32, u32)>,
    }
}

fn attach_text<S, Tag>(subject: &mut S, probe: &Rc<Probe>) -> Handle
where
    S: HasChannel<str, Tag>,
{
    subject
        .channel_mut()
        .attach_member(Probe::on_text, Rc::downgrade(probe))
        .unwrap()
}

// ============================================================================
// Independence
// ============================================================================

#[test]
fn unit_and_string_channels_are_independent() {
    let log = CallLog::new();
    let probe = Probe::shared("p", &log);
    let mut doc = Document::new();

    doc.saved
        .attach_member_unit(Probe::on_signal, Rc::clone(&probe))
        .unwrap();
    doc.body.attach_member(Probe::on_text, Rc::clone(&probe)).unwrap();

    doc.saved.fire();
    assert_eq!(log.take(), ["p:!"]);
    doc.body.notify("text");
    assert_eq!(log.take(), ["p:text"]);

    assert_eq!(doc.saved.detach_all(), 1);
    assert_eq!(doc.body.len(), 1);
    doc.saved.fire();
    assert!(log.is_empty());
}

#[test]
fn same_signature_distinct_tags() {
    let log = CallLog::new();
    let probe = Probe::shared("p", &log);
    let mut doc = Document::new();

    let title = attach_text::<_, Title>(&mut doc, &probe);
    let body = attach_text::<_, Body>(&mut doc, &probe);
    assert_eq!(title, body, "same method and instance derive the same handle");

    doc.on::<str, Title>().notify("t");
    assert_eq!(log.take(), ["p:t"]);

    doc.on_mut::<str, Title>().detach(title);
    assert!(doc.title.is_empty());
    assert_eq!(doc.body.len(), 1, "detach on one channel leaves the other");
}

#[test]
fn tuple_channel_carries_several_arguments() {
    let log = CallLog::new();
    let mut doc = Document::new();
    let l = log.clone();
    doc.cursor
        .attach_fn(move |(line, col)| l.push(format!("{line}:{col}")));
    doc.cursor.notify(&(3, 14));
    assert_eq!(log.take(), ["3:14"]);
}

#[test]
fn subject_wide_wipe_and_detach() {
    let log = CallLog::new();
    let probe = Probe::shared("p", &log);
    let mut doc = Document::new();
    attach_text::<_, Title>(&mut doc, &probe);
    attach_text::<_, Body>(&mut doc, &probe);
    doc.saved.attach_unit(|| {}).unwrap();
    assert_eq!(doc.channel_count(), 4);
    assert_eq!(doc.observer_count(), 3);

    drop(probe);
    doc.title.notify("a");
    doc.body.notify("b");
    assert_eq!(doc.wipe_dead_observers(), 2);
    assert_eq!(doc.detach_all(), 1);
    assert_eq!(doc.observer_count(), 0);
}

// ============================================================================
// Tracing hook
// ============================================================================

#[test]
fn tracer_sees_one_bracket_per_delivery() {
    let tracer = RecordingTracer::shared();
    let log = CallLog::new();
    let mut doc = Document::with_tracer(tracer.clone());
    doc.title.attach_fn(log.recorder("a"));
    doc.title.attach_fn(log.recorder("b"));
    doc.saved.attach_unit(|| {}).unwrap();

    doc.title.notify("x");
    doc.saved.fire();
    assert_eq!(tracer.dispatches(), 3);
    assert!(tracer.is_bracketed());
    assert!(tracer.subjects().iter().all(|s| s.ends_with("Document")));
}

#[test]
fn subject_without_tracer_behaves_identically() {
    let log = CallLog::new();
    let mut plain = Document::new();
    let mut traced = Document::with_tracer(RecordingTracer::shared());
    plain.body.attach_fn(log.recorder("plain"));
    traced.body.attach_fn(log.recorder("traced"));
    plain.body.notify("v");
    traced.body.notify("v");
    assert_eq!(log.take(), ["plain:v", "traced:v"]);
}

// ============================================================================
// Extension
// ============================================================================

/// Adds its own state on top of a [`Document`] and reports its own name.
struct Draft {
    doc: Document,
    revision: u32,
}

impl Draft {
    fn new(tracer: Rc<dyn Tracer>) -> Self {
        Self {
            doc: Document::with_config(ChannelConfig::for_subject::<Draft>().tracer(tracer)),
            revision: 0,
        }
    }

    fn edit(&mut self, text: &str) {
        self.revision += 1;
        self.doc.body.notify(text);
    }
}

impl Deref for Draft {
    type Target = Document;

    fn deref(&self) -> &Document {
        &self.doc
    }
}

impl DerefMut for Draft {
    fn deref_mut(&mut self) -> &mut Document {
        &mut self.doc
    }
}

#[test]
fn derived_subject_keeps_channels_addressable() {
    let tracer = RecordingTracer::shared();
    let log = CallLog::new();
    let probe = Probe::shared("p", &log);
    let mut draft = Draft::new(tracer.clone());

    draft.body.attach_member(Probe::on_text, Rc::clone(&probe)).unwrap();
    draft
        .on_mut::<str, Title>()
        .attach_member(Probe::on_text, Rc::clone(&probe))
        .unwrap();

    draft.edit("first");
    draft.title.notify("heading");
    assert_eq!(log.take(), ["p:first", "p:heading"]);
    assert_eq!(draft.revision, 1);
    assert!(draft.subject_name().ends_with("Draft"));
    assert!(tracer.subjects().iter().all(|s| s.ends_with("Draft")));
}
