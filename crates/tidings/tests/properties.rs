#![forbid(unsafe_code)]

//! Property tests: channel behavior against the harness reference model.

use std::rc::Rc;

use proptest::prelude::*;
use tidings::prelude::*;
use tidings_harness::model::{ChannelOp, Scenario, channel_ops};
use tidings_harness::{CallLog, Probe};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn permissive_channel_matches_model(ops in channel_ops(64)) {
        let mut scenario = Scenario::new(DuplicatePolicy::Allow);
        if let Err(divergence) = scenario.run(&ops) {
            prop_assert!(false, "{}", divergence);
        }
    }

    #[test]
    fn strict_channel_matches_model(ops in channel_ops(64)) {
        let mut scenario = Scenario::new(DuplicatePolicy::Reject);
        if let Err(divergence) = scenario.run(&ops) {
            prop_assert!(false, "{}", divergence);
        }
    }

    #[test]
    fn distinct_subscribers_notified_once_in_order(count in 1_usize..24, value in any::<u32>()) {
        let log = CallLog::new();
        let probes: Vec<_> = (0..count).map(|i| Probe::shared(format!("p{i}"), &log)).collect();
        let mut channel: Channel<u32> = Channel::new();
        for p in &probes {
            channel.attach_member(Probe::on_value, Rc::clone(p)).unwrap();
        }
        prop_assert_eq!(channel.observers().len(), count);

        channel.notify(&value);
        let expected: Vec<_> = (0..count).map(|i| format!("p{i}:{value}")).collect();
        prop_assert_eq!(log.take(), expected);
    }

    #[test]
    fn detach_is_idempotent(ops in channel_ops(32), slot in 0_u8..3) {
        let mut once = Scenario::new(DuplicatePolicy::Allow);
        let mut twice = Scenario::new(DuplicatePolicy::Allow);
        prop_assert!(once.run(&ops).is_ok());
        prop_assert!(twice.run(&ops).is_ok());

        prop_assert!(once.apply(ChannelOp::DetachMember(slot)).is_ok());
        prop_assert!(twice.apply(ChannelOp::DetachMember(slot)).is_ok());
        prop_assert!(twice.apply(ChannelOp::DetachMember(slot)).is_ok());
        prop_assert_eq!(once.channel().len(), twice.channel().len());
        prop_assert_eq!(once.channel().dead_count(), twice.channel().dead_count());
    }

    #[test]
    fn removal_preserves_relative_order(ops in channel_ops(48)) {
        let mut scenario = Scenario::new(DuplicatePolicy::Allow);
        let mut seen = Vec::new();
        for op in ops {
            prop_assert!(scenario.apply(op).is_ok());
            let removes = matches!(
                op,
                ChannelOp::DetachFree(_)
                    | ChannelOp::DetachMember(_)
                    | ChannelOp::DetachFirstMember(_)
                    | ChannelOp::DetachClosure(_)
                    | ChannelOp::DetachFront
                    | ChannelOp::Wipe
            );
            let now: Vec<Handle> = scenario.channel().observers().handles().collect();
            if removes {
                // Survivors form a subsequence of the entries before the removal.
                let mut before = seen.iter();
                prop_assert!(now.iter().all(|h| before.any(|s| s == h)));
            }
            seen = now;
        }
    }
}
