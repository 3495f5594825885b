#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use tidings_core::config::DuplicatePolicy;
use tidings_harness::model::{ChannelOp, Scenario};

#[derive(Debug, Arbitrary)]
struct Input {
    strict: bool,
    ops: Vec<ChannelOp>,
}

fuzz_target!(|input: Input| {
    if input.ops.len() > 512 {
        return;
    }
    let policy = if input.strict {
        DuplicatePolicy::Reject
    } else {
        DuplicatePolicy::Allow
    };
    let mut scenario = Scenario::new(policy);
    if let Err(divergence) = scenario.run(&input.ops) {
        panic!("{divergence}");
    }
});
