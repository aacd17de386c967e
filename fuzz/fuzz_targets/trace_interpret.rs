#![no_main]

use libfuzzer_sys::fuzz_target;
use relay_dialog::{interpret_traces, MessageDescriptor, MAX_LABEL_CHARS, MAX_REPLY_BUTTONS};
use serde_json::Value;

fuzz_target!(|data: &[u8]| {
    let Ok(Value::Array(traces)) = serde_json::from_slice::<Value>(data) else {
        return;
    };
    let turn = interpret_traces(&traces);

    assert!(turn.skipped.len() <= traces.len());
    if turn.session_ending {
        assert!(turn.no_reply.is_none());
    }
    for descriptor in &turn.messages {
        if let MessageDescriptor::Buttons { buttons } = descriptor {
            assert!(buttons.len() <= MAX_REPLY_BUTTONS);
            for button in buttons {
                assert!(button.title.chars().count() <= MAX_LABEL_CHARS);
            }
        }
    }
});
