#![no_main]

use libfuzzer_sys::fuzz_target;
use relay_dialog::MessageDescriptor;
use relay_whatsapp::{build_message_payload, parse_inbound_messages, InboundContent};
use serde_json::Value;

fuzz_target!(|data: &[u8]| {
    let Ok(payload) = serde_json::from_slice::<Value>(data) else {
        return;
    };
    for message in parse_inbound_messages(&payload) {
        assert!(!message.from.trim().is_empty());
        assert!(!message.phone_number_id.trim().is_empty());
        let action = message.content.direct_action();
        if matches!(
            message.content,
            InboundContent::Text(_) | InboundContent::Reply { .. }
        ) {
            assert!(action.is_some());
        }

        let echo = MessageDescriptor::Text {
            value: message.content.kind().to_string(),
        };
        let outbound = build_message_payload(&message.from, &echo, None);
        assert!(outbound.is_some_and(|value| value["to"] == message.from.as_str()));
    }
});
