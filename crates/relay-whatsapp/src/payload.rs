//! Outbound Cloud API payload shaping.

use relay_dialog::{MessageDescriptor, ReplyButton};
use serde_json::{json, Value};

pub const DEFAULT_BUTTON_PROMPT: &str = "Make your choice";

/// Builds the send-message payload for one descriptor.
///
/// `previous` is the descriptor immediately before `descriptor` in the
/// queue; button messages take their prompt from it. `Body` descriptors are
/// staging slots and produce no payload.
pub fn build_message_payload(
    to: &str,
    descriptor: &MessageDescriptor,
    previous: Option<&MessageDescriptor>,
) -> Option<Value> {
    match descriptor {
        MessageDescriptor::Image { value } => Some(media_payload(to, "image", value)),
        MessageDescriptor::Audio { value } => Some(media_payload(to, "audio", value)),
        MessageDescriptor::Buttons { buttons } => {
            let prompt = previous
                .and_then(MessageDescriptor::value)
                .filter(|value| !value.is_empty())
                .unwrap_or(DEFAULT_BUTTON_PROMPT);
            Some(buttons_payload(to, prompt, buttons))
        }
        MessageDescriptor::Text { value } => Some(json!({
            "messaging_product": "whatsapp",
            "recipient_type": "individual",
            "to": to,
            "type": "text",
            "text": {
                "preview_url": true,
                "body": value,
            }
        })),
        MessageDescriptor::Body { .. } => None,
    }
}

fn media_payload(to: &str, media_type: &str, link: &str) -> Value {
    json!({
        "messaging_product": "whatsapp",
        "recipient_type": "individual",
        "to": to,
        "type": media_type,
        media_type: { "link": link }
    })
}

fn buttons_payload(to: &str, prompt: &str, buttons: &[ReplyButton]) -> Value {
    json!({
        "messaging_product": "whatsapp",
        "recipient_type": "individual",
        "to": to,
        "type": "interactive",
        "interactive": {
            "type": "button",
            "body": { "text": prompt },
            "action": { "buttons": buttons }
        }
    })
}

pub fn read_receipt_payload(message_id: &str) -> Value {
    json!({
        "messaging_product": "whatsapp",
        "status": "read",
        "message_id": message_id,
    })
}

/// Typing indicator payload variants, most specific first.
///
/// Cloud API versions disagree on the accepted shape, so callers try each in
/// order until one is not rejected as unsupported.
pub fn typing_indicator_payloads(to: &str, message_id: Option<&str>) -> Vec<Value> {
    let mut payloads = Vec::with_capacity(3);
    if let Some(message_id) = message_id {
        payloads.push(json!({
            "messaging_product": "whatsapp",
            "status": "read",
            "message_id": message_id,
            "typing_indicator": { "type": "text" }
        }));
    }
    payloads.push(json!({
        "messaging_product": "whatsapp",
        "recipient_type": "individual",
        "to": to,
        "type": "typing_indicator",
        "typing_indicator": { "type": "text" }
    }));
    payloads.push(json!({
        "messaging_product": "whatsapp",
        "to": to,
        "status": "typing",
    }));
    payloads
}
