//! Inbound Cloud API webhook parsing.

use relay_dialog::Action;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq)]
/// One user message extracted from a webhook delivery.
pub struct InboundMessage {
    pub from: String,
    pub message_id: Option<String>,
    pub phone_number_id: String,
    pub user_name: Option<String>,
    pub content: InboundContent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundContent {
    Text(String),
    Reply { id: String, title: String },
    Audio { media_id: String },
    Image {
        media_id: String,
        caption: Option<String>,
    },
    Unsupported { kind: String },
}

impl InboundContent {
    /// Returns the action for content that needs no media ingestion.
    pub fn direct_action(&self) -> Option<Action> {
        match self {
            Self::Text(body) => Some(Action::Text(body.clone())),
            Self::Reply { id, title } => Some(Action::from_button_reply(id, title)),
            Self::Audio { .. } | Self::Image { .. } | Self::Unsupported { .. } => None,
        }
    }

    pub fn kind(&self) -> &str {
        match self {
            Self::Text(_) => "text",
            Self::Reply { .. } => "interactive",
            Self::Audio { .. } => "audio",
            Self::Image { .. } => "image",
            Self::Unsupported { kind } => kind.as_str(),
        }
    }
}

/// Extracts every user message from `entry[].changes[].value.messages[]`.
///
/// Status callbacks and values without a `phone_number_id` yield nothing.
pub fn parse_inbound_messages(payload: &Value) -> Vec<InboundMessage> {
    let mut messages = Vec::new();
    for value in change_values(payload) {
        let Some(phone_number_id) = value
            .get("metadata")
            .and_then(|metadata| metadata.get("phone_number_id"))
            .and_then(non_empty_str)
        else {
            continue;
        };
        let Some(raw_messages) = value.get("messages").and_then(Value::as_array) else {
            continue;
        };
        for raw in raw_messages {
            let Some(from) = raw.get("from").and_then(non_empty_str) else {
                continue;
            };
            messages.push(InboundMessage {
                from: from.to_string(),
                message_id: raw.get("id").and_then(non_empty_str).map(str::to_string),
                phone_number_id: phone_number_id.to_string(),
                user_name: contact_name(value, from),
                content: parse_content(raw),
            });
        }
    }
    messages
}

fn change_values(payload: &Value) -> Vec<&Value> {
    payload
        .get("entry")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|entry| entry.get("changes").and_then(Value::as_array))
        .flatten()
        .filter_map(|change| change.get("value").filter(|value| value.is_object()))
        .collect()
}

fn contact_name(value: &Value, from: &str) -> Option<String> {
    let contacts = value.get("contacts").and_then(Value::as_array)?;
    let contact = contacts
        .iter()
        .find(|contact| contact.get("wa_id").and_then(Value::as_str) == Some(from))
        .or_else(|| contacts.first())?;
    contact
        .get("profile")
        .and_then(|profile| profile.get("name"))
        .and_then(non_empty_str)
        .map(str::to_string)
}

fn parse_content(raw: &Value) -> InboundContent {
    let kind = raw.get("type").and_then(Value::as_str).unwrap_or("text");
    match kind {
        "text" => match raw
            .get("text")
            .and_then(|text| text.get("body"))
            .and_then(Value::as_str)
        {
            Some(body) => InboundContent::Text(body.to_string()),
            None => unsupported(kind),
        },
        "interactive" => {
            let interactive = raw.get("interactive");
            let reply = interactive
                .and_then(|interactive| interactive.get("button_reply"))
                .or_else(|| interactive.and_then(|interactive| interactive.get("list_reply")));
            let id = reply
                .and_then(|reply| reply.get("id"))
                .and_then(non_empty_str);
            match id {
                Some(id) => InboundContent::Reply {
                    id: id.to_string(),
                    title: reply
                        .and_then(|reply| reply.get("title"))
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string(),
                },
                None => unsupported(kind),
            }
        }
        "audio" => match media_id(raw, "audio") {
            Some(media_id) => InboundContent::Audio { media_id },
            None => unsupported(kind),
        },
        "image" => match media_id(raw, "image") {
            Some(media_id) => InboundContent::Image {
                media_id,
                caption: raw
                    .get("image")
                    .and_then(|image| image.get("caption"))
                    .and_then(non_empty_str)
                    .map(str::to_string),
            },
            None => unsupported(kind),
        },
        other => unsupported(other),
    }
}

fn media_id(raw: &Value, field: &str) -> Option<String> {
    raw.get(field)
        .and_then(|media| media.get("id"))
        .and_then(non_empty_str)
        .map(str::to_string)
}

fn unsupported(kind: &str) -> InboundContent {
    InboundContent::Unsupported {
        kind: kind.to_string(),
    }
}

fn non_empty_str(value: &Value) -> Option<&str> {
    value
        .as_str()
        .map(str::trim)
        .filter(|value| !value.is_empty())
}
