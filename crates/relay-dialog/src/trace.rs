//! Typed trace items decoded from the dialog engine's turn response.
//!
//! Each raw item is validated on its own so one malformed trace does not
//! prevent the rest of the turn from rendering.

use std::time::Duration;

use serde_json::{Map, Value};
use thiserror::Error;

use crate::rich_text::RichTextDocument;

const PATH_REQUEST_MARKER: &str = "path-";

#[derive(Debug, Clone, PartialEq)]
/// One element of the engine's response sequence.
pub enum TraceItem {
    Text(TextTrace),
    Speak(SpeakTrace),
    Visual { image: String },
    Choice { buttons: Vec<ChoiceButton> },
    NoReply { timeout: Duration },
    End,
    Other { kind: String },
}

impl TraceItem {
    pub fn kind(&self) -> &str {
        match self {
            Self::Text(_) => "text",
            Self::Speak(_) => "speak",
            Self::Visual { .. } => "visual",
            Self::Choice { .. } => "choice",
            Self::NoReply { .. } => "no-reply",
            Self::End => "end",
            Self::Other { kind } => kind.as_str(),
        }
    }

    pub fn is_choice(&self) -> bool {
        matches!(self, Self::Choice { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextTrace {
    Slate(RichTextDocument),
    Message(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeakTrace {
    Audio { src: String },
    Message(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceButton {
    pub label: Option<String>,
    pub target: ButtonTarget,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// What pressing a choice button resolves to.
pub enum ButtonTarget {
    Link(String),
    Path(String),
    Intent(String),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
/// Enumerates reasons a raw trace item could not be decoded.
pub enum TraceDecodeError {
    #[error("trace item must be an object with a string `type` field")]
    MissingType,
    #[error("{kind} trace is missing `{field}`")]
    MissingField {
        kind: &'static str,
        field: &'static str,
    },
    #[error("{kind} trace has invalid `{field}`: {detail}")]
    InvalidField {
        kind: &'static str,
        field: &'static str,
        detail: String,
    },
}

/// Decodes one raw trace item into its typed form.
pub fn decode_trace_item(raw: &Value) -> Result<TraceItem, TraceDecodeError> {
    let kind = raw
        .get("type")
        .and_then(Value::as_str)
        .ok_or(TraceDecodeError::MissingType)?;
    let payload = raw.get("payload").unwrap_or(&Value::Null);
    match kind {
        "text" => decode_text(payload).map(TraceItem::Text),
        "speak" => decode_speak(payload).map(TraceItem::Speak),
        "visual" => {
            let image = required_str(payload, "visual", "payload.image", "image")?;
            Ok(TraceItem::Visual { image })
        }
        "choice" => decode_choice(payload),
        "no-reply" => decode_no_reply(payload),
        "end" => Ok(TraceItem::End),
        other => Ok(TraceItem::Other {
            kind: other.to_string(),
        }),
    }
}

fn decode_text(payload: &Value) -> Result<TextTrace, TraceDecodeError> {
    if let Some(slate) = payload.get("slate").filter(|slate| !slate.is_null()) {
        if slate.get("content").and_then(Value::as_array).is_none() {
            return Err(TraceDecodeError::MissingField {
                kind: "text",
                field: "payload.slate.content",
            });
        }
        let document = serde_json::from_value::<RichTextDocument>(slate.clone()).map_err(
            |error| TraceDecodeError::InvalidField {
                kind: "text",
                field: "payload.slate",
                detail: error.to_string(),
            },
        )?;
        return Ok(TextTrace::Slate(document));
    }
    match payload.get("message").and_then(Value::as_str) {
        Some(message) => Ok(TextTrace::Message(message.to_string())),
        None => Err(TraceDecodeError::MissingField {
            kind: "text",
            field: "payload.slate",
        }),
    }
}

fn decode_speak(payload: &Value) -> Result<SpeakTrace, TraceDecodeError> {
    if payload.get("type").and_then(Value::as_str) == Some("audio") {
        let src = required_str(payload, "speak", "payload.src", "src")?;
        return Ok(SpeakTrace::Audio { src });
    }
    let message = required_str(payload, "speak", "payload.message", "message")?;
    Ok(SpeakTrace::Message(message))
}

fn decode_choice(payload: &Value) -> Result<TraceItem, TraceDecodeError> {
    let raw_buttons = payload
        .get("buttons")
        .and_then(Value::as_array)
        .ok_or(TraceDecodeError::MissingField {
            kind: "choice",
            field: "payload.buttons",
        })?;
    let buttons = raw_buttons
        .iter()
        .map(decode_choice_button)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(TraceItem::Choice { buttons })
}

fn decode_choice_button(raw: &Value) -> Result<ChoiceButton, TraceDecodeError> {
    let request = raw
        .get("request")
        .and_then(Value::as_object)
        .ok_or(TraceDecodeError::MissingField {
            kind: "choice",
            field: "buttons[].request",
        })?;
    let request_type = request
        .get("type")
        .and_then(Value::as_str)
        .ok_or(TraceDecodeError::MissingField {
            kind: "choice",
            field: "buttons[].request.type",
        })?;
    let request_payload = request
        .get("payload")
        .and_then(Value::as_object)
        .ok_or(TraceDecodeError::MissingField {
            kind: "choice",
            field: "buttons[].request.payload",
        })?;
    let label = request_payload
        .get("label")
        .and_then(Value::as_str)
        .map(str::to_string);

    let target = if let Some(url) = first_action_url(request_payload) {
        ButtonTarget::Link(url)
    } else if request_type.contains(PATH_REQUEST_MARKER) {
        ButtonTarget::Path(request_type.to_string())
    } else {
        let intent_name = request_payload
            .get("intent")
            .and_then(|intent| intent.get("name"))
            .and_then(Value::as_str)
            .ok_or(TraceDecodeError::MissingField {
                kind: "choice",
                field: "buttons[].request.payload.intent.name",
            })?;
        ButtonTarget::Intent(intent_name.to_string())
    };
    Ok(ChoiceButton { label, target })
}

fn first_action_url(request_payload: &Map<String, Value>) -> Option<String> {
    request_payload
        .get("actions")
        .and_then(Value::as_array)
        .and_then(|actions| actions.first())
        .and_then(|action| action.get("payload"))
        .and_then(|payload| payload.get("url"))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .map(str::to_string)
}

fn decode_no_reply(payload: &Value) -> Result<TraceItem, TraceDecodeError> {
    let raw_timeout = payload.get("timeout").ok_or(TraceDecodeError::MissingField {
        kind: "no-reply",
        field: "payload.timeout",
    })?;
    let seconds = match raw_timeout {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    }
    .ok_or_else(|| TraceDecodeError::InvalidField {
        kind: "no-reply",
        field: "payload.timeout",
        detail: format!("expected seconds, found {raw_timeout}"),
    })?;
    let timeout =
        Duration::try_from_secs_f64(seconds).map_err(|error| TraceDecodeError::InvalidField {
            kind: "no-reply",
            field: "payload.timeout",
            detail: error.to_string(),
        })?;
    Ok(TraceItem::NoReply { timeout })
}

fn required_str(
    payload: &Value,
    kind: &'static str,
    field: &'static str,
    key: &str,
) -> Result<String, TraceDecodeError> {
    payload
        .get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or(TraceDecodeError::MissingField { kind, field })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unit_decodes_visual_and_speak_variants() {
        assert_eq!(
            decode_trace_item(&json!({"type":"visual","payload":{"image":"https://cdn.example/a.png","visualType":"image"}})),
            Ok(TraceItem::Visual { image: "https://cdn.example/a.png".to_string() })
        );
        assert_eq!(
            decode_trace_item(&json!({"type":"speak","payload":{"type":"audio","src":"https://cdn.example/a.mp3"}})),
            Ok(TraceItem::Speak(SpeakTrace::Audio { src: "https://cdn.example/a.mp3".to_string() }))
        );
        assert_eq!(
            decode_trace_item(&json!({"type":"speak","payload":{"type":"message","message":"Hello"}})),
            Ok(TraceItem::Speak(SpeakTrace::Message("Hello".to_string())))
        );
    }

    #[test]
    fn unit_choice_buttons_resolve_link_path_and_intent_targets() {
        let item = decode_trace_item(&json!({
            "type": "choice",
            "payload": { "buttons": [
                { "name": "Site", "request": { "type": "intent", "payload": {
                    "label": "Site",
                    "actions": [{ "type": "open_url", "payload": { "url": "https://example.com" } }]
                } } },
                { "name": "Menu", "request": { "type": "path-x9k2", "payload": { "label": "Menu" } } },
                { "name": "Hours", "request": { "type": "intent", "payload": {
                    "label": "Hours", "actions": [], "intent": { "name": "opening_hours" }
                } } }
            ] }
        }))
        .expect("choice should decode");
        let TraceItem::Choice { buttons } = item else {
            panic!("expected choice trace");
        };
        assert_eq!(buttons[0].target, ButtonTarget::Link("https://example.com".to_string()));
        assert_eq!(buttons[1].target, ButtonTarget::Path("path-x9k2".to_string()));
        assert_eq!(buttons[2].target, ButtonTarget::Intent("opening_hours".to_string()));
        assert_eq!(buttons[2].label.as_deref(), Some("Hours"));
    }

    #[test]
    fn unit_no_reply_timeout_accepts_numbers_and_numeric_strings() {
        assert_eq!(
            decode_trace_item(&json!({"type":"no-reply","payload":{"timeout":30}})),
            Ok(TraceItem::NoReply { timeout: Duration::from_secs(30) })
        );
        assert_eq!(
            decode_trace_item(&json!({"type":"no-reply","payload":{"timeout":"1.5"}})),
            Ok(TraceItem::NoReply { timeout: Duration::from_millis(1500) })
        );
    }

    #[test]
    fn unit_unknown_trace_kinds_decode_as_other() {
        assert_eq!(
            decode_trace_item(&json!({"type":"debug","payload":{"message":"matched intent"}})),
            Ok(TraceItem::Other { kind: "debug".to_string() })
        );
        assert_eq!(decode_trace_item(&json!({"type":"end"})), Ok(TraceItem::End));
    }

    #[test]
    fn regression_missing_nested_fields_return_decode_errors() {
        assert_eq!(
            decode_trace_item(&json!({"type":"text","payload":{}})),
            Err(TraceDecodeError::MissingField { kind: "text", field: "payload.slate" })
        );
        assert_eq!(
            decode_trace_item(&json!({"type":"text","payload":{"slate":{"id":"s1"}}})),
            Err(TraceDecodeError::MissingField { kind: "text", field: "payload.slate.content" })
        );
        assert_eq!(
            decode_trace_item(&json!({"type":"choice","payload":{"buttons":[{"request":{"type":"intent","payload":{"label":"x"}}}]}})),
            Err(TraceDecodeError::MissingField {
                kind: "choice",
                field: "buttons[].request.payload.intent.name"
            })
        );
        assert_eq!(decode_trace_item(&json!({"payload":{}})), Err(TraceDecodeError::MissingType));
        assert!(matches!(
            decode_trace_item(&json!({"type":"no-reply","payload":{"timeout":-4}})),
            Err(TraceDecodeError::InvalidField { field: "payload.timeout", .. })
        ));
    }
}
