//! Trace interpreter: renders one engine turn into outbound descriptors.
//!
//! The pass is linear with one item of look-ahead. Text that immediately
//! precedes a choice becomes a `body` descriptor, which the sender uses as the
//! prompt of the following button message instead of sending it on its own.
//! `end` is detected anywhere in the turn and suppresses no-reply scheduling.

use std::time::Duration;

use serde::{Serialize, Serializer};
use serde_json::{json, Value};

use crate::label::truncate_label;
use crate::rich_text::render_rich_text;
use crate::trace::{
    decode_trace_item, ButtonTarget, ChoiceButton, SpeakTrace, TextTrace, TraceDecodeError,
    TraceItem,
};

pub const MAX_REPLY_BUTTONS: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
/// A quick-reply button as sent to the messaging platform.
pub struct ReplyButton {
    pub id: String,
    pub title: String,
}

impl Serialize for ReplyButton {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        json!({
            "type": "reply",
            "reply": { "id": self.id, "title": self.title }
        })
        .serialize(serializer)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
/// One queued outbound message produced by the interpreter.
pub enum MessageDescriptor {
    Text { value: String },
    Body { value: String },
    Image { value: String },
    Audio { value: String },
    Buttons { buttons: Vec<ReplyButton> },
}

impl MessageDescriptor {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Text { .. } => "text",
            Self::Body { .. } => "body",
            Self::Image { .. } => "image",
            Self::Audio { .. } => "audio",
            Self::Buttons { .. } => "buttons",
        }
    }

    pub fn value(&self) -> Option<&str> {
        match self {
            Self::Text { value }
            | Self::Body { value }
            | Self::Image { value }
            | Self::Audio { value } => Some(value.as_str()),
            Self::Buttons { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Request to replay a synthetic no-reply turn after `delay`.
pub struct NoReplyRequest {
    pub delay: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedTrace {
    pub index: usize,
    pub error: TraceDecodeError,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// Result of interpreting one engine turn.
pub struct RenderedTurn {
    pub messages: Vec<MessageDescriptor>,
    pub session_ending: bool,
    pub no_reply: Option<NoReplyRequest>,
    pub skipped: Vec<SkippedTrace>,
}

/// Decodes and renders the raw trace sequence of one turn.
///
/// Malformed items are skipped and reported in [`RenderedTurn::skipped`];
/// look-ahead applies to the decoded sequence.
pub fn interpret_traces(raw_traces: &[Value]) -> RenderedTurn {
    let mut items = Vec::with_capacity(raw_traces.len());
    let mut skipped = Vec::new();
    for (index, raw) in raw_traces.iter().enumerate() {
        match decode_trace_item(raw) {
            Ok(item) => items.push(item),
            Err(error) => {
                tracing::warn!(index, error = %error, "skipping malformed dialog trace");
                skipped.push(SkippedTrace { index, error });
            }
        }
    }
    let mut turn = render_trace_items(&items);
    turn.skipped = skipped;
    turn
}

pub fn render_trace_items(items: &[TraceItem]) -> RenderedTurn {
    let session_ending = items.iter().any(|item| matches!(item, TraceItem::End));
    let mut messages = Vec::new();
    let mut no_reply = None;

    for (index, item) in items.iter().enumerate() {
        let next_is_choice = items.get(index + 1).is_some_and(TraceItem::is_choice);
        match item {
            TraceItem::Text(TextTrace::Slate(document)) => {
                messages.push(text_or_body(render_rich_text(document), next_is_choice));
            }
            TraceItem::Text(TextTrace::Message(message))
            | TraceItem::Speak(SpeakTrace::Message(message)) => {
                messages.push(text_or_body(message.clone(), next_is_choice));
            }
            TraceItem::Speak(SpeakTrace::Audio { src }) => {
                messages.push(MessageDescriptor::Audio { value: src.clone() });
            }
            TraceItem::Visual { image } => {
                messages.push(MessageDescriptor::Image {
                    value: image.clone(),
                });
            }
            TraceItem::Choice { buttons } => {
                messages.push(MessageDescriptor::Buttons {
                    buttons: render_reply_buttons(buttons),
                });
            }
            TraceItem::NoReply { timeout } if !session_ending => {
                no_reply = Some(NoReplyRequest { delay: *timeout });
            }
            TraceItem::NoReply { .. } | TraceItem::End | TraceItem::Other { .. } => {}
        }
    }

    RenderedTurn {
        messages,
        session_ending,
        no_reply,
        skipped: Vec::new(),
    }
}

fn text_or_body(value: String, next_is_choice: bool) -> MessageDescriptor {
    if next_is_choice {
        MessageDescriptor::Body { value }
    } else {
        MessageDescriptor::Text { value }
    }
}

fn render_reply_buttons(buttons: &[ChoiceButton]) -> Vec<ReplyButton> {
    buttons
        .iter()
        .filter_map(|button| {
            let id = match &button.target {
                ButtonTarget::Link(_) => return None,
                ButtonTarget::Path(path_type) => path_type.clone(),
                ButtonTarget::Intent(intent_name) => intent_name.clone(),
            };
            Some(ReplyButton {
                id,
                title: truncate_label(button.label.as_deref()),
            })
        })
        .take(MAX_REPLY_BUTTONS)
        .collect()
}
