//! Rich-text ("slate") documents and their conversion to chat markup.
//!
//! The dialog engine emits styled text as a tree of paragraphs and spans.
//! WhatsApp only understands inline markers, so each span collapses to at
//! most one style: bold, then italic, then underline (no marker exists, so
//! the text is emitted raw), then strikethrough.

use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
/// Ordered paragraphs of a slate document.
pub struct RichTextDocument {
    #[serde(default)]
    pub content: Vec<RichTextParagraph>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RichTextParagraph {
    #[serde(default)]
    pub children: Vec<RichTextSpan>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// The single style honored for a text run.
pub enum SpanStyle {
    Bold,
    Italic,
    Underline,
    Strikethrough,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "Value")]
pub enum RichTextSpan {
    Link { url: Option<String> },
    Run { text: String, style: Option<SpanStyle> },
    Unsupported,
}

impl From<Value> for RichTextSpan {
    fn from(value: Value) -> Self {
        let Some(object) = value.as_object() else {
            return Self::Unsupported;
        };
        if is_truthy(object.get("type")) {
            if object.get("type").and_then(Value::as_str) == Some("link") {
                let url = object
                    .get("url")
                    .and_then(Value::as_str)
                    .map(str::to_string);
                return Self::Link { url };
            }
            return Self::Unsupported;
        }
        let text = object
            .get("text")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        Self::Run {
            text,
            style: resolve_span_style(object),
        }
    }
}

fn resolve_span_style(object: &Map<String, Value>) -> Option<SpanStyle> {
    [
        ("fontWeight", SpanStyle::Bold),
        ("italic", SpanStyle::Italic),
        ("underline", SpanStyle::Underline),
        ("strikeThrough", SpanStyle::Strikethrough),
    ]
    .into_iter()
    .find(|(field, _)| is_truthy(object.get(*field)))
    .map(|(_, style)| style)
}

pub(crate) fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(flag)) => *flag,
        Some(Value::Number(number)) => number.as_f64().is_some_and(|n| n != 0.0 && !n.is_nan()),
        Some(Value::String(text)) => !text.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}

/// Renders a document into WhatsApp markup, one newline per paragraph.
pub fn render_rich_text(document: &RichTextDocument) -> String {
    let mut rendered = String::new();
    for paragraph in &document.content {
        for span in &paragraph.children {
            render_span(span, &mut rendered);
        }
        rendered.push('\n');
    }
    rendered
}

fn render_span(span: &RichTextSpan, out: &mut String) {
    match span {
        RichTextSpan::Link { url } => {
            if let Some(url) = url {
                out.push_str(url);
            }
        }
        RichTextSpan::Run { text, .. } if text.is_empty() => {}
        RichTextSpan::Run { text, style } => match style {
            Some(SpanStyle::Bold) => wrap(out, '*', text),
            Some(SpanStyle::Italic) => wrap(out, '_', text),
            Some(SpanStyle::Strikethrough) => wrap(out, '~', text),
            Some(SpanStyle::Underline) | None => out.push_str(text),
        },
        RichTextSpan::Unsupported => {}
    }
}

fn wrap(out: &mut String, marker: char, text: &str) {
    out.push(marker);
    out.push_str(text);
    out.push(marker);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn document(value: Value) -> RichTextDocument {
        serde_json::from_value(value).expect("document should decode")
    }

    fn single_span(span: Value) -> String {
        render_rich_text(&document(json!({ "content": [{ "children": [span] }] })))
    }

    #[test]
    fn unit_single_style_flags_wrap_in_matching_markers() {
        assert_eq!(single_span(json!({"text":"bold","fontWeight":"700"})), "*bold*\n");
        assert_eq!(single_span(json!({"text":"lean","italic":true})), "_lean_\n");
        assert_eq!(
            single_span(json!({"text":"gone","strikeThrough":true})),
            "~gone~\n"
        );
        assert_eq!(single_span(json!({"text":"under","underline":true})), "under\n");
        assert_eq!(single_span(json!({"text":"plain"})), "plain\n");
    }

    #[test]
    fn unit_link_span_emits_url_regardless_of_text() {
        assert_eq!(
            single_span(json!({
                "type": "link",
                "url": "https://example.com/menu",
                "children": [{ "text": "our menu", "fontWeight": "700" }]
            })),
            "https://example.com/menu\n"
        );
    }

    #[test]
    fn unit_first_matching_style_wins() {
        assert_eq!(
            single_span(json!({"text":"both","italic":true,"fontWeight":"700"})),
            "*both*\n"
        );
        assert_eq!(
            single_span(json!({"text":"mix","underline":true,"strikeThrough":true})),
            "mix\n"
        );
    }

    #[test]
    fn unit_empty_text_contributes_nothing() {
        assert_eq!(single_span(json!({"text":"","fontWeight":"700"})), "\n");
        assert_eq!(single_span(json!({"fontWeight":"700"})), "\n");
    }

    #[test]
    fn functional_paragraphs_are_newline_terminated_in_order() {
        let rendered = render_rich_text(&document(json!({
            "content": [
                { "children": [{ "text": "Welcome to " }, { "text": "Luigi's", "fontWeight": "700" }] },
                { "children": [{ "text": "Open " }, { "text": "daily", "italic": true }] }
            ]
        })));
        assert_eq!(rendered, "Welcome to *Luigi's*\nOpen _daily_\n");
    }

    #[test]
    fn regression_malformed_spans_degrade_to_empty_contribution() {
        let rendered = render_rich_text(&document(json!({
            "content": [{ "children": [
                "not-an-object",
                { "type": "mention", "text": "@someone" },
                { "type": "link" },
                { "text": "kept" }
            ] }]
        })));
        assert_eq!(rendered, "kept\n");
    }

    #[test]
    fn regression_false_and_zero_flags_are_not_styles() {
        assert_eq!(
            single_span(json!({"text":"calm","fontWeight":false,"italic":0,"strikeThrough":""})),
            "calm\n"
        );
    }
}
