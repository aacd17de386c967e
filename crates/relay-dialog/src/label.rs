//! Label shaping shared by button rendering.

pub const MAX_LABEL_CHARS: usize = 20;
const ELLIPSIS: char = '…';

/// Truncates a button label to the platform limit.
///
/// Labels over [`MAX_LABEL_CHARS`] keep their first `MAX_LABEL_CHARS - 1`
/// characters followed by a single ellipsis. Absent labels render empty.
pub fn truncate_label(label: Option<&str>) -> String {
    let Some(label) = label else {
        return String::new();
    };
    if label.chars().count() <= MAX_LABEL_CHARS {
        return label.to_string();
    }
    let mut truncated = label
        .chars()
        .take(MAX_LABEL_CHARS - 1)
        .collect::<String>();
    truncated.push(ELLIPSIS);
    truncated
}

pub(crate) fn truncate_for_error(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut truncated = text.chars().take(max_chars).collect::<String>();
    truncated.push_str("...");
    truncated
}
