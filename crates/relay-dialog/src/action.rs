//! Actions sent to the dialog engine for one turn.

use serde::{Serialize, Serializer};
use serde_json::{json, Value};

const PATH_ACTION_MARKER: &str = "path-";

#[derive(Debug, Clone, PartialEq, Eq)]
/// Normalized user input for one dialog turn.
pub enum Action {
    Launch,
    Text(String),
    Choice(String),
    Path {
        path_type: String,
        label: String,
    },
    Intent {
        query: String,
        intent_name: String,
        entities: Vec<Value>,
    },
    NoReply,
}

impl Action {
    /// Maps a platform button reply onto the action the engine expects.
    ///
    /// Buttons rendered from path-style choices carry the path type as their
    /// id; everything else is treated as an intent match.
    pub fn from_button_reply(id: &str, title: &str) -> Self {
        if id.contains(PATH_ACTION_MARKER) {
            Self::Path {
                path_type: id.to_string(),
                label: title.to_string(),
            }
        } else {
            Self::Intent {
                query: title.to_string(),
                intent_name: id.to_string(),
                entities: Vec::new(),
            }
        }
    }

    pub fn kind(&self) -> &str {
        match self {
            Self::Launch => "launch",
            Self::Text(_) => "text",
            Self::Choice(_) => "choice",
            Self::Path { path_type, .. } => path_type.as_str(),
            Self::Intent { .. } => "intent",
            Self::NoReply => "no-reply",
        }
    }

    pub fn to_request_value(&self) -> Value {
        match self {
            Self::Launch => json!({ "type": "launch" }),
            Self::Text(text) => json!({ "type": "text", "payload": text }),
            Self::Choice(payload) => json!({ "type": "choice", "payload": payload }),
            Self::Path { path_type, label } => json!({
                "type": path_type,
                "payload": { "label": label }
            }),
            Self::Intent {
                query,
                intent_name,
                entities,
            } => json!({
                "type": "intent",
                "payload": {
                    "query": query,
                    "intent": { "name": intent_name },
                    "entities": entities
                }
            }),
            Self::NoReply => json!({ "type": "no-reply" }),
        }
    }
}

impl Serialize for Action {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.to_request_value().serialize(serializer)
    }
}
