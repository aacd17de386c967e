//! Dialog-engine protocol building blocks for the relay.
//!
//! Provides the action and trace types exchanged with the hosted dialog
//! runtime, the rich-text renderer, the trace interpreter that turns one
//! engine turn into outbound message descriptors, and the HTTP client used to
//! reach the runtime.
//!
//! ```rust
//! use relay_dialog::{interpret_traces, MessageDescriptor};
//! use serde_json::json;
//!
//! let traces = vec![json!({
//!     "type": "text",
//!     "payload": { "slate": { "content": [{ "children": [{ "text": "Hi", "fontWeight": "700" }] }] } }
//! })];
//! let turn = interpret_traces(&traces);
//! assert_eq!(
//!     turn.messages,
//!     vec![MessageDescriptor::Text { value: "*Hi*\n".to_string() }]
//! );
//! ```

pub mod action;
pub mod engine_client;
pub mod label;
pub mod rich_text;
pub mod trace;
pub mod trace_interpreter;

pub use action::*;
pub use engine_client::*;
pub use label::*;
pub use rich_text::*;
pub use trace::*;
pub use trace_interpreter::*;
