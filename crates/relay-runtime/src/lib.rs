//! Turn orchestration and webhook serving for the dialog relay.
//!
//! Owns per-conversation session ids and no-reply timers, runs one dialog
//! turn per inbound message, and exposes the axum router that receives Cloud
//! API webhooks.

pub mod config;
pub mod dispatch;
pub mod ingest;
pub mod no_reply_scheduler;
pub mod session_table;
pub mod transcript_saver;
pub mod webhook_server;

pub use config::*;
pub use dispatch::*;
pub use ingest::*;
pub use no_reply_scheduler::*;
pub use session_table::*;
pub use transcript_saver::*;
pub use webhook_server::*;
