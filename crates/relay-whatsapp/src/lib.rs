//! WhatsApp Cloud API transport for the dialog relay.
//!
//! Parses inbound webhook payloads, shapes outbound message payloads from
//! interpreter descriptors, and delivers them through the Graph API.

pub mod cloud_api;
pub mod inbound;
pub mod payload;
pub mod presence;
pub mod sender;

pub use cloud_api::*;
pub use inbound::*;
pub use payload::*;
pub use presence::*;
pub use sender::*;
