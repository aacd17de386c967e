//! Best-effort read receipts and typing indicators.

use crate::cloud_api::WhatsAppApi;
use crate::payload::{read_receipt_payload, typing_indicator_payloads};

/// Graph API error code for a parameter the endpoint does not accept.
pub const UNSUPPORTED_PARAMETER_ERROR_CODE: i64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenceOutcome {
    Delivered,
    Unsupported,
    Failed,
}

/// Marks an inbound message as read. Failures are logged, never returned.
pub async fn mark_read(
    api: &dyn WhatsAppApi,
    phone_number_id: &str,
    message_id: &str,
) -> PresenceOutcome {
    match api
        .send_message(phone_number_id, &read_receipt_payload(message_id))
        .await
    {
        Ok(_) => PresenceOutcome::Delivered,
        Err(error) => {
            tracing::debug!(message_id, error = %error, "read receipt rejected");
            PresenceOutcome::Failed
        }
    }
}

/// Shows the typing indicator, trying each payload shape until one is not
/// rejected as unsupported.
pub async fn send_typing_indicator(
    api: &dyn WhatsAppApi,
    phone_number_id: &str,
    to: &str,
    message_id: Option<&str>,
) -> PresenceOutcome {
    for payload in typing_indicator_payloads(to, message_id) {
        match api.send_message(phone_number_id, &payload).await {
            Ok(_) => return PresenceOutcome::Delivered,
            Err(error) if error.graph_error_code() == Some(UNSUPPORTED_PARAMETER_ERROR_CODE) => {
                tracing::debug!(to, error = %error, "typing indicator shape unsupported");
            }
            Err(error) => {
                tracing::debug!(to, error = %error, "typing indicator failed");
                return PresenceOutcome::Failed;
            }
        }
    }
    PresenceOutcome::Unsupported
}
