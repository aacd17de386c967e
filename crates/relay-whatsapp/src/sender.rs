//! Outbound sender: delivers an interpreted turn to one recipient.

use std::sync::Arc;
use std::time::Duration;

use relay_dialog::MessageDescriptor;

use crate::cloud_api::WhatsAppApi;
use crate::payload::build_message_payload;

pub const DEFAULT_IMAGE_THROTTLE_MS_PER_KB: u64 = 10;
pub const DEFAULT_IMAGE_PROBE_FALLBACK_MS: u64 = 5_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Pacing applied after each delivered image so later messages do not
/// overtake it on the recipient's device.
pub struct MediaThrottleConfig {
    pub ms_per_kb: u64,
    pub probe_fallback_ms: u64,
}

impl Default for MediaThrottleConfig {
    fn default() -> Self {
        Self {
            ms_per_kb: DEFAULT_IMAGE_THROTTLE_MS_PER_KB,
            probe_fallback_ms: DEFAULT_IMAGE_PROBE_FALLBACK_MS,
        }
    }
}

impl MediaThrottleConfig {
    /// Delay for an image of `content_length` bytes; fractional kilobytes count.
    pub fn delay_for_size(&self, content_length: u64) -> Duration {
        let micros = u128::from(content_length) * u128::from(self.ms_per_kb) * 1_000 / 1_024;
        Duration::from_micros(u64::try_from(micros).unwrap_or(u64::MAX))
    }

    pub fn probe_fallback(&self) -> Duration {
        Duration::from_millis(self.probe_fallback_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryStatus {
    Sent { message_id: Option<String> },
    Failed { error: String },
    /// Consumed as the prompt of a following button message, or dropped.
    Staged,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReceipt {
    pub index: usize,
    pub kind: &'static str,
    pub status: DeliveryStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub receipts: Vec<DeliveryReceipt>,
}

impl DeliveryReport {
    pub fn sent_count(&self) -> usize {
        self.receipts
            .iter()
            .filter(|receipt| matches!(receipt.status, DeliveryStatus::Sent { .. }))
            .count()
    }

    pub fn failed_count(&self) -> usize {
        self.receipts
            .iter()
            .filter(|receipt| matches!(receipt.status, DeliveryStatus::Failed { .. }))
            .count()
    }
}

#[derive(Clone)]
pub struct OutboundSender {
    api: Arc<dyn WhatsAppApi>,
    throttle: MediaThrottleConfig,
}

impl OutboundSender {
    pub fn new(api: Arc<dyn WhatsAppApi>, throttle: MediaThrottleConfig) -> Self {
        Self { api, throttle }
    }

    pub fn api(&self) -> &Arc<dyn WhatsAppApi> {
        &self.api
    }

    /// Sends every descriptor in order. A failed send is recorded and the
    /// walk continues with the next descriptor.
    pub async fn deliver(
        &self,
        phone_number_id: &str,
        to: &str,
        messages: &[MessageDescriptor],
    ) -> DeliveryReport {
        let mut report = DeliveryReport::default();
        for (index, descriptor) in messages.iter().enumerate() {
            let previous = index.checked_sub(1).and_then(|prev| messages.get(prev));
            let Some(payload) = build_message_payload(to, descriptor, previous) else {
                report.receipts.push(DeliveryReceipt {
                    index,
                    kind: descriptor.kind(),
                    status: DeliveryStatus::Staged,
                });
                continue;
            };

            let status = match self.api.send_message(phone_number_id, &payload).await {
                Ok(sent) => {
                    tracing::debug!(to, descriptor = descriptor.kind(), "outbound message sent");
                    if let MessageDescriptor::Image { value } = descriptor {
                        self.pace_after_image(value).await;
                    }
                    DeliveryStatus::Sent {
                        message_id: sent.message_id,
                    }
                }
                Err(error) => {
                    tracing::warn!(
                        to,
                        descriptor = descriptor.kind(),
                        error = %error,
                        "outbound message failed"
                    );
                    DeliveryStatus::Failed {
                        error: error.to_string(),
                    }
                }
            };
            report.receipts.push(DeliveryReceipt {
                index,
                kind: descriptor.kind(),
                status,
            });
        }
        report
    }

    async fn pace_after_image(&self, url: &str) {
        let delay = match self.api.probe_media_size(url).await {
            Ok(Some(size)) => self.throttle.delay_for_size(size),
            Ok(None) => return,
            Err(error) => {
                tracing::warn!(url, error = %error, "image size probe failed");
                self.throttle.probe_fallback()
            }
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}
