//! Media ingestion seams and inbound-to-action resolution.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use relay_dialog::Action;
use relay_whatsapp::InboundContent;

#[async_trait]
/// Speech-to-text for inbound voice notes.
pub trait AudioTranscriber: Send + Sync {
    async fn transcribe(&self, media_id: &str) -> Result<String>;
}

#[async_trait]
/// Uploads an inbound image and returns its public URL.
pub trait ImageStore: Send + Sync {
    async fn store(&self, media_id: &str) -> Result<String>;
}

#[derive(Clone, Default)]
pub struct MediaIngest {
    transcriber: Option<Arc<dyn AudioTranscriber>>,
    image_store: Option<Arc<dyn ImageStore>>,
}

impl MediaIngest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_transcriber(mut self, transcriber: Arc<dyn AudioTranscriber>) -> Self {
        self.transcriber = Some(transcriber);
        self
    }

    pub fn with_image_store(mut self, image_store: Arc<dyn ImageStore>) -> Self {
        self.image_store = Some(image_store);
        self
    }

    /// Resolves inbound content into the action for this turn.
    ///
    /// `Ok(None)` means the message is acknowledged without a turn.
    pub async fn resolve_action(&self, content: &InboundContent) -> Result<Option<Action>> {
        if let Some(action) = content.direct_action() {
            return Ok(Some(action));
        }
        match content {
            InboundContent::Audio { media_id } => {
                let Some(transcriber) = &self.transcriber else {
                    tracing::debug!(media_id, "no transcriber configured; ignoring audio");
                    return Ok(None);
                };
                let transcript = transcriber
                    .transcribe(media_id)
                    .await
                    .with_context(|| format!("failed to transcribe audio {media_id}"))?;
                let transcript = transcript.trim();
                Ok((!transcript.is_empty()).then(|| Action::Text(transcript.to_string())))
            }
            InboundContent::Image { media_id, .. } => {
                let Some(image_store) = &self.image_store else {
                    tracing::debug!(media_id, "no image store configured; ignoring image");
                    return Ok(None);
                };
                let url = image_store
                    .store(media_id)
                    .await
                    .with_context(|| format!("failed to store image {media_id}"))?;
                Ok(Some(Action::Text(url)))
            }
            InboundContent::Unsupported { kind } => {
                tracing::debug!(kind = %kind, "ignoring unsupported inbound message");
                Ok(None)
            }
            InboundContent::Text(_) | InboundContent::Reply { .. } => Ok(None),
        }
    }
}
