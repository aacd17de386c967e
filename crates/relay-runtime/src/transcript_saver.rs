//! Detached transcript persistence for ended sessions.

use std::sync::Arc;

use relay_dialog::{DialogEngine, TranscriptRecord};
use tokio::task::JoinHandle;

/// Spawns a fire-and-forget transcript save.
///
/// Returns `None` when the engine has no transcript destination configured.
/// Callers drop the handle; it is returned so tests can await completion.
pub fn spawn_transcript_save(
    engine: Arc<dyn DialogEngine>,
    record: TranscriptRecord,
) -> Option<JoinHandle<()>> {
    if !engine.transcripts_enabled() {
        return None;
    }
    Some(tokio::spawn(async move {
        match engine.save_transcript(&record).await {
            Ok(()) => tracing::info!(
                session_id = %record.session_id,
                user_name = record.display_name(),
                "transcript saved"
            ),
            Err(error) => tracing::warn!(
                session_id = %record.session_id,
                error = %error,
                "transcript save failed"
            ),
        }
    }))
}
