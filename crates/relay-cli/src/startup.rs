use std::sync::Arc;

use anyhow::{Context, Result};
use relay_dialog::HttpDialogEngine;
use relay_runtime::{serve_webhooks, MediaIngest, RelayRuntime, WebhookState};
use relay_whatsapp::{HttpWhatsAppApi, OutboundSender};

use crate::cli_args::Cli;

pub(crate) async fn run_relay(cli: Cli) -> Result<()> {
    let engine_config = cli.dialog_engine_config();
    let relay_config = cli.relay_config();
    if relay_config.verify_token().is_none() {
        tracing::warn!("VERIFY_TOKEN is not set; webhook verification requests will be rejected");
    }
    if engine_config.project_id.is_none() {
        tracing::info!("VF_PROJECT_ID is not set; transcripts will not be saved");
    }

    let engine =
        HttpDialogEngine::new(engine_config).context("failed to build dialog engine client")?;
    let api = HttpWhatsAppApi::new(cli.whatsapp_api_config())
        .context("failed to build WhatsApp Cloud API client")?;
    let sender = OutboundSender::new(Arc::new(api), cli.media_throttle_config());
    let runtime = RelayRuntime::new(Arc::new(engine), sender, MediaIngest::new(), &relay_config);

    let state = Arc::new(WebhookState::new(runtime, &relay_config));
    serve_webhooks(&relay_config, state).await
}
