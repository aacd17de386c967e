use clap::{ArgAction, Parser};
use relay_dialog::{
    DialogEngineConfig, DEFAULT_DIALOG_RUNTIME_URL, DEFAULT_TRANSCRIPT_ICON_URL,
    DEFAULT_TRANSCRIPT_URL,
};
use relay_runtime::{RelayConfig, DEFAULT_BIND_HOST, DEFAULT_PORT};
use relay_whatsapp::{
    MediaThrottleConfig, WhatsAppApiConfig, DEFAULT_GRAPH_API_BASE, DEFAULT_GRAPH_API_VERSION,
    DEFAULT_IMAGE_PROBE_FALLBACK_MS, DEFAULT_IMAGE_THROTTLE_MS_PER_KB,
};

fn parse_positive_u64(value: &str) -> Result<u64, String> {
    let parsed = value
        .parse::<u64>()
        .map_err(|error| format!("failed to parse integer: {error}"))?;
    if parsed == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(parsed)
}

fn parse_port(value: &str) -> Result<u16, String> {
    let parsed = value
        .parse::<u16>()
        .map_err(|error| format!("failed to parse port: {error}"))?;
    if parsed == 0 {
        return Err("port must be greater than 0".to_string());
    }
    Ok(parsed)
}

fn parse_non_empty(value: &str) -> Result<String, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err("value must not be empty".to_string());
    }
    Ok(trimmed.to_string())
}

#[derive(Debug, Parser)]
#[command(
    name = "relay-cli",
    about = "Relays WhatsApp Cloud API webhooks to a hosted dialog runtime",
    version
)]
pub(crate) struct Cli {
    #[arg(
        long = "whatsapp-token",
        env = "WHATSAPP_TOKEN",
        hide_env_values = true,
        value_parser = parse_non_empty,
        help = "Cloud API access token used for outbound sends."
    )]
    pub(crate) whatsapp_token: String,

    #[arg(
        long = "whatsapp-version",
        env = "WHATSAPP_VERSION",
        default_value = DEFAULT_GRAPH_API_VERSION,
        help = "Graph API version segment, e.g. v17.0."
    )]
    pub(crate) whatsapp_version: String,

    #[arg(
        long = "whatsapp-api-base",
        env = "WHATSAPP_API_BASE",
        default_value = DEFAULT_GRAPH_API_BASE,
        help = "Graph API base URL."
    )]
    pub(crate) whatsapp_api_base: String,

    #[arg(
        long = "vf-api-key",
        env = "VF_API_KEY",
        hide_env_values = true,
        value_parser = parse_non_empty,
        help = "Dialog runtime API key."
    )]
    pub(crate) vf_api_key: String,

    #[arg(
        long = "vf-version-id",
        env = "VF_VERSION_ID",
        default_value = "development",
        help = "Dialog version id; also prefixes generated session ids."
    )]
    pub(crate) vf_version_id: String,

    #[arg(
        long = "vf-project-id",
        env = "VF_PROJECT_ID",
        help = "Project id. Transcripts are saved at session end only when set."
    )]
    pub(crate) vf_project_id: Option<String>,

    #[arg(
        long = "vf-dm-url",
        env = "VF_DM_URL",
        default_value = DEFAULT_DIALOG_RUNTIME_URL,
        help = "Dialog runtime base URL."
    )]
    pub(crate) vf_dm_url: String,

    #[arg(
        long = "vf-transcript-url",
        env = "VF_TRANSCRIPT_URL",
        default_value = DEFAULT_TRANSCRIPT_URL,
        help = "Transcript endpoint URL."
    )]
    pub(crate) vf_transcript_url: String,

    #[arg(
        long = "vf-transcript-icon",
        env = "VF_TRANSCRIPT_ICON",
        default_value = DEFAULT_TRANSCRIPT_ICON_URL,
        help = "Avatar image attached to saved transcripts."
    )]
    pub(crate) vf_transcript_icon: String,

    #[arg(
        long = "verify-token",
        env = "VERIFY_TOKEN",
        hide_env_values = true,
        help = "Token expected by the GET /webhook verification handshake."
    )]
    pub(crate) verify_token: Option<String>,

    #[arg(
        long = "bind-host",
        env = "RELAY_BIND_HOST",
        default_value = DEFAULT_BIND_HOST,
        help = "Interface the webhook server binds to."
    )]
    pub(crate) bind_host: String,

    #[arg(
        long = "port",
        env = "PORT",
        default_value_t = DEFAULT_PORT,
        value_parser = parse_port,
        help = "Port the webhook server listens on."
    )]
    pub(crate) port: u16,

    #[arg(
        long = "http-timeout-ms",
        env = "RELAY_HTTP_TIMEOUT_MS",
        default_value_t = 15_000,
        value_parser = parse_positive_u64,
        help = "Request timeout for dialog runtime and Graph API calls."
    )]
    pub(crate) http_timeout_ms: u64,

    #[arg(
        long = "image-throttle-ms-per-kb",
        env = "RELAY_IMAGE_THROTTLE_MS_PER_KB",
        default_value_t = DEFAULT_IMAGE_THROTTLE_MS_PER_KB,
        help = "Delay per kilobyte applied after each sent image."
    )]
    pub(crate) image_throttle_ms_per_kb: u64,

    #[arg(
        long = "image-probe-fallback-ms",
        env = "RELAY_IMAGE_PROBE_FALLBACK_MS",
        default_value_t = DEFAULT_IMAGE_PROBE_FALLBACK_MS,
        help = "Delay applied after a sent image whose size probe failed."
    )]
    pub(crate) image_probe_fallback_ms: u64,

    #[arg(
        long = "read-receipts",
        env = "RELAY_READ_RECEIPTS",
        default_value_t = true,
        action = ArgAction::Set,
        help = "Mark inbound messages as read before each turn."
    )]
    pub(crate) read_receipts: bool,

    #[arg(
        long = "typing-indicator",
        env = "RELAY_TYPING_INDICATOR",
        default_value_t = true,
        action = ArgAction::Set,
        help = "Show a typing indicator while the dialog runtime responds."
    )]
    pub(crate) typing_indicator: bool,
}

impl Cli {
    pub(crate) fn dialog_engine_config(&self) -> DialogEngineConfig {
        DialogEngineConfig {
            runtime_url: self.vf_dm_url.trim().to_string(),
            api_key: self.vf_api_key.clone(),
            version_id: self.vf_version_id.trim().to_string(),
            project_id: self
                .vf_project_id
                .as_deref()
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(str::to_string),
            transcript_url: self.vf_transcript_url.trim().to_string(),
            transcript_icon_url: self.vf_transcript_icon.trim().to_string(),
            request_timeout_ms: self.http_timeout_ms,
        }
    }

    pub(crate) fn whatsapp_api_config(&self) -> WhatsAppApiConfig {
        WhatsAppApiConfig {
            api_base: self.whatsapp_api_base.trim().to_string(),
            api_version: self.whatsapp_version.trim().to_string(),
            access_token: self.whatsapp_token.clone(),
            request_timeout_ms: self.http_timeout_ms,
        }
    }

    pub(crate) fn media_throttle_config(&self) -> MediaThrottleConfig {
        MediaThrottleConfig {
            ms_per_kb: self.image_throttle_ms_per_kb,
            probe_fallback_ms: self.image_probe_fallback_ms,
        }
    }

    pub(crate) fn relay_config(&self) -> RelayConfig {
        RelayConfig {
            bind_host: self.bind_host.trim().to_string(),
            port: self.port,
            verify_token: self.verify_token.clone(),
            send_read_receipts: self.read_receipts,
            send_typing_indicator: self.typing_indicator,
        }
    }
}
