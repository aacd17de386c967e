//! Graph API client for WhatsApp Cloud API sends.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_LENGTH, CONTENT_TYPE};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

pub const DEFAULT_GRAPH_API_BASE: &str = "https://graph.facebook.com";
pub const DEFAULT_GRAPH_API_VERSION: &str = "v17.0";

#[derive(Debug, Error)]
/// Enumerates failures reported by the Cloud API transport.
pub enum WhatsAppApiError {
    #[error("missing WhatsApp access token")]
    MissingAccessToken,
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("graph api rejected request with status {status} (code {code:?}): {message}")]
    Rejected {
        status: u16,
        code: Option<i64>,
        message: String,
    },
}

impl WhatsAppApiError {
    pub fn graph_error_code(&self) -> Option<i64> {
        match self {
            Self::Rejected { code, .. } => *code,
            Self::MissingAccessToken | Self::Http(_) => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SentMessage {
    pub message_id: Option<String>,
}

#[async_trait]
/// Trait contract for the outbound messaging transport.
pub trait WhatsAppApi: Send + Sync {
    async fn send_message(
        &self,
        phone_number_id: &str,
        payload: &Value,
    ) -> Result<SentMessage, WhatsAppApiError>;

    /// Returns the advertised byte size of a media URL, if any.
    async fn probe_media_size(&self, url: &str) -> Result<Option<u64>, WhatsAppApiError>;
}

#[derive(Debug, Clone)]
pub struct WhatsAppApiConfig {
    pub api_base: String,
    pub api_version: String,
    pub access_token: String,
    pub request_timeout_ms: u64,
}

impl Default for WhatsAppApiConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_GRAPH_API_BASE.to_string(),
            api_version: DEFAULT_GRAPH_API_VERSION.to_string(),
            access_token: String::new(),
            request_timeout_ms: 15_000,
        }
    }
}

#[derive(Debug, Deserialize)]
struct GraphSendResponse {
    #[serde(default)]
    messages: Vec<GraphMessageRef>,
}

#[derive(Debug, Deserialize)]
struct GraphMessageRef {
    id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GraphErrorEnvelope {
    error: GraphErrorBody,
}

#[derive(Debug, Deserialize)]
struct GraphErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    code: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct HttpWhatsAppApi {
    http: reqwest::Client,
    config: WhatsAppApiConfig,
}

impl HttpWhatsAppApi {
    pub fn new(config: WhatsAppApiConfig) -> Result<Self, WhatsAppApiError> {
        if config.access_token.trim().is_empty() {
            return Err(WhatsAppApiError::MissingAccessToken);
        }
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_millis(config.request_timeout_ms.max(1)))
            .build()?;
        Ok(Self { http, config })
    }

    fn messages_endpoint(&self, phone_number_id: &str) -> String {
        format!(
            "{}/{}/{}/messages",
            self.config.api_base.trim_end_matches('/'),
            self.config.api_version.trim_matches('/'),
            phone_number_id.trim()
        )
    }
}

#[async_trait]
impl WhatsAppApi for HttpWhatsAppApi {
    async fn send_message(
        &self,
        phone_number_id: &str,
        payload: &Value,
    ) -> Result<SentMessage, WhatsAppApiError> {
        let response = self
            .http
            .post(self.messages_endpoint(phone_number_id))
            .bearer_auth(self.config.access_token.trim())
            .json(payload)
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(rejection(status.as_u16(), &body));
        }
        let message_id = serde_json::from_str::<GraphSendResponse>(&body)
            .ok()
            .and_then(|parsed| parsed.messages.into_iter().next())
            .and_then(|message| message.id);
        Ok(SentMessage { message_id })
    }

    async fn probe_media_size(&self, url: &str) -> Result<Option<u64>, WhatsAppApiError> {
        let response = self.http.head(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(WhatsAppApiError::Rejected {
                status: status.as_u16(),
                code: None,
                message: format!("media probe for {url} failed"),
            });
        }
        Ok(response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<u64>().ok()))
    }
}

fn rejection(status: u16, body: &str) -> WhatsAppApiError {
    match serde_json::from_str::<GraphErrorEnvelope>(body) {
        Ok(envelope) => WhatsAppApiError::Rejected {
            status,
            code: envelope.error.code,
            message: envelope
                .error
                .message
                .unwrap_or_else(|| "unknown graph api error".to_string()),
        },
        Err(_) => WhatsAppApiError::Rejected {
            status,
            code: None,
            message: body.chars().take(800).collect(),
        },
    }
}
