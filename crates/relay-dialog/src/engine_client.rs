//! HTTP client for the hosted dialog runtime.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, Url};
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;

use crate::action::Action;
use crate::label::truncate_for_error;

pub const DEFAULT_DIALOG_RUNTIME_URL: &str = "https://general-runtime.voiceflow.com";
pub const DEFAULT_TRANSCRIPT_URL: &str = "https://api.voiceflow.com/v2/transcripts";
pub const DEFAULT_TRANSCRIPT_ICON_URL: &str =
    "https://s3.amazonaws.com/com.voiceflow.studio/share/200x200/200x200.png";
const ANONYMOUS_USER_NAME: &str = "Anonymous";

#[derive(Debug, Error)]
/// Enumerates failures talking to the dialog runtime.
pub enum DialogEngineError {
    #[error("missing dialog engine API key")]
    MissingApiKey,
    #[error("invalid dialog engine url '{0}'")]
    InvalidUrl(String),
    #[error("transcript saving requires a project id")]
    MissingProjectId,
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("dialog engine {operation} returned non-success status {status}: {body}")]
    HttpStatus {
        operation: &'static str,
        status: u16,
        body: String,
    },
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
/// Variables upserted on the engine's user state before each turn.
pub struct UserVariables {
    pub user_id: String,
    pub user_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptRecord {
    pub session_id: String,
    pub user_name: Option<String>,
}

impl TranscriptRecord {
    pub fn display_name(&self) -> &str {
        self.user_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(ANONYMOUS_USER_NAME)
    }
}

#[async_trait]
/// Trait contract for the dialog runtime used by the relay.
pub trait DialogEngine: Send + Sync {
    async fn update_user_variables(
        &self,
        user_id: &str,
        variables: &UserVariables,
    ) -> Result<(), DialogEngineError>;

    /// Sends one action and returns the raw trace sequence of the turn.
    async fn interact(
        &self,
        user_id: &str,
        session_id: &str,
        action: &Action,
    ) -> Result<Vec<Value>, DialogEngineError>;

    async fn save_transcript(&self, transcript: &TranscriptRecord)
        -> Result<(), DialogEngineError>;

    fn version_id(&self) -> &str;

    fn transcripts_enabled(&self) -> bool;
}

#[derive(Debug, Clone)]
/// Public struct `DialogEngineConfig` used by the relay runtime.
pub struct DialogEngineConfig {
    pub runtime_url: String,
    pub api_key: String,
    pub version_id: String,
    pub project_id: Option<String>,
    pub transcript_url: String,
    pub transcript_icon_url: String,
    pub request_timeout_ms: u64,
}

impl Default for DialogEngineConfig {
    fn default() -> Self {
        Self {
            runtime_url: DEFAULT_DIALOG_RUNTIME_URL.to_string(),
            api_key: String::new(),
            version_id: "development".to_string(),
            project_id: None,
            transcript_url: DEFAULT_TRANSCRIPT_URL.to_string(),
            transcript_icon_url: DEFAULT_TRANSCRIPT_ICON_URL.to_string(),
            request_timeout_ms: 15_000,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpDialogEngine {
    client: reqwest::Client,
    runtime_url: Url,
    transcript_url: Url,
    config: DialogEngineConfig,
}

impl HttpDialogEngine {
    pub fn new(config: DialogEngineConfig) -> Result<Self, DialogEngineError> {
        if config.api_key.trim().is_empty() {
            return Err(DialogEngineError::MissingApiKey);
        }
        let runtime_url = parse_url(&config.runtime_url)?;
        let transcript_url = parse_url(&config.transcript_url)?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_millis(config.request_timeout_ms.max(1)))
            .build()?;

        Ok(Self {
            client,
            runtime_url,
            transcript_url,
            config,
        })
    }

    fn user_state_url(&self, user_id: &str, endpoint: &str) -> Result<Url, DialogEngineError> {
        let mut url = self.runtime_url.clone();
        url.path_segments_mut()
            .map_err(|_| DialogEngineError::InvalidUrl(self.config.runtime_url.clone()))?
            .pop_if_empty()
            .extend(["state", "user", user_id, endpoint]);
        Ok(url)
    }

    async fn send(
        &self,
        operation: &'static str,
        method: Method,
        url: Url,
        headers: &[(&'static str, &str)],
        body: &Value,
    ) -> Result<reqwest::Response, DialogEngineError> {
        let mut request = self
            .client
            .request(method, url)
            .header(AUTHORIZATION, self.config.api_key.trim())
            .json(body);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(DialogEngineError::HttpStatus {
            operation,
            status: status.as_u16(),
            body: truncate_for_error(&body, 800),
        })
    }
}

#[async_trait]
impl DialogEngine for HttpDialogEngine {
    async fn update_user_variables(
        &self,
        user_id: &str,
        variables: &UserVariables,
    ) -> Result<(), DialogEngineError> {
        let url = self.user_state_url(user_id, "variables")?;
        let body = serde_json::to_value(variables)
            .map_err(|error| DialogEngineError::InvalidResponse(error.to_string()))?;
        self.send("variables", Method::PATCH, url, &[], &body).await?;
        Ok(())
    }

    async fn interact(
        &self,
        user_id: &str,
        session_id: &str,
        action: &Action,
    ) -> Result<Vec<Value>, DialogEngineError> {
        let url = self.user_state_url(user_id, "interact")?;
        let body = json!({
            "action": action,
            "config": { "tts": false, "stripSSML": true }
        });
        let response = self
            .send(
                "interact",
                Method::POST,
                url,
                &[
                    ("versionID", self.config.version_id.as_str()),
                    ("sessionID", session_id),
                ],
                &body,
            )
            .await?;
        let payload = response.json::<Value>().await?;
        traces_from_interact_response(payload)
    }

    async fn save_transcript(
        &self,
        transcript: &TranscriptRecord,
    ) -> Result<(), DialogEngineError> {
        let project_id = self
            .config
            .project_id
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or(DialogEngineError::MissingProjectId)?;
        let body = json!({
            "browser": "WhatsApp",
            "device": "desktop",
            "os": "server",
            "sessionID": transcript.session_id,
            "unread": true,
            "versionID": self.config.version_id,
            "projectID": project_id,
            "user": {
                "name": transcript.display_name(),
                "image": self.config.transcript_icon_url,
            }
        });
        self.send(
            "transcript",
            Method::PUT,
            self.transcript_url.clone(),
            &[],
            &body,
        )
        .await?;
        Ok(())
    }

    fn version_id(&self) -> &str {
        &self.config.version_id
    }

    fn transcripts_enabled(&self) -> bool {
        self.config
            .project_id
            .as_deref()
            .is_some_and(|value| !value.trim().is_empty())
    }
}

fn parse_url(raw: &str) -> Result<Url, DialogEngineError> {
    let url = Url::parse(raw.trim()).map_err(|_| DialogEngineError::InvalidUrl(raw.to_string()))?;
    if url.cannot_be_a_base() {
        return Err(DialogEngineError::InvalidUrl(raw.to_string()));
    }
    Ok(url)
}

/// Extracts the trace array from an interact response body.
///
/// The runtime returns a bare array; newer deployments wrap it as
/// `{ "trace": [...] }`.
pub fn traces_from_interact_response(payload: Value) -> Result<Vec<Value>, DialogEngineError> {
    match payload {
        Value::Array(traces) => Ok(traces),
        Value::Object(mut object) => match object.remove("trace") {
            Some(Value::Array(traces)) => Ok(traces),
            _ => Err(DialogEngineError::InvalidResponse(
                "interact response object did not contain a trace array".to_string(),
            )),
        },
        other => Err(DialogEngineError::InvalidResponse(format!(
            "interact response must be a trace array, found {}",
            truncate_for_error(&other.to_string(), 200)
        ))),
    }
}
