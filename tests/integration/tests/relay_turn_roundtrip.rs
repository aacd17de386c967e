use std::{collections::VecDeque, sync::Arc, time::Duration};

use async_trait::async_trait;
use relay_dialog::{
    Action, DialogEngine, DialogEngineConfig, DialogEngineError, HttpDialogEngine,
    TranscriptRecord, UserVariables,
};
use relay_runtime::{MediaIngest, RelayConfig, RelayRuntime, TurnRequest};
use relay_whatsapp::{
    parse_inbound_messages, HttpWhatsAppApi, MediaThrottleConfig, OutboundSender, SentMessage,
    WhatsAppApi, WhatsAppApiConfig, WhatsAppApiError,
};
use serde_json::{json, Value};
use tokio::sync::Mutex as AsyncMutex;

const USER: &str = "15551238888";
const PHONE_NUMBER_ID: &str = "109876";

struct ScriptedEngine {
    turns: AsyncMutex<VecDeque<Vec<Value>>>,
    interactions: AsyncMutex<Vec<(String, Action)>>,
    transcripts: AsyncMutex<Vec<TranscriptRecord>>,
    transcripts_enabled: bool,
}

impl ScriptedEngine {
    fn new(turns: Vec<Vec<Value>>) -> Self {
        Self {
            turns: AsyncMutex::new(VecDeque::from(turns)),
            interactions: AsyncMutex::new(Vec::new()),
            transcripts: AsyncMutex::new(Vec::new()),
            transcripts_enabled: true,
        }
    }

    async fn actions(&self) -> Vec<Action> {
        self.interactions
            .lock()
            .await
            .iter()
            .map(|(_, action)| action.clone())
            .collect()
    }
}

#[async_trait]
impl DialogEngine for ScriptedEngine {
    async fn update_user_variables(
        &self,
        _user_id: &str,
        _variables: &UserVariables,
    ) -> Result<(), DialogEngineError> {
        Ok(())
    }

    async fn interact(
        &self,
        _user_id: &str,
        session_id: &str,
        action: &Action,
    ) -> Result<Vec<Value>, DialogEngineError> {
        self.interactions
            .lock()
            .await
            .push((session_id.to_string(), action.clone()));
        self.turns.lock().await.pop_front().ok_or_else(|| {
            DialogEngineError::InvalidResponse("scripted turn queue exhausted".into())
        })
    }

    async fn save_transcript(
        &self,
        transcript: &TranscriptRecord,
    ) -> Result<(), DialogEngineError> {
        self.transcripts.lock().await.push(transcript.clone());
        Ok(())
    }

    fn version_id(&self) -> &str {
        "production"
    }

    fn transcripts_enabled(&self) -> bool {
        self.transcripts_enabled
    }
}

#[derive(Default)]
struct RecordingApi {
    sent: AsyncMutex<Vec<Value>>,
}

impl RecordingApi {
    async fn sent(&self) -> Vec<Value> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl WhatsAppApi for RecordingApi {
    async fn send_message(
        &self,
        _phone_number_id: &str,
        payload: &Value,
    ) -> Result<SentMessage, WhatsAppApiError> {
        self.sent.lock().await.push(payload.clone());
        Ok(SentMessage::default())
    }

    async fn probe_media_size(&self, _url: &str) -> Result<Option<u64>, WhatsAppApiError> {
        Ok(Some(1_024))
    }
}

fn quiet_config() -> RelayConfig {
    RelayConfig {
        send_read_receipts: false,
        send_typing_indicator: false,
        ..RelayConfig::default()
    }
}

fn relay(engine: Arc<ScriptedEngine>, api: Arc<RecordingApi>) -> RelayRuntime {
    RelayRuntime::new(
        engine,
        OutboundSender::new(api, MediaThrottleConfig::default()),
        MediaIngest::new(),
        &quiet_config(),
    )
}

fn request(action: Action) -> TurnRequest {
    TurnRequest {
        user_id: USER.to_string(),
        phone_number_id: PHONE_NUMBER_ID.to_string(),
        user_name: None,
        action,
    }
}

fn slate_text(text: &str) -> Value {
    json!({
        "type": "text",
        "payload": { "slate": { "content": [{ "children": [
            { "text": "Hello " },
            { "text": text, "fontWeight": "700" }
        ] }] } }
    })
}

fn choice(labels: &[&str]) -> Value {
    let buttons: Vec<Value> = labels
        .iter()
        .map(|label| {
            json!({
                "name": label,
                "request": {
                    "type": format!("path-{}", label.to_lowercase()),
                    "payload": { "label": label }
                }
            })
        })
        .collect();
    json!({ "type": "choice", "payload": { "buttons": buttons } })
}

fn no_reply(seconds: f64) -> Value {
    json!({ "type": "no-reply", "payload": { "timeout": seconds } })
}

#[tokio::test]
async fn integration_choice_turn_sends_single_interactive_message_with_staged_prompt() {
    let engine = Arc::new(ScriptedEngine::new(vec![vec![
        slate_text("Ana"),
        choice(&["Menu", "Hours", "Location", "Careers"]),
    ]]));
    let api = Arc::new(RecordingApi::default());
    let outcome = relay(engine.clone(), api.clone())
        .run_turn(request(Action::Launch))
        .await
        .expect("turn");

    let sent = api.sent().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0]["type"], "interactive");
    assert_eq!(sent[0]["interactive"]["body"]["text"], "Hello *Ana*\n");
    let buttons = sent[0]["interactive"]["action"]["buttons"]
        .as_array()
        .expect("buttons");
    let ids: Vec<&str> = buttons
        .iter()
        .filter_map(|button| button["reply"]["id"].as_str())
        .collect();
    assert_eq!(ids, vec!["path-menu", "path-hours", "path-location"]);
    assert_eq!(outcome.delivery.sent_count(), 1);
    assert!(outcome.no_reply_generation.is_none());
}

#[tokio::test]
async fn integration_end_trace_rotates_session_and_saves_transcript_for_ended_session() {
    let engine = Arc::new(ScriptedEngine::new(vec![
        vec![slate_text("one")],
        vec![slate_text("bye"), json!({ "type": "end" }), no_reply(0.01)],
        vec![slate_text("again")],
    ]));
    let api = Arc::new(RecordingApi::default());
    let relay = relay(engine.clone(), api.clone());

    let first = relay
        .run_turn(request(Action::Text("hi".to_string())))
        .await
        .expect("first turn");
    let second = relay
        .run_turn(request(Action::Text("bye".to_string())))
        .await
        .expect("second turn");
    assert_eq!(first.session_id, second.session_id);
    assert_eq!(second.ended_session_id.as_deref(), Some(first.session_id.as_str()));
    assert!(second.no_reply_generation.is_none());
    second
        .transcript_task
        .expect("transcript task")
        .await
        .expect("transcript task joins");

    let transcripts = engine.transcripts.lock().await.clone();
    assert_eq!(transcripts.len(), 1);
    assert_eq!(transcripts[0].session_id, first.session_id);
    assert_eq!(transcripts[0].display_name(), "Anonymous");

    let third = relay
        .run_turn(request(Action::Text("hello again".to_string())))
        .await
        .expect("third turn");
    assert_ne!(third.session_id, first.session_id);
    assert!(third.session_id.starts_with("production."));
    assert_eq!(relay.scheduler().armed_count(), 0);
}

#[tokio::test]
async fn integration_rearmed_no_reply_replays_only_once_for_latest_turn() {
    let engine = Arc::new(ScriptedEngine::new(vec![
        vec![slate_text("first"), no_reply(0.05)],
        vec![slate_text("second"), no_reply(0.08)],
        vec![json!({ "type": "speak", "payload": { "type": "message", "message": "Still there?" } })],
    ]));
    let api = Arc::new(RecordingApi::default());
    let relay = relay(engine.clone(), api.clone());

    let first = relay
        .run_turn(request(Action::Text("a".to_string())))
        .await
        .expect("first turn");
    let second = relay
        .run_turn(request(Action::Text("b".to_string())))
        .await
        .expect("second turn");
    assert!(second.no_reply_generation > first.no_reply_generation);

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(
        engine.actions().await,
        vec![
            Action::Text("a".to_string()),
            Action::Text("b".to_string()),
            Action::NoReply,
        ]
    );
    let sent = api.sent().await;
    assert_eq!(sent.last().expect("replay message")["text"]["body"], "Still there?");
    assert_eq!(relay.scheduler().armed_count(), 0);
}

#[tokio::test]
async fn integration_webhook_payload_flows_through_http_clients() {
    let server = httpmock::MockServer::start_async().await;
    let variables = server.mock(|when, then| {
        when.method(httpmock::Method::PATCH)
            .path(format!("/state/user/{USER}/variables"))
            .json_body(json!({ "user_id": USER, "user_name": "Ana" }));
        then.status(200).body("{}");
    });
    let interact = server.mock(|when, then| {
        when.method(httpmock::Method::POST)
            .path(format!("/state/user/{USER}/interact"))
            .header("authorization", "VF.DM.key")
            .header("versionID", "production")
            .json_body(json!({
                "action": { "type": "text", "payload": "hello" },
                "config": { "tts": false, "stripSSML": true }
            }));
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!([
                { "type": "visual", "payload": { "image": server.url("/media/menu.png") } },
                { "type": "speak", "payload": { "type": "message", "message": "Here is the menu" } }
            ]));
    });
    let send = server.mock(|when, then| {
        when.method(httpmock::Method::POST)
            .path(format!("/v17.0/{PHONE_NUMBER_ID}/messages"))
            .header("authorization", "Bearer wa-token");
        then.status(200)
            .body(r#"{"messages":[{"id":"wamid.out"}]}"#);
    });
    let probe = server.mock(|when, then| {
        when.method(httpmock::Method::HEAD).path("/media/menu.png");
        then.status(200).header("content-length", "1024");
    });

    let engine = HttpDialogEngine::new(DialogEngineConfig {
        runtime_url: server.base_url(),
        api_key: "VF.DM.key".to_string(),
        version_id: "production".to_string(),
        request_timeout_ms: 5_000,
        ..DialogEngineConfig::default()
    })
    .expect("engine");
    let api = HttpWhatsAppApi::new(WhatsAppApiConfig {
        api_base: server.base_url(),
        access_token: "wa-token".to_string(),
        request_timeout_ms: 5_000,
        ..WhatsAppApiConfig::default()
    })
    .expect("api");
    let relay = RelayRuntime::new(
        Arc::new(engine),
        OutboundSender::new(Arc::new(api), MediaThrottleConfig::default()),
        MediaIngest::new(),
        &quiet_config(),
    );

    let webhook = json!({
        "object": "whatsapp_business_account",
        "entry": [{ "changes": [{ "value": {
            "metadata": { "phone_number_id": PHONE_NUMBER_ID },
            "contacts": [{ "profile": { "name": "Ana" }, "wa_id": USER }],
            "messages": [{ "from": USER, "id": "wamid.in", "type": "text", "text": { "body": "hello" } }]
        } }] }]
    });
    let messages = parse_inbound_messages(&webhook);
    assert_eq!(messages.len(), 1);
    let outcome = relay
        .handle_inbound(&messages[0])
        .await
        .expect("turn")
        .expect("actionable message");

    assert_eq!(outcome.delivery.sent_count(), 2);
    variables.assert();
    interact.assert();
    send.assert_hits(2);
    probe.assert();
}
