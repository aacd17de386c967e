//! Dispatch manager: runs one dialog turn for one conversation.

use std::sync::Arc;

use anyhow::{Context, Result};
use futures_util::future::BoxFuture;
use relay_dialog::{
    interpret_traces, Action, DialogEngine, RenderedTurn, TranscriptRecord, UserVariables,
};
use relay_whatsapp::{
    mark_read, send_typing_indicator, DeliveryReport, InboundMessage, OutboundSender,
};
use tokio::task::JoinHandle;

use crate::config::RelayConfig;
use crate::ingest::MediaIngest;
use crate::no_reply_scheduler::NoReplyScheduler;
use crate::session_table::SessionTable;
use crate::transcript_saver::spawn_transcript_save;

#[derive(Debug, Clone, PartialEq, Eq)]
/// Everything needed to run, or later replay, one turn.
pub struct TurnRequest {
    pub user_id: String,
    pub phone_number_id: String,
    pub user_name: Option<String>,
    pub action: Action,
}

impl TurnRequest {
    pub fn from_inbound(message: &InboundMessage, action: Action) -> Self {
        Self {
            user_id: message.from.clone(),
            phone_number_id: message.phone_number_id.clone(),
            user_name: message.user_name.clone(),
            action,
        }
    }

    fn no_reply(&self) -> Self {
        Self {
            action: Action::NoReply,
            ..self.clone()
        }
    }
}

#[derive(Debug)]
pub struct TurnOutcome {
    pub session_id: String,
    pub rendered: RenderedTurn,
    pub delivery: DeliveryReport,
    /// Session id retired by this turn, when the dialog ended.
    pub ended_session_id: Option<String>,
    pub transcript_task: Option<JoinHandle<()>>,
    pub no_reply_generation: Option<u64>,
}

struct RuntimeInner {
    engine: Arc<dyn DialogEngine>,
    sender: OutboundSender,
    sessions: SessionTable,
    scheduler: NoReplyScheduler,
    ingest: MediaIngest,
    send_read_receipts: bool,
    send_typing_indicator: bool,
}

#[derive(Clone)]
pub struct RelayRuntime {
    inner: Arc<RuntimeInner>,
}

impl RelayRuntime {
    pub fn new(
        engine: Arc<dyn DialogEngine>,
        sender: OutboundSender,
        ingest: MediaIngest,
        config: &RelayConfig,
    ) -> Self {
        let sessions = SessionTable::new(engine.version_id());
        Self {
            inner: Arc::new(RuntimeInner {
                engine,
                sender,
                sessions,
                scheduler: NoReplyScheduler::new(),
                ingest,
                send_read_receipts: config.send_read_receipts,
                send_typing_indicator: config.send_typing_indicator,
            }),
        }
    }

    pub fn sessions(&self) -> &SessionTable {
        &self.inner.sessions
    }

    pub fn scheduler(&self) -> &NoReplyScheduler {
        &self.inner.scheduler
    }

    /// Resolves an inbound message and runs its turn.
    ///
    /// Returns `Ok(None)` for messages that are acknowledged without a turn.
    pub async fn handle_inbound(&self, message: &InboundMessage) -> Result<Option<TurnOutcome>> {
        self.inner.scheduler.cancel(&message.from);
        let Some(action) = self.inner.ingest.resolve_action(&message.content).await? else {
            return Ok(None);
        };
        self.signal_presence(message).await;
        let outcome = self
            .run_turn(TurnRequest::from_inbound(message, action))
            .await?;
        Ok(Some(outcome))
    }

    async fn signal_presence(&self, message: &InboundMessage) {
        let api = self.inner.sender.api().as_ref();
        if self.inner.send_read_receipts {
            if let Some(message_id) = message.message_id.as_deref() {
                mark_read(api, &message.phone_number_id, message_id).await;
            }
        }
        if self.inner.send_typing_indicator {
            send_typing_indicator(
                api,
                &message.phone_number_id,
                &message.from,
                message.message_id.as_deref(),
            )
            .await;
        }
    }

    /// Runs one turn: interact, render, deliver, then settle session state.
    pub async fn run_turn(&self, request: TurnRequest) -> Result<TurnOutcome> {
        let inner = &self.inner;
        inner.scheduler.cancel(&request.user_id);
        let session_id = inner.sessions.ensure(&request.user_id);

        let variables = UserVariables {
            user_id: request.user_id.clone(),
            user_name: request.user_name.clone(),
        };
        if let Err(error) = inner
            .engine
            .update_user_variables(&request.user_id, &variables)
            .await
        {
            tracing::warn!(
                user_id = %request.user_id,
                error = %error,
                "user variable upsert failed; continuing turn"
            );
        }

        let traces = inner
            .engine
            .interact(&request.user_id, &session_id, &request.action)
            .await
            .with_context(|| format!("dialog interact failed for user {}", request.user_id))?;
        let rendered = interpret_traces(&traces);
        tracing::debug!(
            user_id = %request.user_id,
            session_id = %session_id,
            action = request.action.kind(),
            traces = traces.len(),
            messages = rendered.messages.len(),
            "dialog turn rendered"
        );

        let delivery = inner
            .sender
            .deliver(&request.phone_number_id, &request.user_id, &rendered.messages)
            .await;

        let mut ended_session_id = None;
        let mut transcript_task = None;
        if rendered.session_ending {
            let ended = inner
                .sessions
                .retire(&request.user_id)
                .unwrap_or_else(|| session_id.clone());
            tracing::info!(user_id = %request.user_id, session_id = %ended, "dialog session ended");
            transcript_task = spawn_transcript_save(
                Arc::clone(&inner.engine),
                TranscriptRecord {
                    session_id: ended.clone(),
                    user_name: request.user_name.clone(),
                },
            );
            ended_session_id = Some(ended);
        }

        let no_reply_generation = rendered.no_reply.map(|no_reply| {
            let runtime = self.clone();
            let replay = request.no_reply();
            inner
                .scheduler
                .arm(&request.user_id, no_reply.delay, move || {
                    replay_no_reply(runtime, replay)
                })
        });

        Ok(TurnOutcome {
            session_id,
            rendered,
            delivery,
            ended_session_id,
            transcript_task,
            no_reply_generation,
        })
    }
}

fn replay_no_reply(runtime: RelayRuntime, request: TurnRequest) -> BoxFuture<'static, ()> {
    Box::pin(async move {
        let user_id = request.user_id.clone();
        if let Err(error) = runtime.run_turn(request).await {
            tracing::warn!(user_id = %user_id, error = %error, "no-reply turn failed");
        }
    })
}
