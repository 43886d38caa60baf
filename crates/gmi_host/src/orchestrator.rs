//! The host agent.
//!
//! A turn starts from a [`HostRequest`]. Direct requests go straight to the
//! named agent. Queries run a reasoning loop: the language model picks
//! agents to call through the `send_message` tool until it produces a final
//! answer. Hosts without a model route queries by keyword instead.
//!
//! [`HostAgent::stream`] runs the turn on a worker task. A second task waits
//! for the worker and emits the single terminal event, so errors and panics
//! inside the turn still end the stream with one `Completed` event.

use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use futures::Stream;
use gmi_a2a::A2aClient;
use gmi_agents::{LanguageModel, ModelConfig};
use gmi_core::{joined_text, normalize_all, CoreError, MessagePart, TaskDispatcher};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{error, info, warn};

use crate::error::{HostError, HostResult};
use crate::events::{HostEvent, THINKING};
use crate::reasoning::{parse_step, Step, STEP_PROTOCOL};
use crate::request::HostRequest;
use crate::routing::fallback_agent;
use crate::session::{SessionStore, Speaker};

/// Default bound on `send_message` calls per turn.
pub const DEFAULT_MAX_TOOL_CALLS: usize = 8;

/// Default bound on one reasoning call to the language model.
pub const DEFAULT_MODEL_TIMEOUT: Duration = Duration::from_secs(120);

/// An agent the host can delegate to, as listed in its instructions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgentEntry {
    pub name: String,
    pub description: String,
}

pub struct HostAgent {
    dispatcher: Arc<dyn TaskDispatcher>,
    directory: Vec<AgentEntry>,
    model: Option<Arc<dyn LanguageModel>>,
    sessions: SessionStore,
    max_tool_calls: usize,
    model_timeout: Duration,
}

impl HostAgent {
    /// Host over any dispatcher. Agents are listed by name only.
    pub fn new(dispatcher: Arc<dyn TaskDispatcher>) -> Self {
        let directory = dispatcher
            .agent_names()
            .into_iter()
            .map(|name| AgentEntry {
                name,
                description: String::new(),
            })
            .collect();
        Self {
            dispatcher,
            directory,
            model: None,
            sessions: SessionStore::new(),
            max_tool_calls: DEFAULT_MAX_TOOL_CALLS,
            model_timeout: DEFAULT_MODEL_TIMEOUT,
        }
    }

    /// Host over discovered A2A agents, listed with their card descriptions.
    pub fn from_client(client: A2aClient) -> Self {
        let directory = client
            .descriptors()
            .into_iter()
            .map(|d| AgentEntry {
                name: d.name.clone(),
                description: d.description.clone(),
            })
            .collect();
        let mut host = Self::new(Arc::new(client));
        host.directory = directory;
        host
    }

    pub fn with_model(mut self, model: Arc<dyn LanguageModel>) -> Self {
        self.model = Some(model);
        self
    }

    pub fn with_max_tool_calls(mut self, max_tool_calls: usize) -> Self {
        self.max_tool_calls = max_tool_calls.max(1);
        self
    }

    /// Bound each reasoning call. A model that does not answer in time ends
    /// the turn with an error.
    pub fn with_model_timeout(mut self, timeout: Duration) -> Self {
        self.model_timeout = timeout;
        self
    }

    /// Keep at most `max_sessions` conversations in memory.
    pub fn with_max_sessions(mut self, max_sessions: usize) -> Self {
        self.sessions = SessionStore::with_capacity(max_sessions);
        self
    }

    pub fn has_model(&self) -> bool {
        self.model.is_some()
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// System prompt for the reasoning loop.
    pub fn root_instruction(&self, today: NaiveDate) -> String {
        let agents = if self.directory.is_empty() {
            "No agents found".to_string()
        } else {
            self.directory
                .iter()
                .filter_map(|entry| serde_json::to_string(entry).ok())
                .collect::<Vec<_>>()
                .join("\n")
        };

        format!(
            "**Role:** You are the Host Agent, an orchestrator that coordinates business-analysis \
             work across remote agents.\n\n\
             **Directives:**\n\
             * Decide which remote agents can handle the request and delegate to them with `send_message`.\n\
             * Messages may carry text, files (PDF, Word, images, audio) or structured data.\n\
             * Combine agent responses into one clear answer.\n\
             * Always say which agents you contacted and why.\n\
             * Rely only on the agents listed below and their responses.\n\n\
             **Today's Date:** {}\n\n\
             <Available Agents>\n{}\n</Available Agents>\n\n{}",
            today.format("%Y-%m-%d"),
            agents,
            STEP_PROTOCOL
        )
    }

    /// Run one turn and stream its progress.
    ///
    /// Yields zero or more `Working` events followed by exactly one
    /// `Completed`. Must be called inside a tokio runtime.
    pub fn stream(
        self: &Arc<Self>,
        request: HostRequest,
        session_id: &str,
    ) -> impl Stream<Item = HostEvent> + Send + Unpin + 'static {
        let (tx, rx) = mpsc::channel(32);
        let host = Arc::clone(self);
        let session_id = session_id.to_string();
        let status_tx = tx.clone();

        let worker =
            tokio::spawn(async move { host.run_turn(request, &session_id, &status_tx).await });

        tokio::spawn(async move {
            let terminal = match worker.await {
                Ok(Ok(content)) => HostEvent::Completed { content },
                Ok(Err(e)) => {
                    error!("Host turn failed: {}", e);
                    HostEvent::failed(e)
                }
                Err(e) => {
                    error!("Host worker aborted: {}", e);
                    HostEvent::failed(HostError::Worker(e.to_string()))
                }
            };
            let _ = tx.send(terminal).await;
        });

        ReceiverStream::new(rx)
    }

    async fn run_turn(
        &self,
        request: HostRequest,
        session_id: &str,
        events: &mpsc::Sender<HostEvent>,
    ) -> HostResult<Vec<MessagePart>> {
        let handle = self.sessions.get_or_create(session_id);
        let mut session = handle.lock().await;
        let _ = events.send(HostEvent::working(THINKING)).await;

        let history = session.render();
        session.record(Speaker::User, request.transcript_text());

        let content = match request {
            HostRequest::Direct { agent, parts } => {
                let _ = events
                    .send(HostEvent::working(format!("Sending message to {}...", agent)))
                    .await;
                self.send_message(&agent, parts).await
            }
            HostRequest::Query { text } => match &self.model {
                Some(model) => self.reason(model.as_ref(), &history, &text, events).await?,
                None => self.route_by_keyword(&text, events).await,
            },
        };

        session.record(Speaker::Assistant, joined_text(&content));
        Ok(content)
    }

    async fn reason(
        &self,
        model: &dyn LanguageModel,
        history: &str,
        query: &str,
        events: &mpsc::Sender<HostEvent>,
    ) -> HostResult<Vec<MessagePart>> {
        let config = ModelConfig::new(self.root_instruction(Utc::now().date_naive()));
        let mut prompt = String::new();
        if !history.is_empty() {
            prompt.push_str("Conversation so far:\n");
            prompt.push_str(history);
            prompt.push_str("\n\n");
        }
        prompt.push_str(&format!("User: {}", query));

        let mut files = Vec::new();
        let mut calls = 0;
        let mut limit_announced = false;

        loop {
            let reply = tokio::time::timeout(self.model_timeout, model.complete(&prompt, &config))
                .await
                .map_err(|_| HostError::ModelTimeout(self.model_timeout))??;
            let (agent_name, parts) = match parse_step(&reply) {
                Step::Final { text } => return Ok(assemble(text, files)),
                Step::SendMessage { agent_name, parts } => (agent_name, parts),
            };

            if calls >= self.max_tool_calls {
                if limit_announced {
                    warn!(calls, "Model kept calling agents past the limit");
                    return Ok(assemble(
                        format!("Stopped after {} agent calls without a final answer.", calls),
                        files,
                    ));
                }
                limit_announced = true;
                prompt.push_str(&format!(
                    "\n\nTool: the limit of {} agent calls for this request is reached. Give your final answer now.",
                    self.max_tool_calls
                ));
                continue;
            }

            calls += 1;
            let _ = events
                .send(HostEvent::working(format!("Sending message to {}...", agent_name)))
                .await;
            let result = self.send_message(&agent_name, normalize_all(&parts)).await;
            files.extend(result.iter().filter(|p| p.is_file()).cloned());

            prompt.push_str(&format!(
                "\n\nAssistant: {}\n\nTool result from {}:\n{}",
                reply.trim(),
                agent_name,
                describe(&result)
            ));
        }
    }

    async fn route_by_keyword(
        &self,
        text: &str,
        events: &mpsc::Sender<HostEvent>,
    ) -> Vec<MessagePart> {
        let available = self.dispatcher.agent_names();
        match fallback_agent(text, &available) {
            Some(agent) => {
                let _ = events
                    .send(HostEvent::working(format!("Routing to {}...", agent)))
                    .await;
                self.send_message(&agent, vec![MessagePart::text(text)]).await
            }
            None => {
                let listed = if available.is_empty() {
                    "none".to_string()
                } else {
                    available.join(", ")
                };
                vec![MessagePart::text(format!(
                    "No matching agent found for this request. Available agents: {}",
                    listed
                ))]
            }
        }
    }

    /// The `send_message` tool. Failures come back as text parts.
    async fn send_message(&self, agent: &str, parts: Vec<MessagePart>) -> Vec<MessagePart> {
        info!(agent, parts = parts.len(), "Delegating to agent");
        match self.dispatcher.send_task(agent, parts).await {
            Ok(parts) => parts,
            Err(CoreError::TransportTimeout { .. }) => {
                warn!(agent, "Agent timed out");
                vec![MessagePart::text(format!(
                    "Timeout error communicating with {}. The request may have been too large or the agent is busy.",
                    agent
                ))]
            }
            Err(e) => {
                warn!(agent, "Agent call failed: {}", e);
                vec![MessagePart::text(format!(
                    "Error communicating with {}: {}",
                    agent, e
                ))]
            }
        }
    }
}

fn assemble(text: String, files: Vec<MessagePart>) -> Vec<MessagePart> {
    let mut content = vec![MessagePart::text(text)];
    content.extend(files);
    content
}

/// Render tool output for the model's prompt.
fn describe(parts: &[MessagePart]) -> String {
    if parts.is_empty() {
        return "(no content)".to_string();
    }
    parts
        .iter()
        .map(|part| match part {
            MessagePart::Text { text } => text.clone(),
            MessagePart::Data { data } => data.to_string(),
            MessagePart::File { file } => format!("[file: {} ({})]", file.name, file.mime_type),
        })
        .collect::<Vec<_>>()
        .join("\n")
}
