//! JSON-RPC agent server.
//!
//! Serves an agent card on `/.well-known/agent.json` and the A2A JSON-RPC
//! methods on `/`. Each `message/send` opens a task in a process-local
//! [`TaskTracker`], hands it to an [`AgentExecutor`], returns the finished
//! task and then drops it from the tracker.

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use axum::{extract::State, routing::get, Json, Router};
use gmi_core::{normalize_all, CoreError, CoreResult, ErrorKind, Task, TaskRequest, TaskTracker};
use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::protocol::{
    codes, AgentCard, JsonRpcError, JsonRpcRequest, JsonRpcResponse, MessageSendParams,
    TaskIdParams, WireTask, AGENT_CARD_PATH, JSONRPC_VERSION, METHOD_CANCEL_TASK,
    METHOD_SEND_MESSAGE,
};

/// Runs the work behind one task.
///
/// `execute` receives a task that has been observed (`Submitted`) and must
/// leave it in a terminal state. `cancel` is part of the protocol surface;
/// executors that cannot stop work return `UnsupportedOperation`.
#[async_trait]
pub trait AgentExecutor: Send + Sync {
    async fn execute(&self, request: TaskRequest, tracker: &TaskTracker) -> CoreResult<()>;

    async fn cancel(&self, task_id: &str, _tracker: &TaskTracker) -> CoreResult<()> {
        Err(CoreError::UnsupportedOperation(format!(
            "cancellation of task {} is not supported",
            task_id
        )))
    }

    /// Name given to the artifact in returned tasks.
    fn artifact_name(&self) -> Option<&str> {
        None
    }
}

#[derive(Clone)]
struct ServerState {
    card: Arc<AgentCard>,
    executor: Arc<dyn AgentExecutor>,
    tracker: Arc<TaskTracker>,
}

/// Build the router for one agent.
pub fn router(card: AgentCard, executor: Arc<dyn AgentExecutor>) -> Router {
    let state = ServerState {
        card: Arc::new(card),
        executor,
        tracker: Arc::new(TaskTracker::new()),
    };

    Router::new()
        .route(AGENT_CARD_PATH, get(agent_card))
        .route("/", axum::routing::post(rpc_handler))
        .with_state(state)
}

/// Bind `addr` and serve `router` until the process stops.
pub async fn serve(addr: SocketAddr, router: Router) -> CoreResult<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Agent server listening on {}", addr);
    axum::serve(listener, router).await?;
    Ok(())
}

async fn agent_card(State(state): State<ServerState>) -> Json<AgentCard> {
    Json(state.card.as_ref().clone())
}

async fn rpc_handler(State(state): State<ServerState>, body: String) -> Json<JsonRpcResponse> {
    Json(handle_rpc(&state, &body).await)
}

async fn handle_rpc(state: &ServerState, body: &str) -> JsonRpcResponse {
    let raw: Value = match serde_json::from_str(body) {
        Ok(raw) => raw,
        Err(e) => {
            return JsonRpcResponse::failure(
                Value::Null,
                JsonRpcError::new(codes::PARSE_ERROR, format!("invalid JSON: {}", e)),
            )
        }
    };
    let id = raw.get("id").cloned().unwrap_or(Value::Null);

    let request: JsonRpcRequest = match serde_json::from_value(raw) {
        Ok(request) => request,
        Err(e) => {
            return JsonRpcResponse::failure(
                id,
                JsonRpcError::new(codes::INVALID_REQUEST, e.to_string()),
            )
        }
    };
    if request.jsonrpc != JSONRPC_VERSION {
        return JsonRpcResponse::failure(
            id,
            JsonRpcError::new(codes::INVALID_REQUEST, "jsonrpc must be \"2.0\""),
        );
    }

    let outcome = match request.method.as_str() {
        METHOD_SEND_MESSAGE => on_send_message(state, request.params).await,
        METHOD_CANCEL_TASK => on_cancel(state, request.params).await,
        other => Err(JsonRpcError::new(
            codes::METHOD_NOT_FOUND,
            format!("Unknown method: {}", other),
        )),
    };

    match outcome {
        Ok(result) => JsonRpcResponse::success(id, result),
        Err(error) => JsonRpcResponse::failure(id, error),
    }
}

async fn on_send_message(state: &ServerState, params: Value) -> Result<Value, JsonRpcError> {
    let params: MessageSendParams = serde_json::from_value(params)
        .map_err(|e| JsonRpcError::new(codes::INVALID_PARAMS, e.to_string()))?;

    let message = params.message;
    let task_id = Uuid::new_v4().to_string();
    if let Some(client_task_id) = &message.task_id {
        debug!(task_id = %task_id, client_task_id = %client_task_id, "Assigned fresh task id");
    }
    let request = TaskRequest::new(
        task_id.clone(),
        message.context_id.unwrap_or_default(),
        normalize_all(&message.parts),
    );

    state.tracker.observe(request.clone());
    let record = TaskRecord {
        tracker: &state.tracker,
        task_id: &task_id,
    };
    let result = state.executor.execute(request, &state.tracker).await;

    if let Err(e) = &result {
        warn!(task_id = %task_id, "Task execution failed: {}", e);
        let still_open = state
            .tracker
            .get(&task_id)
            .map(|t| !t.state.is_terminal())
            .unwrap_or(false);
        // Tasks the executor already closed keep their own reason.
        if still_open {
            let _ = state.tracker.fail(&task_id, e.kind(), e.to_string());
        }
    }

    let task = record
        .take()
        .ok_or_else(|| JsonRpcError::new(codes::INTERNAL_ERROR, "task record lost"))?;

    match result {
        Err(e) if matches!(e.kind(), ErrorKind::InvalidParams | ErrorKind::UnsupportedFormat) => {
            Err(JsonRpcError::from(&e))
        }
        _ => {
            let wire = WireTask::from_task(&task, state.executor.artifact_name());
            serde_json::to_value(wire)
                .map_err(|e| JsonRpcError::new(codes::INTERNAL_ERROR, e.to_string()))
        }
    }
}

/// Removes a task from the tracker when the request ends, including when the
/// handler future is dropped mid-execution.
struct TaskRecord<'a> {
    tracker: &'a TaskTracker,
    task_id: &'a str,
}

impl TaskRecord<'_> {
    fn take(self) -> Option<Task> {
        self.tracker.take(self.task_id)
    }
}

impl Drop for TaskRecord<'_> {
    fn drop(&mut self) {
        if self.tracker.take(self.task_id).is_some() {
            debug!(task_id = %self.task_id, "Dropped abandoned task");
        }
    }
}

async fn on_cancel(state: &ServerState, params: Value) -> Result<Value, JsonRpcError> {
    let params: TaskIdParams = serde_json::from_value(params)
        .map_err(|e| JsonRpcError::new(codes::INVALID_PARAMS, e.to_string()))?;
    match state.executor.cancel(&params.id, &state.tracker).await {
        Ok(()) => Err(JsonRpcError::new(
            codes::UNSUPPORTED_OPERATION,
            "cancellation is not supported",
        )),
        Err(e) => Err(JsonRpcError::new(codes::UNSUPPORTED_OPERATION, e.to_string())),
    }
}
