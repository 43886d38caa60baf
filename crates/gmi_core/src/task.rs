//! Task lifecycle tracking.
//!
//! Every inbound request opens a [`Task`]. The tracker enforces the
//! lifecycle `submitted → working → completed | failed`: states are never
//! revisited, artifacts may only be attached while working, and terminal
//! tasks are frozen.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{CoreError, CoreResult, ErrorKind};
use crate::parts::MessagePart;

/// Lifecycle state of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    /// Observed, not yet validated
    Submitted,
    /// Validated and executing
    Working,
    /// Finished with artifacts
    Completed,
    /// Finished with an error
    Failed,
}

impl TaskState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskState::Submitted => "submitted",
            TaskState::Working => "working",
            TaskState::Completed => "completed",
            TaskState::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskState::Completed | TaskState::Failed)
    }
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The identifiers and message an inbound request carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRequest {
    pub task_id: String,
    pub context_id: String,
    pub message: Vec<MessagePart>,
}

impl TaskRequest {
    pub fn new(
        task_id: impl Into<String>,
        context_id: impl Into<String>,
        message: Vec<MessagePart>,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            context_id: context_id.into(),
            message,
        }
    }

    /// Check that the task id, context id and message are all present.
    pub fn validate(&self) -> CoreResult<()> {
        if self.task_id.trim().is_empty() {
            return Err(CoreError::InvalidParams("task id is required".into()));
        }
        if self.context_id.trim().is_empty() {
            return Err(CoreError::InvalidParams("context id is required".into()));
        }
        if self.message.is_empty() {
            return Err(CoreError::InvalidParams("message is required".into()));
        }
        Ok(())
    }
}

/// A unit of work owned by one inbound request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub task_id: String,
    pub context_id: String,
    pub state: TaskState,
    pub input_parts: Vec<MessagePart>,
    pub artifacts: Vec<MessagePart>,
    pub error: Option<ErrorKind>,
    /// Human-readable detail accompanying the latest status change
    pub status_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    fn submitted(request: TaskRequest) -> Self {
        let now = Utc::now();
        Self {
            task_id: request.task_id,
            context_id: request.context_id,
            state: TaskState::Submitted,
            input_parts: request.message,
            artifacts: Vec::new(),
            error: None,
            status_message: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn request(&self) -> TaskRequest {
        TaskRequest::new(&self.task_id, &self.context_id, self.input_parts.clone())
    }
}

/// Lifecycle notifications published by the tracker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TaskEvent {
    StatusUpdate {
        task_id: String,
        context_id: String,
        state: TaskState,
        message: Option<String>,
        is_final: bool,
    },
    ArtifactUpdate {
        task_id: String,
        context_id: String,
        parts: Vec<MessagePart>,
    },
}

/// Receiver of task lifecycle events.
pub trait TaskEventSink: Send + Sync {
    fn publish(&self, event: TaskEvent);
}

/// Sink that keeps every event in memory.
#[derive(Debug, Default)]
pub struct EventLog {
    events: Mutex<Vec<TaskEvent>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events published so far.
    pub fn events(&self) -> Vec<TaskEvent> {
        self.events.lock().clone()
    }
}

impl TaskEventSink for EventLog {
    fn publish(&self, event: TaskEvent) {
        self.events.lock().push(event);
    }
}

/// Sink that drops events after logging them at debug level.
struct TracingSink;

impl TaskEventSink for TracingSink {
    fn publish(&self, event: TaskEvent) {
        debug!(?event, "Task event");
    }
}

/// In-memory task store keyed by task id.
pub struct TaskTracker {
    tasks: RwLock<HashMap<String, Task>>,
    sink: Arc<dyn TaskEventSink>,
}

impl TaskTracker {
    /// Create a tracker that only logs its events.
    pub fn new() -> Self {
        Self::with_sink(Arc::new(TracingSink))
    }

    /// Create a tracker that publishes events to `sink`.
    pub fn with_sink(sink: Arc<dyn TaskEventSink>) -> Self {
        Self {
            tasks: RwLock::new(HashMap::new()),
            sink,
        }
    }

    /// Record a request. A task id seen for the first time enters `Submitted`;
    /// an already known id returns the existing record unchanged.
    pub fn observe(&self, request: TaskRequest) -> Task {
        let task = {
            let mut tasks = self.tasks.write();
            if let Some(existing) = tasks.get(&request.task_id) {
                return existing.clone();
            }
            let task = Task::submitted(request);
            tasks.insert(task.task_id.clone(), task.clone());
            task
        };

        debug!(task_id = %task.task_id, "Task submitted");
        self.publish_status(&task);
        task
    }

    /// Validate the request and move the task to `Working`.
    ///
    /// A request missing its task id, context id or message moves straight to
    /// `Failed` and the validation error is returned.
    pub fn start_work(&self, task_id: &str) -> CoreResult<Task> {
        let mut rejected = None;
        let task = self.update(task_id, |task| {
            if task.state != TaskState::Submitted {
                return Err(invalid_transition(task, TaskState::Working));
            }
            match task.request().validate() {
                Ok(()) => task.state = TaskState::Working,
                Err(e) => {
                    task.state = TaskState::Failed;
                    task.error = Some(e.kind());
                    task.status_message = Some(e.to_string());
                    rejected = Some(e);
                }
            }
            Ok(())
        })?;

        self.publish_status(&task);
        match rejected {
            None => Ok(task),
            Some(e) => {
                warn!(task_id = %task_id, error = %e, "Task failed validation");
                Err(e)
            }
        }
    }

    /// Attach artifact parts to a working task.
    pub fn add_artifact(&self, task_id: &str, parts: Vec<MessagePart>) -> CoreResult<Task> {
        let task = self.update(task_id, |task| {
            if task.state != TaskState::Working {
                return Err(CoreError::InvalidState(format!(
                    "cannot attach artifact to task {} in state {}",
                    task.task_id, task.state
                )));
            }
            task.artifacts.extend(parts.iter().cloned());
            Ok(())
        })?;

        self.sink.publish(TaskEvent::ArtifactUpdate {
            task_id: task.task_id.clone(),
            context_id: task.context_id.clone(),
            parts,
        });
        Ok(task)
    }

    /// Move a working task to `Completed`.
    pub fn complete(&self, task_id: &str) -> CoreResult<Task> {
        let task = self.update(task_id, |task| {
            if task.state != TaskState::Working {
                return Err(invalid_transition(task, TaskState::Completed));
            }
            task.state = TaskState::Completed;
            Ok(())
        })?;
        self.publish_status(&task);
        Ok(task)
    }

    /// Move a non-terminal task to `Failed`.
    pub fn fail(&self, task_id: &str, kind: ErrorKind, message: impl Into<String>) -> CoreResult<Task> {
        let message = message.into();
        let task = self.update(task_id, |task| {
            if task.state.is_terminal() {
                return Err(invalid_transition(task, TaskState::Failed));
            }
            task.state = TaskState::Failed;
            task.error = Some(kind);
            task.status_message = Some(message.clone());
            Ok(())
        })?;
        self.publish_status(&task);
        Ok(task)
    }

    pub fn get(&self, task_id: &str) -> Option<Task> {
        self.tasks.read().get(task_id).cloned()
    }

    /// Remove and return a task once its result has been consumed.
    pub fn take(&self, task_id: &str) -> Option<Task> {
        self.tasks.write().remove(task_id)
    }

    pub fn len(&self) -> usize {
        self.tasks.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.read().is_empty()
    }

    fn update<F>(&self, task_id: &str, apply: F) -> CoreResult<Task>
    where
        F: FnOnce(&mut Task) -> CoreResult<()>,
    {
        let mut tasks = self.tasks.write();
        let task = tasks
            .get_mut(task_id)
            .ok_or_else(|| CoreError::InvalidState(format!("unknown task: {}", task_id)))?;
        apply(task)?;
        task.updated_at = Utc::now();
        Ok(task.clone())
    }

    fn publish_status(&self, task: &Task) {
        self.sink.publish(TaskEvent::StatusUpdate {
            task_id: task.task_id.clone(),
            context_id: task.context_id.clone(),
            state: task.state,
            message: task.status_message.clone(),
            is_final: task.state.is_terminal(),
        });
    }
}

impl Default for TaskTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TaskTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskTracker")
            .field("tasks", &self.tasks.read().keys().collect::<Vec<_>>())
            .finish()
    }
}

fn invalid_transition(task: &Task, to: TaskState) -> CoreError {
    CoreError::InvalidState(format!(
        "task {} cannot move from {} to {}",
        task.task_id, task.state, to
    ))
}
