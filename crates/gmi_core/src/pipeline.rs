//! Sequential hand-off pipeline.
//!
//! A [`PipelineCoordinator`] drives a fixed list of stages. Each stage is an
//! agent reached through a [`TaskDispatcher`]; its text output becomes the
//! next stage's input. The first failure aborts the run and the best partial
//! result is returned instead of an error.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info};

use crate::dispatch::TaskDispatcher;
use crate::error::{CoreError, CoreResult};
use crate::parts::{joined_text, MessagePart};

/// A validated, finite, repeat-free list of stage names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelinePlan {
    stages: Vec<String>,
}

impl PipelinePlan {
    /// Create a plan. Fails on an empty list or a repeated stage name.
    pub fn new<I, S>(stages: I) -> CoreResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let stages: Vec<String> = stages.into_iter().map(Into::into).collect();
        if stages.is_empty() {
            return Err(CoreError::InvalidConfig(
                "pipeline needs at least one stage".into(),
            ));
        }

        let mut seen = HashSet::new();
        for stage in &stages {
            if stage.trim().is_empty() {
                return Err(CoreError::InvalidConfig("stage name cannot be empty".into()));
            }
            if !seen.insert(stage.as_str()) {
                return Err(CoreError::InvalidConfig(format!(
                    "stage '{}' appears more than once",
                    stage
                )));
            }
        }

        Ok(Self { stages })
    }

    pub fn stages(&self) -> &[String] {
        &self.stages
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

/// Where a run stands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Stage at this index is executing
    Running(usize),
    /// Every stage succeeded
    Completed,
    /// Stage `at_index` failed; later stages never ran
    Aborted { at_index: usize, reason: String },
}

/// Output recorded for one successful stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageOutcome {
    pub stage: String,
    pub output: String,
}

/// State of one pipeline invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineRun {
    pub stages: Vec<String>,
    pub current_index: usize,
    /// Input for the next stage; the best available output once finished
    pub carry_payload: String,
    /// Outputs of the successful stages, in stage order
    pub results: Vec<StageOutcome>,
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl PipelineRun {
    fn start(plan: &PipelinePlan, input: String) -> Self {
        Self {
            stages: plan.stages.clone(),
            current_index: 0,
            carry_payload: input,
            results: Vec::new(),
            status: RunStatus::Running(0),
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Final text, or the last successful stage's output after an abort
    /// (the original input if the first stage failed).
    pub fn output(&self) -> &str {
        &self.carry_payload
    }

    pub fn is_completed(&self) -> bool {
        self.status == RunStatus::Completed
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self.status, RunStatus::Aborted { .. })
    }

    /// Output of a stage, if it ran successfully.
    pub fn result_for(&self, stage: &str) -> Option<&str> {
        self.results
            .iter()
            .find(|r| r.stage == stage)
            .map(|r| r.output.as_str())
    }

    /// Name of the stage that aborted the run.
    pub fn failed_stage(&self) -> Option<&str> {
        match &self.status {
            RunStatus::Aborted { at_index, .. } => self.stages.get(*at_index).map(String::as_str),
            _ => None,
        }
    }
}

/// Runs a [`PipelinePlan`] against a dispatcher.
#[derive(Debug, Clone)]
pub struct PipelineCoordinator {
    plan: PipelinePlan,
}

impl PipelineCoordinator {
    pub fn new(plan: PipelinePlan) -> Self {
        Self { plan }
    }

    pub fn plan(&self) -> &PipelinePlan {
        &self.plan
    }

    /// Run every stage in order, stopping at the first failure.
    pub async fn run(&self, dispatcher: &dyn TaskDispatcher, input: impl Into<String>) -> PipelineRun {
        let mut run = PipelineRun::start(&self.plan, input.into());
        info!(stages = run.stages.len(), "Starting pipeline run");

        for (index, stage) in self.plan.stages.iter().enumerate() {
            run.current_index = index;
            run.status = RunStatus::Running(index);
            info!(stage = %stage, index, "Running stage");

            // Each stage gets its own copy of the carry payload.
            let input = vec![MessagePart::text(run.carry_payload.clone())];
            let outcome = match dispatcher.send_task(stage, input).await {
                Ok(parts) => stage_output(&parts),
                Err(e) => Err(e.to_string()),
            };

            match outcome {
                Ok(output) => {
                    info!(stage = %stage, chars = output.len(), "Stage completed");
                    run.carry_payload = output.clone();
                    run.results.push(StageOutcome {
                        stage: stage.clone(),
                        output,
                    });
                }
                Err(reason) => {
                    error!(stage = %stage, index, "Stage failed: {}", reason);
                    run.status = RunStatus::Aborted {
                        at_index: index,
                        reason,
                    };
                    run.finished_at = Some(Utc::now());
                    return run;
                }
            }
        }

        run.current_index = run.stages.len();
        run.status = RunStatus::Completed;
        run.finished_at = Some(Utc::now());
        info!("Pipeline run completed");
        run
    }
}

/// Extract the hand-off text from a stage's response parts.
///
/// A structured envelope carrying `error` is a failure; one carrying
/// `response_received` hands that field on. Empty output is a failure.
fn stage_output(parts: &[MessagePart]) -> Result<String, String> {
    let mut text = joined_text(parts);
    if text.trim().is_empty() {
        text = parts
            .iter()
            .filter_map(|p| match p {
                MessagePart::Data { data } => Some(render(data)),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n");
    }

    if let Ok(Value::Object(envelope)) = serde_json::from_str::<Value>(text.trim()) {
        if let Some(err) = envelope.get("error").filter(|e| !e.is_null()) {
            return Err(render(err));
        }
        if let Some(received) = envelope.get("response_received") {
            text = render(received);
        }
    }

    if text.trim().is_empty() {
        return Err("stage returned no output".to_string());
    }
    Ok(text)
}

fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
