//! # gmi_core
//!
//! Core building blocks of the GMI multi-agent business-analysis framework.
//!
//! This crate owns everything that does not need a network: the canonical
//! message-part model, the content normalizer that turns provider-specific
//! part shapes into that model, the per-request task lifecycle, and the
//! sequential hand-off pipeline that chains role agents together.
//!
//! # Architecture
//!
//! - **Parts**: `MessagePart` is the canonical wire shape (`text` / `file` / `data`)
//! - **Normalizer**: total mapping from arbitrary JSON parts to `MessagePart`
//! - **Tasks**: `TaskTracker` enforces `submitted → working → completed|failed`
//! - **Pipeline**: `PipelineCoordinator` pushes one stage's output into the next
//! - **Dispatch**: `TaskDispatcher` is the seam the pipeline and the host use to
//!   reach remote agents
//!
//! # Example
//!
//! ```rust,ignore
//! use gmi_core::{PipelineCoordinator, PipelinePlan};
//!
//! let plan = PipelinePlan::new(["Stakeholder Agent", "Business Analyst Agent"])?;
//! let run = PipelineCoordinator::new(plan).run(&dispatcher, "We need a time tracker").await;
//! println!("{}", run.output());
//! ```

pub mod config;
pub mod dispatch;
pub mod error;
pub mod mime;
pub mod normalize;
pub mod parts;
pub mod pipeline;
pub mod task;

pub use config::{AgentSettings, GmiConfig, HostSettings, LlmSettings};
pub use dispatch::TaskDispatcher;
pub use error::{CoreError, CoreResult, ErrorKind};
pub use mime::{mime_from_name, DEFAULT_MIME_TYPE};
pub use normalize::{normalize, normalize_all};
pub use parts::{build_parts, joined_text, FilePart, FilePayload, MessagePart};
pub use pipeline::{PipelineCoordinator, PipelinePlan, PipelineRun, RunStatus, StageOutcome};
pub use task::{
    EventLog, Task, TaskEvent, TaskEventSink, TaskRequest, TaskState, TaskTracker,
};
