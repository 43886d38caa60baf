//! # gmi_agents
//!
//! The five business-analysis role agents of GMI.
//!
//! Each role wraps one LLM call with a role prompt and emits a Markdown
//! document. Roles are served over A2A through [`RoleAgentExecutor`] and
//! chained by the stakeholder pipeline in [`chain`].
//!
//! ## Roles
//!
//! | Role | Card name | Port | Artifact |
//! |------|-----------|------|----------|
//! | Stakeholder | Stakeholder Requirements Agent | 10004 | `stakeholder_brief.md` |
//! | Business Analyst | Business Analyst Agent | 10005 | `business_requirements.md` |
//! | Domain Expert | Domain Expert Agent | 10006 | `domain_validation.md` |
//! | Product Manager | Product Manager Agent | 10007 | `product_roadmap.md` |
//! | Agile PM | Agile Project Manager Agent | 10008 | `sprint_plan.md` |

pub mod agent;
pub mod artifact;
pub mod chain;
pub mod error;
pub mod executor;
pub mod ingest;
pub mod llm;
pub mod prompts;
pub mod roles;

pub use agent::RoleAgent;
pub use artifact::MarkdownSink;
pub use chain::{render_report, stakeholder_plan};
pub use error::{AgentError, AgentResult};
pub use executor::RoleAgentExecutor;
pub use ingest::{DocumentExtractor, Extraction, ExtractionStats, PlainTextExtractor};
pub use llm::{LanguageModel, LlmAdapter, LlmProvider, ModelConfig, DEFAULT_LLM_TIMEOUT};
pub use roles::AgentRole;
