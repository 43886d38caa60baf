//! Business-analysis role definitions.

use gmi_a2a::{AgentCapabilities, AgentCard, AgentSkill};
use serde::{Deserialize, Serialize};

use crate::error::{AgentError, AgentResult};

const MULTIMODAL_INPUTS: &[&str] = &[
    "text/plain",
    "application/pdf",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "image/jpeg",
    "image/png",
    "audio/wav",
    "audio/mp3",
];

const TEXT_INPUTS: &[&str] = &["text/plain"];

/// The five roles of the hand-off chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    Stakeholder,
    BusinessAnalyst,
    DomainExpert,
    ProductManager,
    AgilePm,
}

impl AgentRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentRole::Stakeholder => "stakeholder",
            AgentRole::BusinessAnalyst => "business_analyst",
            AgentRole::DomainExpert => "domain_expert",
            AgentRole::ProductManager => "product_manager",
            AgentRole::AgilePm => "agile_pm",
        }
    }

    /// Name advertised on the agent card; agents are addressed by it.
    pub fn card_name(&self) -> &'static str {
        match self {
            AgentRole::Stakeholder => "Stakeholder Requirements Agent",
            AgentRole::BusinessAnalyst => "Business Analyst Agent",
            AgentRole::DomainExpert => "Domain Expert Agent",
            AgentRole::ProductManager => "Product Manager Agent",
            AgentRole::AgilePm => "Agile Project Manager Agent",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            AgentRole::Stakeholder => {
                "Processes multimodal stakeholder inputs and synthesizes a stakeholder brief with vision, goals and constraints"
            }
            AgentRole::BusinessAnalyst => {
                "Turns stakeholder briefs into a structured Business Requirements Document"
            }
            AgentRole::DomainExpert => {
                "Validates requirements for domain compliance and feasibility, filling gaps and risks"
            }
            AgentRole::ProductManager => {
                "Defines product vision, strategy and a prioritized roadmap"
            }
            AgentRole::AgilePm => "Plans sprints and an iterative delivery schedule from the roadmap",
        }
    }

    /// Fixed local port the role's server listens on.
    pub fn port(&self) -> u16 {
        match self {
            AgentRole::Stakeholder => 10004,
            AgentRole::BusinessAnalyst => 10005,
            AgentRole::DomainExpert => 10006,
            AgentRole::ProductManager => 10007,
            AgentRole::AgilePm => 10008,
        }
    }

    pub fn input_content_types(&self) -> &'static [&'static str] {
        match self {
            AgentRole::Stakeholder | AgentRole::BusinessAnalyst | AgentRole::DomainExpert => {
                MULTIMODAL_INPUTS
            }
            AgentRole::ProductManager | AgentRole::AgilePm => TEXT_INPUTS,
        }
    }

    /// File name of the Markdown artifact the role writes.
    pub fn artifact_file(&self) -> &'static str {
        match self {
            AgentRole::Stakeholder => "stakeholder_brief.md",
            AgentRole::BusinessAnalyst => "business_requirements.md",
            AgentRole::DomainExpert => "domain_validation.md",
            AgentRole::ProductManager => "product_roadmap.md",
            AgentRole::AgilePm => "sprint_plan.md",
        }
    }

    /// Reply sent to the user when the LLM call fails.
    pub fn apology(&self) -> &'static str {
        match self {
            AgentRole::Stakeholder => {
                "Sorry, I couldn't generate the stakeholder brief at this moment. Please try again later."
            }
            AgentRole::BusinessAnalyst | AgentRole::DomainExpert => {
                "Sorry, I couldn't generate the Business Requirements Document at this moment. Please try again later."
            }
            AgentRole::ProductManager => {
                "Sorry, I couldn't generate the Product Roadmap at this moment. Please try again later."
            }
            AgentRole::AgilePm => {
                "Sorry, I couldn't generate the Sprint Plan at this moment. Please try again later."
            }
        }
    }

    /// Words that point at this role in free text. Only the keyword fallback
    /// route uses these.
    pub fn keywords(&self) -> &'static [&'static str] {
        match self {
            AgentRole::Stakeholder => &["stakeholder", "vision", "meeting notes", "interview"],
            AgentRole::BusinessAnalyst => &["business analyst", "brd", "requirements"],
            AgentRole::DomainExpert => &["domain", "compliance", "regulation", "feasibility"],
            AgentRole::ProductManager => &["product", "roadmap", "prioriti", "feature"],
            AgentRole::AgilePm => &["agile", "sprint", "backlog", "scrum", "velocity"],
        }
    }

    pub fn skill(&self) -> AgentSkill {
        let (id, name, tags, examples): (&str, &str, &[&str], &[&str]) = match self {
            AgentRole::Stakeholder => (
                "stakeholder_requirements_analyst",
                "Stakeholder Requirements Analyst",
                &["business-analysis", "requirements", "stakeholder-management"],
                &[
                    "Analyze these meeting notes and create a brief for our customer portal",
                    "Summarize stakeholder interviews about the mobile app redesign",
                ],
            ),
            AgentRole::BusinessAnalyst => (
                "business_requirements_document",
                "Business Requirements Documentation",
                &["business-analysis", "BRD", "requirements"],
                &["Turn this stakeholder brief into a BRD"],
            ),
            AgentRole::DomainExpert => (
                "domain_requirements_validation",
                "Domain Requirements Validation",
                &["domain-expertise", "compliance", "feasibility"],
                &["Check these requirements against healthcare regulations"],
            ),
            AgentRole::ProductManager => (
                "product_roadmap",
                "Product Roadmap Planning",
                &["product-management", "roadmap", "prioritization"],
                &["Build a roadmap from this requirements document"],
            ),
            AgentRole::AgilePm => (
                "sprint_planning",
                "Sprint Planning",
                &["agile", "scrum", "sprint-planning"],
                &["Plan the first three sprints for this roadmap"],
            ),
        };

        AgentSkill {
            id: id.to_string(),
            name: name.to_string(),
            description: self.description().to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            examples: examples.iter().map(|e| e.to_string()).collect(),
        }
    }

    /// Build the agent card served by this role at `base_url`.
    pub fn agent_card(&self, base_url: &str) -> AgentCard {
        AgentCard {
            name: self.card_name().to_string(),
            description: self.description().to_string(),
            url: base_url.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            default_input_modes: self
                .input_content_types()
                .iter()
                .map(|m| m.to_string())
                .collect(),
            default_output_modes: vec!["text/markdown".to_string()],
            capabilities: AgentCapabilities { streaming: false },
            skills: vec![self.skill()],
        }
    }

    /// Parse a role from its `as_str` form, a hyphenated variant, or its card name.
    pub fn parse(value: &str) -> AgentResult<Self> {
        let normalized = value.trim().to_lowercase().replace('-', "_");
        Self::all()
            .into_iter()
            .find(|role| {
                role.as_str() == normalized || role.card_name().to_lowercase() == value.trim().to_lowercase()
            })
            .ok_or_else(|| AgentError::UnknownRole(value.to_string()))
    }

    /// Roles in hand-off order.
    pub fn all() -> Vec<Self> {
        vec![
            AgentRole::Stakeholder,
            AgentRole::BusinessAnalyst,
            AgentRole::DomainExpert,
            AgentRole::ProductManager,
            AgentRole::AgilePm,
        ]
    }
}

impl std::fmt::Display for AgentRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
