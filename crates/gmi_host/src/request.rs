//! What a caller can ask the host for.

use gmi_core::{joined_text, MessagePart};
use serde::{Deserialize, Serialize};

/// One inbound host request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HostRequest {
    /// The caller names the agent; the parts are forwarded as-is.
    Direct { agent: String, parts: Vec<MessagePart> },
    /// Free text for the reasoning loop to route.
    Query { text: String },
}

impl HostRequest {
    pub fn direct(agent: impl Into<String>, parts: Vec<MessagePart>) -> Self {
        Self::Direct {
            agent: agent.into(),
            parts,
        }
    }

    pub fn query(text: impl Into<String>) -> Self {
        Self::Query { text: text.into() }
    }

    /// Text recorded in the session transcript for this request.
    pub fn transcript_text(&self) -> String {
        match self {
            Self::Direct { agent, parts } => {
                let files = parts.iter().filter(|p| p.is_file()).count();
                let text = joined_text(parts);
                if files == 0 {
                    format!("[to {}] {}", agent, text)
                } else {
                    format!("[to {}] {} (+{} file(s))", agent, text, files)
                }
            }
            Self::Query { text } => text.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transcript_text() {
        let direct = HostRequest::direct(
            "Business Analyst Agent",
            vec![
                MessagePart::text("Draft a BRD"),
                MessagePart::file_uri("notes.pdf", "", "https://files/notes.pdf"),
            ],
        );
        assert_eq!(
            direct.transcript_text(),
            "[to Business Analyst Agent] Draft a BRD (+1 file(s))"
        );
        assert_eq!(HostRequest::query("hi").transcript_text(), "hi");
    }
}
