//! JSON step protocol between the host and its language model.
//!
//! Each model reply is one step: either a tool call
//! `{"action":"send_message","agent_name":"..","parts":[..]}` or a final
//! answer `{"action":"final","text":".."}`. A reply that is not a step object
//! is taken as the final answer verbatim.

use serde_json::{json, Value};

/// Instructions appended to the host system prompt.
pub const STEP_PROTOCOL: &str = r#"Reply with exactly one JSON object and nothing else.
To delegate to an agent:
{"action": "send_message", "agent_name": "<agent name>", "parts": [{"type": "text", "text": "..."}]}
Parts may also be {"type": "file", "file": {"name": "...", "mimeType": "...", "uri": "..."}} or {"type": "data", "data": {...}}.
When you have the answer for the user:
{"action": "final", "text": "<answer in Markdown>"}"#;

#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    SendMessage { agent_name: String, parts: Vec<Value> },
    Final { text: String },
}

/// Interpret one model reply.
pub fn parse_step(reply: &str) -> Step {
    let trimmed = strip_code_fence(reply.trim());
    let Ok(Value::Object(obj)) = serde_json::from_str::<Value>(trimmed) else {
        return Step::Final {
            text: reply.trim().to_string(),
        };
    };

    match obj.get("action").and_then(Value::as_str) {
        Some("send_message") => {
            let Some(agent_name) = obj.get("agent_name").and_then(Value::as_str) else {
                return Step::Final {
                    text: reply.trim().to_string(),
                };
            };
            let parts = match (obj.get("parts"), obj.get("message")) {
                (Some(Value::Array(parts)), _) => parts.clone(),
                (_, Some(Value::String(text))) => vec![json!({"type": "text", "text": text})],
                _ => Vec::new(),
            };
            Step::SendMessage {
                agent_name: agent_name.to_string(),
                parts,
            }
        }
        Some("final") => Step::Final {
            text: obj
                .get("text")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        },
        _ => Step::Final {
            text: reply.trim().to_string(),
        },
    }
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}
