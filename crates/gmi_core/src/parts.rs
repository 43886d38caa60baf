//! Canonical message parts.
//!
//! A [`MessagePart`] is the smallest unit of multimodal payload exchanged
//! between agents. Its serde representation is the A2A wire shape:
//!
//! ```text
//! {"type": "text", "text": "..."}
//! {"type": "file", "file": {"name": "...", "mimeType": "...", "bytes": "<base64>"}}
//! {"type": "file", "file": {"name": "...", "mimeType": "...", "uri": "..."}}
//! {"type": "data", "data": <any JSON>}
//! ```

use std::path::Path;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::mime::{mime_from_name, DEFAULT_MIME_TYPE};

/// One unit of message payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MessagePart {
    Text { text: String },
    File { file: FilePart },
    Data { data: serde_json::Value },
}

impl MessagePart {
    /// Create a text part.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Create a file part carrying inline bytes.
    pub fn file_bytes(name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self::File {
            file: FilePart::new(name, mime_type, FilePayload::Bytes(bytes)),
        }
    }

    /// Create a file part referencing a URI.
    pub fn file_uri(name: impl Into<String>, mime_type: impl Into<String>, uri: impl Into<String>) -> Self {
        Self::File {
            file: FilePart::new(name, mime_type, FilePayload::Uri(uri.into())),
        }
    }

    /// Create a structured data part.
    pub fn data(data: serde_json::Value) -> Self {
        Self::Data { data }
    }

    /// The text body, if this is a text part.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text } => Some(text),
            _ => None,
        }
    }

    pub fn is_file(&self) -> bool {
        matches!(self, Self::File { .. })
    }

    /// Short kind label used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Text { .. } => "text",
            Self::File { .. } => "file",
            Self::Data { .. } => "data",
        }
    }
}

/// Concatenate the text parts of a part list, separated by newlines.
pub fn joined_text(parts: &[MessagePart]) -> String {
    parts
        .iter()
        .filter_map(MessagePart::as_text)
        .collect::<Vec<_>>()
        .join("\n")
}

/// A named, typed file payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "FileWire", into = "FileWire")]
pub struct FilePart {
    pub name: String,
    /// Never empty; falls back to `application/octet-stream`.
    pub mime_type: String,
    pub payload: FilePayload,
}

impl FilePart {
    /// Create a file part. An empty MIME type is derived from the name.
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, payload: FilePayload) -> Self {
        let name = name.into();
        let mut mime_type = mime_type.into();
        if mime_type.trim().is_empty() {
            mime_type = mime_from_name(&name).to_string();
        }
        Self {
            name,
            mime_type,
            payload,
        }
    }
}

/// Exactly one payload representation per file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilePayload {
    Bytes(Vec<u8>),
    Uri(String),
}

/// Wire representation of a file part.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct FileWire {
    #[serde(default)]
    name: String,
    #[serde(rename = "mimeType", default)]
    mime_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    bytes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    uri: Option<String>,
}

impl TryFrom<FileWire> for FilePart {
    type Error = String;

    fn try_from(wire: FileWire) -> Result<Self, Self::Error> {
        let payload = match (wire.bytes, wire.uri) {
            (Some(encoded), _) => FilePayload::Bytes(
                BASE64
                    .decode(encoded.as_bytes())
                    .map_err(|e| format!("file bytes are not valid base64: {}", e))?,
            ),
            (None, Some(uri)) => FilePayload::Uri(uri),
            (None, None) => return Err("file part carries neither bytes nor uri".to_string()),
        };
        Ok(FilePart::new(wire.name, wire.mime_type, payload))
    }
}

impl From<FilePart> for FileWire {
    fn from(file: FilePart) -> Self {
        let (bytes, uri) = match file.payload {
            FilePayload::Bytes(raw) => (Some(BASE64.encode(raw)), None),
            FilePayload::Uri(uri) => (None, Some(uri)),
        };
        FileWire {
            name: file.name,
            mime_type: file.mime_type,
            bytes,
            uri,
        }
    }
}

/// Build a multimodal part list from optional text, a local file and a URI.
///
/// The local file is read into inline bytes. When `mime_type` is not given it
/// is guessed from the file name (or URI). A file that cannot be read is
/// replaced by a text part describing the failure.
pub fn build_parts(
    text: Option<&str>,
    file_path: Option<&Path>,
    file_uri: Option<&str>,
    mime_type: Option<&str>,
) -> Vec<MessagePart> {
    let mut parts = Vec::new();

    if let Some(text) = text.filter(|t| !t.is_empty()) {
        parts.push(MessagePart::text(text));
    }

    if let Some(path) = file_path {
        match std::fs::read(path) {
            Ok(bytes) => {
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string());
                let mime = mime_type
                    .map(str::to_string)
                    .unwrap_or_else(|| mime_from_name(&name).to_string());
                parts.push(MessagePart::file_bytes(name, mime, bytes));
            }
            Err(e) => {
                error!("Error reading file {}: {}", path.display(), e);
                parts.push(MessagePart::text(format!("Error reading file: {}", e)));
            }
        }
    }

    if let Some(uri) = file_uri {
        let name = uri.rsplit('/').next().unwrap_or(uri).to_string();
        let mime = mime_type.unwrap_or_else(|| mime_from_name(uri));
        let mime = if mime.is_empty() { DEFAULT_MIME_TYPE } else { mime };
        parts.push(MessagePart::file_uri(name, mime, uri));
    }

    parts
}
