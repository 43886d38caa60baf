//! Content normalizer.
//!
//! Partners and model providers hand us message parts in several shapes. The
//! functions here map every one of them onto [`MessagePart`]. Normalization
//! never fails: a shape we do not recognise degrades to a text part holding
//! the JSON rendering of the input and a warning is logged.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde_json::{Map, Value};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::mime::{mime_from_name, DEFAULT_MIME_TYPE};
use crate::parts::{FilePart, FilePayload, MessagePart};

/// Normalize a list of raw parts. Output order and length match the input.
pub fn normalize_all(raw: &[Value]) -> Vec<MessagePart> {
    let parts: Vec<MessagePart> = raw.iter().map(normalize).collect();
    debug!(count = parts.len(), "Normalized message parts");
    parts
}

/// Normalize one raw part.
pub fn normalize(raw: &Value) -> MessagePart {
    let obj = match raw {
        Value::Object(obj) => obj,
        Value::String(s) => return MessagePart::text(s.clone()),
        other => return MessagePart::text(other.to_string()),
    };

    match obj.get("type").and_then(Value::as_str) {
        Some("text") => MessagePart::text(obj.get("text").map(text_of).unwrap_or_default()),
        Some("file") => match obj.get("file") {
            Some(Value::Object(file)) => file_part(file, None).unwrap_or_else(|| degrade(raw)),
            _ => degrade(raw),
        },
        Some("data") => match obj.get("data") {
            Some(data) => MessagePart::data(data.clone()),
            None => degrade(raw),
        },
        _ => provider_shape(obj).unwrap_or_else(|| degrade(raw)),
    }
}

/// Provider envelopes and the bare-`text` fallback.
fn provider_shape(obj: &Map<String, Value>) -> Option<MessagePart> {
    let name = obj.get("name").and_then(Value::as_str);

    if let (Some(mime), Some(url)) = (
        obj.get("mime_type").and_then(Value::as_str),
        obj.get("file_url").and_then(Value::as_str),
    ) {
        let name = name
            .map(str::to_string)
            .unwrap_or_else(|| name_from_uri(url));
        return Some(MessagePart::File {
            file: FilePart::new(name, mime, FilePayload::Uri(url.to_string())),
        });
    }

    if let Some(Value::Object(inline)) = obj.get("inline_data") {
        let mut file = inline.clone();
        if let Some(data) = inline.get("data") {
            file.insert("bytes".to_string(), data.clone());
        }
        return file_part(&file, name);
    }

    obj.get("text").map(|text| MessagePart::text(text_of(text)))
}

/// Build a file part from a `{name, mimeType|mime_type, bytes|uri}` object.
///
/// Returns `None` when the object carries no payload.
fn file_part(file: &Map<String, Value>, fallback_name: Option<&str>) -> Option<MessagePart> {
    let uri = file.get("uri").and_then(Value::as_str);
    let payload = match (file.get("bytes").and_then(Value::as_str), uri) {
        (Some(encoded), _) => FilePayload::Bytes(decode_bytes(encoded)),
        (None, Some(uri)) => FilePayload::Uri(uri.to_string()),
        (None, None) => return None,
    };

    let name = file
        .get("name")
        .and_then(Value::as_str)
        .filter(|n| !n.is_empty())
        .or(fallback_name)
        .map(str::to_string)
        .unwrap_or_else(|| match uri {
            Some(uri) if !uri.ends_with('/') => name_from_uri(uri),
            _ => generated_name(),
        });

    let mime = file
        .get("mimeType")
        .or_else(|| file.get("mime_type"))
        .and_then(Value::as_str)
        .filter(|m| !m.trim().is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| {
            let from_name = mime_from_name(&name);
            let derived = match uri {
                Some(uri) if from_name == DEFAULT_MIME_TYPE => mime_from_name(uri),
                _ => from_name,
            };
            derived.to_string()
        });

    Some(MessagePart::File {
        file: FilePart::new(name, mime, payload),
    })
}

fn decode_bytes(encoded: &str) -> Vec<u8> {
    match BASE64.decode(encoded.as_bytes()) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("File bytes are not valid base64 ({}); keeping raw text", e);
            encoded.as_bytes().to_vec()
        }
    }
}

fn name_from_uri(uri: &str) -> String {
    let path = uri.split(['?', '#']).next().unwrap_or(uri);
    match path.rsplit('/').next() {
        Some(last) if !last.is_empty() => last.to_string(),
        _ => generated_name(),
    }
}

fn generated_name() -> String {
    format!("file_{}", Uuid::new_v4().simple())
}

fn text_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn degrade(raw: &Value) -> MessagePart {
    warn!("Unknown part format, converting to text: {}", raw);
    MessagePart::text(raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn file_of(part: &MessagePart) -> &FilePart {
        match part {
            MessagePart::File { file } => file,
            other => panic!("expected file part, got {:?}", other),
        }
    }

    #[test]
    fn test_canonical_text() {
        assert_eq!(
            normalize(&json!({"type": "text", "text": "hi"})),
            MessagePart::text("hi")
        );
        assert_eq!(normalize(&json!({"type": "text"})), MessagePart::text(""));
    }

    #[test]
    fn test_canonical_file_with_bytes() {
        let encoded = BASE64.encode(b"pdf-bytes");
        let part = normalize(&json!({
            "type": "file",
            "file": {"name": "brief.pdf", "mimeType": "application/pdf", "bytes": encoded}
        }));
        let file = file_of(&part);
        assert_eq!(file.name, "brief.pdf");
        assert_eq!(file.mime_type, "application/pdf");
        assert_eq!(file.payload, FilePayload::Bytes(b"pdf-bytes".to_vec()));
    }

    #[test]
    fn test_file_without_name_or_mime() {
        let part = normalize(&json!({"type": "file", "file": {"bytes": BASE64.encode(b"x")}}));
        let file = file_of(&part);
        assert!(file.name.starts_with("file_"));
        assert_eq!(file.mime_type, DEFAULT_MIME_TYPE);
    }

    #[test]
    fn test_file_mime_derived_from_name_or_alias() {
        let part = normalize(&json!({"type": "file", "file": {"name": "a.png", "uri": "gs://b/a.png"}}));
        assert_eq!(file_of(&part).mime_type, "image/png");

        let part = normalize(&json!({
            "type": "file",
            "file": {"name": "a", "mime_type": "audio/wav", "uri": "gs://b/a"}
        }));
        assert_eq!(file_of(&part).mime_type, "audio/wav");

        let part = normalize(&json!({
            "type": "file",
            "file": {"name": "notes.md", "mimeType": "", "bytes": BASE64.encode(b"# x")}
        }));
        assert_eq!(file_of(&part).mime_type, "text/markdown");
    }

    #[test]
    fn test_bytes_win_over_uri() {
        let part = normalize(&json!({
            "type": "file",
            "file": {"name": "a.txt", "bytes": BASE64.encode(b"abc"), "uri": "https://x/a.txt"}
        }));
        assert_eq!(file_of(&part).payload, FilePayload::Bytes(b"abc".to_vec()));
    }

    #[test]
    fn test_invalid_base64_keeps_raw() {
        let part = normalize(&json!({"type": "file", "file": {"name": "a.txt", "bytes": "not base64!"}}));
        assert_eq!(file_of(&part).payload, FilePayload::Bytes(b"not base64!".to_vec()));
    }

    #[test]
    fn test_canonical_data() {
        let part = normalize(&json!({"type": "data", "data": {"score": 3}}));
        assert_eq!(part, MessagePart::data(json!({"score": 3})));
    }

    #[test]
    fn test_malformed_canonical_shapes_degrade() {
        for raw in [
            json!({"type": "file"}),
            json!({"type": "file", "file": "oops"}),
            json!({"type": "file", "file": {"name": "a.txt"}}),
            json!({"type": "data"}),
        ] {
            let part = normalize(&raw);
            assert_eq!(part, MessagePart::text(raw.to_string()));
        }
    }

    #[test]
    fn test_adk_file_url_envelope() {
        let part = normalize(&json!({
            "mime_type": "application/pdf",
            "file_url": "https://storage.example.com/docs/brief.pdf?x=1"
        }));
        let file = file_of(&part);
        assert_eq!(file.name, "brief.pdf");
        assert_eq!(file.mime_type, "application/pdf");
        assert_eq!(
            file.payload,
            FilePayload::Uri("https://storage.example.com/docs/brief.pdf?x=1".into())
        );
    }

    #[test]
    fn test_inline_data_envelope() {
        let part = normalize(&json!({
            "name": "clip.wav",
            "inline_data": {"mime_type": "audio/wav", "data": BASE64.encode(b"RIFF")}
        }));
        let file = file_of(&part);
        assert_eq!(file.name, "clip.wav");
        assert_eq!(file.mime_type, "audio/wav");
        assert_eq!(file.payload, FilePayload::Bytes(b"RIFF".to_vec()));

        let part = normalize(&json!({"inline_data": {"mimeType": "image/png", "uri": "gs://b/p"}}));
        let file = file_of(&part);
        assert_eq!(file.mime_type, "image/png");
        assert_eq!(file.payload, FilePayload::Uri("gs://b/p".into()));
    }

    #[test]
    fn test_bare_text_and_unknown_shapes() {
        assert_eq!(normalize(&json!({"text": "plain"})), MessagePart::text("plain"));
        assert_eq!(normalize(&json!("just a string")), MessagePart::text("just a string"));
        assert_eq!(normalize(&json!(42)), MessagePart::text("42"));

        let unknown = json!({"foo": "bar"});
        assert_eq!(normalize(&unknown), MessagePart::text(unknown.to_string()));
    }

    #[test]
    fn test_normalize_all_preserves_length_and_order() {
        let raw = vec![
            json!({"type": "text", "text": "one"}),
            json!({"weird": true}),
            json!({"type": "data", "data": [1, 2]}),
            json!(null),
        ];
        let parts = normalize_all(&raw);
        assert_eq!(parts.len(), raw.len());
        assert_eq!(parts[0], MessagePart::text("one"));
        assert_eq!(parts[2], MessagePart::data(json!([1, 2])));
        assert_eq!(parts[3], MessagePart::text("null"));
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let inputs = vec![
            json!({"type": "text", "text": "hello"}),
            json!({"type": "file", "file": {"bytes": BASE64.encode(b"zz")}}),
            json!({"type": "file", "file": {"name": "a.txt", "bytes": "%%%"}}),
            json!({"mime_type": "image/png", "file_url": "https://x/y.png"}),
            json!({"inline_data": {"data": BASE64.encode(b"q")}}),
            json!({"type": "data", "data": {"k": [1, 2]}}),
            json!({"unknown": 1}),
            json!(3.5),
        ];

        for raw in inputs {
            let once = normalize(&raw);
            let wire = serde_json::to_value(&once).unwrap();
            let twice = normalize(&wire);
            assert_eq!(once, twice, "not idempotent for {}", raw);
        }
    }

    #[test]
    fn test_file_mime_never_empty() {
        let inputs = vec![
            json!({"type": "file", "file": {"uri": "https://x/"}}),
            json!({"type": "file", "file": {"name": "", "mimeType": " ", "bytes": ""}}),
            json!({"inline_data": {"mime_type": "", "uri": "s3://bucket/key"}}),
        ];
        for raw in inputs {
            let part = normalize(&raw);
            assert!(!file_of(&part).mime_type.is_empty());
        }
    }
}
