//! Agent invocation client.
//!
//! One [`RemoteConnection`] per remote agent holds the transport to that
//! agent. [`A2aClient`] maps agent names to connections and is the
//! [`TaskDispatcher`] the host and the pipeline use. No call is ever retried
//! here.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use gmi_core::{normalize_all, CoreError, CoreResult, MessagePart, TaskDispatcher};
use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::discovery::{AgentDescriptor, CapabilityRegistry};
use crate::protocol::{JsonRpcRequest, Message, MessageSendParams, METHOD_SEND_MESSAGE};

/// Default bound on one task round trip. File payloads can be large.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Carries one JSON request to a remote agent and returns its JSON reply.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn post_json(&self, body: &Value) -> CoreResult<Value>;
}

/// JSON-over-HTTP transport bound to one agent URL.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(url: impl Into<String>, timeout: Duration) -> CoreResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CoreError::InvalidConfig(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            url: url.into(),
            timeout,
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post_json(&self, body: &Value) -> CoreResult<Value> {
        let response = self
            .client
            .post(&self.url)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    CoreError::TransportTimeout {
                        target: self.url.clone(),
                        seconds: self.timeout.as_secs(),
                    }
                } else {
                    CoreError::remote(&self.url, format!("request failed: {}", e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(CoreError::remote(
                &self.url,
                format!("HTTP {}: {}", status, text),
            ));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| CoreError::malformed(&self.url, format!("response is not JSON: {}", e)))
    }
}

/// A connection to one remote agent.
pub struct RemoteConnection {
    descriptor: Arc<AgentDescriptor>,
    transport: Box<dyn Transport>,
    pending_task_ids: Mutex<HashSet<String>>,
    timeout: Duration,
}

impl RemoteConnection {
    pub fn new(descriptor: Arc<AgentDescriptor>, transport: Box<dyn Transport>) -> Self {
        Self {
            descriptor,
            transport,
            pending_task_ids: Mutex::new(HashSet::new()),
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Connect to a descriptor's URL over HTTP, bounding each call by `timeout`.
    pub fn http(descriptor: Arc<AgentDescriptor>, timeout: Duration) -> CoreResult<Self> {
        let transport = HttpTransport::new(descriptor.url.clone(), timeout)?;
        Ok(Self::new(descriptor, Box::new(transport)).with_timeout(timeout))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn descriptor(&self) -> &AgentDescriptor {
        &self.descriptor
    }

    /// Message ids of requests currently in flight.
    pub fn pending_task_ids(&self) -> Vec<String> {
        self.pending_task_ids.lock().iter().cloned().collect()
    }

    /// Submit `parts` as a new task and return the parts the agent produced.
    pub async fn send_task(&self, parts: Vec<MessagePart>) -> CoreResult<Vec<MessagePart>> {
        let agent = self.descriptor.name.as_str();
        let rejected = parts.iter().find_map(|part| match part {
            MessagePart::File { file } if !self.descriptor.accepts(&file.mime_type) => {
                Some(file.mime_type.as_str())
            }
            _ => None,
        });
        if let Some(mime_type) = rejected {
            return Err(CoreError::UnsupportedFormat(format!(
                "{} does not accept {}",
                agent, mime_type
            )));
        }

        let message_id = Uuid::new_v4().to_string();
        let context_id = Uuid::new_v4().to_string();

        let message = Message::user(&parts, message_id.clone(), context_id);
        let request = JsonRpcRequest::new(
            message_id.clone(),
            METHOD_SEND_MESSAGE,
            MessageSendParams { message },
        )?;
        let body = serde_json::to_value(&request)?;

        info!(agent = %agent, parts = parts.len(), "Sending task");
        let pending = PendingGuard::new(&self.pending_task_ids, message_id);
        let outcome = tokio::time::timeout(self.timeout, self.transport.post_json(&body)).await;
        drop(pending);

        let response = match outcome {
            Ok(result) => result?,
            Err(_) => {
                warn!(agent = %agent, "Task timed out after {:?}", self.timeout);
                return Err(CoreError::TransportTimeout {
                    target: agent.to_string(),
                    seconds: self.timeout.as_secs(),
                });
            }
        };

        let parts = extract_parts(agent, &response)?;
        debug!(agent = %agent, parts = parts.len(), "Task returned");
        Ok(parts)
    }
}

/// Keeps a message id in the pending set until dropped, including when the
/// request future is cancelled.
struct PendingGuard<'a> {
    ids: &'a Mutex<HashSet<String>>,
    id: String,
}

impl<'a> PendingGuard<'a> {
    fn new(ids: &'a Mutex<HashSet<String>>, id: String) -> Self {
        ids.lock().insert(id.clone());
        Self { ids, id }
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.ids.lock().remove(&self.id);
    }
}

impl std::fmt::Debug for RemoteConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteConnection")
            .field("agent", &self.descriptor.name)
            .field("url", &self.descriptor.url)
            .field("pending", &self.pending_task_ids.lock().len())
            .finish()
    }
}

/// Pull the output parts out of a `message/send` response.
///
/// `result.artifacts[*].parts` wins over `result.text`. A result with
/// neither, or no result at all, is malformed. A task whose status is
/// `failed` and an error envelope are remote errors.
pub fn extract_parts(agent: &str, response: &Value) -> CoreResult<Vec<MessagePart>> {
    if let Some(error) = response.get("error").filter(|e| !e.is_null()) {
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string());
        let code = error.get("code").and_then(Value::as_i64);
        return Err(CoreError::remote(
            agent,
            match code {
                Some(code) => format!("{} (code {})", message, code),
                None => message,
            },
        ));
    }

    let result = match response.get("result") {
        Some(Value::Object(result)) => result,
        _ => return Err(CoreError::malformed(agent, "response has no result object")),
    };

    if let Some(status) = result.get("status") {
        if status.get("state").and_then(Value::as_str) == Some("failed") {
            let reason = status
                .pointer("/message/parts")
                .and_then(Value::as_array)
                .map(|parts| gmi_core::joined_text(&normalize_all(parts)))
                .filter(|r| !r.is_empty())
                .unwrap_or_else(|| "task failed".to_string());
            return Err(CoreError::remote(agent, reason));
        }
    }

    if let Some(artifacts) = result.get("artifacts").and_then(Value::as_array) {
        let raw: Vec<Value> = artifacts
            .iter()
            .filter_map(|a| a.get("parts").and_then(Value::as_array))
            .flatten()
            .cloned()
            .collect();
        return Ok(normalize_all(&raw));
    }

    if let Some(text) = result.get("text").and_then(Value::as_str) {
        return Ok(vec![MessagePart::text(text)]);
    }

    Err(CoreError::malformed(
        agent,
        "result carries neither artifacts nor text",
    ))
}

/// Name-addressed set of remote connections.
pub struct A2aClient {
    connections: HashMap<String, RemoteConnection>,
}

impl A2aClient {
    pub fn new() -> Self {
        Self {
            connections: HashMap::new(),
        }
    }

    /// Open an HTTP connection to every agent in the registry.
    pub fn from_registry(registry: &CapabilityRegistry, timeout: Duration) -> CoreResult<Self> {
        let mut client = Self::new();
        for descriptor in registry.descriptors() {
            client.add_connection(RemoteConnection::http(descriptor, timeout)?);
        }
        Ok(client)
    }

    /// Add a connection, replacing any with the same agent name.
    pub fn add_connection(&mut self, connection: RemoteConnection) {
        self.connections
            .insert(connection.descriptor.name.clone(), connection);
    }

    pub fn connection(&self, agent_name: &str) -> CoreResult<&RemoteConnection> {
        self.connections
            .get(agent_name)
            .ok_or_else(|| CoreError::agent_not_found(agent_name, self.agent_names()))
    }

    /// Descriptors of every connected agent, sorted by name.
    pub fn descriptors(&self) -> Vec<&AgentDescriptor> {
        let mut descriptors: Vec<&AgentDescriptor> =
            self.connections.values().map(|c| c.descriptor()).collect();
        descriptors.sort_by(|a, b| a.name.cmp(&b.name));
        descriptors
    }
}

impl Default for A2aClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TaskDispatcher for A2aClient {
    async fn send_task(&self, agent_name: &str, parts: Vec<MessagePart>) -> CoreResult<Vec<MessagePart>> {
        self.connection(agent_name)?.send_task(parts).await
    }

    fn agent_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.connections.keys().cloned().collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{AgentCapabilities, AgentCard};
    use serde_json::json;

    fn descriptor(name: &str) -> Arc<AgentDescriptor> {
        Arc::new(AgentDescriptor::from_card(
            AgentCard {
                name: name.to_string(),
                description: String::new(),
                url: String::new(),
                version: "1.0.0".into(),
                default_input_modes: vec!["text/plain".into()],
                default_output_modes: vec!["text/markdown".into()],
                capabilities: AgentCapabilities::default(),
                skills: Vec::new(),
            },
            "http://localhost:10006",
        ))
    }

    /// Transport replying with a fixed body after an optional delay.
    struct StubTransport {
        reply: CoreResult<Value>,
        delay: Option<Duration>,
        requests: Arc<Mutex<Vec<Value>>>,
    }

    impl StubTransport {
        fn replying(reply: Value) -> Self {
            Self {
                reply: Ok(reply),
                delay: None,
                requests: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    #[async_trait]
    impl Transport for StubTransport {
        async fn post_json(&self, body: &Value) -> CoreResult<Value> {
            self.requests.lock().push(body.clone());
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            match &self.reply {
                Ok(v) => Ok(v.clone()),
                Err(e) => Err(CoreError::remote("stub", e.to_string())),
            }
        }
    }

    fn client_with(name: &str, transport: StubTransport, timeout: Duration) -> A2aClient {
        let mut client = A2aClient::new();
        client.add_connection(
            RemoteConnection::new(descriptor(name), Box::new(transport)).with_timeout(timeout),
        );
        client
    }

    #[tokio::test]
    async fn test_send_task_returns_artifact_parts() {
        let transport = StubTransport::replying(json!({
            "jsonrpc": "2.0",
            "id": "1",
            "result": {"artifacts": [{"parts": [{"type": "text", "text": "Y"}]}]}
        }));
        let client = client_with("DomainExpert", transport, DEFAULT_REQUEST_TIMEOUT);

        let parts = client
            .send_task("DomainExpert", vec![MessagePart::text("x")])
            .await
            .unwrap();

        assert_eq!(parts, vec![MessagePart::text("Y")]);
    }

    #[tokio::test]
    async fn test_fresh_ids_per_call() {
        let transport = StubTransport::replying(json!({"result": {"text": "ok"}}));
        let requests = transport.requests.clone();
        let client = client_with("A", transport, DEFAULT_REQUEST_TIMEOUT);

        client.send_task("A", vec![MessagePart::text("1")]).await.unwrap();
        client.send_task("A", vec![MessagePart::text("2")]).await.unwrap();

        let requests = requests.lock();
        let ids: HashSet<&str> = requests
            .iter()
            .flat_map(|r| {
                [
                    r["params"]["message"]["messageId"].as_str().unwrap(),
                    r["params"]["message"]["contextId"].as_str().unwrap(),
                ]
            })
            .collect();
        assert_eq!(ids.len(), 4);
        assert_eq!(requests[0]["method"], "message/send");
        assert_eq!(requests[1]["params"]["message"]["parts"][0]["text"], "2");
    }

    #[tokio::test]
    async fn test_slow_remote_times_out() {
        let mut transport = StubTransport::replying(json!({"result": {"text": "late"}}));
        transport.delay = Some(Duration::from_secs(5));
        let client = client_with("Slow", transport, Duration::from_millis(50));

        let err = client
            .send_task("Slow", vec![MessagePart::text("x")])
            .await
            .unwrap_err();

        assert!(matches!(err, CoreError::TransportTimeout { .. }));
        assert!(client.connection("Slow").unwrap().pending_task_ids().is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_call_leaves_no_pending_id() {
        let mut transport = StubTransport::replying(json!({"result": {"text": "late"}}));
        transport.delay = Some(Duration::from_secs(5));
        let connection = RemoteConnection::new(descriptor("Slow"), Box::new(transport));

        let outcome = tokio::time::timeout(
            Duration::from_millis(50),
            connection.send_task(vec![MessagePart::text("x")]),
        )
        .await;

        assert!(outcome.is_err());
        assert!(connection.pending_task_ids().is_empty());
    }

    #[tokio::test]
    async fn test_http_timeout_is_transport_timeout() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        // Accept connections and never answer.
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let transport = HttpTransport::new(url, Duration::from_millis(100)).unwrap();
        let err = transport.post_json(&json!({"jsonrpc": "2.0"})).await.unwrap_err();

        assert!(matches!(err, CoreError::TransportTimeout { .. }));
    }

    #[tokio::test]
    async fn test_file_type_not_advertised_is_rejected_locally() {
        let transport = StubTransport::replying(json!({"result": {"text": "ok"}}));
        let requests = transport.requests.clone();
        let client = client_with("Product Manager Agent", transport, DEFAULT_REQUEST_TIMEOUT);

        let err = client
            .send_task(
                "Product Manager Agent",
                vec![
                    MessagePart::text("see attached"),
                    MessagePart::file_bytes("voice.wav", "audio/wav", vec![1, 2]),
                ],
            )
            .await
            .unwrap_err();

        assert!(matches!(err, CoreError::UnsupportedFormat(ref m) if m.contains("audio/wav")));
        assert!(requests.lock().is_empty());

        let accepted = client
            .send_task(
                "Product Manager Agent",
                vec![MessagePart::file_bytes("notes.txt", "text/plain", b"n".to_vec())],
            )
            .await;
        assert!(accepted.is_ok());
    }

    #[tokio::test]
    async fn test_unknown_agent() {
        let client = A2aClient::new();
        let err = client
            .send_task("Nobody", vec![MessagePart::text("x")])
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::AgentNotFound { .. }));
    }

    #[tokio::test]
    async fn test_transport_error_is_not_retried() {
        let transport = StubTransport {
            reply: Err(CoreError::remote("stub", "connection reset")),
            delay: None,
            requests: Arc::new(Mutex::new(Vec::new())),
        };
        let requests = transport.requests.clone();
        let client = client_with("A", transport, DEFAULT_REQUEST_TIMEOUT);

        assert!(client.send_task("A", vec![MessagePart::text("x")]).await.is_err());
        assert_eq!(requests.lock().len(), 1);
    }

    #[test]
    fn test_extract_prefers_artifacts_over_text() {
        let parts = extract_parts(
            "A",
            &json!({"result": {
                "text": "flat",
                "artifacts": [
                    {"parts": [{"type": "text", "text": "one"}]},
                    {"parts": [{"type": "data", "data": {"k": 1}}]}
                ]
            }}),
        )
        .unwrap();
        assert_eq!(
            parts,
            vec![MessagePart::text("one"), MessagePart::data(json!({"k": 1}))]
        );
    }

    #[test]
    fn test_extract_text_and_empty_artifacts() {
        assert_eq!(
            extract_parts("A", &json!({"result": {"text": "flat"}})).unwrap(),
            vec![MessagePart::text("flat")]
        );
        assert!(extract_parts("A", &json!({"result": {"artifacts": []}}))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_extract_failures() {
        let kind = |v: Value| extract_parts("A", &v).unwrap_err().kind();
        use gmi_core::ErrorKind;

        assert_eq!(kind(json!({"result": {"id": "t"}})), ErrorKind::MalformedResponse);
        assert_eq!(kind(json!({"jsonrpc": "2.0"})), ErrorKind::MalformedResponse);
        assert_eq!(
            kind(json!({"error": {"code": -32603, "message": "boom"}})),
            ErrorKind::RemoteError
        );
        assert_eq!(
            kind(json!({"result": {"status": {"state": "failed"}, "artifacts": []}})),
            ErrorKind::RemoteError
        );
    }

    #[test]
    fn test_failed_status_message_is_surfaced() {
        let err = extract_parts(
            "A",
            &json!({"result": {"status": {
                "state": "failed",
                "message": {"role": "agent", "parts": [{"type": "text", "text": "LLM quota"}]}
            }}}),
        )
        .unwrap_err();
        assert!(err.to_string().contains("LLM quota"));
    }
}
