//! Capability discovery and the agent registry.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use gmi_core::{CoreError, CoreResult, ErrorKind};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::protocol::{AgentCard, AgentSkill, AGENT_CARD_PATH};

/// Default bound on one discovery fetch.
pub const DEFAULT_DISCOVERY_TIMEOUT: Duration = Duration::from_secs(30);

/// What the registry knows about one remote agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentDescriptor {
    pub name: String,
    pub description: String,
    /// Endpoint the descriptor was discovered from
    pub url: String,
    pub version: String,
    pub supported_input_content_types: BTreeSet<String>,
    pub supported_output_content_types: BTreeSet<String>,
    pub skills: Vec<AgentSkill>,
    pub streaming: bool,
    pub discovered_at: DateTime<Utc>,
}

impl AgentDescriptor {
    pub fn from_card(card: AgentCard, endpoint: &str) -> Self {
        Self {
            name: card.name,
            description: card.description,
            url: endpoint.trim_end_matches('/').to_string(),
            version: card.version,
            supported_input_content_types: card.default_input_modes.into_iter().collect(),
            supported_output_content_types: card.default_output_modes.into_iter().collect(),
            skills: card.skills,
            streaming: card.capabilities.streaming,
            discovered_at: Utc::now(),
        }
    }

    /// Whether the agent advertises `mime_type` as an input. Agents that
    /// advertise nothing accept anything.
    pub fn accepts(&self, mime_type: &str) -> bool {
        self.supported_input_content_types.is_empty()
            || self.supported_input_content_types.contains(mime_type)
            || (self.supported_input_content_types.contains("text")
                && mime_type.starts_with("text/"))
    }
}

/// Fetches the agent card of an endpoint.
#[async_trait]
pub trait CardFetcher: Send + Sync {
    async fn fetch_card(&self, endpoint: &str) -> CoreResult<AgentCard>;
}

/// Card fetcher over HTTP.
#[derive(Debug, Clone)]
pub struct HttpCardFetcher {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpCardFetcher {
    pub fn new(timeout: Duration) -> CoreResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CoreError::InvalidConfig(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client, timeout })
    }
}

#[async_trait]
impl CardFetcher for HttpCardFetcher {
    async fn fetch_card(&self, endpoint: &str) -> CoreResult<AgentCard> {
        let url = format!("{}{}", endpoint.trim_end_matches('/'), AGENT_CARD_PATH);
        debug!(url = %url, "Fetching agent card");

        let response = self.client.get(&url).send().await.map_err(|e| {
            if e.is_timeout() {
                CoreError::TransportTimeout {
                    target: url.clone(),
                    seconds: self.timeout.as_secs(),
                }
            } else {
                CoreError::remote(endpoint, format!("connection failed: {}", e))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(CoreError::remote(
                endpoint,
                format!("agent card request returned {}", status),
            ));
        }

        response
            .json::<AgentCard>()
            .await
            .map_err(|e| CoreError::malformed(endpoint, format!("invalid agent card: {}", e)))
    }
}

/// An endpoint that could not be discovered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryFailure {
    pub endpoint: String,
    pub kind: ErrorKind,
    pub error: String,
}

/// Outcome of a batch discovery.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiscoverySummary {
    /// Names of the agents added or replaced, in endpoint order
    pub discovered: Vec<String>,
    pub failures: Vec<DiscoveryFailure>,
}

impl DiscoverySummary {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Known agents, keyed by card name.
///
/// Written during discovery, read afterwards. Callers own the registry and
/// pass it by reference; there is no global instance.
pub struct CapabilityRegistry {
    agents: HashMap<String, Arc<AgentDescriptor>>,
    timeout: Duration,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_DISCOVERY_TIMEOUT)
    }

    /// Create a registry whose fetches are bounded by `timeout`.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            agents: HashMap::new(),
            timeout,
        }
    }

    /// Fetch one endpoint's card and cache its descriptor.
    ///
    /// A descriptor already cached under the same name is replaced.
    pub async fn discover(&mut self, fetcher: &dyn CardFetcher, endpoint: &str) -> CoreResult<Arc<AgentDescriptor>> {
        let descriptor = Arc::new(fetch_descriptor(fetcher, endpoint, self.timeout).await?);
        self.insert(descriptor.clone());
        Ok(descriptor)
    }

    /// Discover every endpoint. Failures are recorded, never raised.
    pub async fn discover_all<S: AsRef<str>>(&mut self, fetcher: &dyn CardFetcher, endpoints: &[S]) -> DiscoverySummary {
        let timeout = self.timeout;
        let fetches = endpoints
            .iter()
            .map(|endpoint| fetch_descriptor(fetcher, endpoint.as_ref(), timeout));
        let results = join_all(fetches).await;

        let mut summary = DiscoverySummary::default();
        for (endpoint, result) in endpoints.iter().zip(results) {
            let endpoint = endpoint.as_ref();
            match result {
                Ok(descriptor) => {
                    summary.discovered.push(descriptor.name.clone());
                    self.insert(Arc::new(descriptor));
                }
                Err(e) => {
                    error!(endpoint = %endpoint, "Failed to discover agent: {}", e);
                    summary.failures.push(DiscoveryFailure {
                        endpoint: endpoint.to_string(),
                        kind: e.kind(),
                        error: e.to_string(),
                    });
                }
            }
        }

        info!(
            discovered = summary.discovered.len(),
            failed = summary.failures.len(),
            "Discovery finished"
        );
        summary
    }

    /// Insert a descriptor, replacing any with the same name.
    pub fn insert(&mut self, descriptor: Arc<AgentDescriptor>) {
        if self.agents.contains_key(&descriptor.name) {
            debug!(agent = %descriptor.name, "Replacing cached descriptor");
        }
        self.agents.insert(descriptor.name.clone(), descriptor);
    }

    pub fn lookup(&self, name: &str) -> CoreResult<Arc<AgentDescriptor>> {
        self.agents
            .get(name)
            .cloned()
            .ok_or_else(|| CoreError::agent_not_found(name, self.names()))
    }

    /// Agent names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.agents.keys().cloned().collect();
        names.sort();
        names
    }

    /// Descriptors sorted by name.
    pub fn descriptors(&self) -> Vec<Arc<AgentDescriptor>> {
        let mut descriptors: Vec<_> = self.agents.values().cloned().collect();
        descriptors.sort_by(|a, b| a.name.cmp(&b.name));
        descriptors
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

impl Default for CapabilityRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CapabilityRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapabilityRegistry")
            .field("agents", &self.names())
            .field("timeout", &self.timeout)
            .finish()
    }
}

async fn fetch_descriptor(fetcher: &dyn CardFetcher, endpoint: &str, timeout: Duration) -> CoreResult<AgentDescriptor> {
    let card = tokio::time::timeout(timeout, fetcher.fetch_card(endpoint))
        .await
        .map_err(|_| CoreError::TransportTimeout {
            target: endpoint.to_string(),
            seconds: timeout.as_secs(),
        })??;

    if card.name.trim().is_empty() {
        return Err(CoreError::malformed(endpoint, "agent card has no name"));
    }
    info!(agent = %card.name, endpoint = %endpoint, "Discovered agent");
    Ok(AgentDescriptor::from_card(card, endpoint))
}
