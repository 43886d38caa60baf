//! # gmi_a2a
//!
//! Agent-to-agent plumbing for GMI.
//!
//! - **Protocol**: JSON-RPC 2.0 envelopes, agent cards and wire tasks
//! - **Discovery**: `CapabilityRegistry` resolves endpoints to `AgentDescriptor`s
//! - **Client**: `A2aClient` sends tasks to named agents with a bounded wait
//! - **Server**: `router`/`serve` expose an `AgentExecutor` over HTTP

pub mod client;
pub mod discovery;
pub mod protocol;
pub mod server;

pub use client::{
    extract_parts, A2aClient, HttpTransport, RemoteConnection, Transport, DEFAULT_REQUEST_TIMEOUT,
};
pub use discovery::{
    AgentDescriptor, CapabilityRegistry, CardFetcher, DiscoveryFailure, DiscoverySummary,
    HttpCardFetcher, DEFAULT_DISCOVERY_TIMEOUT,
};
pub use protocol::{AgentCapabilities, AgentCard, AgentSkill, WireTask};
pub use server::{router, serve, AgentExecutor};
