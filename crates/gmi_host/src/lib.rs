//! # gmi_host
//!
//! The host agent: the user-facing entry point that delegates work to the
//! remote GMI agents.
//!
//! ```rust,ignore
//! use futures::StreamExt;
//! use gmi_host::{HostAgent, HostEvent, HostRequest};
//!
//! let host = Arc::new(HostAgent::from_client(client).with_model(model));
//! let mut events = host.stream(HostRequest::query("Plan our portal launch"), "session-1");
//! while let Some(event) = events.next().await {
//!     match event {
//!         HostEvent::Working { status } => println!("{}", status),
//!         HostEvent::Completed { content } => println!("{:?}", content),
//!     }
//! }
//! ```

pub mod error;
pub mod events;
pub mod orchestrator;
pub mod reasoning;
pub mod request;
pub mod routing;
pub mod session;

pub use error::{HostError, HostResult};
pub use events::{HostEvent, THINKING};
pub use orchestrator::{AgentEntry, HostAgent, DEFAULT_MAX_TOOL_CALLS, DEFAULT_MODEL_TIMEOUT};
pub use request::HostRequest;
pub use routing::fallback_agent;
pub use session::{Session, SessionStore, Speaker, Turn, DEFAULT_MAX_SESSIONS};
