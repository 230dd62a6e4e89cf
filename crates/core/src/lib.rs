//! # Chatty Core
//!
//! Domain types, traits, and error definitions for the Chatty conversation
//! engine. This crate has **no framework dependencies**; it defines the
//! domain model the other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator is a trait here. Implementations live in
//! their respective crates:
//! - [`Provider`]: LLM backends (`chatty-providers`)
//! - [`ModelCall`]: turns a context into assistant text (`chatty-providers`)
//! - [`Tool`]: capabilities the model may invoke (`chatty-tools`)
//!
//! The engine itself (`chatty-conversation`) only sees [`ModelCall`], so it
//! can be tested with scripted stand-ins.

pub mod error;
pub mod event;
pub mod model;
pub mod provider;
pub mod tool;
pub mod turn;

// Re-export key types at crate root for ergonomics
pub use error::{ConversationError, ModelCallError, ProviderError, ToolError};
pub use event::{DomainEvent, EventBus};
pub use model::{ModelCall, ModelCallInput};
pub use provider::{ChatMessage, ChatRole, Provider, ProviderRequest, ProviderResponse, ToolDefinition};
pub use tool::{CapabilityRegistry, Tool, ToolCall, ToolOutput};
pub use turn::{Lineage, LineageKind, Role, StoreId, Turn, TurnState};
