//! LLM Provider implementations for Chatty.
//!
//! All providers implement the `chatty_core::Provider` trait.
//! The router selects the correct provider based on configuration, and
//! [`ProviderModel`] adapts a provider to the conversation store's
//! `ModelCall` seam.

pub mod model;
pub mod openai_compat;
pub mod router;

pub use model::ProviderModel;
pub use openai_compat::OpenAiCompatProvider;
pub use router::{ProviderRouter, build_from_config};
