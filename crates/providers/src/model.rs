//! Provider-backed model calls.
//!
//! [`ProviderModel`] answers one assistant turn:
//!
//! 1. **Render** the directive as a system message and each context turn
//!    as a user/assistant message
//! 2. **Send** the transcript plus capability definitions to the provider
//! 3. **If tool calls**: run them through the capability registry, append
//!    the results, go back to step 2
//! 4. **If text**: that text is the turn's content
//!
//! Tool failures are fed back to the model as `Error: ...` output so it can
//! recover; provider failures end the call.

use async_trait::async_trait;
use chatty_config::AppConfig;
use chatty_core::error::ModelCallError;
use chatty_core::event::{DomainEvent, EventBus};
use chatty_core::model::{ModelCall, ModelCallInput};
use chatty_core::provider::{ChatMessage, Provider, ProviderRequest};
use chatty_core::tool::{CapabilityRegistry, ToolCall};
use chatty_core::turn::{Role, Turn};
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// A [`ModelCall`] collaborator backed by an LLM [`Provider`].
pub struct ProviderModel {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
    max_rounds: u32,
    events: Option<Arc<EventBus>>,
}

impl ProviderModel {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: 0.7,
            max_tokens: None,
            max_rounds: 8,
            events: None,
        }
    }

    /// Build from config: model, temperature, token and tool-round limits.
    pub fn from_config(provider: Arc<dyn Provider>, config: &AppConfig) -> Self {
        let model = config.model_for(provider.name()).to_string();
        Self::new(provider, model)
            .with_temperature(config.default_temperature)
            .with_max_tokens(config.default_max_tokens)
            .with_max_rounds(config.max_tool_rounds)
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    /// Maximum provider round-trips per turn.
    pub fn with_max_rounds(mut self, max: u32) -> Self {
        self.max_rounds = max.max(1);
        self
    }

    pub fn with_events(mut self, events: Arc<EventBus>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Render the directive and context turns as a provider transcript.
    ///
    /// Turns without content (never computed) are sent as empty assistant
    /// messages so the alternation stays intact.
    pub fn transcript(directive: &str, context: &[Turn]) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(context.len() + 1);
        if !directive.is_empty() {
            messages.push(ChatMessage::system(directive));
        }
        messages.extend(context.iter().map(|turn| match turn.role {
            Role::User => ChatMessage::user(turn.text()),
            Role::Assistant => ChatMessage::assistant(turn.text()),
        }));
        messages
    }

    async fn run_tool(&self, capabilities: &CapabilityRegistry, call: &ToolCall) -> String {
        let start = Instant::now();
        let result = capabilities.execute(call).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        let (success, output) = match result {
            Ok(out) => (out.success, out.output),
            Err(e) => {
                warn!(tool = %call.name, error = %e, "Tool execution failed");
                (false, format!("Error: {e}"))
            }
        };

        if let Some(events) = &self.events {
            events.publish(DomainEvent::ToolExecuted {
                tool_name: call.name.clone(),
                success,
                duration_ms,
                timestamp: Utc::now(),
            });
        }
        output
    }
}

#[async_trait]
impl ModelCall for ProviderModel {
    async fn call(&self, input: ModelCallInput<'_>) -> Result<String, ModelCallError> {
        if input.context.is_empty() {
            return Err(ModelCallError::EmptyContext);
        }

        let mut messages = Self::transcript(input.directive, input.context);
        let tools = input.capabilities.definitions();

        for round in 1..=self.max_rounds {
            debug!(
                provider = %self.provider.name(),
                model = %self.model,
                round,
                messages = messages.len(),
                "Model call round"
            );

            let request = ProviderRequest {
                model: self.model.clone(),
                messages: messages.clone(),
                temperature: self.temperature,
                max_tokens: self.max_tokens,
                tools: tools.clone(),
            };
            let response = self.provider.complete(request).await?;

            if response.message.tool_calls.is_empty() {
                return Ok(response.message.content);
            }

            let tool_calls = response.message.tool_calls.clone();
            messages.push(response.message);

            for tc in &tool_calls {
                let call = ToolCall {
                    id: tc.id.clone(),
                    name: tc.name.clone(),
                    arguments: serde_json::from_str(&tc.arguments).unwrap_or_default(),
                };
                let output = self.run_tool(input.capabilities, &call).await;
                messages.push(ChatMessage::tool_result(&tc.id, output));
            }
        }

        Err(ModelCallError::ToolLoopExhausted {
            max_rounds: self.max_rounds,
        })
    }
}
