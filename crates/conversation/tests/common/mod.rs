//! Shared helpers for conversation integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use chatty_core::error::{ModelCallError, ProviderError};
use chatty_core::model::{ModelCall, ModelCallInput};
use chatty_core::turn::Turn;
use std::sync::{Arc, Mutex};

type Reply = dyn Fn(&ModelCallInput<'_>) -> Result<String, ModelCallError> + Send + Sync;

/// One recorded collaborator call.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub directive: String,
    pub capabilities: Vec<String>,
    pub context: Vec<Turn>,
}

impl RecordedCall {
    /// The context as plain texts, for compact assertions.
    pub fn texts(&self) -> Vec<&str> {
        self.context.iter().map(Turn::text).collect()
    }
}

/// A model collaborator driven by a closure, recording every call.
pub struct ScriptedModel {
    reply: Box<Reply>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedModel {
    pub fn new(
        reply: impl Fn(&ModelCallInput<'_>) -> Result<String, ModelCallError> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            reply: Box::new(reply),
            calls: Mutex::new(Vec::new()),
        })
    }

    /// Replies `re: <prompt>`.
    pub fn echo() -> Arc<Self> {
        Self::new(|input| Ok(format!("re: {}", input.prompt().unwrap_or_default())))
    }

    /// Echoes, except when answering the assistant turn at `index`.
    pub fn failing_at(index: usize) -> Arc<Self> {
        Self::new(move |input| {
            if input.context.len() == index {
                Err(ProviderError::ApiError {
                    status_code: 503,
                    message: "upstream unavailable".into(),
                }
                .into())
            } else {
                Ok(format!("re: {}", input.prompt().unwrap_or_default()))
            }
        })
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl ModelCall for ScriptedModel {
    async fn call(&self, input: ModelCallInput<'_>) -> Result<String, ModelCallError> {
        self.calls.lock().unwrap().push(RecordedCall {
            directive: input.directive.to_string(),
            capabilities: input.capabilities.names().into_iter().map(String::from).collect(),
            context: input.context.to_vec(),
        });
        (self.reply)(&input)
    }
}
