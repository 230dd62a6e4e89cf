//! The model-call collaborator seam.
//!
//! The conversation store hands each stale assistant turn to a
//! [`ModelCall`] together with the directive, the attached capabilities
//! and every turn before it. What happens behind the seam (HTTP, tool
//! loops, caching) is the collaborator's business.

use async_trait::async_trait;

use crate::error::ModelCallError;
use crate::tool::CapabilityRegistry;
use crate::turn::Turn;

/// Everything a model call may condition on.
#[derive(Debug, Clone, Copy)]
pub struct ModelCallInput<'a> {
    pub directive: &'a str,
    pub capabilities: &'a CapabilityRegistry,
    /// Turns up to and including the user turn being answered.
    pub context: &'a [Turn],
}

impl ModelCallInput<'_> {
    /// The user text being answered, i.e. the last context turn.
    pub fn prompt(&self) -> Option<&str> {
        self.context.last().map(Turn::text)
    }
}

/// Produces the text of one assistant turn.
#[async_trait]
pub trait ModelCall: Send + Sync {
    async fn call(&self, input: ModelCallInput<'_>) -> Result<String, ModelCallError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_is_last_context_turn() {
        let registry = CapabilityRegistry::new();
        let context = vec![
            Turn::user("My name is Max"),
            Turn::assistant("Hi Max"),
            Turn::user("what is 2+10"),
        ];
        let input = ModelCallInput {
            directive: "You are a helpful assistant",
            capabilities: &registry,
            context: &context,
        };
        assert_eq!(input.prompt(), Some("what is 2+10"));

        let empty = ModelCallInput { context: &[], ..input };
        assert_eq!(empty.prompt(), None);
    }
}
