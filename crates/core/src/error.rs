//! Error types for the Chatty domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error enum.

use thiserror::Error;

// --- Bounded context errors ---

/// Failures surfaced by the conversation store.
///
/// None of these leave the store partially mutated: index and capability
/// errors are raised before any change, and a failed recomputation leaves
/// the failing turn (and everything after it) exactly as it was.
#[derive(Debug, Error)]
pub enum ConversationError {
    #[error("Turn index {index} out of range (conversation has {len} turns)")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Capability already attached: {0}")]
    DuplicateCapability(String),

    #[error("Recomputing turn {index} failed: {source}")]
    ModelCall {
        index: usize,
        #[source]
        source: ModelCallError,
    },

    #[error("User input must not be empty")]
    EmptyInput,
}

impl ConversationError {
    /// The turn index a failed recomputation stopped at, if any.
    pub fn failed_turn(&self) -> Option<usize> {
        match self {
            Self::ModelCall { index, .. } => Some(*index),
            _ => None,
        }
    }
}

/// Opaque upstream failure from the model-call collaborator.
#[derive(Debug, Error)]
pub enum ModelCallError {
    #[error("{0}")]
    Provider(#[from] ProviderError),

    #[error("{0}")]
    Tool(#[from] ToolError),

    #[error("No context turns to answer")]
    EmptyContext,

    #[error("Model kept requesting tools after {max_rounds} rounds")]
    ToolLoopExhausted { max_rounds: u32 },
}

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Tool execution failed: {tool_name}: {reason}")]
    ExecutionFailed { tool_name: String, reason: String },

    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_error_names_index_and_length() {
        let err = ConversationError::IndexOutOfRange { index: 7, len: 4 };
        let text = err.to_string();
        assert!(text.contains('7'));
        assert!(text.contains('4'));
    }

    #[test]
    fn model_call_error_reports_failed_turn() {
        let err = ConversationError::ModelCall {
            index: 3,
            source: ModelCallError::Provider(ProviderError::RateLimited {
                retry_after_secs: 5,
            }),
        };
        assert_eq!(err.failed_turn(), Some(3));
        assert!(err.to_string().contains("turn 3"));
        assert!(err.to_string().contains("Rate limited"));
        assert_eq!(ConversationError::EmptyInput.failed_turn(), None);
    }

    #[test]
    fn tool_error_displays_correctly() {
        let err = ModelCallError::Tool(ToolError::ExecutionFailed {
            tool_name: "calculator".into(),
            reason: "division by zero".into(),
        });
        assert!(err.to_string().contains("calculator"));
        assert!(err.to_string().contains("division by zero"));
    }
}
