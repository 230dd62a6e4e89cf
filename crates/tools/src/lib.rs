//! Built-in capabilities for Chatty.
//!
//! Capabilities are attached to a conversation and offered to the model,
//! which may call them while answering a turn.

pub mod calculator;

use chatty_core::tool::CapabilityRegistry;
use std::sync::Arc;

pub use calculator::CalculatorTool;

/// Create a capability registry with all built-in tools.
pub fn default_registry() -> CapabilityRegistry {
    let mut registry = CapabilityRegistry::new();
    // Fresh registry, so names cannot collide.
    let _ = registry.insert(Arc::new(CalculatorTool));
    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_registry_has_calculator() {
        let registry = default_registry();
        assert_eq!(registry.names(), vec!["calculator"]);
    }
}
