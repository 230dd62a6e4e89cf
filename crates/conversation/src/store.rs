//! The conversation store.
//!
//! A [`ConversationStore`] owns an alternating sequence of user and
//! assistant turns. Mutations never call the model; they only mark the
//! assistant turns whose inputs changed as stale. [`ConversationStore::run`]
//! then recomputes exactly those turns, oldest first, so every recomputed
//! turn sees the final content of everything before it.

use chatty_core::error::ConversationError;
use chatty_core::event::{DomainEvent, EventBus};
use chatty_core::model::{ModelCall, ModelCallInput};
use chatty_core::tool::{CapabilityRegistry, Tool};
use chatty_core::turn::{Lineage, LineageKind, Role, StoreId, Turn};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What a successful [`ConversationStore::run`] did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Indices of the assistant turns that were recomputed, ascending.
    pub recomputed: Vec<usize>,
}

impl RunReport {
    /// True when the run had nothing to do.
    pub fn is_noop(&self) -> bool {
        self.recomputed.is_empty()
    }
}

/// A stateful conversation with incremental recomputation.
pub struct ConversationStore {
    id: StoreId,
    directive: String,
    turns: Vec<Turn>,
    capabilities: CapabilityRegistry,
    lineage: Option<Lineage>,
    model: Arc<dyn ModelCall>,
    events: Option<Arc<EventBus>>,
}

impl ConversationStore {
    /// Create an empty root store.
    pub fn new(directive: impl Into<String>, model: Arc<dyn ModelCall>) -> Self {
        Self {
            id: StoreId::new(),
            directive: directive.into(),
            turns: Vec::new(),
            capabilities: CapabilityRegistry::new(),
            lineage: None,
            model,
            events: None,
        }
    }

    /// Create a store seeded with alternating user/assistant texts.
    ///
    /// Seeded assistant texts are taken as given (fresh). An odd-length
    /// seed ends on a user turn, so a pending assistant placeholder is
    /// appended for the next [`run`](Self::run) to fill.
    pub fn with_history<I, S>(directive: impl Into<String>, model: Arc<dyn ModelCall>, seed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut store = Self::new(directive, model);
        store.turns = seed
            .into_iter()
            .enumerate()
            .map(|(i, text)| match Role::for_index(i) {
                Role::User => Turn::user(text),
                Role::Assistant => Turn::assistant(text),
            })
            .collect();
        if store.turns.len() % 2 == 1 {
            store.turns.push(Turn::pending());
        }
        store
    }

    /// Attach a whole capability set at construction.
    pub fn with_capabilities(mut self, capabilities: CapabilityRegistry) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Publish domain events on `events`.
    pub fn with_events(mut self, events: Arc<EventBus>) -> Self {
        self.events = Some(events);
        self
    }

    // --- Mutations ---

    /// Append a user turn, compute its reply and return it.
    ///
    /// Any turns already stale are recomputed in the same pass. On failure
    /// the new turns stay in place with the reply still pending, so a later
    /// [`run`](Self::run) retries it.
    pub async fn invoke(&mut self, text: impl Into<String>) -> Result<String, ConversationError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(ConversationError::EmptyInput);
        }

        self.turns.push(Turn::user(text));
        self.turns.push(Turn::pending());

        let report = self.run().await?;
        let reply = self.last_reply().unwrap_or_default().to_string();
        info!(
            store_id = %self.id,
            turns = self.turns.len(),
            recomputed = report.recomputed.len(),
            "Invoke complete"
        );
        Ok(reply)
    }

    /// Replace the content of turn `index`.
    ///
    /// Every assistant turn after `index` becomes stale. The rewritten turn
    /// keeps its own staleness, so an overridden assistant reply stands
    /// until something before it changes.
    pub fn rewrite(&mut self, index: usize, content: impl Into<String>) -> Result<(), ConversationError> {
        let len = self.turns.len();
        let turn = self
            .turns
            .get_mut(index)
            .ok_or(ConversationError::IndexOutOfRange { index, len })?;
        turn.content = Some(content.into());

        let invalidated = self.invalidate_from(index + 1);
        debug!(store_id = %self.id, index, invalidated, "Turn rewritten");
        Ok(())
    }

    /// Replace the directive. Every assistant turn becomes stale.
    pub fn set_directive(&mut self, text: impl Into<String>) {
        self.directive = text.into();
        let invalidated = self.invalidate_from(0);
        debug!(store_id = %self.id, invalidated, "Directive changed");
        self.publish(DomainEvent::DirectiveChanged {
            store_id: self.id,
            invalidated,
            timestamp: Utc::now(),
        });
    }

    /// Attach a capability. Existing turns are not invalidated.
    pub fn add_capability(&mut self, tool: Arc<dyn Tool>) -> Result<(), ConversationError> {
        let name = tool.name().to_string();
        self.capabilities.insert(tool)?;
        debug!(store_id = %self.id, capability = %name, "Capability added");
        self.publish(DomainEvent::CapabilityAdded {
            store_id: self.id,
            name,
            timestamp: Utc::now(),
        });
        Ok(())
    }

    /// Recompute every stale assistant turn, in ascending index order.
    ///
    /// Stops at the first failing turn: that turn and everything after it
    /// are left exactly as they were, and the error names the index.
    pub async fn run(&mut self) -> Result<RunReport, ConversationError> {
        let stale = self.stale_indices();
        if stale.is_empty() {
            debug!(store_id = %self.id, "Nothing stale");
            return Ok(RunReport::default());
        }

        let mut recomputed = Vec::with_capacity(stale.len());
        for index in stale {
            let input = ModelCallInput {
                directive: &self.directive,
                capabilities: &self.capabilities,
                context: &self.turns[..index],
            };

            let result = self.model.call(input).await;
            match result {
                Ok(text) => {
                    let chars = text.chars().count();
                    let turn = &mut self.turns[index];
                    turn.content = Some(text);
                    turn.stale = false;
                    recomputed.push(index);

                    debug!(store_id = %self.id, index, chars, "Turn recomputed");
                    self.publish(DomainEvent::TurnRecomputed {
                        store_id: self.id,
                        index,
                        chars,
                        timestamp: Utc::now(),
                    });
                }
                Err(source) => {
                    warn!(store_id = %self.id, index, error = %source, "Model call failed");
                    self.publish(DomainEvent::RunFailed {
                        store_id: self.id,
                        index,
                        error_message: source.to_string(),
                        timestamp: Utc::now(),
                    });
                    return Err(ConversationError::ModelCall { index, source });
                }
            }
        }

        info!(store_id = %self.id, recomputed = ?recomputed, "Run complete");
        self.publish(DomainEvent::RunCompleted {
            store_id: self.id,
            recomputed: recomputed.clone(),
            timestamp: Utc::now(),
        });
        Ok(RunReport { recomputed })
    }

    // --- Detachment ---

    /// A fully independent copy tagged as a copy of this store.
    pub fn copy(&self) -> Self {
        self.detach(LineageKind::Copy)
    }

    /// A fully independent copy tagged as a branch of this store.
    pub fn branch(&self) -> Self {
        self.detach(LineageKind::Branch)
    }

    fn detach(&self, kind: LineageKind) -> Self {
        let child = Self {
            id: StoreId::new(),
            directive: self.directive.clone(),
            turns: self.turns.clone(),
            capabilities: self.capabilities.clone(),
            lineage: Some(Lineage {
                parent: self.id,
                kind,
                at_turn: self.turns.len(),
            }),
            model: Arc::clone(&self.model),
            events: self.events.clone(),
        };
        debug!(parent = %self.id, child = %child.id, ?kind, "Store detached");
        child
    }

    // --- Reads ---

    pub fn at(&self, index: usize) -> Result<&Turn, ConversationError> {
        self.turns.get(index).ok_or(ConversationError::IndexOutOfRange {
            index,
            len: self.turns.len(),
        })
    }

    /// An owned snapshot of every turn.
    pub fn full_history(&self) -> Vec<Turn> {
        self.turns.clone()
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn id(&self) -> StoreId {
        self.id
    }

    pub fn directive(&self) -> &str {
        &self.directive
    }

    pub fn capabilities(&self) -> &CapabilityRegistry {
        &self.capabilities
    }

    pub fn lineage(&self) -> Option<Lineage> {
        self.lineage
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Indices of assistant turns awaiting recomputation, ascending.
    pub fn stale_indices(&self) -> Vec<usize> {
        self.turns
            .iter()
            .enumerate()
            .filter(|(_, t)| t.is_assistant() && t.stale)
            .map(|(i, _)| i)
            .collect()
    }

    /// Content of the final assistant turn, if it has any.
    pub fn last_reply(&self) -> Option<&str> {
        self.turns
            .last()
            .filter(|t| t.is_assistant())
            .and_then(|t| t.content.as_deref())
    }

    // --- Internals ---

    /// Mark stale every assistant turn at `start` or later. Returns how many.
    fn invalidate_from(&mut self, start: usize) -> usize {
        let mut count = 0;
        for turn in self.turns.iter_mut().skip(start).filter(|t| t.is_assistant()) {
            turn.stale = true;
            count += 1;
        }
        count
    }

    fn publish(&self, event: DomainEvent) {
        if let Some(events) = &self.events {
            events.publish(event);
        }
    }
}

impl std::fmt::Debug for ConversationStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationStore")
            .field("id", &self.id)
            .field("directive", &self.directive)
            .field("turns", &self.turns)
            .field("capabilities", &self.capabilities)
            .field("lineage", &self.lineage)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chatty_core::error::{ModelCallError, ProviderError, ToolError};
    use chatty_core::tool::ToolOutput;
    use chatty_core::turn::TurnState;
    use std::sync::Mutex;

    /// Replies `re: <prompt>`; fails when the prompt is `fail`.
    #[derive(Default)]
    struct EchoModel {
        contexts: Mutex<Vec<Vec<Turn>>>,
    }

    impl EchoModel {
        fn call_count(&self) -> usize {
            self.contexts.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl ModelCall for EchoModel {
        async fn call(&self, input: ModelCallInput<'_>) -> Result<String, ModelCallError> {
            self.contexts.lock().unwrap().push(input.context.to_vec());
            match input.prompt() {
                Some("fail") => Err(ProviderError::Network("connection reset".into()).into()),
                Some(prompt) => Ok(format!("re: {prompt}")),
                None => Err(ModelCallError::EmptyContext),
            }
        }
    }

    struct NoopTool(&'static str);

    #[async_trait]
    impl Tool for NoopTool {
        fn name(&self) -> &str {
            self.0
        }
        fn description(&self) -> &str {
            "does nothing"
        }
        fn parameters_schema(&self) -> serde_json::Value {
            serde_json::json!({"type": "object"})
        }
        async fn execute(&self, _arguments: serde_json::Value) -> Result<ToolOutput, ToolError> {
            Ok(ToolOutput { success: true, output: String::new(), data: None })
        }
    }

    fn store() -> (ConversationStore, Arc<EchoModel>) {
        let model = Arc::new(EchoModel::default());
        (ConversationStore::new("You are a helpful assistant", model.clone()), model)
    }

    #[tokio::test]
    async fn invoke_appends_pair_and_returns_reply() {
        let (mut store, model) = store();
        let reply = store.invoke("My name is Max").await.unwrap();

        assert_eq!(reply, "re: My name is Max");
        assert_eq!(store.len(), 2);
        assert_eq!(store.at(0).unwrap(), &Turn::user("My name is Max"));
        assert_eq!(store.at(1).unwrap().state(), TurnState::Fresh);
        assert_eq!(store.last_reply(), Some("re: My name is Max"));
        assert_eq!(model.call_count(), 1);
    }

    #[tokio::test]
    async fn invoke_rejects_blank_input() {
        let (mut store, model) = store();
        let err = store.invoke("   ").await.unwrap_err();
        assert!(matches!(err, ConversationError::EmptyInput));
        assert!(store.is_empty());
        assert_eq!(model.call_count(), 0);
    }

    #[tokio::test]
    async fn failed_invoke_leaves_pending_reply() {
        let (mut store, _) = store();
        let err = store.invoke("fail").await.unwrap_err();
        assert_eq!(err.failed_turn(), Some(1));
        assert_eq!(store.len(), 2);
        assert_eq!(store.at(1).unwrap().state(), TurnState::Pending);
        assert_eq!(store.stale_indices(), vec![1]);
    }

    #[test]
    fn with_history_seeds_fresh_turns() {
        let model = Arc::new(EchoModel::default());
        let store = ConversationStore::with_history("d", model, ["hi", "hello", "how are you?"]);

        assert_eq!(store.len(), 4);
        assert_eq!(store.at(1).unwrap(), &Turn::assistant("hello"));
        assert_eq!(store.at(3).unwrap().state(), TurnState::Pending);
        assert_eq!(store.stale_indices(), vec![3]);
        assert_eq!(store.last_reply(), None);
    }

    #[test]
    fn rewrite_out_of_range_is_rejected() {
        let model = Arc::new(EchoModel::default());
        let mut store = ConversationStore::with_history("d", model, ["a", "b"]);
        let before = store.full_history();

        let err = store.rewrite(2, "nope").unwrap_err();
        assert!(matches!(err, ConversationError::IndexOutOfRange { index: 2, len: 2 }));
        assert_eq!(store.full_history(), before);
        assert!(store.at(5).is_err());
    }

    #[test]
    fn rewriting_an_assistant_turn_keeps_it_fresh() {
        let model = Arc::new(EchoModel::default());
        let mut store = ConversationStore::with_history("d", model, ["a", "b", "c", "d"]);

        store.rewrite(1, "overridden").unwrap();
        assert_eq!(store.at(1).unwrap().state(), TurnState::Fresh);
        assert_eq!(store.at(1).unwrap().text(), "overridden");
        assert_eq!(store.stale_indices(), vec![3]);
    }

    #[test]
    fn add_capability_does_not_invalidate() {
        let model = Arc::new(EchoModel::default());
        let mut store = ConversationStore::with_history("d", model, ["a", "b"]);

        store.add_capability(Arc::new(NoopTool("calculator"))).unwrap();
        assert!(store.stale_indices().is_empty());

        let err = store.add_capability(Arc::new(NoopTool("calculator"))).unwrap_err();
        assert!(matches!(err, ConversationError::DuplicateCapability(ref n) if n == "calculator"));
        assert_eq!(store.capabilities().len(), 1);
    }

    #[tokio::test]
    async fn run_passes_directive_and_capabilities() {
        struct Inspect;

        #[async_trait]
        impl ModelCall for Inspect {
            async fn call(&self, input: ModelCallInput<'_>) -> Result<String, ModelCallError> {
                Ok(format!("{}|{}", input.directive, input.capabilities.names().join(",")))
            }
        }

        let mut store = ConversationStore::new("Be brief", Arc::new(Inspect));
        store.add_capability(Arc::new(NoopTool("calculator"))).unwrap();
        assert_eq!(store.invoke("hi").await.unwrap(), "Be brief|calculator");
    }

    #[tokio::test]
    async fn events_follow_mutations() {
        let events = Arc::new(EventBus::default());
        let mut rx = events.subscribe();
        let (store, _) = store();
        let mut store = store.with_events(events);

        store.invoke("hi").await.unwrap();
        store.set_directive("Answer in French");
        store.add_capability(Arc::new(NoopTool("calculator"))).unwrap();

        let mut seen = Vec::new();
        while let Ok(event) = rx.try_recv() {
            seen.push(event);
        }
        assert!(matches!(seen[0].as_ref(), DomainEvent::TurnRecomputed { index: 1, chars: 6, .. }));
        assert!(matches!(seen[1].as_ref(), DomainEvent::RunCompleted { recomputed, .. } if recomputed == &vec![1]));
        assert!(matches!(seen[2].as_ref(), DomainEvent::DirectiveChanged { invalidated: 1, .. }));
        assert!(matches!(seen[3].as_ref(), DomainEvent::CapabilityAdded { name, .. } if name == "calculator"));
        assert_eq!(seen.len(), 4);
    }

    #[tokio::test]
    async fn run_failure_is_published() {
        let events = Arc::new(EventBus::default());
        let mut rx = events.subscribe();
        let (store, _) = store();
        let mut store = store.with_events(events);

        assert!(store.invoke("fail").await.is_err());
        match rx.try_recv().unwrap().as_ref() {
            DomainEvent::RunFailed { store_id, index, error_message, .. } => {
                assert_eq!(*store_id, store.id());
                assert_eq!(*index, 1);
                assert!(error_message.contains("connection reset"));
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn copy_and_branch_record_lineage() {
        let model = Arc::new(EchoModel::default());
        let store = ConversationStore::with_history("d", model, ["a", "b"]);

        let copy = store.copy();
        let branch = store.branch();
        assert_ne!(copy.id(), store.id());
        assert_ne!(branch.id(), copy.id());
        assert_eq!(store.lineage(), None);
        assert_eq!(
            copy.lineage(),
            Some(Lineage { parent: store.id(), kind: LineageKind::Copy, at_turn: 2 })
        );
        assert_eq!(branch.lineage().unwrap().kind, LineageKind::Branch);
        assert_eq!(branch.full_history(), store.full_history());
        assert_eq!(branch.directive(), "d");
    }

    #[test]
    fn debug_omits_model() {
        let (store, _) = store();
        let shown = format!("{store:?}");
        assert!(shown.starts_with("ConversationStore"));
        assert!(shown.contains("You are a helpful assistant"));
    }
}
