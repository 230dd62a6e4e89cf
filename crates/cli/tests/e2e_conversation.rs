//! End-to-end tests for the Chatty pipeline.
//!
//! A scripted provider stands in for the HTTP backend; everything between
//! user input and the stored reply is real: store, provider-backed model
//! call, tool loop and the calculator capability.

use std::sync::{Arc, Mutex};

use chatty_conversation::{ConversationStore, transcript};
use chatty_core::error::{ConversationError, ModelCallError, ProviderError};
use chatty_core::event::{DomainEvent, EventBus};
use chatty_core::provider::{
    ChatMessage, ChatRole, MessageToolCall, Provider, ProviderRequest, ProviderResponse, Usage,
};
use chatty_core::turn::TurnState;
use chatty_providers::ProviderModel;
use chatty_tools::default_registry;

// ── Mock Provider ────────────────────────────────────────────────────────

/// Returns scripted responses in sequence and records every request.
struct ScriptedProvider {
    responses: Mutex<Vec<Result<ProviderResponse, ProviderError>>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    fn new(responses: Vec<Result<ProviderResponse, ProviderError>>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "e2e_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        self.requests.lock().unwrap().push(request);
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            panic!("ScriptedProvider: no more responses");
        }
        responses.remove(0)
    }
}

fn text(content: &str) -> Result<ProviderResponse, ProviderError> {
    Ok(ProviderResponse {
        message: ChatMessage::assistant(content),
        usage: Some(Usage {
            prompt_tokens: 20,
            completion_tokens: 8,
            total_tokens: 28,
        }),
        model: "e2e-model".into(),
    })
}

fn calculate(formula: &str) -> Result<ProviderResponse, ProviderError> {
    let message = ChatMessage {
        tool_calls: vec![MessageToolCall {
            id: "call_calc".into(),
            name: "calculator".into(),
            arguments: serde_json::json!({ "formula": formula }).to_string(),
        }],
        ..ChatMessage::assistant("")
    };
    Ok(ProviderResponse {
        message,
        usage: None,
        model: "e2e-model".into(),
    })
}

fn store_with(provider: Arc<ScriptedProvider>, events: Arc<EventBus>) -> ConversationStore {
    let model = ProviderModel::new(provider, "e2e-model").with_events(events.clone());
    ConversationStore::new("You are a helpful assistant", Arc::new(model))
        .with_capabilities(default_registry())
        .with_events(events)
}

fn contents(request: &ProviderRequest) -> Vec<(ChatRole, String)> {
    request
        .messages
        .iter()
        .map(|m| (m.role, m.content.clone()))
        .collect()
}

// ── Tests ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn rewrite_and_recompute_through_provider() {
    let provider = ScriptedProvider::new(vec![
        text("Nice to meet you, Max."),
        calculate("2+10"),
        text("2+10 is 12."),
        text("Nice to meet you, Zoe."),
        text("Still 12, Zoe."),
    ]);
    let events = Arc::new(EventBus::default());
    let mut store = store_with(provider.clone(), events.clone());

    assert_eq!(store.invoke("My name is Max").await.unwrap(), "Nice to meet you, Max.");
    assert_eq!(store.invoke("what is 2+10").await.unwrap(), "2+10 is 12.");

    let requests = provider.requests();
    assert_eq!(requests.len(), 3);
    assert_eq!(requests[0].tools[0].name, "calculator");
    assert_eq!(
        contents(&requests[1]),
        vec![
            (ChatRole::System, "You are a helpful assistant".to_string()),
            (ChatRole::User, "My name is Max".to_string()),
            (ChatRole::Assistant, "Nice to meet you, Max.".to_string()),
            (ChatRole::User, "what is 2+10".to_string()),
        ]
    );
    // The tool result went back to the model before the final answer.
    let tool_msg = requests[2].messages.last().unwrap();
    assert_eq!(tool_msg.role, ChatRole::Tool);
    assert_eq!(tool_msg.content, "12");

    store.rewrite(0, "My name is Zoe").unwrap();
    assert_eq!(store.stale_indices(), vec![1, 3]);

    let report = store.run().await.unwrap();
    assert_eq!(report.recomputed, vec![1, 3]);

    let requests = provider.requests();
    assert_eq!(requests.len(), 5);
    assert_eq!(
        contents(&requests[3])[1..],
        [(ChatRole::User, "My name is Zoe".to_string())]
    );
    assert_eq!(
        contents(&requests[4])[1..],
        [
            (ChatRole::User, "My name is Zoe".to_string()),
            (ChatRole::Assistant, "Nice to meet you, Zoe.".to_string()),
            (ChatRole::User, "what is 2+10".to_string()),
        ]
    );

    let shown = transcript(&store);
    assert!(shown.contains("# capabilities: calculator"));
    assert!(shown.contains("  3  assistant: Still 12, Zoe."));
}

#[tokio::test]
async fn provider_failure_stops_the_run() {
    let provider = ScriptedProvider::new(vec![
        text("Hi Max."),
        text("Twelve."),
        text("Salut Max."),
        Err(ProviderError::RateLimited { retry_after_secs: 5 }),
    ]);
    let events = Arc::new(EventBus::default());
    let mut rx = events.subscribe();
    let mut store = store_with(provider.clone(), events.clone());

    store.invoke("My name is Max").await.unwrap();
    store.invoke("what is 2+10").await.unwrap();
    store.set_directive("Answer in French");

    let err = store.run().await.unwrap_err();
    assert_eq!(err.failed_turn(), Some(3));
    assert!(matches!(
        err,
        ConversationError::ModelCall {
            source: ModelCallError::Provider(ProviderError::RateLimited { .. }),
            ..
        }
    ));
    assert_eq!(store.at(1).unwrap().text(), "Salut Max.");
    assert_eq!(store.at(3).unwrap().state(), TurnState::Stale);
    assert_eq!(store.at(3).unwrap().text(), "Twelve.");
    assert_eq!(
        provider.requests()[3].messages[0].content,
        "Answer in French"
    );

    let mut failed = None;
    while let Ok(event) = rx.try_recv() {
        if let DomainEvent::RunFailed { index, .. } = event.as_ref() {
            failed = Some(*index);
        }
    }
    assert_eq!(failed, Some(3));
}

#[tokio::test]
async fn branch_shares_model_but_not_history() {
    let provider = ScriptedProvider::new(vec![text("Hello."), text("On the branch.")]);
    let events = Arc::new(EventBus::default());
    let mut store = store_with(provider.clone(), events);

    store.invoke("hello").await.unwrap();
    let mut branch = store.branch();
    assert_eq!(branch.invoke("branch only").await.unwrap(), "On the branch.");

    assert_eq!(store.len(), 2);
    assert_eq!(branch.len(), 4);
    assert_eq!(branch.lineage().unwrap().parent, store.id());
    assert_eq!(provider.requests().len(), 2);
}
