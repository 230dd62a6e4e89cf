//! `chatty chat`: Interactive or single-message conversation.
//!
//! Plain lines are sent to the model. Slash commands inspect and edit the
//! conversation; edits only mark replies stale, and `/run` recomputes them.

use chatty_config::AppConfig;
use chatty_conversation::{ConversationStore, transcript};
use chatty_core::error::ConversationError;
use chatty_core::event::EventBus;
use chatty_core::model::ModelCall;
use chatty_core::tool::CapabilityRegistry;
use chatty_providers::{ProviderModel, build_from_config};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

const HELP: &str = "\
  Commands:
    <text>              Send a message
    /history            Show the whole conversation
    /show N             Show turn N
    /rewrite N <text>   Replace turn N (later replies go stale)
    /directive <text>   Replace the directive (every reply goes stale)
    /run                Recompute stale replies
    /branch, /copy      Continue in a detached copy of this conversation
    /back               Return to the conversation you detached from
    /tools              List attached capabilities
    /help               Show this help
    /exit               Quit";

/// One parsed line of REPL input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Say(String),
    History,
    Show(usize),
    Rewrite { index: usize, text: String },
    Directive(String),
    Run,
    Branch,
    Copy,
    Back,
    Tools,
    Help,
    Exit,
    Empty,
    /// A malformed command, with a usage hint.
    Invalid(String),
}

/// Parse one REPL line.
pub fn parse_command(line: &str) -> Command {
    let line = line.trim();
    if line.is_empty() {
        return Command::Empty;
    }
    if matches!(line, "exit" | "quit") {
        return Command::Exit;
    }
    let Some(rest) = line.strip_prefix('/') else {
        return Command::Say(line.to_string());
    };

    let (name, args) = match rest.split_once(char::is_whitespace) {
        Some((name, args)) => (name, args.trim()),
        None => (rest, ""),
    };

    match name {
        "history" => Command::History,
        "show" => match args.parse::<usize>() {
            Ok(index) => Command::Show(index),
            Err(_) => Command::Invalid("usage: /show N".into()),
        },
        "rewrite" => {
            let (index, text) = args.split_once(char::is_whitespace).unwrap_or((args, ""));
            match (index.parse::<usize>(), text.trim()) {
                (Ok(index), text) if !text.is_empty() => Command::Rewrite {
                    index,
                    text: text.to_string(),
                },
                _ => Command::Invalid("usage: /rewrite N <text>".into()),
            }
        }
        "directive" if !args.is_empty() => Command::Directive(args.to_string()),
        "directive" => Command::Invalid("usage: /directive <text>".into()),
        "run" => Command::Run,
        "branch" => Command::Branch,
        "copy" => Command::Copy,
        "back" => Command::Back,
        "tools" => Command::Tools,
        "help" | "?" => Command::Help,
        "exit" | "quit" => Command::Exit,
        other => Command::Invalid(format!("unknown command /{other} (try /help)")),
    }
}

/// What the REPL should do after a command.
#[derive(Debug, PartialEq, Eq)]
pub enum Step {
    Print(String),
    Exit,
}

/// The REPL state: the active store plus the stores detached from.
pub struct Session {
    current: ConversationStore,
    parents: Vec<ConversationStore>,
}

impl Session {
    pub fn new(store: ConversationStore) -> Self {
        Self { current: store, parents: Vec::new() }
    }

    pub fn current(&self) -> &ConversationStore {
        &self.current
    }

    /// How many stores sit below the current one.
    pub fn depth(&self) -> usize {
        self.parents.len()
    }

    pub async fn handle(&mut self, command: Command) -> Result<Step, ConversationError> {
        let output = match command {
            Command::Say(text) => self.current.invoke(text).await?,
            Command::History => transcript(&self.current),
            Command::Show(index) => self.current.at(index)?.to_string(),
            Command::Rewrite { index, text } => {
                self.current.rewrite(index, text)?;
                stale_summary(&self.current)
            }
            Command::Directive(text) => {
                self.current.set_directive(text);
                stale_summary(&self.current)
            }
            Command::Run => {
                let report = self.current.run().await?;
                if report.is_noop() {
                    "Nothing to recompute.".to_string()
                } else {
                    let indices: Vec<String> = report.recomputed.iter().map(usize::to_string).collect();
                    format!("Recomputed turns {}.", indices.join(", "))
                }
            }
            Command::Branch => {
                let child = self.current.branch();
                self.detach(child, "branch")
            }
            Command::Copy => {
                let child = self.current.copy();
                self.detach(child, "copy")
            }
            Command::Back => match self.parents.pop() {
                Some(parent) => {
                    self.current = parent;
                    format!("Back on {} ({} turns).", self.current.id(), self.current.len())
                }
                None => "Already at the root conversation.".to_string(),
            },
            Command::Tools => {
                let names = self.current.capabilities().names();
                if names.is_empty() {
                    "No capabilities attached.".to_string()
                } else {
                    names.join(", ")
                }
            }
            Command::Help => HELP.to_string(),
            Command::Exit => return Ok(Step::Exit),
            Command::Empty => String::new(),
            Command::Invalid(usage) => usage,
        };
        Ok(Step::Print(output))
    }

    fn detach(&mut self, child: ConversationStore, kind: &str) -> String {
        let parent = std::mem::replace(&mut self.current, child);
        let message = format!("Now on {kind} {} of {}.", self.current.id(), parent.id());
        self.parents.push(parent);
        message
    }
}

fn stale_summary(store: &ConversationStore) -> String {
    match store.stale_indices().len() {
        0 => "Nothing stale.".to_string(),
        n => format!("{n} repl{} stale; /run to recompute.", if n == 1 { "y" } else { "ies" }),
    }
}

/// Local providers run without a key; everything else needs one.
fn missing_api_key(config: &AppConfig) -> bool {
    config.default_provider != "ollama" && !config.has_api_key_for(&config.default_provider)
}

pub async fn run(
    message: Option<String>,
    directive: Option<String>,
    no_tools: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    if missing_api_key(&config) {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set one of these environment variables (or put it in a .env file):");
        eprintln!("    CHATTY_API_KEY, OPENAI_API_KEY, OPENROUTER_API_KEY");
        eprintln!();
        eprintln!("  Or add it to your config file:");
        eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
        eprintln!();
        return Err("No API key found. See above for setup instructions.".into());
    }

    let router = build_from_config(&config);
    let provider = router.default_provider().ok_or("No default provider configured")?;
    let events = Arc::new(EventBus::default());
    let model: Arc<dyn ModelCall> =
        Arc::new(ProviderModel::from_config(provider, &config).with_events(events.clone()));

    let capabilities = if no_tools {
        CapabilityRegistry::new()
    } else {
        chatty_tools::default_registry()
    };
    let directive = directive.unwrap_or_else(|| config.directive.clone());
    let store = ConversationStore::new(directive, model)
        .with_capabilities(capabilities)
        .with_events(events);
    debug!(
        store_id = %store.id(),
        provider = %config.default_provider,
        capabilities = store.capabilities().len(),
        "Conversation started"
    );

    if let Some(msg) = message {
        let mut store = store;
        eprint!("  Thinking...");
        let reply = store.invoke(msg).await;
        eprint!("\r              \r");
        println!("{}", reply?);
        return Ok(());
    }

    println!();
    println!("  Chatty: interactive mode");
    println!();
    println!("  Provider:   {}", config.default_provider);
    println!("  Model:      {}", config.model_for(&config.default_provider));
    println!("  Directive:  {}", store.directive());
    println!("  Tools:      {}", display_names(store.capabilities()));
    println!();
    println!("  Type a message and press Enter. /help lists commands.");
    println!();

    let mut session = Session::new(store);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    prompt(session.depth())?;
    while let Some(line) = lines.next_line().await? {
        match session.handle(parse_command(&line)).await {
            Ok(Step::Exit) => break,
            Ok(Step::Print(output)) if output.is_empty() => {}
            Ok(Step::Print(output)) => {
                println!();
                for line in output.lines() {
                    println!("  {line}");
                }
                println!();
            }
            Err(e) => {
                eprintln!("  [Error] {e}");
                println!();
            }
        }
        prompt(session.depth())?;
    }

    println!();
    println!("  Goodbye!");
    println!();
    Ok(())
}

fn display_names(capabilities: &CapabilityRegistry) -> String {
    if capabilities.is_empty() {
        "none".to_string()
    } else {
        capabilities.names().join(", ")
    }
}

fn prompt(depth: usize) -> std::io::Result<()> {
    use std::io::Write;
    if depth == 0 {
        print!("  You > ");
    } else {
        print!("  You [{depth}] > ");
    }
    std::io::stdout().flush()
}
