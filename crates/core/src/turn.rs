//! Turn and store-identity domain types.
//!
//! A conversation is a strictly alternating sequence of turns:
//! even indices are user turns, odd indices are assistant turns.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for one conversation store instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StoreId(pub Uuid);

impl StoreId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for StoreId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for StoreId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Who authored a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    /// The role a turn at `index` must have.
    pub fn for_index(index: usize) -> Self {
        if index % 2 == 0 { Role::User } else { Role::Assistant }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => f.write_str("user"),
            Role::Assistant => f.write_str("assistant"),
        }
    }
}

/// Derived recomputation state of a turn.
///
/// `Pending` and `Stale` are both stored as `stale = true`; they differ
/// only in whether content has ever been written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnState {
    Pending,
    Stale,
    Fresh,
}

/// One exchange unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,

    /// Absent only for assistant placeholders that were never computed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    /// True when the inputs feeding this turn changed since it was computed.
    #[serde(default)]
    pub stale: bool,
}

impl Turn {
    /// A user turn. User turns are never stale.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: Some(content.into()),
            stale: false,
        }
    }

    /// An assistant turn whose content is given rather than computed.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: Some(content.into()),
            stale: false,
        }
    }

    /// An assistant placeholder awaiting its first computation.
    pub fn pending() -> Self {
        Self {
            role: Role::Assistant,
            content: None,
            stale: true,
        }
    }

    pub fn state(&self) -> TurnState {
        match (self.stale, &self.content) {
            (false, _) => TurnState::Fresh,
            (true, None) => TurnState::Pending,
            (true, Some(_)) => TurnState::Stale,
        }
    }

    /// Content as text, empty when absent.
    pub fn text(&self) -> &str {
        self.content.as_deref().unwrap_or("")
    }

    pub fn is_assistant(&self) -> bool {
        self.role == Role::Assistant
    }
}

/// `role: content`, with a `(stale)` marker on stale turns and
/// `<pending>` in place of content that was never computed.
impl std::fmt::Display for Turn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.state() {
            TurnState::Stale => write!(f, "{} (stale): {}", self.role, self.text()),
            TurnState::Pending => write!(f, "{}: <pending>", self.role),
            TurnState::Fresh => write!(f, "{}: {}", self.role, self.text()),
        }
    }
}

/// How a store was detached from its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineageKind {
    Copy,
    Branch,
}

/// Where a store came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lineage {
    pub parent: StoreId,
    pub kind: LineageKind,
    /// Number of turns the parent held when this store was detached.
    pub at_turn: usize,
}
