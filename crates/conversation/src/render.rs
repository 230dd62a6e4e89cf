//! Human-readable rendering of a conversation.

use std::fmt::Write;

use chatty_core::turn::LineageKind;

use crate::store::ConversationStore;

/// Render a store as a transcript: a `#` header with the directive,
/// capabilities and lineage, then one `index  role: content` line per turn.
pub fn transcript(store: &ConversationStore) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# directive: {}", store.directive());

    if !store.capabilities().is_empty() {
        let _ = writeln!(out, "# capabilities: {}", store.capabilities().names().join(", "));
    }

    if let Some(lineage) = store.lineage() {
        let kind = match lineage.kind {
            LineageKind::Copy => "copy",
            LineageKind::Branch => "branch",
        };
        let _ = writeln!(out, "# {kind} of {} at turn {}", lineage.parent, lineage.at_turn);
    }

    for (index, turn) in store.turns().iter().enumerate() {
        let _ = writeln!(out, "{index:>3}  {turn}");
    }
    out
}
