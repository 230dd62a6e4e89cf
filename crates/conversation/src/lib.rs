//! The Chatty conversation engine.
//!
//! A [`ConversationStore`] keeps an alternating user/assistant transcript
//! and recomputes only what an edit invalidated:
//!
//! 1. **Mutate**: `invoke`, `rewrite`, `set_directive`, `add_capability`
//! 2. **Invalidate**: later assistant turns (or all of them, for a new
//!    directive) are marked stale
//! 3. **Run**: stale turns are recomputed oldest first through the
//!    [`ModelCall`](chatty_core::ModelCall) collaborator, stopping at the
//!    first failure
//!
//! `copy` and `branch` detach independent stores that remember their parent.

pub mod render;
pub mod store;

pub use render::transcript;
pub use store::{ConversationStore, RunReport};
