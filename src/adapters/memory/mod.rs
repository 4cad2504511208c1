//! In-memory store
//!
//! Implements every store trait over a JSON fixture. Transitions succeed unless the
//! fixture lists the work unit under `blocked_transitions`.

pub mod fixture;
pub mod store;

pub use fixture::{
    AccountEmail, AddedAnalysisGroup, BlockedTransition, MemoryFixture, SampleMessageLink,
    StoredFile, StoredMessage, ThreadMessage, TransitionAttempt,
};
pub use store::MemoryStore;
