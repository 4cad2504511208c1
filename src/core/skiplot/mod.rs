//! Skip-lot batching
//!
//! Components, leaf first:
//!
//! - [`equivalency`] - eligibility of a sample type under an equivalency
//! - [`locator`] - open aggregate lookup
//! - [`accumulator`] - quota decision, attachment and aggregate creation
//! - [`advancer`] - two-phase workflow transition of a full aggregate
//! - [`post_actions`] - relabel and analysis propagation after advancement
//! - [`notifier`] - mailing-list or sample-thread messages
//! - [`coordinator`] - the [`SkipLotEngine`] running one invocation

pub mod accumulator;
pub mod advancer;
pub mod coordinator;
pub mod equivalency;
pub mod locator;
pub mod notifier;
pub mod post_actions;
pub mod summary;
pub mod trace;

pub use accumulator::{decide, BatchAccumulator, BatchDecision, Placement};
pub use coordinator::{sample_id_from_content, ExecuteParameters, SkipLotEngine};
pub use equivalency::{Eligibility, EquivalencyResolver};
pub use summary::{InvocationOutcome, InvocationReport};
pub use trace::{Action, ActionTrace};
