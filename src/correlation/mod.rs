//! Per-run state used to detect import cycles.
//!
//! Every top-level resolution request, together with the reentrant calls it triggers, forms
//! a logical run identified by a [`CorrelationId`]. The [`CorrelationStore`] keeps the
//! cycle-detection state of each active run and evicts it as soon as the outermost call
//! for that run returns.

mod provider;
mod store;

pub use provider::{
  CorrelationId, CorrelationIdProvider, CorrelationScope, FixedCorrelation, ThreadCorrelation,
};
pub use store::{CorrelationSnapshot, CorrelationStore, RunGuard};
