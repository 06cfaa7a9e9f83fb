//! Core assistant components
//!
//! Chat and plan-generation sessions, the plan prompt builder and the
//! food log store.

mod chat;
mod fallback;
pub mod plan;
mod plan_session;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;

pub use chat::{ChatSession, ChatSnapshot, SendOutcome};
pub use plan_session::{PlanError, PlanSession, PlanSnapshot};
pub use store::{FoodLog, FoodLogStore, StoreError};
