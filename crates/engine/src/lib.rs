//! `wareflow-engine` — application services over the movement core.
//!
//! Three services compose the lower crates:
//!
//! - [`TaskEngine`]: the movement-task lifecycle, wired to the stock ledger
//!   (completion applies the atomic transfer) and the event bus.
//! - [`ReplenishmentReactor`]: runs synchronously after ledger mutations that
//!   touch a pick face and decides whether a top-up task is needed.
//! - [`FulfillmentService`]: the inbound gatehouse chain and the outbound
//!   order → dispatch → shipment chain, both expressed as movement tasks.

pub mod fulfillment_service;
pub mod replenishment;
pub mod task_engine;

#[cfg(test)]
mod integration_tests;

pub use fulfillment_service::{CompleteOrderOutcome, FulfillmentConfig, FulfillmentService};
pub use replenishment::{ReplenishmentDecision, ReplenishmentReactor};
pub use task_engine::{EngineConfig, TaskEngine};
