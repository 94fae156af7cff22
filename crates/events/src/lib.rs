//! Domain events and the pub/sub bus that carries them.
//!
//! Ledger mutations, task lifecycle changes, and fulfillment milestones emit
//! [`WarehouseEvent`]s; notification, audit-history, and reporting
//! collaborators (out of scope here) consume them via an [`EventBus`].

pub mod bus;
pub mod domain;
pub mod event;
pub mod in_memory_bus;

pub use bus::{EventBus, Subscription};
pub use domain::WarehouseEvent;
pub use event::Event;
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
