//! `wareflow-tasks` — the movement-task family.
//!
//! Six task kinds share one shape and one forward-only state machine;
//! per-kind routing constraints are validated at creation, before any task
//! exists, so a mis-routed task can never reach the ledger.

pub mod task;

pub use task::{MovementTask, ReplenishMethod, TaskKind, TaskStatus};
