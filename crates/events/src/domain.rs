//! Warehouse domain events.
//!
//! These are the facts the movement core announces to its collaborators.
//! Task kinds are carried as their stable string labels so this crate stays
//! below the task model in the dependency graph.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use wareflow_core::{DispatchId, LocationCode, OrderId, ProductId, TaskId};

use crate::event::Event;

/// Event: a movement task of any kind was created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskCreated {
    pub task_id: TaskId,
    pub kind: String,
    pub product_id: ProductId,
    pub quantity: u32,
    pub source: LocationCode,
    pub destination: LocationCode,
    pub occurred_at: DateTime<Utc>,
}

/// Event: a movement task completed and its stock transfer was applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskCompleted {
    pub task_id: TaskId,
    pub kind: String,
    pub product_id: ProductId,
    pub quantity: u32,
    pub source: LocationCode,
    pub destination: LocationCode,
    pub occurred_at: DateTime<Utc>,
}

/// Event: a ledger row changed quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockChanged {
    pub location: LocationCode,
    pub product_id: ProductId,
    pub quantity: u32,
    pub occurred_at: DateTime<Utc>,
}

/// Event: a pick face dropped below its low-stock threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockBelowThreshold {
    pub pick_face: LocationCode,
    pub product_id: ProductId,
    pub current_stock: u32,
    pub low_stock_threshold: u32,
    pub occurred_at: DateTime<Utc>,
}

/// Event: replenishment was needed but no donor location had stock.
///
/// This is an observed operational condition, not an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplenishmentUnavailable {
    pub pick_face: LocationCode,
    pub product_id: ProductId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: an order was completed, picked, and marked shipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderShipped {
    pub order_id: OrderId,
    pub dispatch_id: DispatchId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WarehouseEvent {
    TaskCreated(TaskCreated),
    TaskCompleted(TaskCompleted),
    StockChanged(StockChanged),
    StockBelowThreshold(StockBelowThreshold),
    ReplenishmentUnavailable(ReplenishmentUnavailable),
    OrderShipped(OrderShipped),
}

impl Event for WarehouseEvent {
    fn event_type(&self) -> &'static str {
        match self {
            WarehouseEvent::TaskCreated(_) => "task.created",
            WarehouseEvent::TaskCompleted(_) => "task.completed",
            WarehouseEvent::StockChanged(_) => "stock.changed",
            WarehouseEvent::StockBelowThreshold(_) => "stock.below_threshold",
            WarehouseEvent::ReplenishmentUnavailable(_) => "replenishment.unavailable",
            WarehouseEvent::OrderShipped(_) => "order.shipped",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            WarehouseEvent::TaskCreated(e) => e.occurred_at,
            WarehouseEvent::TaskCompleted(e) => e.occurred_at,
            WarehouseEvent::StockChanged(e) => e.occurred_at,
            WarehouseEvent::StockBelowThreshold(e) => e.occurred_at,
            WarehouseEvent::ReplenishmentUnavailable(e) => e.occurred_at,
            WarehouseEvent::OrderShipped(e) => e.occurred_at,
        }
    }
}
