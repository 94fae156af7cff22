//! Fulfillment paperwork: orders, gatehouse, inbound, dispatch.
//!
//! Outbound: Order → Dispatch → CMR / Shipment. Inbound: GatehouseBooking →
//! ProvisionalBayAssignment → FinalBayAssignment → Inbound. These are the
//! entities; the orchestration that wires them to movement tasks lives in
//! `wareflow-engine`.

pub mod dispatch;
pub mod gatehouse;
pub mod inbound;
pub mod order;

pub use dispatch::{Cmr, Dispatch, FinalizeOutcome, Shipment};
pub use gatehouse::{
    FinalBayAssignment, GatehouseBooking, LoadingConfirmation, ProvisionalBayAssignment,
};
pub use inbound::{Inbound, InboundStatus};
pub use order::{Order, OrderItem, OrderStatus};
