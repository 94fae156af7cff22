//! Inbound load records: the receiving side of the fulfillment pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use wareflow_core::{
    BayAssignmentId, DomainError, DomainResult, Entity, InboundId, LocationCode, ProductId,
    WorkerId,
};
use wareflow_products::BatchNumber;

/// Status of an inbound load, from gate arrival to putaway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InboundStatus {
    /// Awaiting admin release.
    Pending,
    /// Release acknowledged.
    Received,
    /// Ready for putaway.
    Released,
    /// Putaway complete.
    Stored,
}

impl InboundStatus {
    fn rank(self) -> u8 {
        match self {
            InboundStatus::Pending => 0,
            InboundStatus::Received => 1,
            InboundStatus::Released => 2,
            InboundStatus::Stored => 3,
        }
    }
}

/// One received load sitting on the warehouse floor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inbound {
    id: InboundId,
    pub final_bay_assignment: BayAssignmentId,
    pub product_id: ProductId,
    pub quantity: u32,
    pub batch: BatchNumber,
    pub receiving_date: DateTime<Utc>,
    pub received_by: Option<WorkerId>,
    pub notes: Option<String>,
    status: InboundStatus,
    /// Where on the floor the load was placed; putaway starts here.
    pub floor_location: LocationCode,
}

impl Inbound {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: InboundId,
        final_bay_assignment: BayAssignmentId,
        product_id: ProductId,
        quantity: u32,
        batch: BatchNumber,
        receiving_date: DateTime<Utc>,
        received_by: Option<WorkerId>,
        floor_location: LocationCode,
    ) -> DomainResult<Self> {
        if quantity == 0 {
            return Err(DomainError::validation("inbound quantity must be positive"));
        }
        Ok(Self {
            id,
            final_bay_assignment,
            product_id,
            quantity,
            batch,
            receiving_date,
            received_by,
            notes: None,
            status: InboundStatus::Pending,
            floor_location,
        })
    }

    pub fn id_typed(&self) -> InboundId {
        self.id
    }

    pub fn status(&self) -> InboundStatus {
        self.status
    }

    /// Move the load forward through its lifecycle.
    ///
    /// Transitions are forward-only, and `Released` additionally requires
    /// the current status to be exactly `Pending` (a load that has merely
    /// been acknowledged as Received must not skip straight to putaway).
    pub fn update_status(&mut self, new_status: InboundStatus) -> DomainResult<()> {
        if new_status.rank() <= self.status.rank() {
            return Err(DomainError::invalid_transition(format!(
                "inbound {} is {:?}, cannot go back to {new_status:?}",
                self.id, self.status
            )));
        }
        if new_status == InboundStatus::Released && self.status != InboundStatus::Pending {
            return Err(DomainError::invalid_transition(format!(
                "inbound {} is {:?}, can only release pending loads",
                self.id, self.status
            )));
        }
        self.status = new_status;
        Ok(())
    }
}

impl Entity for Inbound {
    type Id = InboundId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
