//! Dispatch paperwork: the outbound terminus of an order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use wareflow_core::{
    BayAssignmentId, DispatchId, DomainError, DomainResult, Entity, OrderId, TaskId, WorkerId,
};

/// CMR consignment note confirming goods handed to a carrier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cmr {
    pub created_at: DateTime<Utc>,
    pub confirmed_by: WorkerId,
    /// Reference into the document store (out of scope).
    pub document_ref: String,
}

/// Departure record for a finalized dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shipment {
    pub shipment_time: DateTime<Utc>,
    pub shipped_by: WorkerId,
    pub tracking_number: Option<String>,
}

/// Outcome of a finalize attempt.
///
/// Refusal is a normal workflow state an operator will resolve (the vehicle
/// simply is not loaded yet), so it is not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinalizeOutcome {
    Finalized { at: DateTime<Utc> },
    Refused { reason: String },
}

/// The single dispatch created when an order completes.
///
/// Owns its loader tasks (one per order item, by id), at most one CMR, and
/// at most one shipment. A shipment can never exist before the linked bay
/// assignment reports loading confirmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dispatch {
    id: DispatchId,
    pub order_id: OrderId,
    pub dispatched_by: Option<WorkerId>,
    pub driver_name: String,
    pub vehicle_registration: String,
    pub trailer_number: String,
    pub final_bay_assignment: Option<BayAssignmentId>,
    loader_task_ids: Vec<TaskId>,
    finalized_at: Option<DateTime<Utc>>,
    cmr: Option<Cmr>,
    shipment: Option<Shipment>,
}

impl Dispatch {
    pub fn new(
        id: DispatchId,
        order_id: OrderId,
        driver_name: impl Into<String>,
        vehicle_registration: impl Into<String>,
        trailer_number: impl Into<String>,
    ) -> Self {
        Self {
            id,
            order_id,
            dispatched_by: None,
            driver_name: driver_name.into(),
            vehicle_registration: vehicle_registration.into(),
            trailer_number: trailer_number.into(),
            final_bay_assignment: None,
            loader_task_ids: Vec::new(),
            finalized_at: None,
            cmr: None,
            shipment: None,
        }
    }

    pub fn id_typed(&self) -> DispatchId {
        self.id
    }

    pub fn loader_task_ids(&self) -> &[TaskId] {
        &self.loader_task_ids
    }

    pub fn add_loader_task(&mut self, task_id: TaskId) {
        self.loader_task_ids.push(task_id);
    }

    pub fn link_final_bay(&mut self, bay: BayAssignmentId) {
        self.final_bay_assignment = Some(bay);
    }

    pub fn finalized_at(&self) -> Option<DateTime<Utc>> {
        self.finalized_at
    }

    pub fn cmr(&self) -> Option<&Cmr> {
        self.cmr.as_ref()
    }

    pub fn shipment(&self) -> Option<&Shipment> {
        self.shipment.as_ref()
    }

    /// Finalize departure; refuses (non-fatally) until the linked bay
    /// assignment has confirmed loading.
    pub fn finalize(&mut self, bay_loaded: bool, now: DateTime<Utc>) -> FinalizeOutcome {
        if self.final_bay_assignment.is_none() {
            return FinalizeOutcome::Refused {
                reason: format!("dispatch {} has no final bay assignment", self.id),
            };
        }
        if !bay_loaded {
            return FinalizeOutcome::Refused {
                reason: "cannot dispatch, vehicle loading not confirmed".to_string(),
            };
        }
        self.finalized_at = Some(now);
        FinalizeOutcome::Finalized { at: now }
    }

    /// Attach the CMR document; a dispatch owns at most one.
    pub fn attach_cmr(&mut self, cmr: Cmr) -> DomainResult<()> {
        if self.cmr.is_some() {
            return Err(DomainError::conflict(format!(
                "dispatch {} already has a CMR",
                self.id
            )));
        }
        self.cmr = Some(cmr);
        Ok(())
    }

    /// Record the shipment; requires prior finalization (which itself
    /// requires confirmed loading), and a dispatch ships at most once.
    pub fn record_shipment(&mut self, shipment: Shipment) -> DomainResult<()> {
        if self.finalized_at.is_none() {
            return Err(DomainError::invariant(format!(
                "dispatch {} not finalized, shipment cannot exist before loading is confirmed",
                self.id
            )));
        }
        if self.shipment.is_some() {
            return Err(DomainError::conflict(format!(
                "dispatch {} already shipped",
                self.id
            )));
        }
        self.shipment = Some(shipment);
        Ok(())
    }
}

impl Entity for Dispatch {
    type Id = DispatchId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dispatch() -> Dispatch {
        Dispatch::new(
            DispatchId::new(),
            OrderId::new(),
            "J. Driver",
            "XYZ 1234",
            "TR 5678",
        )
    }

    #[test]
    fn finalize_refuses_without_bay_or_loading() {
        let mut d = dispatch();
        assert!(matches!(
            d.finalize(true, Utc::now()),
            FinalizeOutcome::Refused { .. }
        ));

        d.link_final_bay(BayAssignmentId::new());
        assert!(matches!(
            d.finalize(false, Utc::now()),
            FinalizeOutcome::Refused { .. }
        ));
        assert!(d.finalized_at().is_none());

        assert!(matches!(
            d.finalize(true, Utc::now()),
            FinalizeOutcome::Finalized { .. }
        ));
    }

    #[test]
    fn shipment_requires_finalization() {
        let mut d = dispatch();
        let shipment = Shipment {
            shipment_time: Utc::now(),
            shipped_by: WorkerId::new(),
            tracking_number: None,
        };
        let err = d.record_shipment(shipment.clone()).unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));

        d.link_final_bay(BayAssignmentId::new());
        d.finalize(true, Utc::now());
        d.record_shipment(shipment.clone()).unwrap();
        // At most one shipment.
        assert!(matches!(
            d.record_shipment(shipment).unwrap_err(),
            DomainError::Conflict(_)
        ));
    }

    #[test]
    fn at_most_one_cmr() {
        let mut d = dispatch();
        let cmr = Cmr {
            created_at: Utc::now(),
            confirmed_by: WorkerId::new(),
            document_ref: "cmr/0001".to_string(),
        };
        d.attach_cmr(cmr.clone()).unwrap();
        assert!(matches!(
            d.attach_cmr(cmr).unwrap_err(),
            DomainError::Conflict(_)
        ));
    }
}
