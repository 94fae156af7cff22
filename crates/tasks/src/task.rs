use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use wareflow_core::{DomainError, DomainResult, Entity, LocationCode, ProductId, TaskId, WorkerId};
use wareflow_locations::LocationKindTag;
use wareflow_products::{BatchNumber, TaskPriority};

/// Equipment class used for a replenishment movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplenishMethod {
    /// Vertical-narrow-aisle lift between racking and buffer.
    Vna,
    /// Fast floor-level cross-dock movement.
    CrossDock,
}

/// The six movement-task kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    /// Released inbound load, floor → PND buffer.
    InboundPutaway,
    /// VNA move between storage and a PND buffer, either direction.
    VnaTransfer,
    /// General fork-lift-truck floor movement (cross-dock, order completion).
    FltTransfer,
    /// Top-up of a pick face from a donor location.
    Replenishment { method: ReplenishMethod },
    /// Order picking, storage → PND buffer; chains a follow-on transfer.
    OrderPicking,
    /// Staging → dispatch bay, performed by the loading crew.
    Loader,
}

impl TaskKind {
    /// Stable label used in events and logs.
    pub fn label(&self) -> &'static str {
        match self {
            TaskKind::InboundPutaway => "inbound_putaway",
            TaskKind::VnaTransfer => "vna_transfer",
            TaskKind::FltTransfer => "flt_transfer",
            TaskKind::Replenishment {
                method: ReplenishMethod::Vna,
            } => "replenishment_vna",
            TaskKind::Replenishment {
                method: ReplenishMethod::CrossDock,
            } => "replenishment_cross_dock",
            TaskKind::OrderPicking => "order_picking",
            TaskKind::Loader => "loader",
        }
    }

    /// Per-kind routing constraints, checked against the endpoint kinds
    /// before a task is created.
    pub fn validate_route(
        &self,
        source: LocationKindTag,
        destination: LocationKindTag,
    ) -> DomainResult<()> {
        let fail = |msg: &str| {
            Err(DomainError::invalid_route(format!(
                "{}: {msg} (source {source:?}, destination {destination:?})",
                self.label()
            )))
        };
        match self {
            TaskKind::InboundPutaway => {
                if source != LocationKindTag::InboundFloor {
                    return fail("source must be an inbound floor location");
                }
            }
            TaskKind::VnaTransfer => {
                // Putaway direction starts at a PND, picking direction ends
                // at one; a move with no PND endpoint (or two) is not a VNA
                // transfer.
                let pnd_endpoints = usize::from(source == LocationKindTag::Pnd)
                    + usize::from(destination == LocationKindTag::Pnd);
                if pnd_endpoints != 1 {
                    return fail("exactly one endpoint must be a PND buffer");
                }
            }
            TaskKind::FltTransfer => {}
            TaskKind::Replenishment { .. } => {
                if destination != LocationKindTag::PickFace {
                    return fail("destination must be a pick face");
                }
            }
            TaskKind::OrderPicking => {
                if destination != LocationKindTag::Pnd {
                    return fail("destination must be a PND buffer");
                }
            }
            TaskKind::Loader => {
                if destination != LocationKindTag::OutboundFloor {
                    return fail("destination must be an outbound floor bay");
                }
            }
        }
        Ok(())
    }
}

/// Task lifecycle status; transitions are forward-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
    /// Terminal operator abort of an in-progress task; reverses no ledger
    /// state, since the ledger only mutates at completion.
    Failed,
}

/// One unit of physical movement work.
///
/// Tasks are never destroyed; the full set is an append-only audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovementTask {
    id: TaskId,
    kind: TaskKind,
    product_id: ProductId,
    quantity: u32,
    batch: BatchNumber,
    source: LocationCode,
    destination: LocationCode,
    assignee: Option<WorkerId>,
    status: TaskStatus,
    priority: TaskPriority,
    /// Equipment note, e.g. the VNA kit used.
    equipment: Option<String>,
    created_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    failed_at: Option<DateTime<Utc>>,
}

impl MovementTask {
    /// Create a task, fail-fast validating quantity and routing.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: TaskId,
        kind: TaskKind,
        product_id: ProductId,
        quantity: u32,
        batch: BatchNumber,
        source: LocationCode,
        source_kind: LocationKindTag,
        destination: LocationCode,
        destination_kind: LocationKindTag,
        priority: TaskPriority,
    ) -> DomainResult<Self> {
        if quantity == 0 {
            return Err(DomainError::validation("task quantity must be positive"));
        }
        if source == destination {
            return Err(DomainError::invalid_route(format!(
                "task source and destination are both {source}"
            )));
        }
        kind.validate_route(source_kind, destination_kind)?;

        Ok(Self {
            id,
            kind,
            product_id,
            quantity,
            batch,
            source,
            destination,
            assignee: None,
            status: TaskStatus::Pending,
            priority,
            equipment: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            failed_at: None,
        })
    }

    pub fn id_typed(&self) -> TaskId {
        self.id
    }

    pub fn kind(&self) -> TaskKind {
        self.kind
    }

    pub fn product_id(&self) -> ProductId {
        self.product_id
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn batch(&self) -> &BatchNumber {
        &self.batch
    }

    pub fn source(&self) -> &LocationCode {
        &self.source
    }

    pub fn destination(&self) -> &LocationCode {
        &self.destination
    }

    pub fn assignee(&self) -> Option<WorkerId> {
        self.assignee
    }

    pub fn status(&self) -> TaskStatus {
        self.status
    }

    pub fn priority(&self) -> TaskPriority {
        self.priority
    }

    pub fn equipment(&self) -> Option<&str> {
        self.equipment.as_deref()
    }

    pub fn set_equipment(&mut self, equipment: impl Into<String>) {
        self.equipment = Some(equipment.into());
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    pub fn failed_at(&self) -> Option<DateTime<Utc>> {
        self.failed_at
    }

    /// Assign a worker; only valid while Pending.
    pub fn assign(&mut self, worker: WorkerId) -> DomainResult<()> {
        if self.status != TaskStatus::Pending {
            return Err(DomainError::invalid_transition(format!(
                "task {} is {:?}, assignment only valid while pending",
                self.id, self.status
            )));
        }
        self.assignee = Some(worker);
        Ok(())
    }

    /// Abandon a pending task by removing its assignee.
    ///
    /// In-progress tasks cannot be abandoned; they run to completion or are
    /// explicitly failed.
    pub fn unassign(&mut self) -> DomainResult<()> {
        if self.status != TaskStatus::Pending {
            return Err(DomainError::invalid_transition(format!(
                "task {} is {:?}, only pending tasks can be abandoned",
                self.id, self.status
            )));
        }
        self.assignee = None;
        Ok(())
    }

    /// Pending → InProgress.
    pub fn start(&mut self, now: DateTime<Utc>) -> DomainResult<()> {
        if self.status != TaskStatus::Pending {
            return Err(DomainError::already_started(format!(
                "task {} is {:?}",
                self.id, self.status
            )));
        }
        self.status = TaskStatus::InProgress;
        self.started_at = Some(now);
        Ok(())
    }

    /// Check that completion is allowed right now.
    ///
    /// Split from [`mark_completed`] so the caller can run the stock
    /// transfer between the check and the state change while holding the
    /// task lock; on transfer failure the task stays InProgress and remains
    /// retryable.
    pub fn ensure_completable(&self) -> DomainResult<()> {
        match self.status {
            TaskStatus::InProgress => Ok(()),
            TaskStatus::Completed => Err(DomainError::already_completed(format!(
                "task {}",
                self.id
            ))),
            TaskStatus::Pending => Err(DomainError::invalid_transition(format!(
                "task {} has not been started",
                self.id
            ))),
            TaskStatus::Failed => Err(DomainError::invalid_transition(format!(
                "task {} was failed by an operator",
                self.id
            ))),
        }
    }

    /// InProgress → Completed. Caller must have passed [`ensure_completable`].
    pub fn mark_completed(&mut self, now: DateTime<Utc>) {
        debug_assert_eq!(self.status, TaskStatus::InProgress);
        self.status = TaskStatus::Completed;
        self.completed_at = Some(now);
    }

    /// Operator abort: InProgress → Failed. No ledger state is touched.
    pub fn fail(&mut self, now: DateTime<Utc>) -> DomainResult<()> {
        if self.status != TaskStatus::InProgress {
            return Err(DomainError::invalid_transition(format!(
                "task {} is {:?}, only in-progress tasks can be failed",
                self.id, self.status
            )));
        }
        self.status = TaskStatus::Failed;
        self.failed_at = Some(now);
        Ok(())
    }
}

impl Entity for MovementTask {
    type Id = TaskId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
