//! Movement-task lifecycle, wired to the ledger and the event bus.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use chrono::Utc;
use tracing::{info, warn};

use wareflow_core::{DomainError, DomainResult, LocationCode, ProductId, TaskId, WorkerId};
use wareflow_events::domain::{StockChanged, TaskCompleted, TaskCreated};
use wareflow_events::{EventBus, InMemoryEventBus, WarehouseEvent};
use wareflow_ledger::{StockLedger, TransferOutcome};
use wareflow_locations::{LocationKindTag, LocationRegistry};
use wareflow_products::{BatchNumber, ProductCatalog, TaskPriority};
use wareflow_tasks::{MovementTask, TaskKind};

use crate::replenishment::{ReplenishmentDecision, ReplenishmentReactor};

/// Engine wiring that is layout-specific rather than behavioural.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Where the follow-on transfer chained from a completed order-picking
    /// task delivers to (the designated outbound area).
    pub picking_chain_destination: LocationCode,
}

/// The movement-task engine.
///
/// Tasks are never destroyed; the full set is an append-only audit trail.
/// Each task sits behind its own mutex, so lifecycle calls on different
/// tasks never contend and two concurrent `complete_task` calls on the same
/// task serialize (the loser observes `AlreadyCompleted`).
#[derive(Debug)]
pub struct TaskEngine {
    registry: Arc<LocationRegistry>,
    ledger: Arc<StockLedger>,
    catalog: Arc<ProductCatalog>,
    bus: Arc<InMemoryEventBus<WarehouseEvent>>,
    reactor: ReplenishmentReactor,
    config: EngineConfig,
    tasks: RwLock<HashMap<TaskId, Arc<Mutex<MovementTask>>>>,
}

impl TaskEngine {
    pub fn new(
        registry: Arc<LocationRegistry>,
        ledger: Arc<StockLedger>,
        catalog: Arc<ProductCatalog>,
        bus: Arc<InMemoryEventBus<WarehouseEvent>>,
        config: EngineConfig,
    ) -> DomainResult<Self> {
        if registry.kind_tag(&config.picking_chain_destination)? != LocationKindTag::OutboundFloor {
            return Err(DomainError::invalid_state(format!(
                "location {} is not an outbound floor area",
                config.picking_chain_destination
            )));
        }
        let reactor = ReplenishmentReactor::new(
            Arc::clone(&registry),
            Arc::clone(&ledger),
            Arc::clone(&catalog),
            Arc::clone(&bus),
        );
        Ok(Self {
            registry,
            ledger,
            catalog,
            bus,
            reactor,
            config,
            tasks: RwLock::new(HashMap::new()),
        })
    }

    pub fn catalog(&self) -> &ProductCatalog {
        &self.catalog
    }

    /// Create a movement task, validating routing against the registered
    /// endpoint kinds before anything exists.
    #[allow(clippy::too_many_arguments)]
    pub fn create_task(
        &self,
        kind: TaskKind,
        product_id: ProductId,
        quantity: u32,
        batch: BatchNumber,
        source: LocationCode,
        destination: LocationCode,
        priority: TaskPriority,
    ) -> DomainResult<TaskId> {
        if !self.catalog.contains(product_id) {
            return Err(DomainError::not_found(format!("product {product_id}")));
        }
        let source_kind = self.registry.kind_tag(&source)?;
        let destination_kind = self.registry.kind_tag(&destination)?;

        let id = TaskId::new();
        let task = MovementTask::new(
            id,
            kind,
            product_id,
            quantity,
            batch,
            source.clone(),
            source_kind,
            destination.clone(),
            destination_kind,
            priority,
        )?;

        let mut map = self.tasks.write().expect("task engine poisoned");
        map.insert(id, Arc::new(Mutex::new(task)));
        drop(map);

        info!(
            task = %id,
            kind = kind.label(),
            quantity,
            source = %source,
            destination = %destination,
            "task created"
        );
        self.publish(WarehouseEvent::TaskCreated(TaskCreated {
            task_id: id,
            kind: kind.label().to_owned(),
            product_id,
            quantity,
            source,
            destination,
            occurred_at: Utc::now(),
        }));
        Ok(id)
    }

    fn entry(&self, id: TaskId) -> DomainResult<Arc<Mutex<MovementTask>>> {
        let map = self.tasks.read().expect("task engine poisoned");
        map.get(&id)
            .cloned()
            .ok_or_else(|| DomainError::not_found(format!("task {id}")))
    }

    /// Point-in-time copy of one task.
    pub fn task(&self, id: TaskId) -> DomainResult<MovementTask> {
        let entry = self.entry(id)?;
        let guard = entry.lock().expect("task poisoned");
        Ok(guard.clone())
    }

    /// Snapshot of every task, ordered by creation time.
    pub fn tasks(&self) -> Vec<MovementTask> {
        let map = self.tasks.read().expect("task engine poisoned");
        let mut all: Vec<MovementTask> = map
            .values()
            .map(|t| t.lock().expect("task poisoned").clone())
            .collect();
        all.sort_by(|a, b| {
            a.created_at()
                .cmp(&b.created_at())
                .then_with(|| a.id_typed().cmp(&b.id_typed()))
        });
        all
    }

    pub fn assign_task(&self, id: TaskId, worker: WorkerId) -> DomainResult<()> {
        let entry = self.entry(id)?;
        let mut guard = entry.lock().expect("task poisoned");
        guard.assign(worker)
    }

    pub fn unassign_task(&self, id: TaskId) -> DomainResult<()> {
        let entry = self.entry(id)?;
        let mut guard = entry.lock().expect("task poisoned");
        guard.unassign()
    }

    pub fn start_task(&self, id: TaskId) -> DomainResult<()> {
        let entry = self.entry(id)?;
        let mut guard = entry.lock().expect("task poisoned");
        guard.start(Utc::now())
    }

    /// Operator abort of an in-progress task. No ledger state is touched,
    /// since the ledger only mutates at completion.
    pub fn fail_task(&self, id: TaskId) -> DomainResult<()> {
        let entry = self.entry(id)?;
        let mut guard = entry.lock().expect("task poisoned");
        guard.fail(Utc::now())?;
        warn!(task = %id, "task failed by operator");
        Ok(())
    }

    pub fn set_task_equipment(&self, id: TaskId, equipment: impl Into<String>) -> DomainResult<()> {
        let entry = self.entry(id)?;
        let mut guard = entry.lock().expect("task poisoned");
        guard.set_equipment(equipment);
        Ok(())
    }

    /// Complete a task: apply its stock transfer atomically, then run the
    /// post-completion reactions.
    ///
    /// The task mutex is held across check → transfer → state change, so of
    /// two concurrent calls exactly one succeeds and the other observes
    /// `AlreadyCompleted`. If the transfer fails (`InsufficientStock`) the
    /// task stays InProgress and remains retryable.
    pub fn complete_task(&self, id: TaskId) -> DomainResult<TransferOutcome> {
        let entry = self.entry(id)?;
        let (task, outcome) = {
            let mut guard = entry.lock().expect("task poisoned");
            guard.ensure_completable()?;
            let outcome = self.ledger.transfer_atomic(
                guard.source(),
                guard.destination(),
                guard.product_id(),
                guard.batch(),
                guard.quantity(),
            )?;
            guard.mark_completed(Utc::now());
            (guard.clone(), outcome)
        };

        info!(
            task = %id,
            kind = task.kind().label(),
            quantity = task.quantity(),
            source = %task.source(),
            destination = %task.destination(),
            "task completed"
        );

        self.after_transfer(task.source(), task.product_id());
        self.after_transfer(task.destination(), task.product_id());

        self.publish(WarehouseEvent::TaskCompleted(TaskCompleted {
            task_id: id,
            kind: task.kind().label().to_owned(),
            product_id: task.product_id(),
            quantity: task.quantity(),
            source: task.source().clone(),
            destination: task.destination().clone(),
            occurred_at: Utc::now(),
        }));

        if task.kind() == TaskKind::OrderPicking {
            self.chain_picking_follow_on(&task);
        }

        Ok(outcome)
    }

    /// Post-mutation reactions for one endpoint: publish `StockChanged`,
    /// refresh the pick-face mirror, and run the replenishment reactor.
    ///
    /// Reaction failures are logged, not propagated; the transfer has
    /// already been applied and must not be reported as failed.
    fn after_transfer(&self, location: &LocationCode, product_id: ProductId) {
        let quantity = self.ledger.quantity_at(location, product_id);
        self.publish(WarehouseEvent::StockChanged(StockChanged {
            location: location.clone(),
            product_id,
            quantity,
            occurred_at: Utc::now(),
        }));

        match self.registry.kind_tag(location) {
            Ok(LocationKindTag::PickFace) => {
                if let Err(err) = self.registry.set_pick_face_stock(location, quantity) {
                    warn!(location = %location, ?err, "pick face mirror refresh failed");
                }
                if let Err(err) = self.run_replenishment(location) {
                    warn!(location = %location, ?err, "replenishment reaction failed");
                }
            }
            Ok(_) => {}
            Err(err) => warn!(location = %location, ?err, "endpoint vanished from registry"),
        }
    }

    /// Run the replenishment reactor for one pick face, creating the top-up
    /// task when one is called for.
    pub fn run_replenishment(&self, pick_face: &LocationCode) -> DomainResult<Option<TaskId>> {
        match self.reactor.evaluate(pick_face)? {
            ReplenishmentDecision::Replenish {
                donor,
                method,
                quantity,
                priority,
            } => {
                let spec = self
                    .registry
                    .pick_face_spec(pick_face)?
                    .ok_or_else(|| {
                        DomainError::invariant(format!("location {pick_face} is not a pick face"))
                    })?;
                let batch = self.batch_for(spec.product_id)?;
                let id = self.create_task(
                    TaskKind::Replenishment { method },
                    spec.product_id,
                    quantity,
                    batch,
                    donor,
                    pick_face.clone(),
                    priority,
                )?;
                Ok(Some(id))
            }
            _ => Ok(None),
        }
    }

    fn batch_for(&self, product_id: ProductId) -> DomainResult<BatchNumber> {
        Ok(self.catalog.get(product_id)?.batch_number().clone())
    }

    /// Completing an order-picking task drops the pallet at a PND buffer;
    /// the follow-on transfer carries it to the outbound area.
    fn chain_picking_follow_on(&self, picked: &MovementTask) {
        let result = self.create_task(
            TaskKind::FltTransfer,
            picked.product_id(),
            picked.quantity(),
            picked.batch().clone(),
            picked.destination().clone(),
            self.config.picking_chain_destination.clone(),
            picked.priority(),
        );
        match result {
            Ok(follow_on) => {
                info!(picked = %picked.id_typed(), follow_on = %follow_on, "picking follow-on chained")
            }
            Err(err) => {
                warn!(picked = %picked.id_typed(), ?err, "picking follow-on could not be chained")
            }
        }
    }

    fn publish(&self, event: WarehouseEvent) {
        if let Err(err) = self.bus.publish(event) {
            warn!(?err, "event publish failed");
        }
    }
}
