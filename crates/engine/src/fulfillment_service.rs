//! Inbound gatehouse chain and outbound order chain, wired to movement tasks.
//!
//! Inbound: booking → provisional bay → final bay → inbound record →
//! putaway task → Stored. Outbound: order → completion (picking transfers +
//! dispatch + loader tasks) → loading confirmation → finalize → CMR →
//! shipment.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use wareflow_core::{
    BayAssignmentId, BookingId, CustomerId, DispatchId, DomainError, DomainResult, InboundId,
    LocationCode, OrderId, ProductId, TaskId, WorkerId,
};
use wareflow_events::domain::OrderShipped;
use wareflow_events::{EventBus, InMemoryEventBus, WarehouseEvent};
use wareflow_fulfillment::{
    Cmr, Dispatch, FinalBayAssignment, FinalizeOutcome, GatehouseBooking, Inbound, InboundStatus,
    LoadingConfirmation, Order, OrderItem, ProvisionalBayAssignment, Shipment,
};
use wareflow_ledger::{StockKey, StockLedger};
use wareflow_locations::{LocationKindTag, LocationRegistry};
use wareflow_products::BatchNumber;
use wareflow_tasks::{TaskKind, TaskStatus};

use crate::task_engine::TaskEngine;

/// Layout wiring for the fulfillment chains.
#[derive(Debug, Clone)]
pub struct FulfillmentConfig {
    /// Outbound floor area where picked order stock is staged.
    pub outbound_staging: LocationCode,
    /// Outbound floor bay that loader tasks deliver to.
    pub dispatch_bay: LocationCode,
}

/// Result of attempting to complete an order.
///
/// Refusal is a normal business outcome, not an error: the order, the
/// ledger, and the task set are untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompleteOrderOutcome {
    Completed {
        dispatch_id: DispatchId,
        transfer_task_ids: Vec<TaskId>,
        loader_task_ids: Vec<TaskId>,
    },
    Refused {
        reason: String,
    },
}

#[derive(Debug, Default)]
struct GatehouseState {
    bookings: HashMap<BookingId, GatehouseBooking>,
    provisional: HashMap<BayAssignmentId, ProvisionalBayAssignment>,
    provisional_by_booking: HashMap<BookingId, BayAssignmentId>,
    finals: HashMap<BayAssignmentId, FinalBayAssignment>,
    final_by_provisional: HashMap<BayAssignmentId, BayAssignmentId>,
}

#[derive(Debug, Default)]
struct InboundState {
    inbounds: HashMap<InboundId, Inbound>,
    by_putaway_task: HashMap<TaskId, InboundId>,
}

#[derive(Debug, Default)]
struct OutboundState {
    orders: HashMap<OrderId, Order>,
    dispatches: HashMap<DispatchId, Dispatch>,
    dispatch_by_order: HashMap<OrderId, DispatchId>,
}

/// Application service for both fulfillment chains.
#[derive(Debug)]
pub struct FulfillmentService {
    engine: Arc<TaskEngine>,
    registry: Arc<LocationRegistry>,
    ledger: Arc<StockLedger>,
    bus: Arc<InMemoryEventBus<WarehouseEvent>>,
    config: FulfillmentConfig,
    gatehouse: Mutex<GatehouseState>,
    inbound: Mutex<InboundState>,
    outbound: Mutex<OutboundState>,
}

impl FulfillmentService {
    /// Wire the service up, validating that the configured staging and
    /// dispatch locations exist and are outbound floor areas.
    pub fn new(
        engine: Arc<TaskEngine>,
        registry: Arc<LocationRegistry>,
        ledger: Arc<StockLedger>,
        bus: Arc<InMemoryEventBus<WarehouseEvent>>,
        config: FulfillmentConfig,
    ) -> DomainResult<Self> {
        for code in [&config.outbound_staging, &config.dispatch_bay] {
            if registry.kind_tag(code)? != LocationKindTag::OutboundFloor {
                return Err(DomainError::invalid_state(format!(
                    "location {code} is not an outbound floor area"
                )));
            }
        }
        Ok(Self {
            engine,
            registry,
            ledger,
            bus,
            config,
            gatehouse: Mutex::new(GatehouseState::default()),
            inbound: Mutex::new(InboundState::default()),
            outbound: Mutex::new(OutboundState::default()),
        })
    }

    // ---- gatehouse chain ----

    pub fn record_booking(
        &self,
        driver_name: impl Into<String>,
        company: impl Into<String>,
        vehicle_registration: impl Into<String>,
        trailer_number: impl Into<String>,
        arrival_time: DateTime<Utc>,
    ) -> BookingId {
        let id = BookingId::new();
        let booking = GatehouseBooking::new(
            id,
            driver_name,
            company,
            vehicle_registration,
            trailer_number,
            arrival_time,
        );
        let mut state = self.gatehouse.lock().expect("gatehouse state poisoned");
        state.bookings.insert(id, booking);
        info!(booking = %id, "vehicle booked in at gatehouse");
        id
    }

    /// Advisory bay assignment on arrival; exactly one per booking.
    pub fn assign_provisional_bay(
        &self,
        booking_id: BookingId,
        bay: impl Into<String>,
        assigned_by: WorkerId,
    ) -> DomainResult<BayAssignmentId> {
        let mut state = self.gatehouse.lock().expect("gatehouse state poisoned");
        if !state.bookings.contains_key(&booking_id) {
            return Err(DomainError::not_found(format!("booking {booking_id}")));
        }
        if state.provisional_by_booking.contains_key(&booking_id) {
            return Err(DomainError::conflict(format!(
                "booking {booking_id} already has a provisional bay"
            )));
        }
        let id = BayAssignmentId::new();
        let assignment = ProvisionalBayAssignment::new(id, booking_id, bay, assigned_by, Utc::now());
        state.provisional.insert(id, assignment);
        state.provisional_by_booking.insert(booking_id, id);
        Ok(id)
    }

    /// Revise a provisional bay; allowed until the final bay is confirmed.
    pub fn revise_provisional_bay(
        &self,
        assignment_id: BayAssignmentId,
        bay: impl Into<String>,
        revised_by: WorkerId,
    ) -> DomainResult<()> {
        let mut state = self.gatehouse.lock().expect("gatehouse state poisoned");
        if state.final_by_provisional.contains_key(&assignment_id) {
            return Err(DomainError::conflict(format!(
                "provisional bay {assignment_id} already confirmed final"
            )));
        }
        let assignment = state.provisional.get_mut(&assignment_id).ok_or_else(|| {
            DomainError::not_found(format!("provisional bay assignment {assignment_id}"))
        })?;
        assignment.revise_bay(bay, revised_by, Utc::now());
        Ok(())
    }

    /// Authoritative bay assignment; exactly one per provisional.
    pub fn confirm_final_bay(
        &self,
        provisional_id: BayAssignmentId,
        bay: impl Into<String>,
        confirmed_by: WorkerId,
    ) -> DomainResult<BayAssignmentId> {
        let mut state = self.gatehouse.lock().expect("gatehouse state poisoned");
        if !state.provisional.contains_key(&provisional_id) {
            return Err(DomainError::not_found(format!(
                "provisional bay assignment {provisional_id}"
            )));
        }
        if state.final_by_provisional.contains_key(&provisional_id) {
            return Err(DomainError::conflict(format!(
                "provisional bay {provisional_id} already has a final assignment"
            )));
        }
        let id = BayAssignmentId::new();
        let assignment = FinalBayAssignment::new(id, provisional_id, bay, confirmed_by, Utc::now());
        state.finals.insert(id, assignment);
        state.final_by_provisional.insert(provisional_id, id);
        Ok(id)
    }

    /// One-shot loading confirmation on a final bay assignment; a repeat
    /// call reports `AlreadyConfirmed` and changes nothing.
    pub fn confirm_loading(
        &self,
        final_bay_id: BayAssignmentId,
        loader: WorkerId,
    ) -> DomainResult<LoadingConfirmation> {
        let mut state = self.gatehouse.lock().expect("gatehouse state poisoned");
        let assignment = state
            .finals
            .get_mut(&final_bay_id)
            .ok_or_else(|| DomainError::not_found(format!("final bay assignment {final_bay_id}")))?;
        let confirmation = assignment.confirm_loading(loader, Utc::now());
        if confirmation == LoadingConfirmation::AlreadyConfirmed {
            warn!(bay_assignment = %final_bay_id, "loading already confirmed");
        }
        Ok(confirmation)
    }

    pub fn final_bay(&self, id: BayAssignmentId) -> DomainResult<FinalBayAssignment> {
        let state = self.gatehouse.lock().expect("gatehouse state poisoned");
        state
            .finals
            .get(&id)
            .cloned()
            .ok_or_else(|| DomainError::not_found(format!("final bay assignment {id}")))
    }

    pub fn provisional_bay(&self, id: BayAssignmentId) -> DomainResult<ProvisionalBayAssignment> {
        let state = self.gatehouse.lock().expect("gatehouse state poisoned");
        state
            .provisional
            .get(&id)
            .cloned()
            .ok_or_else(|| DomainError::not_found(format!("provisional bay assignment {id}")))
    }

    // ---- inbound chain ----

    /// Record a received load. The stock arrives onto the inbound floor
    /// ledger row immediately; the record itself stays Pending until a
    /// release decision is made.
    #[allow(clippy::too_many_arguments)]
    pub fn record_inbound(
        &self,
        final_bay_id: BayAssignmentId,
        product_id: ProductId,
        quantity: u32,
        batch: BatchNumber,
        received_by: Option<WorkerId>,
        floor_location: LocationCode,
    ) -> DomainResult<InboundId> {
        // Existence checks before any state changes.
        self.final_bay(final_bay_id)?;
        if self.registry.kind_tag(&floor_location)? != LocationKindTag::InboundFloor {
            return Err(DomainError::invalid_state(format!(
                "location {floor_location} is not an inbound floor area"
            )));
        }
        let product = self.engine.catalog().get(product_id)?;

        let id = InboundId::new();
        let record = Inbound::new(
            id,
            final_bay_id,
            product_id,
            quantity,
            batch.clone(),
            Utc::now(),
            received_by,
            floor_location.clone(),
        )?;

        self.ledger.receive(
            &StockKey::new(floor_location.clone(), product_id, batch),
            quantity,
            Some(product.expiration_date()),
        )?;

        let mut state = self.inbound.lock().expect("inbound state poisoned");
        state.inbounds.insert(id, record);
        info!(inbound = %id, quantity, floor = %floor_location, "inbound load received");
        Ok(id)
    }

    /// Acknowledge a load without releasing it for putaway.
    pub fn mark_inbound_received(&self, inbound_id: InboundId) -> DomainResult<()> {
        let mut state = self.inbound.lock().expect("inbound state poisoned");
        let record = state
            .inbounds
            .get_mut(&inbound_id)
            .ok_or_else(|| DomainError::not_found(format!("inbound {inbound_id}")))?;
        record.update_status(InboundStatus::Received)
    }

    /// Release a pending load for putaway, creating the floor → PND
    /// movement task. Completing that task (via [`complete_putaway`]) marks
    /// the load Stored.
    ///
    /// [`complete_putaway`]: FulfillmentService::complete_putaway
    pub fn release_inbound(
        &self,
        inbound_id: InboundId,
        destination: LocationCode,
    ) -> DomainResult<TaskId> {
        let mut state = self.inbound.lock().expect("inbound state poisoned");
        let record = state
            .inbounds
            .get_mut(&inbound_id)
            .ok_or_else(|| DomainError::not_found(format!("inbound {inbound_id}")))?;

        // Validate the transition on a scratch copy first; the stored record
        // only changes once the task exists.
        let mut released = record.clone();
        released.update_status(InboundStatus::Released)?;

        let product = self.engine.catalog().get(record.product_id)?;
        let task_id = self.engine.create_task(
            TaskKind::InboundPutaway,
            record.product_id,
            record.quantity,
            record.batch.clone(),
            record.floor_location.clone(),
            destination,
            product.replenishment_priority(record.quantity),
        )?;

        *record = released;
        state.by_putaway_task.insert(task_id, inbound_id);
        info!(inbound = %inbound_id, task = %task_id, "inbound released for putaway");
        Ok(task_id)
    }

    /// Complete a putaway task and mark its inbound record Stored.
    pub fn complete_putaway(&self, task_id: TaskId) -> DomainResult<()> {
        self.engine.complete_task(task_id)?;
        let mut state = self.inbound.lock().expect("inbound state poisoned");
        let Some(inbound_id) = state.by_putaway_task.get(&task_id).copied() else {
            return Err(DomainError::not_found(format!(
                "no inbound linked to task {task_id}"
            )));
        };
        let record = state
            .inbounds
            .get_mut(&inbound_id)
            .ok_or_else(|| DomainError::not_found(format!("inbound {inbound_id}")))?;
        record.update_status(InboundStatus::Stored)?;
        info!(inbound = %inbound_id, "inbound load stored");
        Ok(())
    }

    pub fn inbound(&self, id: InboundId) -> DomainResult<Inbound> {
        let state = self.inbound.lock().expect("inbound state poisoned");
        state
            .inbounds
            .get(&id)
            .cloned()
            .ok_or_else(|| DomainError::not_found(format!("inbound {id}")))
    }

    // ---- outbound chain ----

    pub fn place_order(
        &self,
        customer_id: CustomerId,
        items: Vec<OrderItem>,
    ) -> DomainResult<OrderId> {
        let id = OrderId::new();
        let order = Order::new(id, customer_id, Utc::now(), items)?;
        let mut state = self.outbound.lock().expect("outbound state poisoned");
        state.orders.insert(id, order);
        info!(order = %id, "order placed");
        Ok(id)
    }

    pub fn mark_order_processing(&self, order_id: OrderId) -> DomainResult<()> {
        self.with_order(order_id, |order| order.mark_processing())
    }

    pub fn record_order_payment(&self, order_id: OrderId, when: DateTime<Utc>) -> DomainResult<()> {
        self.with_order(order_id, |order| {
            order.record_payment(when);
            Ok(())
        })
    }

    pub fn cancel_order(&self, order_id: OrderId) -> DomainResult<()> {
        self.with_order(order_id, |order| order.cancel())
    }

    pub fn order_invoice(&self, order_id: OrderId) -> DomainResult<String> {
        Ok(self.order(order_id)?.generate_invoice())
    }

    fn with_order(
        &self,
        order_id: OrderId,
        f: impl FnOnce(&mut Order) -> DomainResult<()>,
    ) -> DomainResult<()> {
        let mut state = self.outbound.lock().expect("outbound state poisoned");
        let order = state
            .orders
            .get_mut(&order_id)
            .ok_or_else(|| DomainError::not_found(format!("order {order_id}")))?;
        f(order)
    }

    /// Complete an order: source every item from a full-pallet storage
    /// location, create the picking transfers and loader tasks, mark the
    /// order shipped, and open its dispatch.
    ///
    /// Refusal is non-fatal and all-or-nothing: every item source is
    /// resolved before anything mutates, so a refused order leaves the
    /// order, the ledger, and the task set exactly as they were.
    pub fn complete_order(
        &self,
        order_id: OrderId,
        driver_name: impl Into<String>,
        vehicle_registration: impl Into<String>,
        trailer_number: impl Into<String>,
    ) -> DomainResult<CompleteOrderOutcome> {
        let mut state = self.outbound.lock().expect("outbound state poisoned");
        let order = state
            .orders
            .get_mut(&order_id)
            .ok_or_else(|| DomainError::not_found(format!("order {order_id}")))?;

        if !order.is_completable() {
            let reason = format!("order {order_id} is {:?}", order.status());
            warn!(order = %order_id, reason = %reason, "order completion refused");
            return Ok(CompleteOrderOutcome::Refused { reason });
        }

        // Resolve every item source before mutating anything.
        let mut plans = Vec::with_capacity(order.items().len());
        for item in order.items() {
            let product = self.engine.catalog().get(item.product_id)?;
            let source = self.ledger.find_location_with_stock(
                item.product_id,
                product.pallet_size(),
                |code| matches!(self.registry.kind_tag(code), Ok(LocationKindTag::Storage)),
            );
            let Some((source, _)) = source else {
                let reason = format!(
                    "no full-pallet stock for product {} ({})",
                    product.sku(),
                    item.product_id
                );
                warn!(order = %order_id, reason = %reason, "order completion refused");
                return Ok(CompleteOrderOutcome::Refused { reason });
            };
            plans.push((item.clone(), product, source));
        }

        let mut transfer_task_ids = Vec::with_capacity(plans.len());
        let mut loader_task_ids = Vec::with_capacity(plans.len());
        let dispatch_id = DispatchId::new();
        let mut dispatch = Dispatch::new(
            dispatch_id,
            order_id,
            driver_name,
            vehicle_registration,
            trailer_number,
        );

        for (item, product, source) in plans {
            let priority = product.replenishment_priority(item.quantity);
            let transfer = self.engine.create_task(
                TaskKind::FltTransfer,
                item.product_id,
                item.quantity,
                product.batch_number().clone(),
                source,
                self.config.outbound_staging.clone(),
                priority,
            )?;
            transfer_task_ids.push(transfer);

            let loader = self.engine.create_task(
                TaskKind::Loader,
                item.product_id,
                item.quantity,
                product.batch_number().clone(),
                self.config.outbound_staging.clone(),
                self.config.dispatch_bay.clone(),
                priority,
            )?;
            dispatch.add_loader_task(loader);
            loader_task_ids.push(loader);
        }

        order.mark_shipped()?;
        state.dispatches.insert(dispatch_id, dispatch);
        state.dispatch_by_order.insert(order_id, dispatch_id);

        info!(
            order = %order_id,
            dispatch = %dispatch_id,
            transfers = transfer_task_ids.len(),
            "order completed and shipped"
        );
        self.publish(WarehouseEvent::OrderShipped(OrderShipped {
            order_id,
            dispatch_id,
            occurred_at: Utc::now(),
        }));

        Ok(CompleteOrderOutcome::Completed {
            dispatch_id,
            transfer_task_ids,
            loader_task_ids,
        })
    }

    /// Link a dispatch to the final bay assignment its vehicle is on.
    pub fn link_dispatch_bay(
        &self,
        dispatch_id: DispatchId,
        final_bay_id: BayAssignmentId,
    ) -> DomainResult<()> {
        self.final_bay(final_bay_id)?;
        let mut state = self.outbound.lock().expect("outbound state poisoned");
        let dispatch = state
            .dispatches
            .get_mut(&dispatch_id)
            .ok_or_else(|| DomainError::not_found(format!("dispatch {dispatch_id}")))?;
        dispatch.link_final_bay(final_bay_id);
        Ok(())
    }

    /// Finalize a dispatch. Refuses (non-fatally) unless the linked bay
    /// assignment has confirmed loading and every loader task is done.
    pub fn finalize_dispatch(&self, dispatch_id: DispatchId) -> DomainResult<FinalizeOutcome> {
        let bay_loaded = {
            let state = self.outbound.lock().expect("outbound state poisoned");
            let dispatch = state
                .dispatches
                .get(&dispatch_id)
                .ok_or_else(|| DomainError::not_found(format!("dispatch {dispatch_id}")))?;
            let loaders_done = dispatch
                .loader_task_ids()
                .iter()
                .all(|id| matches!(self.engine.task(*id).map(|t| t.status()), Ok(TaskStatus::Completed)));
            loaders_done
                && match dispatch.final_bay_assignment {
                    Some(bay) => self.final_bay(bay)?.is_loaded(),
                    None => false,
                }
        };

        let mut state = self.outbound.lock().expect("outbound state poisoned");
        let dispatch = state
            .dispatches
            .get_mut(&dispatch_id)
            .ok_or_else(|| DomainError::not_found(format!("dispatch {dispatch_id}")))?;
        let outcome = dispatch.finalize(bay_loaded, Utc::now());
        if let FinalizeOutcome::Refused { reason } = &outcome {
            warn!(dispatch = %dispatch_id, reason = %reason, "dispatch finalization refused");
        }
        Ok(outcome)
    }

    /// Attach the CMR consignment note; at most one per dispatch.
    pub fn attach_cmr(
        &self,
        dispatch_id: DispatchId,
        confirmed_by: WorkerId,
        document_ref: impl Into<String>,
    ) -> DomainResult<()> {
        let mut state = self.outbound.lock().expect("outbound state poisoned");
        let dispatch = state
            .dispatches
            .get_mut(&dispatch_id)
            .ok_or_else(|| DomainError::not_found(format!("dispatch {dispatch_id}")))?;
        dispatch.attach_cmr(Cmr {
            created_at: Utc::now(),
            confirmed_by,
            document_ref: document_ref.into(),
        })
    }

    /// Record the physical departure; requires a finalized dispatch.
    pub fn record_shipment(
        &self,
        dispatch_id: DispatchId,
        shipped_by: WorkerId,
        tracking_number: Option<String>,
    ) -> DomainResult<()> {
        let mut state = self.outbound.lock().expect("outbound state poisoned");
        let dispatch = state
            .dispatches
            .get_mut(&dispatch_id)
            .ok_or_else(|| DomainError::not_found(format!("dispatch {dispatch_id}")))?;
        dispatch.record_shipment(Shipment {
            shipment_time: Utc::now(),
            shipped_by,
            tracking_number,
        })
    }

    pub fn order(&self, id: OrderId) -> DomainResult<Order> {
        let state = self.outbound.lock().expect("outbound state poisoned");
        state
            .orders
            .get(&id)
            .cloned()
            .ok_or_else(|| DomainError::not_found(format!("order {id}")))
    }

    pub fn dispatch(&self, id: DispatchId) -> DomainResult<Dispatch> {
        let state = self.outbound.lock().expect("outbound state poisoned");
        state
            .dispatches
            .get(&id)
            .cloned()
            .ok_or_else(|| DomainError::not_found(format!("dispatch {id}")))
    }

    pub fn dispatch_for_order(&self, order_id: OrderId) -> DomainResult<Dispatch> {
        let state = self.outbound.lock().expect("outbound state poisoned");
        let dispatch_id = state
            .dispatch_by_order
            .get(&order_id)
            .ok_or_else(|| DomainError::not_found(format!("dispatch for order {order_id}")))?;
        Ok(state.dispatches[dispatch_id].clone())
    }

    fn publish(&self, event: WarehouseEvent) {
        if let Err(err) = self.bus.publish(event) {
            warn!(?err, "event publish failed");
        }
    }
}
